//! Token Provenance Tracer
//!
//! Traces where a token went: starting from the configured seed addresses,
//! follows qualifying transfers forward through the block explorer up to
//! MAX_DEPTH layers and writes the resulting event graph to CSV.
//!
//! Usage:
//!   cargo run --release -- --seed 0xabc... --max-depth 3
//!   cargo run --release -- --config trace.toml --output data/result.csv
//!
//! Configuration comes from `.env`, the environment, an optional TOML file
//! and CLI flags (highest precedence). Ctrl-C stops the trace and still
//! writes everything collected so far.
//!
//! Created: 2026-10-18

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use token_trace::config::{ConfigVars, TomlTraceConfig, TraceConfig};
use token_trace::{
    CancelSignal, CsvResultSink, DiagnosticsLogger, ExplorerClient, ResultSink, RetryPolicy,
    RetryingSource, TraversalEngine,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Token provenance tracer
#[derive(Parser)]
#[command(name = "token-trace")]
struct Args {
    /// Env file to load before reading the environment
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Optional TOML config file (overrides environment)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed address (repeatable; overrides SEED_ADDRESSES)
    #[arg(short, long = "seed")]
    seeds: Vec<String>,

    /// Depth bound (overrides MAX_DEPTH)
    #[arg(long)]
    max_depth: Option<u32>,

    /// Per-address acceptance cap (overrides TX_COUNT_THRESHOLD)
    #[arg(long)]
    tx_count_threshold: Option<usize>,

    /// Token symbol traced at depth 0 (overrides TRACKED_TOKEN_SYMBOL)
    #[arg(long)]
    symbol: Option<String>,

    /// Output CSV path (overrides OUTPUT_PATH)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Resolve configuration: env file < environment < TOML < CLI
    fn resolve_config(&self) -> Result<TraceConfig> {
        dotenv::from_filename(&self.env_file).ok();
        let mut vars = ConfigVars::from_env();

        if let Some(path) = &self.config {
            vars.overlay_toml(TomlTraceConfig::load(path)?);
        }
        if !self.seeds.is_empty() {
            vars.set("SEED_ADDRESSES", self.seeds.join(","));
        }
        if let Some(depth) = self.max_depth {
            vars.set("MAX_DEPTH", depth.to_string());
        }
        if let Some(threshold) = self.tx_count_threshold {
            vars.set("TX_COUNT_THRESHOLD", threshold.to_string());
        }
        if let Some(symbol) = &self.symbol {
            vars.set("TRACKED_TOKEN_SYMBOL", symbol.clone());
        }
        if let Some(output) = &self.output {
            vars.set("OUTPUT_PATH", output.to_string_lossy());
        }

        Ok(TraceConfig::from_vars(&vars)?)
    }
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    info!("===========================================");
    info!("   Token Provenance Tracer");
    info!("===========================================");

    let config = args.resolve_config().context("Invalid configuration")?;
    info!("Explorer: {}", config.api_url);
    info!("Seeds: {:?}", config.seed_addresses);
    info!(
        "Max depth: {}, tx count threshold: {}, tracked symbol: {}",
        config.max_depth, config.tx_count_threshold, config.tracked_token_symbol
    );

    let client = ExplorerClient::new(&config.api_url, &config.api_key, config.request_timeout)
        .context("Failed to build explorer client")?;
    let source = RetryingSource::new(client, RetryPolicy::new(config.max_retries, config.initial_backoff));

    let cancel = CancelSignal::new();
    let engine = TraversalEngine::from_config(Arc::new(source), &config).with_cancel_signal(cancel.clone());

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, stopping trace (partial results will be saved)");
            cancel.cancel();
        }
    });

    let report = engine.run(&config.seed_addresses).await;

    let mut sink = CsvResultSink::new(&config.output_path);
    sink.write(&report.events)?;

    if !report.diagnostics.is_empty() {
        let logger = DiagnosticsLogger::beside(&config.output_path);
        logger.write(&report.diagnostics)?;
        warn!(
            "{} recovered failure(s) written to {}",
            report.diagnostics.len(),
            logger.path().display()
        );
    }

    for seed in &report.seeds {
        info!("  {}: {}", seed.seed, seed.stats);
    }
    if report.cancelled {
        warn!("Trace was cancelled; {} events saved", report.events.len());
    } else {
        info!("Done: {} events saved to {}", report.events.len(), config.output_path.display());
    }

    Ok(())
}
