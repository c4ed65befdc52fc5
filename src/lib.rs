//! Token Provenance Tracer Library
//!
//! Follows ERC-20 transfer flow outward from seed addresses using an
//! Etherscan-compatible block explorer, up to a bounded depth, and produces
//! a deduplicated, ordered event dataset for graph analysis.
//!
//! Created: 2026-10-18

pub mod config;
pub mod explorer;
pub mod output;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigError, TraceConfig};
pub use explorer::{ExplorerClient, FetchError, RetryPolicy, RetryingSource, TransferSource};
pub use output::{CsvResultSink, DiagnosticsLogger, ResultSink};
pub use trace::{CancelSignal, Diagnostic, EventCollection, EventFilter, TraceReport, TraversalEngine};
pub use types::{TracedEvent, TransferRecord, BURN_ADDRESS};
