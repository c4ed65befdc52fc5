//! Traversal Engine
//!
//! Walks the transfer graph forward from each seed address, depth-first and
//! pre-order, up to `max_depth`. Each seed runs as its own tokio task; all
//! tasks share one `EventCollection` and are joined before the report is
//! built.
//!
//! Per seed, the walk uses an explicit stack of frames instead of recursion.
//! A frame is one `(address, depth)` visit: its fetched records, a cursor,
//! and the number of events it has accepted. Accepting a record pushes the
//! child frame for `record.to` immediately, so the child is fully expanded
//! before the next sibling record is considered.
//!
//! Failure handling:
//! - fetch failure: the address is treated as having no transfers
//! - malformed record: skipped, reported, walk continues
//! - cancellation: in-flight fetches are dropped and tasks unwind; every
//!   event in the collection is complete
//!
//! Created: 2026-10-18

use super::cancel::CancelSignal;
use super::collection::EventCollection;
use super::diagnostics::{Diagnostic, TraversalStats};
use super::filter::{EventFilter, RecordOutcome};
use crate::config::TraceConfig;
use crate::explorer::TransferSource;
use crate::types::{TracedEvent, TransferRecord};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One `(address, depth)` visit on the explicit stack
struct Frame {
    address: String,
    depth: u32,
    records: Vec<TransferRecord>,
    cursor: usize,
    accepted: usize,
}

/// Result of one seed traversal
#[derive(Debug, Clone, Default)]
pub struct SeedSummary {
    pub seed: String,
    pub stats: TraversalStats,
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything a run produced, handed to the result sink after the join
#[derive(Debug, Clone, Default)]
pub struct TraceReport {
    /// Events in global insertion order
    pub events: Vec<TracedEvent>,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: TraversalStats,
    pub seeds: Vec<SeedSummary>,
    /// The run stopped early on a cancel request
    pub cancelled: bool,
}

/// Depth-bounded transfer graph walker
#[derive(Clone)]
pub struct TraversalEngine {
    source: Arc<dyn TransferSource>,
    filter: EventFilter,
    max_depth: u32,
    tx_count_threshold: usize,
    cancel: CancelSignal,
}

impl TraversalEngine {
    pub fn new(
        source: Arc<dyn TransferSource>,
        filter: EventFilter,
        max_depth: u32,
        tx_count_threshold: usize,
    ) -> Self {
        Self {
            source,
            filter,
            max_depth,
            tx_count_threshold,
            cancel: CancelSignal::new(),
        }
    }

    pub fn from_config(source: Arc<dyn TransferSource>, config: &TraceConfig) -> Self {
        Self::new(
            source,
            EventFilter::new(config.tracked_token_symbol.clone()),
            config.max_depth,
            config.tx_count_threshold,
        )
    }

    /// Use an externally owned cancel signal
    pub fn with_cancel_signal(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Trace every seed concurrently and join before returning
    pub async fn run(&self, seeds: &[String]) -> TraceReport {
        info!(
            "Tracing {} seed(s): max_depth={}, tx_count_threshold={}, symbol={}",
            seeds.len(),
            self.max_depth,
            self.tx_count_threshold,
            self.filter.tracked_symbol()
        );

        let collection = Arc::new(EventCollection::new());
        let handles = seeds.iter().map(|seed| {
            let engine = self.clone();
            let collection = Arc::clone(&collection);
            let seed = seed.clone();
            tokio::spawn(async move { engine.trace_seed(&seed, &collection).await })
        });
        let results = join_all(handles).await;

        let mut report = TraceReport::default();
        for (seed, result) in seeds.iter().zip(results) {
            match result {
                Ok(summary) => {
                    report.stats.merge(&summary.stats);
                    report.diagnostics.extend(summary.diagnostics.iter().cloned());
                    report.seeds.push(summary);
                }
                Err(e) => {
                    error!("Traversal task for {} failed: {}", seed, e);
                    report.diagnostics.push(Diagnostic::TaskFailed {
                        seed: seed.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Every task has been joined, so no other owner remains
        report.events = match Arc::try_unwrap(collection) {
            Ok(collection) => collection.into_events(),
            Err(shared) => shared.snapshot(),
        };
        report.cancelled = self.cancel.is_cancelled();

        info!(
            "Trace complete: {} events, {} diagnostics ({})",
            report.events.len(),
            report.diagnostics.len(),
            report.stats
        );
        report
    }

    /// Depth-first walk from one seed, writing into the shared collection
    pub async fn trace_seed(&self, seed: &str, collection: &EventCollection) -> SeedSummary {
        let mut summary = SeedSummary {
            seed: seed.to_string(),
            ..Default::default()
        };
        info!("Seed {}: starting traversal", seed);

        let mut stack: Vec<Frame> = Vec::new();
        if let Some(root) = self.open_frame(seed, 0, &mut summary).await {
            stack.push(root);
        }

        while let Some(frame) = stack.last_mut() {
            if self.cancel.is_cancelled() {
                warn!("Seed {}: cancelled with {} frame(s) open", seed, stack.len());
                break;
            }
            if frame.cursor >= frame.records.len() {
                stack.pop();
                continue;
            }

            let index = frame.cursor;
            frame.cursor += 1;
            summary.stats.records_seen += 1;

            let outcome = self
                .filter
                .evaluate(&frame.records[index], &frame.address, frame.depth);
            let event = match outcome {
                RecordOutcome::Accepted(event) => event,
                RecordOutcome::Filtered(_) => {
                    summary.stats.filtered += 1;
                    continue;
                }
                RecordOutcome::Malformed(e) => {
                    let hash = frame.records[index].hash.clone();
                    warn!("Skipping record #{} ({}) for {}: {}", index, hash, frame.address, e);
                    summary.stats.malformed += 1;
                    summary.diagnostics.push(Diagnostic::MalformedRecord {
                        address: frame.address.clone(),
                        depth: frame.depth,
                        index,
                        hash,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            if collection.contains(&event) {
                summary.stats.duplicates += 1;
                continue;
            }
            if frame.accepted >= self.tx_count_threshold {
                debug!(
                    "{} at depth {}: acceptance cap {} reached",
                    frame.address, frame.depth, self.tx_count_threshold
                );
                summary.stats.cap_hits += 1;
                frame.cursor = frame.records.len();
                continue;
            }

            let next = event.to.clone();
            let next_depth = frame.depth + 1;
            debug!("Event: {}", event);
            if !collection.try_insert(event) {
                // Another seed inserted the same transfer since the check above
                summary.stats.duplicates += 1;
                continue;
            }
            frame.accepted += 1;
            summary.stats.accepted += 1;

            if let Some(child) = self.open_frame(&next, next_depth, &mut summary).await {
                stack.push(child);
            }
        }

        info!("Seed {}: {}", seed, summary.stats);
        summary
    }

    /// Fetch records for a new frame. Returns `None` for terminal visits:
    /// depth bound reached, fetch failed or cancelled.
    async fn open_frame(&self, address: &str, depth: u32, summary: &mut SeedSummary) -> Option<Frame> {
        if depth >= self.max_depth || self.cancel.is_cancelled() {
            return None;
        }
        summary.stats.addresses_visited += 1;

        let result = tokio::select! {
            _ = self.cancel.cancelled() => {
                debug!("Fetch for {} abandoned on cancel", address);
                return None;
            }
            result = self.source.fetch(address) => result,
        };

        match result {
            Ok(records) => {
                debug!("{} at depth {}: {} transfers", address, depth, records.len());
                Some(Frame {
                    address: address.to_string(),
                    depth,
                    records,
                    cursor: 0,
                    accepted: 0,
                })
            }
            Err(e) => {
                warn!("Fetch failed for {} at depth {}: {}", address, depth, e);
                summary.stats.fetch_failures += 1;
                summary.diagnostics.push(Diagnostic::FetchFailed {
                    address: address.to_string(),
                    depth,
                    error: e.to_string(),
                });
                None
            }
        }
    }
}
