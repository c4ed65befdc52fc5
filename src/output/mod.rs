//! Result Output
//!
//! Sinks receive the final event collection after every traversal task has
//! been joined. The CSV sink produces the dataset read by the graph
//! dashboard; the JSONL logger keeps the run's diagnostics next to it.
//!
//! Created: 2026-10-18

pub mod csv_sink;
pub mod diagnostics_log;

pub use csv_sink::CsvResultSink;
pub use diagnostics_log::DiagnosticsLogger;

use crate::types::TracedEvent;
use anyhow::Result;

/// Consumer of the final, stable event collection
pub trait ResultSink {
    /// Persist `events` in the given (insertion) order
    fn write(&mut self, events: &[TracedEvent]) -> Result<()>;
}
