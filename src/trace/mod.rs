//! Transfer Tracing Core
//!
//! Filter, deduplicating collection and the concurrent depth-first
//! traversal engine that ties them to a `TransferSource`.
//!
//! Created: 2026-10-18

pub mod cancel;
pub mod collection;
pub mod diagnostics;
pub mod engine;
pub mod filter;

pub use cancel::CancelSignal;
pub use collection::{is_duplicate, EventCollection};
pub use diagnostics::{Diagnostic, TraversalStats};
pub use engine::{SeedSummary, TraceReport, TraversalEngine};
pub use filter::{EventFilter, FilterReason, RecordOutcome};
