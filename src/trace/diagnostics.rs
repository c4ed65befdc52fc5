//! Traversal diagnostics
//!
//! Failures that were recovered during a run are collected here and returned
//! alongside the events instead of being printed and forgotten.

use serde::Serialize;
use std::fmt;

/// A recovered failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Transfer list could not be fetched; the address was treated as empty
    FetchFailed {
        address: String,
        depth: u32,
        error: String,
    },
    /// A single record was structurally invalid and skipped
    MalformedRecord {
        address: String,
        depth: u32,
        index: usize,
        hash: String,
        error: String,
    },
    /// A seed task ended abnormally; events it inserted are kept
    TaskFailed { seed: String, error: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FetchFailed { address, depth, error } => {
                write!(f, "fetch failed for {} at depth {}: {}", address, depth, error)
            }
            Diagnostic::MalformedRecord {
                address,
                depth,
                index,
                hash,
                error,
            } => write!(
                f,
                "malformed record #{} ({}) for {} at depth {}: {}",
                index, hash, address, depth, error
            ),
            Diagnostic::TaskFailed { seed, error } => {
                write!(f, "traversal task for seed {} failed: {}", seed, error)
            }
        }
    }
}

/// Counters for one seed traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    /// Frames that issued a fetch
    pub addresses_visited: u64,
    pub fetch_failures: u64,
    pub records_seen: u64,
    pub accepted: u64,
    pub filtered: u64,
    pub duplicates: u64,
    pub malformed: u64,
    /// Frames that stopped early on the acceptance cap
    pub cap_hits: u64,
}

impl TraversalStats {
    pub fn merge(&mut self, other: &TraversalStats) {
        self.addresses_visited += other.addresses_visited;
        self.fetch_failures += other.fetch_failures;
        self.records_seen += other.records_seen;
        self.accepted += other.accepted;
        self.filtered += other.filtered;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
        self.cap_hits += other.cap_hits;
    }
}

impl fmt::Display for TraversalStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} addresses, {} records, {} accepted, {} filtered, {} duplicates, {} malformed, {} fetch failures, {} cap hits",
            self.addresses_visited,
            self.records_seen,
            self.accepted,
            self.filtered,
            self.duplicates,
            self.malformed,
            self.fetch_failures,
            self.cap_hits
        )
    }
}
