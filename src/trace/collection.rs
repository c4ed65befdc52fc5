//! Shared event collection
//!
//! Append-only, insertion-ordered store shared by every seed task.
//! The duplicate check and the append run under one lock, so two tasks
//! discovering the same transfer at the same time cannot both insert it.
//! A key index makes the duplicate check O(1).

use crate::types::{EventKey, TracedEvent};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    events: Vec<TracedEvent>,
    index: HashSet<EventKey>,
}

/// Thread-safe, deduplicating event store
#[derive(Debug, Default)]
pub struct EventCollection {
    inner: Mutex<Inner>,
}

/// Whether `candidate` matches any event in `existing` on every field except `layer`
pub fn is_duplicate(candidate: &TracedEvent, existing: &[TracedEvent]) -> bool {
    let key = candidate.key();
    existing.iter().any(|e| e.key() == key)
}

impl EventCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events are only ever appended whole, so a poisoned lock still guards
    /// a consistent collection.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `event` unless an equal event (ignoring `layer`) is present.
    /// Returns true when inserted.
    pub fn try_insert(&self, event: TracedEvent) -> bool {
        let mut inner = self.lock();
        if !inner.index.insert(event.key()) {
            return false;
        }
        inner.events.push(event);
        true
    }

    pub fn contains(&self, event: &TracedEvent) -> bool {
        self.lock().index.contains(&event.key())
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the events in insertion order
    pub fn snapshot(&self) -> Vec<TracedEvent> {
        self.lock().events.clone()
    }

    /// Consume the collection, returning events in insertion order
    pub fn into_events(self) -> Vec<TracedEvent> {
        self.inner
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .events
    }
}
