//! Interaction recorder
//!
//! Bounded, append-only store of recent interaction events. Ingestion is a
//! single `VecDeque` push (plus at most one eviction), so the host adapter can
//! forward raw events without ever blocking on feature computation.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::behavior::types::InteractionEvent;
use crate::config::DEFAULT_RECORDER_CAPACITY;

/// Rolling event buffer with FIFO eviction
#[derive(Debug, Clone)]
pub struct InteractionRecorder {
    events: VecDeque<InteractionEvent>,
    capacity: usize,
}

impl Default for InteractionRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_RECORDER_CAPACITY)
    }
}

impl InteractionRecorder {
    /// Create a recorder retaining at most `capacity` events (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest once capacity is exceeded
    pub fn append(&mut self, event: InteractionEvent) {
        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
    }

    /// Alias of [`append`](Self::append) used by host adapters
    pub fn ingest(&mut self, event: InteractionEvent) {
        self.append(event);
    }

    /// Events within `window_ms` of the current wall-clock time
    pub fn query(&self, window_ms: u64) -> Vec<InteractionEvent> {
        self.query_at(window_ms, Utc::now())
    }

    /// Events with `now - timestamp <= window_ms`, in insertion order
    pub fn query_at(&self, window_ms: u64, now: DateTime<Utc>) -> Vec<InteractionEvent> {
        let window_ms = i64::try_from(window_ms).unwrap_or(i64::MAX);
        self.events
            .iter()
            .filter(|e| (now - e.timestamp).num_milliseconds() <= window_ms)
            .cloned()
            .collect()
    }

    /// Iterate over every retained event, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &InteractionEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
