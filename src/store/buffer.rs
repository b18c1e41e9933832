//! Fixed-capacity ring of recent events.

use crate::event::Event;
use std::collections::VecDeque;

/// Default number of events kept in memory.
pub const DEFAULT_CAPACITY: usize = 2000;

/// Insertion-ordered buffer that evicts the oldest event when full.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    capacity: usize,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBuffer {
    /// Create a buffer holding at most `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, returning the evicted one if the buffer was full.
    pub fn push(&mut self, event: Event) -> Option<Event> {
        let evicted = if self.events.len() == self.capacity {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Most recently accepted event.
    pub fn last(&self) -> Option<&Event> {
        self.events.back()
    }

    /// Up to `limit` most recent events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<Event> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
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
}
