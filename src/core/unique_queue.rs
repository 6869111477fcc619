//! Time-ordered queue that holds at most one entry per key.

use std::collections::HashMap;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::core::timed_heap::{HeapHandle, TimedHeap};
use crate::core::TimedValue;

/// Heap plus membership, always mutated together under one lock.
#[derive(Debug, Default)]
struct UniqueState {
    heap: TimedHeap,
    /// Keys currently in `heap`, mapped to the handle of their entry.
    members: HashMap<String, HeapHandle>,
}

/// Queue ordered by [`TimedValue::next`] that guarantees any key is present
/// at most once until it is popped or explicitly removed.
///
/// Each operation takes the internal `parking_lot::Mutex` for its own
/// duration only.
#[derive(Debug, Default)]
pub struct UniqueQueue {
    state: Mutex<UniqueState>,
}

impl UniqueQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless its key is already queued. The existing entry's
    /// schedule is left untouched in that case. Returns true if inserted.
    pub fn add(&self, entry: TimedValue) -> bool {
        let mut state = self.state.lock();
        if state.members.contains_key(&entry.value) {
            return false;
        }
        let key = entry.value.clone();
        let handle = state.heap.push(entry);
        state.members.insert(key, handle);
        true
    }

    /// Drop `key` from the queue so it will not be returned by [`get`](Self::get)
    /// and may be added again. Returns true if an entry was removed.
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        match state.members.remove(key) {
            Some(handle) => state.heap.remove(handle).is_some(),
            None => false,
        }
    }

    /// Pop the entry with the earliest `next`, releasing its key.
    pub fn get(&self) -> Option<TimedValue> {
        let mut state = self.state.lock();
        let (_, entry) = state.heap.pop()?;
        state.members.remove(&entry.value);
        Some(entry)
    }

    /// Scheduled time of the front entry, if any.
    pub fn peek_next(&self) -> Option<SystemTime> {
        self.state.lock().heap.peek().map(|e| e.next)
    }

    /// Whether `key` is currently queued.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().members.contains_key(key)
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry and return how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.heap.len();
        state.heap.clear();
        state.members.clear();
        dropped
    }
}
