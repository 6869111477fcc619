//! Index-tracking binary min-heap of [`TimedValue`]s ordered by `next`.
//!
//! Every entry is tagged with a [`HeapHandle`] and the heap keeps a map from
//! handle to array slot current across every swap. That makes removal of an
//! arbitrary entry O(log n): the target is swapped with the last slot, the
//! tail is truncated, and the entry that moved into the hole is sifted up or
//! down until heap order holds again.
//!
//! The heap does not deduplicate and does not lock; callers serialize access.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::core::TimedValue;

/// Opaque identity of one pushed entry, valid until it leaves the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapHandle(u64);

#[derive(Debug)]
struct Slot {
    handle: HeapHandle,
    entry: TimedValue,
}

/// Min-heap keyed on [`TimedValue::next`]. Ties pop in an unspecified order.
#[derive(Debug, Default)]
pub struct TimedHeap {
    slots: Vec<Slot>,
    positions: HashMap<HeapHandle, usize>,
    next_handle: u64,
}

impl TimedHeap {
    /// Empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty heap with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
            next_handle: 0,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the heap holds no entries.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Insert an entry and return the handle that identifies it.
    pub fn push(&mut self, entry: TimedValue) -> HeapHandle {
        let handle = HeapHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        let idx = self.slots.len();
        self.slots.push(Slot { handle, entry });
        self.positions.insert(handle, idx);
        self.sift_up(idx);
        handle
    }

    /// Remove and return the entry with the smallest `next`.
    pub fn pop(&mut self) -> Option<(HeapHandle, TimedValue)> {
        let last = self.slots.len().checked_sub(1)?;
        self.swap_slots(0, last);
        let slot = self.slots.pop()?;
        self.positions.remove(&slot.handle);
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        Some((slot.handle, slot.entry))
    }

    /// Remove the entry behind `handle`, restoring heap order around the
    /// slot it vacated. Returns `None` for handles no longer in the heap.
    pub fn remove(&mut self, handle: HeapHandle) -> Option<TimedValue> {
        let idx = *self.positions.get(&handle)?;
        let last = self.slots.len().checked_sub(1)?;
        self.swap_slots(idx, last);
        let slot = self.slots.pop()?;
        self.positions.remove(&slot.handle);
        if idx < self.slots.len() {
            self.restore(idx);
        }
        Some(slot.entry)
    }

    /// Entry that the next [`pop`](Self::pop) would return.
    pub fn peek(&self) -> Option<&TimedValue> {
        self.slots.first().map(|slot| &slot.entry)
    }

    /// Look up a live entry by handle.
    pub fn get(&self, handle: HeapHandle) -> Option<&TimedValue> {
        self.positions
            .get(&handle)
            .and_then(|&idx| self.slots.get(idx))
            .map(|slot| &slot.entry)
    }

    /// Drop every entry. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.positions.clear();
    }

    fn next_at(&self, idx: usize) -> SystemTime {
        self.slots[idx].entry.next
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.next_at(a) < self.next_at(b)
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        self.positions.insert(self.slots[a].handle, a);
        self.positions.insert(self.slots[b].handle, b);
    }

    fn restore(&mut self, idx: usize) {
        if idx > 0 && self.less(idx, (idx - 1) / 2) {
            self.sift_up(idx);
        } else {
            self.sift_down(idx);
        }
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.less(idx, parent) {
                break;
            }
            self.swap_slots(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.slots.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, idx) {
                break;
            }
            self.swap_slots(idx, child);
            idx = child;
        }
    }
}
