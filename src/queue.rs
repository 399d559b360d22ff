use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Handle to an entry that is still scheduled in an [`EventQueue`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EntryId(u64);

/// A payload paired with the priority it is ordered by.
///
/// Equality compares payload and priority only.
#[derive(Clone, Debug)]
pub struct Entry<T> {
    pub payload: T,
    pub priority: f64,
    id: EntryId,
}

impl<T> Entry<T> {
    pub fn new(payload: T, priority: f64) -> Self {
        Self {
            payload,
            priority,
            id: EntryId(0),
        }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }
}

impl<T: PartialEq> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload && self.priority == other.priority
    }
}

/// Min-priority queue keyed by `f64` timestamps.
///
/// Backed by a binary heap that tracks the position of every entry, so a
/// scheduled entry can be moved to a new priority in `O(log n)`. Entries
/// with equal priority pop in the order they were pushed.
#[derive(Debug)]
pub struct EventQueue<T> {
    heap: Vec<Entry<T>>,
    positions: HashMap<EntryId, usize>,
    next_id: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn push(&mut self, payload: T, priority: f64) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;

        let idx = self.heap.len();
        self.heap.push(Entry {
            payload,
            priority,
            id,
        });
        self.positions.insert(id, idx);
        self.sift_up(idx);
        id
    }

    pub fn pop(&mut self) -> Result<Entry<T>> {
        if self.heap.is_empty() {
            return Err(Error::EmptyQueue);
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop().ok_or(Error::EmptyQueue)?;
        self.positions.remove(&entry.id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Ok(entry)
    }

    pub fn peek(&self) -> Option<&Entry<T>> {
        self.heap.first()
    }

    /// Current priority of a scheduled entry.
    pub fn priority_of(&self, id: EntryId) -> Option<f64> {
        self.positions.get(&id).map(|&idx| self.heap[idx].priority)
    }

    /// Moves a scheduled entry to `priority`.
    pub fn update(&mut self, id: EntryId, priority: f64) -> Result<()> {
        let idx = *self.positions.get(&id).ok_or(Error::UnknownEntry)?;
        self.heap[idx].priority = priority;
        if !self.sift_down(idx) {
            self.sift_up(idx);
        }
        Ok(())
    }

    fn less(&self, i: usize, j: usize) -> bool {
        let a = &self.heap[i];
        let b = &self.heap[j];
        // ids grow with every push, so they double as insertion order
        match a.priority.total_cmp(&b.priority) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => a.id.0 < b.id.0,
        }
    }

    fn swap(&mut self, i: usize, j: usize) {
        if i == j {
            return;
        }
        self.heap.swap(i, j);
        self.positions.insert(self.heap[i].id, i);
        self.positions.insert(self.heap[j].id, j);
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if !self.less(idx, parent) {
                break;
            }
            self.swap(idx, parent);
            idx = parent;
        }
    }

    /// Returns whether the entry moved.
    fn sift_down(&mut self, start: usize) -> bool {
        let len = self.heap.len();
        let mut idx = start;
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
            self.swap(idx, child);
            idx = child;
        }
        idx > start
    }
}
