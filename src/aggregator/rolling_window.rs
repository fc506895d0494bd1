//! Fixed-capacity FIFO window
//!
//! The window keeps the most recent `capacity` entries in arrival order.
//! Appending beyond capacity drops the oldest entry; entries are never
//! reordered or de-duplicated.

use std::collections::vec_deque::{self, VecDeque};

#[derive(Debug, Clone, PartialEq)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    /// Create an empty window
    ///
    /// A capacity of zero is bumped to one so the latest entry is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a window pre-filled with `seed`, whose capacity is the seed size
    ///
    /// The buffer then stays at constant length: every push evicts one entry.
    pub fn seeded(seed: impl IntoIterator<Item = T>) -> Self {
        let buffer: VecDeque<T> = seed.into_iter().collect();
        let capacity = buffer.len().max(1);
        Self { buffer, capacity }
    }

    /// Append an entry, returning the evicted oldest entry if the window was full
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buffer.len() >= self.capacity {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.buffer.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.buffer.back()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.buffer.front()
    }

    /// The last `n` entries, oldest first
    pub fn tail(&self, n: usize) -> impl Iterator<Item = &T> {
        self.buffer.iter().skip(self.buffer.len().saturating_sub(n))
    }

    /// Mean of `metric` over the last `n` entries, `None` when empty
    pub fn mean_of<F>(&self, n: usize, metric: F) -> Option<f64>
    where
        F: Fn(&T) -> f64,
    {
        let (sum, count) = self
            .tail(n)
            .fold((0.0, 0usize), |(sum, count), item| (sum + metric(item), count + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl<'a, T> IntoIterator for &'a RollingWindow<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.buffer.iter()
    }
}
