// src/pool/queue.rs
//! Bounded idle queue with a one-shot close.

use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of a non-blocking dequeue.
#[derive(Debug)]
pub(crate) enum Pop<T> {
    /// An idle item was removed.
    Item(T),
    /// Nothing is idle right now.
    Empty,
    /// The queue was closed by pool shutdown.
    Closed,
}

/// Wrapper around `crossbeam::queue::ArrayQueue` that can be closed once.
///
/// Capacity is fixed at construction. `push` never blocks: a full queue hands
/// the item back to the caller.
pub(crate) struct IdleQueue<T> {
    items: crossbeam::queue::ArrayQueue<T>,
    closed: AtomicBool,
}

impl<T> IdleQueue<T> {
    /// `capacity` must be non-zero.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: crossbeam::queue::ArrayQueue::new(capacity),
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn push(&self, item: T) -> Result<(), T> {
        self.items.push(item)
    }

    #[inline]
    pub(crate) fn pop(&self) -> Pop<T> {
        if self.closed.load(Ordering::Acquire) {
            return Pop::Closed;
        }
        match self.items.pop() {
            Some(item) => Pop::Item(item),
            None => Pop::Empty,
        }
    }

    /// Marks the queue closed. Returns `false` if it already was.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Removes every remaining item, ignoring the closed flag.
    pub(crate) fn drain(&self) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(|| self.items.pop())
    }

    /// Point-in-time length; may be stale under concurrency.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
