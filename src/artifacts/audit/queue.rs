use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Pop-only queue shared by the audit workers
///
/// Items keep the index they were enqueued with so results can be put back
/// in discovery order. The lock is held for the pop alone.
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<(usize, T)>>,
}

impl<T> WorkQueue<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        WorkQueue {
            items: Mutex::new(items.into_iter().enumerate().collect()),
        }
    }

    pub fn try_pop(&self) -> Option<(usize, T)> {
        // a worker panicking mid-pop leaves the deque itself intact
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
