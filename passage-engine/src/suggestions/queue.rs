//! Pending highlight fetches and the guards serializing them.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use crate::model::PassageId;

/// FIFO of passages waiting for a highlight fetch.
///
/// Only one drain runs at a time, and only one highlight request is in flight
/// at a time across every entry point.
#[derive(Debug, Default)]
pub struct HighlightQueue {
    pending: Mutex<VecDeque<PassageId>>,
    draining: AtomicBool,
    outstanding: AtomicUsize,
    serial: AsyncMutex<()>,
}

/// Held while the queue is being drained; releases the drain flag on drop.
#[derive(Debug)]
pub struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
struct Outstanding<'a>(&'a AtomicUsize);

impl<'a> Outstanding<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for Outstanding<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Holds the highlight slot and counts as outstanding until dropped.
#[derive(Debug)]
pub struct FetchGuard<'a> {
    _serial: AsyncMutexGuard<'a, ()>,
    _outstanding: Outstanding<'a>,
}

impl HighlightQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> std::sync::MutexGuard<'_, VecDeque<PassageId>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues `id` unless it is already waiting. Returns whether it was added.
    pub fn push(&self, id: PassageId) -> bool {
        let mut q = self.pending();
        if q.contains(&id) {
            return false;
        }
        q.push_back(id);
        true
    }

    pub fn pop_front(&self) -> Option<PassageId> {
        self.pending().pop_front()
    }

    pub fn clear(&self) {
        self.pending().clear();
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    /// Claims the drain; `None` when another drain is running.
    pub fn try_drain(&self) -> Option<DrainGuard<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainGuard(&self.draining))
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Waits for the highlight slot and marks a fetch as outstanding.
    pub async fn begin_fetch(&self) -> FetchGuard<'_> {
        let outstanding = Outstanding::enter(&self.outstanding);
        let serial = self.serial.lock().await;
        FetchGuard {
            _serial: serial,
            _outstanding: outstanding,
        }
    }

    /// True while any highlight fetch is waiting or running.
    pub fn is_fetching(&self) -> bool {
        self.outstanding.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IdAllocator;

    #[test]
    fn duplicates_are_not_queued() {
        let mut ids = IdAllocator::new();
        let (a, b) = (ids.passage(), ids.passage());
        let q = HighlightQueue::new();
        assert!(q.push(a));
        assert!(q.push(b));
        assert!(!q.push(a));
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_front(), Some(a));
        assert!(q.push(a));
        assert_eq!(q.pop_front(), Some(b));
        q.clear();
        assert!(q.is_empty());
    }

    #[test]
    fn only_one_drain_at_a_time() {
        let q = HighlightQueue::new();
        let guard = q.try_drain();
        assert!(guard.is_some());
        assert!(q.try_drain().is_none());
        drop(guard);
        assert!(!q.is_draining());
        assert!(q.try_drain().is_some());
    }

    #[tokio::test]
    async fn fetch_guard_tracks_outstanding_work() {
        let q = HighlightQueue::new();
        assert!(!q.is_fetching());
        let g = q.begin_fetch().await;
        assert!(q.is_fetching());
        drop(g);
        assert!(!q.is_fetching());
    }
}
