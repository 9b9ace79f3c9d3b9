use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::{Condvar, Mutex};

use super::lock;

/// Idle worker keyed by the fatigue score it had when it became idle.
///
/// A worker's fatigue only changes while it is busy, so the key stays valid
/// for as long as the entry sits in the queue.
#[derive(Debug, Clone, Copy)]
struct IdleEntry {
    fatigue: f64,
    worker: usize,
}

impl PartialEq for IdleEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleEntry {}

impl PartialOrd for IdleEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleEntry {
    // Equal fatigue falls back to the lower worker id.
    fn cmp(&self, other: &Self) -> Ordering {
        self.fatigue
            .total_cmp(&other.fatigue)
            .then(self.worker.cmp(&other.worker))
    }
}

/// Min-priority queue of idle workers, least fatigued first.
#[derive(Debug, Default)]
pub(crate) struct IdleQueue {
    heap: Mutex<BinaryHeap<Reverse<IdleEntry>>>,
    available: Condvar,
}

impl IdleQueue {
    pub(crate) fn push(&self, worker: usize, fatigue: f64) {
        lock(&self.heap).push(Reverse(IdleEntry { fatigue, worker }));
        self.available.notify_one();
    }

    /// Remove the least fatigued idle worker, blocking while none is idle.
    pub(crate) fn pop_blocking(&self) -> usize {
        let mut heap = lock(&self.heap);
        loop {
            if let Some(Reverse(entry)) = heap.pop() {
                return entry.worker;
            }
            heap = self
                .available
                .wait(heap)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.heap).len()
    }
}
