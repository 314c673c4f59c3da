//! Per-priority FIFO storage shared by producers and the drain loop.
//!
//! All four buckets sit behind one mutex. Contention is low (one consumer,
//! bursty producers) and a single lock keeps the capacity check, the append
//! and the count update in one critical section. Per-bucket lock-free queues
//! would be the next step if producers ever dominate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::task::TaskRecord;
use super::types::Priority;

type Buckets = [VecDeque<TaskRecord>; 4];

/// Thread-safe FIFO storage partitioned by [`Priority`].
#[derive(Debug, Default)]
pub struct PriorityBuckets {
    buckets: Mutex<Buckets>,
    /// Mirrors the summed bucket lengths; only written with the lock held.
    count: AtomicUsize,
}

impl PriorityBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    // No user code runs under this lock, so a poisoned guard still holds
    // structurally valid buckets.
    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the tail of the record's bucket.
    pub fn enqueue(&self, record: TaskRecord) {
        let mut buckets = self.lock();
        buckets[record.priority.index()].push_back(record);
        self.count.fetch_add(1, Ordering::Release);
    }

    /// Append unless `capacity` records are already stored, handing the
    /// record back on refusal.
    pub fn enqueue_bounded(&self, record: TaskRecord, capacity: usize) -> Result<(), TaskRecord> {
        let mut buckets = self.lock();
        if self.count.load(Ordering::Acquire) >= capacity {
            return Err(record);
        }
        buckets[record.priority.index()].push_back(record);
        self.count.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Remove the head of the highest-priority non-empty bucket.
    pub fn try_dequeue(&self) -> Option<TaskRecord> {
        let mut buckets = self.lock();
        let record = buckets.iter_mut().find_map(VecDeque::pop_front)?;
        self.count.fetch_sub(1, Ordering::Release);
        Some(record)
    }

    /// Drop every stored record, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let drained: Vec<TaskRecord> = {
            let mut buckets = self.lock();
            let drained = buckets.iter_mut().flat_map(|b| b.drain(..)).collect();
            self.count.store(0, Ordering::Release);
            drained
        };
        // Captured state in the callbacks is dropped outside the lock.
        drained.len()
    }

    /// Total stored records. Never takes the lock.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Per-priority lengths, indexed by [`Priority::index`].
    pub fn depths(&self) -> [usize; 4] {
        let buckets = self.lock();
        let mut depths = [0; 4];
        for priority in Priority::ALL {
            depths[priority.index()] = buckets[priority.index()].len();
        }
        depths
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::scheduler::task::TaskId;

    fn record(id: u64, priority: Priority) -> TaskRecord {
        TaskRecord::new(TaskId(id), priority, Instant::now(), Box::new(|| {}))
    }

    fn drain_ids(store: &PriorityBuckets) -> Vec<u64> {
        std::iter::from_fn(|| store.try_dequeue()).map(|r| r.id.0).collect()
    }

    #[test]
    fn dequeue_on_empty_is_none() {
        let store = PriorityBuckets::new();
        assert!(store.try_dequeue().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn dequeues_in_priority_order() {
        let store = PriorityBuckets::new();
        store.enqueue(record(1, Priority::Low));
        store.enqueue(record(2, Priority::Normal));
        store.enqueue(record(3, Priority::Critical));
        store.enqueue(record(4, Priority::High));
        assert_eq!(drain_ids(&store), vec![3, 4, 2, 1]);
    }

    #[test]
    fn fifo_within_a_bucket() {
        let store = PriorityBuckets::new();
        for id in 0..5 {
            store.enqueue(record(id, Priority::Normal));
        }
        assert_eq!(drain_ids(&store), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn count_tracks_bucket_lengths() {
        let store = PriorityBuckets::new();
        store.enqueue(record(1, Priority::Low));
        store.enqueue(record(2, Priority::Low));
        store.enqueue(record(3, Priority::High));
        assert_eq!(store.count(), 3);
        assert_eq!(store.depths(), [0, 1, 0, 2]);
        store.try_dequeue();
        assert_eq!(store.count(), 2);
        assert_eq!(store.depths(), [0, 0, 0, 2]);
    }

    #[test]
    fn bounded_enqueue_refuses_at_capacity() {
        let store = PriorityBuckets::new();
        assert!(store.enqueue_bounded(record(1, Priority::Normal), 2).is_ok());
        assert!(store.enqueue_bounded(record(2, Priority::Normal), 2).is_ok());
        let refused = store.enqueue_bounded(record(3, Priority::Critical), 2).unwrap_err();
        assert_eq!(refused.id, TaskId(3));
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn clear_empties_everything() {
        let store = PriorityBuckets::new();
        for (id, priority) in Priority::ALL.into_iter().enumerate() {
            store.enqueue(record(id as u64, priority));
        }
        assert_eq!(store.clear(), 4);
        assert_eq!(store.count(), 0);
        assert_eq!(store.depths(), [0; 4]);
        assert!(store.try_dequeue().is_none());
    }

    #[test]
    fn concurrent_bounded_enqueue_never_overfills() {
        let store = Arc::new(PriorityBuckets::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let mut accepted = 0;
                    for i in 0..50 {
                        if store.enqueue_bounded(record(t * 100 + i, Priority::ALL[(i % 4) as usize]), 120).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();
        let accepted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, 120);
        assert_eq!(store.count(), 120);
        assert_eq!(store.depths().iter().sum::<usize>(), 120);
    }
}
