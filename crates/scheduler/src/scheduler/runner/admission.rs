use std::sync::atomic::Ordering;

use tracing::warn;

use crate::scheduler::task::{AdmissionError, Task, TaskId, TaskRecord};
use crate::scheduler::types::Priority;

use super::FrameScheduler;

impl FrameScheduler {
    /// Queue `callback` at `priority`. Returns `false` when the queue is full
    /// or the scheduler has been disposed; never blocks.
    pub fn queue_task<F>(&self, callback: F, priority: Priority) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(callback);
        self.try_submit(Some(task), priority).is_ok()
    }

    /// Queue `callback` at [`Priority::Normal`].
    pub fn queue<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue_task(callback, Priority::Normal)
    }

    /// Admission with the rejection reason spelled out.
    pub fn try_submit(&self, callback: Option<Task>, priority: Priority) -> Result<TaskId, AdmissionError> {
        let Some(callback) = callback else {
            return Err(AdmissionError::MissingCallback);
        };
        if !self.is_running() {
            return Err(AdmissionError::ShutDown);
        }

        let capacity = self.config.max_total_queued_tasks;
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = TaskRecord::new(id, priority, self.clock.now(), callback);

        if self.store.enqueue_bounded(record, capacity).is_err() {
            let queued = self.store.count();
            warn!(queued, capacity, priority = %priority, "Task queue full, rejecting task");
            self.counters.record_rejected();
            return Err(AdmissionError::AtCapacity { queued, capacity });
        }

        // Lost a race with `dispose`: nothing may run after shutdown.
        if !self.is_running() {
            self.store.clear();
            return Err(AdmissionError::ShutDown);
        }
        Ok(id)
    }
}
