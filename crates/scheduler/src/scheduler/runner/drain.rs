use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::scheduler::task::TaskFault;
use crate::scheduler::types::{effective_frame_cap, FrameReport, StopReason};

use super::FrameScheduler;

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

impl FrameScheduler {
    /// Drain one frame's worth of tasks on the calling thread.
    ///
    /// Stops at the item cap, the time budget, or an empty queue, whichever
    /// comes first. A panicking callback is logged and skipped; it never
    /// escapes this call. Must not be called concurrently with itself.
    pub fn process_frame(&self) -> FrameReport {
        if !self.is_running() {
            return FrameReport::stopped();
        }
        self.counters.record_frame();

        let start = self.clock.now();
        // A budget past the end of the clock's range means no deadline.
        let deadline = start.checked_add(self.config.frame_budget());
        let slow_threshold = self.config.slow_task_threshold();
        let queued_at_start = self.store.count();
        let cap = effective_frame_cap(queued_at_start, &self.config);

        let mut executed = 0;
        let mut faulted = 0;
        let mut stop_reason = StopReason::ItemCap;

        while executed < cap {
            let now = self.clock.now();
            if deadline.is_some_and(|d| now >= d) {
                debug!(
                    elapsed_ms = millis(now.saturating_duration_since(start)),
                    remaining = self.store.count(),
                    "Frame budget exhausted"
                );
                stop_reason = StopReason::Deadline;
                break;
            }
            if !self.is_running() {
                stop_reason = StopReason::Stopped;
                break;
            }
            let Some(record) = self.store.try_dequeue() else {
                stop_reason = StopReason::Idle;
                break;
            };

            let (id, priority) = (record.id, record.priority);
            let task_start = self.clock.now();
            // The unwind boundary covers exactly this one callback.
            let outcome = panic::catch_unwind(AssertUnwindSafe(move || record.run()));
            let took = self.clock.now().saturating_duration_since(task_start);

            executed += 1;
            self.counters.record_processed();

            match outcome {
                Ok(()) => {
                    if took > slow_threshold {
                        info!(task_id = %id, priority = %priority, elapsed_ms = millis(took), "Slow task");
                        self.counters.record_slow_task();
                    }
                }
                Err(payload) => {
                    let fault = TaskFault::from_panic(id, priority, payload);
                    error!(task_id = %id, priority = %priority, "Task failed: {}", fault.message);
                    faulted += 1;
                    self.counters.record_fault();
                }
            }
        }

        let remaining = self.store.count();
        if remaining > self.config.backlog_warn_threshold {
            warn!(
                queued = remaining,
                threshold = self.config.backlog_warn_threshold,
                "Task queue is backing up"
            );
            self.counters.record_backlog_warning();
        }

        FrameReport {
            executed,
            faulted,
            cap,
            queued_at_start,
            remaining,
            elapsed: self.clock.now().saturating_duration_since(start),
            stop_reason,
        }
    }
}
