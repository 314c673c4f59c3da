use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use framequeue_core::FrameQueueError;
use tracing::{debug, info};

use crate::scheduler::clock::{Clock, MonotonicClock};
use crate::scheduler::metrics::{throughput, SchedulerCounters, SchedulerStatistics};
use crate::scheduler::store::PriorityBuckets;
use crate::scheduler::types::{Priority, SchedulerConfig};

/// Defers short callbacks from any thread and runs them on the consumer
/// thread, a bounded slice per [`process_frame`](Self::process_frame) call.
///
/// Share it with producers behind an `Arc`; only one thread may drain.
pub struct FrameScheduler {
    pub(super) config: SchedulerConfig,
    pub(super) store: PriorityBuckets,
    pub(super) counters: SchedulerCounters,
    pub(super) clock: Arc<dyn Clock>,
    /// Clock reading at construction (uptime base).
    pub(super) started: Instant,
    pub(super) started_at: DateTime<Utc>,
    pub(super) next_id: AtomicU64,
    /// Set once by `dispose`; never cleared.
    pub(super) shutdown: AtomicBool,
}

impl FrameScheduler {
    /// Create a scheduler on the monotonic system clock.
    pub fn new(config: SchedulerConfig) -> Result<Self, FrameQueueError> {
        Self::with_clock(config, Arc::new(MonotonicClock))
    }

    /// Create a scheduler reading time from `clock`.
    pub fn with_clock(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Result<Self, FrameQueueError> {
        config.validate()?;
        info!(
            "Frame scheduler ready: {} tasks/frame (boost to {} above {} queued), {}ms budget, capacity {}",
            config.max_tasks_per_frame,
            config.boost_cap,
            config.backlog_threshold_for_boost,
            config.max_processing_time_per_frame_ms,
            config.max_total_queued_tasks,
        );
        let started = clock.now();
        Ok(Self {
            config,
            store: PriorityBuckets::new(),
            counters: SchedulerCounters::default(),
            clock,
            started,
            started_at: Utc::now(),
            next_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Records waiting to be drained.
    pub fn queued_task_count(&self) -> usize {
        self.store.count()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
    }

    pub(super) fn uptime(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.started)
    }

    /// `(processed_total, queued, tasks_per_second)`.
    pub fn get_statistics(&self) -> (u64, usize, f64) {
        let processed = self.counters.processed();
        (processed, self.store.count(), throughput(processed, self.uptime()))
    }

    /// Full diagnostics view.
    pub fn snapshot(&self) -> SchedulerStatistics {
        let processed = self.counters.processed();
        let uptime = self.uptime();
        let depths = self.store.depths();
        SchedulerStatistics {
            processed_total: processed,
            faulted_total: self.counters.faulted(),
            rejected_total: self.counters.rejected(),
            slow_tasks_total: self.counters.slow_tasks(),
            backlog_warnings_total: self.counters.backlog_warnings(),
            frames_drained: self.counters.frames(),
            queued: self.store.count(),
            queued_by_priority: Priority::ALL.iter().map(|p| (*p, depths[p.index()])).collect(),
            uptime,
            rate: throughput(processed, uptime),
            started_at: self.started_at,
            running: self.is_running(),
        }
    }

    /// Discard every pending task without running it.
    pub fn clear_queue(&self) {
        let dropped = self.store.clear();
        if dropped > 0 {
            debug!(dropped, "Cleared task queue");
        }
    }

    /// Stop for good: later frames are no-ops, later submissions are refused.
    pub fn dispose(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }
        let dropped = self.store.clear();
        info!(dropped, processed = self.counters.processed(), "Frame scheduler disposed");
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("config", &self.config)
            .field("queued", &self.store.count())
            .field("processed", &self.counters.processed())
            .field("running", &self.is_running())
            .finish()
    }
}
