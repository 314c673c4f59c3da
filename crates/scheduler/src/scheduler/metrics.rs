use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::types::Priority;

/// Floor applied to uptime when computing throughput.
pub const MIN_UPTIME_SECS: f64 = 0.001;

/// Lifetime counters. Written by the drain loop and producers, readable
/// from any thread without touching the queue mutex.
#[derive(Debug, Default)]
pub struct SchedulerCounters {
    processed: AtomicU64,
    faulted: AtomicU64,
    rejected: AtomicU64,
    slow_tasks: AtomicU64,
    backlog_warnings: AtomicU64,
    frames: AtomicU64,
}

impl SchedulerCounters {
    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.faulted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_slow_task(&self) {
        self.slow_tasks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backlog_warning(&self) {
        self.backlog_warnings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn faulted(&self) -> u64 {
        self.faulted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn slow_tasks(&self) -> u64 {
        self.slow_tasks.load(Ordering::Relaxed)
    }

    pub fn backlog_warnings(&self) -> u64 {
        self.backlog_warnings.load(Ordering::Relaxed)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

/// Tasks per second over the given uptime.
pub fn throughput(processed: u64, uptime: Duration) -> f64 {
    processed as f64 / uptime.as_secs_f64().max(MIN_UPTIME_SECS)
}

/// Point-in-time view for diagnostics panels and JSON dumps.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatistics {
    /// Callbacks run since start, faulted ones included.
    pub processed_total: u64,
    pub faulted_total: u64,
    /// Submissions refused at capacity.
    pub rejected_total: u64,
    pub slow_tasks_total: u64,
    pub backlog_warnings_total: u64,
    pub frames_drained: u64,
    /// Live queue depth.
    pub queued: usize,
    /// Queue depth per priority class.
    pub queued_by_priority: Vec<(Priority, usize)>,
    pub uptime: Duration,
    /// Tasks per second since start.
    pub rate: f64,
    pub started_at: DateTime<Utc>,
    pub running: bool,
}

impl SchedulerStatistics {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let c = SchedulerCounters::default();
        assert_eq!(c.processed(), 0);
        assert_eq!(c.faulted(), 0);
        assert_eq!(c.rejected(), 0);
        assert_eq!(c.frames(), 0);
    }

    #[test]
    fn counters_accumulate() {
        let c = SchedulerCounters::default();
        c.record_processed();
        c.record_processed();
        c.record_fault();
        c.record_slow_task();
        c.record_backlog_warning();
        assert_eq!(c.processed(), 2);
        assert_eq!(c.faulted(), 1);
        assert_eq!(c.slow_tasks(), 1);
        assert_eq!(c.backlog_warnings(), 1);
    }

    #[test]
    fn throughput_uses_uptime() {
        assert_eq!(throughput(100, Duration::from_secs(4)), 25.0);
    }

    #[test]
    fn throughput_floors_tiny_uptime() {
        assert_eq!(throughput(3, Duration::ZERO), 3000.0);
        assert_eq!(throughput(0, Duration::ZERO), 0.0);
    }

    #[test]
    fn statistics_to_json() {
        let stats = SchedulerStatistics {
            processed_total: 5,
            faulted_total: 1,
            rejected_total: 0,
            slow_tasks_total: 0,
            backlog_warnings_total: 0,
            frames_drained: 2,
            queued: 3,
            queued_by_priority: vec![(Priority::Critical, 3)],
            uptime: Duration::from_secs(2),
            rate: 2.5,
            started_at: Utc::now(),
            running: true,
        };
        let json = stats.to_json().unwrap();
        assert_eq!(json["processed_total"], 5);
        assert_eq!(json["queued_by_priority"][0][0], "critical");
        assert_eq!(json["rate"], 2.5);
    }
}
