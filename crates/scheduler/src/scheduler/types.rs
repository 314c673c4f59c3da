use std::fmt;
use std::path::Path;
use std::time::Duration;

use framequeue_core::config::profiled_env_parse;
use framequeue_core::FrameQueueError;
use serde::{Deserialize, Serialize};

/// Task service class. Lower numeric value = served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Must land this tick if at all possible (input, packet acks).
    Critical = 0,
    /// Visible work the user is waiting on.
    High = 1,
    /// Default class.
    #[default]
    Normal = 2,
    /// Background trickle; may be delayed indefinitely under load.
    Low = 3,
}

impl Priority {
    /// All classes in service order.
    pub const ALL: [Priority; 4] = [Priority::Critical, Priority::High, Priority::Normal, Priority::Low];

    /// Stable slot for per-priority arrays.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn label(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a drain pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Queue ran dry before any limit was reached.
    Idle,
    /// Per-frame item cap reached.
    ItemCap,
    /// Time budget exhausted.
    Deadline,
    /// Scheduler has been disposed.
    Stopped,
}

/// Outcome of one `process_frame` call.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    /// Callbacks run this frame, faulted ones included.
    pub executed: usize,
    /// Callbacks that panicked.
    pub faulted: usize,
    /// Item cap in force for this frame.
    pub cap: usize,
    /// Queue depth when the frame started.
    pub queued_at_start: usize,
    /// Queue depth when the frame ended.
    pub remaining: usize,
    /// Wall-clock time spent in the frame.
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

impl FrameReport {
    pub(crate) fn stopped() -> Self {
        Self {
            executed: 0,
            faulted: 0,
            cap: 0,
            queued_at_start: 0,
            remaining: 0,
            elapsed: Duration::ZERO,
            stop_reason: StopReason::Stopped,
        }
    }
}

/// Per-frame item cap for a given backlog.
///
/// Above `backlog_threshold_for_boost` the cap widens by one item per
/// `boost_divisor` queued items, never beyond `boost_cap`.
pub fn effective_frame_cap(queued: usize, config: &SchedulerConfig) -> usize {
    if queued > config.backlog_threshold_for_boost {
        let widened = config.max_tasks_per_frame + queued / config.boost_divisor;
        config.boost_cap.min(widened)
    } else {
        config.max_tasks_per_frame
    }
}

/// Scheduler configuration, typically parsed from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Baseline per-frame item cap.
    #[serde(default = "default_max_tasks_per_frame")]
    pub max_tasks_per_frame: usize,
    /// Admission ceiling.
    #[serde(default = "default_max_total_queued")]
    pub max_total_queued_tasks: usize,
    /// Per-frame time budget in milliseconds.
    #[serde(default = "default_frame_budget_ms")]
    pub max_processing_time_per_frame_ms: u64,
    /// Backlog above which the per-frame cap widens.
    #[serde(default = "default_boost_threshold")]
    pub backlog_threshold_for_boost: usize,
    /// Absolute ceiling on the widened cap.
    #[serde(default = "default_boost_cap")]
    pub boost_cap: usize,
    /// One extra item per this many backlog items.
    #[serde(default = "default_boost_divisor")]
    pub boost_divisor: usize,
    /// Callback duration that triggers a slow-task diagnostic.
    #[serde(default = "default_slow_task_ms")]
    pub slow_task_log_threshold_ms: f64,
    /// Queue depth after a frame that triggers a backlog warning.
    #[serde(default = "default_backlog_warn")]
    pub backlog_warn_threshold: usize,
}

fn default_max_tasks_per_frame() -> usize { 4 }
fn default_max_total_queued() -> usize { 150 }
fn default_frame_budget_ms() -> u64 { 8 }
fn default_boost_threshold() -> usize { 40 }
fn default_boost_cap() -> usize { 12 }
fn default_boost_divisor() -> usize { 25 }
fn default_slow_task_ms() -> f64 { 1.0 }
fn default_backlog_warn() -> usize { 50 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_frame: default_max_tasks_per_frame(),
            max_total_queued_tasks: default_max_total_queued(),
            max_processing_time_per_frame_ms: default_frame_budget_ms(),
            backlog_threshold_for_boost: default_boost_threshold(),
            boost_cap: default_boost_cap(),
            boost_divisor: default_boost_divisor(),
            slow_task_log_threshold_ms: default_slow_task_ms(),
            backlog_warn_threshold: default_backlog_warn(),
        }
    }
}

impl SchedulerConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, FrameQueueError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FrameQueueError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Apply `FRAMEQUEUE_*` env overrides for the given profile on top of `self`.
    pub fn with_env_overrides(self, p: &str) -> Result<Self, FrameQueueError> {
        let config = Self {
            max_tasks_per_frame: profiled_env_parse(p, "FRAMEQUEUE_MAX_TASKS_PER_FRAME", self.max_tasks_per_frame),
            max_total_queued_tasks: profiled_env_parse(p, "FRAMEQUEUE_MAX_QUEUED", self.max_total_queued_tasks),
            max_processing_time_per_frame_ms: profiled_env_parse(
                p,
                "FRAMEQUEUE_FRAME_BUDGET_MS",
                self.max_processing_time_per_frame_ms,
            ),
            backlog_threshold_for_boost: profiled_env_parse(
                p,
                "FRAMEQUEUE_BOOST_THRESHOLD",
                self.backlog_threshold_for_boost,
            ),
            boost_cap: profiled_env_parse(p, "FRAMEQUEUE_BOOST_CAP", self.boost_cap),
            boost_divisor: profiled_env_parse(p, "FRAMEQUEUE_BOOST_DIVISOR", self.boost_divisor),
            slow_task_log_threshold_ms: profiled_env_parse(
                p,
                "FRAMEQUEUE_SLOW_TASK_MS",
                self.slow_task_log_threshold_ms,
            ),
            backlog_warn_threshold: profiled_env_parse(p, "FRAMEQUEUE_BACKLOG_WARN", self.backlog_warn_threshold),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the drain loop cannot work with.
    pub fn validate(&self) -> Result<(), FrameQueueError> {
        if self.max_tasks_per_frame == 0 {
            return Err(FrameQueueError::Config("max_tasks_per_frame must be at least 1".into()));
        }
        if self.max_total_queued_tasks == 0 {
            return Err(FrameQueueError::Config("max_total_queued_tasks must be at least 1".into()));
        }
        if self.boost_divisor == 0 {
            return Err(FrameQueueError::Config("boost_divisor must be at least 1".into()));
        }
        if self.boost_cap < self.max_tasks_per_frame {
            return Err(FrameQueueError::Config(format!(
                "boost_cap ({}) is below max_tasks_per_frame ({})",
                self.boost_cap, self.max_tasks_per_frame
            )));
        }
        if Duration::try_from_secs_f64(self.slow_task_log_threshold_ms / 1000.0).is_err() {
            return Err(FrameQueueError::Config(format!(
                "slow_task_log_threshold_ms must be a non-negative duration, got {}",
                self.slow_task_log_threshold_ms
            )));
        }
        Ok(())
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.max_processing_time_per_frame_ms)
    }

    /// Saturates at `Duration::MAX` for values `validate` would reject.
    pub fn slow_task_threshold(&self) -> Duration {
        Duration::try_from_secs_f64(self.slow_task_log_threshold_ms / 1000.0).unwrap_or(Duration::MAX)
    }
}
