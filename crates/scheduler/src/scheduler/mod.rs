//! Priority-bucketed frame scheduler with admission control.
//!
//! Producers on any thread hand short callbacks to a [`FrameScheduler`];
//! the host's consumer thread calls [`FrameScheduler::process_frame`] once
//! per tick to run a bounded slice of them, Critical work first.

pub mod clock;
pub mod metrics;
pub mod runner;
pub mod store;
pub mod task;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use metrics::{SchedulerCounters, SchedulerStatistics};
pub use runner::FrameScheduler;
pub use store::PriorityBuckets;
pub use task::{AdmissionError, Task, TaskFault, TaskId, TaskRecord};
pub use types::{
    FrameReport, Priority, SchedulerConfig, StopReason, effective_frame_cap,
};
