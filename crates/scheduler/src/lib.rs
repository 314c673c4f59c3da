pub mod scheduler;

pub use framequeue_core::FrameQueueError;
pub use scheduler::{
    AdmissionError, Clock, FrameReport, FrameScheduler, ManualClock, MonotonicClock, Priority,
    SchedulerConfig, SchedulerStatistics, StopReason, Task, TaskId,
};
