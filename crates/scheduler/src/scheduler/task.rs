use std::any::Any;
use std::fmt;
use std::time::Instant;

use serde::Serialize;

use super::types::Priority;

/// A deferred unit of work. Runs once, on the consumer thread.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Sequence number assigned at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdmissionError {
    #[error("no callback supplied")]
    MissingCallback,
    #[error("task queue full ({queued}/{capacity})")]
    AtCapacity { queued: usize, capacity: usize },
    #[error("scheduler has been disposed")]
    ShutDown,
}

/// A callback that panicked while being drained.
#[derive(Debug, Clone, thiserror::Error)]
#[error("task {id} ({priority}) panicked: {message}")]
pub struct TaskFault {
    pub id: TaskId,
    pub priority: Priority,
    pub message: String,
}

impl TaskFault {
    /// Build a fault from a `catch_unwind` payload.
    pub(crate) fn from_panic(id: TaskId, priority: Priority, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "<non-string panic payload>".to_string()
        };
        Self { id, priority, message }
    }
}

/// A queued task and its bookkeeping.
pub struct TaskRecord {
    pub id: TaskId,
    pub priority: Priority,
    /// Clock reading at admission.
    pub created_at: Instant,
    pub(crate) callback: Task,
}

impl TaskRecord {
    pub fn new(id: TaskId, priority: Priority, created_at: Instant, callback: Task) -> Self {
        Self { id, priority, created_at, callback }
    }

    /// Consume the record, running its callback.
    pub fn run(self) {
        (self.callback)()
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_message_from_str_payload() {
        let fault = TaskFault::from_panic(TaskId(3), Priority::High, Box::new("boom"));
        assert_eq!(fault.message, "boom");
        assert_eq!(fault.to_string(), "task #3 (high) panicked: boom");
    }

    #[test]
    fn fault_message_from_string_payload() {
        let fault = TaskFault::from_panic(TaskId(1), Priority::Low, Box::new(format!("bad {}", 42)));
        assert_eq!(fault.message, "bad 42");
    }

    #[test]
    fn fault_message_from_opaque_payload() {
        let fault = TaskFault::from_panic(TaskId(1), Priority::Low, Box::new(17u32));
        assert_eq!(fault.message, "<non-string panic payload>");
    }

    #[test]
    fn admission_error_display() {
        let err = AdmissionError::AtCapacity { queued: 150, capacity: 150 };
        assert_eq!(err.to_string(), "task queue full (150/150)");
    }
}
