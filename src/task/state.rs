// src/task/state.rs

use std::fmt;

/// Lifecycle of a task within one run.
///
/// `Pending -> Running -> {Completed | Failed | Cancelled}`. The three
/// right-hand states are terminal; nothing leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Registered, waiting on predecessors (or never reached).
    Pending,
    /// Action dispatched, completion handle outstanding.
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }

    /// Failed or Cancelled: the states that abort a run.
    pub fn is_abort(self) -> bool {
        matches!(self, TaskState::Failed | TaskState::Cancelled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "pending",
            TaskState::Running => "running",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
