// src/task/handle.rs

//! Completion handle handed to a task body.

use std::fmt;
use std::sync::Arc;

use crate::procedure::core::Signal;
use crate::procedure::runtime::RunShared;
use crate::task::TaskState;
use crate::types::TaskName;

/// One-shot completion handle for a running task.
///
/// Cheap to clone, `Send + Sync`, and may be invoked from any thread. Only
/// the first terminal call (`complete`, `fail`, `cancel`) has an effect;
/// later calls, from any clone, are ignored. A platform callback that fires
/// after the run has finished is therefore harmless.
#[derive(Clone)]
pub struct TaskHandle {
    task: TaskName,
    run: Arc<RunShared>,
}

impl TaskHandle {
    pub(crate) fn new(task: TaskName, run: Arc<RunShared>) -> Self {
        Self { task, run }
    }

    pub fn task_name(&self) -> &str {
        &self.task
    }

    pub fn run_id(&self) -> u64 {
        self.run.run_id()
    }

    pub fn complete(&self) {
        self.run.signal(&self.task, Signal::Complete);
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.run.signal(&self.task, Signal::Fail(reason.into()));
    }

    pub fn cancel(&self, code: i32, reason: impl Into<String>) {
        self.run.signal(
            &self.task,
            Signal::Cancel {
                code,
                reason: reason.into(),
            },
        );
    }

    /// Report progress. `percent` is clamped to 100. Does not affect
    /// scheduling; ignored once the task is terminal.
    pub fn progress(&self, percent: u8, description: Option<&str>) {
        self.run.progress(&self.task, percent.min(100), description);
    }

    pub fn state(&self) -> TaskState {
        self.run.state_of(&self.task).unwrap_or(TaskState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("task", &self.task)
            .field("run_id", &self.run.run_id())
            .finish()
    }
}
