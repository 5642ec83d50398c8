// src/task/mod.rs

//! Units of work scheduled by a [`Procedure`](crate::procedure::Procedure).
//!
//! - [`state`] is the per-task state machine.
//! - [`handle`] is the one-shot completion handle given to a task body.

pub mod handle;
pub mod state;

use std::fmt;

pub use handle::TaskHandle;
pub use state::TaskState;

use crate::types::TaskName;

/// Boxed task body.
///
/// Invoked exactly once, when all predecessors have completed. The body
/// signals its outcome through the [`TaskHandle`], possibly much later and
/// from another thread. Returning `Err` is treated like
/// [`TaskHandle::fail`].
pub type Action = Box<dyn FnOnce(TaskHandle) -> anyhow::Result<()> + Send + 'static>;

/// A named unit of work.
pub struct Task {
    name: TaskName,
    action: Action,
}

impl Task {
    pub fn new<F>(name: impl Into<TaskName>, action: F) -> Self
    where
        F: FnOnce(TaskHandle) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (TaskName, Action) {
        (self.name, self.action)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
