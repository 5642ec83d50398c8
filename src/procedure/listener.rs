// src/procedure/listener.rs

//! Observer contract for a running procedure.
//!
//! All callbacks are invoked by the engine, on whichever thread happened to
//! drive the run forward (the caller of `start`, or the thread that invoked
//! a completion handle). Listeners that touch UI-owned state must hop to the
//! right thread themselves, e.g. through [`crate::exec::Executor`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::task::TaskState;
use crate::types::TaskName;

/// Snapshot of a task at the moment a callback is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub name: TaskName,
    pub generation: usize,
    pub state: TaskState,
    /// Failure or cancellation reason, if any.
    pub reason: Option<String>,
}

/// Terminal result of a run. Exactly one is produced per `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed {
        task: TaskName,
        reason: String,
    },
    Cancelled {
        task: TaskName,
        code: i32,
        reason: String,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

pub trait ProcedureListener: Send + Sync {
    /// Every task of a generation completed. `task` closed the barrier.
    fn on_block_completed(&self, _task: &TaskView) {}

    /// The generation holding `task` settled after `task` failed.
    fn on_block_failed(&self, _task: &TaskView) {}

    fn on_progress(&self, _task: &TaskView, _percent: u8, _description: Option<&str>) {}

    fn on_completed(&self);

    fn on_failed(&self, task: &TaskView);

    fn on_cancel(&self, code: i32, reason: &str);
}

impl<T: ProcedureListener + ?Sized> ProcedureListener for Arc<T> {
    fn on_block_completed(&self, task: &TaskView) {
        (**self).on_block_completed(task)
    }

    fn on_block_failed(&self, task: &TaskView) {
        (**self).on_block_failed(task)
    }

    fn on_progress(&self, task: &TaskView, percent: u8, description: Option<&str>) {
        (**self).on_progress(task, percent, description)
    }

    fn on_completed(&self) {
        (**self).on_completed()
    }

    fn on_failed(&self, task: &TaskView) {
        (**self).on_failed(task)
    }

    fn on_cancel(&self, code: i32, reason: &str) {
        (**self).on_cancel(code, reason)
    }
}

/// Logs every callback. Useful as a default when the caller only cares about
/// the [`RunOutcome`] on the run handle.
#[derive(Debug, Clone, Default)]
pub struct TracingListener {
    label: String,
}

impl TracingListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl ProcedureListener for TracingListener {
    fn on_block_completed(&self, task: &TaskView) {
        debug!(label = %self.label, task = %task.name, generation = task.generation, "onBlockCompleted");
    }

    fn on_block_failed(&self, task: &TaskView) {
        debug!(label = %self.label, task = %task.name, generation = task.generation, "onBlockFailed");
    }

    fn on_progress(&self, task: &TaskView, percent: u8, description: Option<&str>) {
        debug!(label = %self.label, task = %task.name, percent, ?description, "onProgress");
    }

    fn on_completed(&self) {
        info!(label = %self.label, "onCompleted");
    }

    fn on_failed(&self, task: &TaskView) {
        warn!(label = %self.label, task = %task.name, reason = ?task.reason, "onFailed");
    }

    fn on_cancel(&self, code: i32, reason: &str) {
        info!(label = %self.label, code, reason, "onCancel");
    }
}

/// Listener callbacks as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureEvent {
    BlockCompleted(TaskView),
    BlockFailed(TaskView),
    Progress {
        task: TaskView,
        percent: u8,
        description: Option<String>,
    },
    Completed,
    Failed(TaskView),
    Cancelled {
        code: i32,
        reason: String,
    },
}

impl ProcedureEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcedureEvent::Completed | ProcedureEvent::Failed(_) | ProcedureEvent::Cancelled { .. }
        )
    }
}

/// Forwards every callback as a [`ProcedureEvent`] over an unbounded channel.
///
/// A dropped receiver is not an error; events are discarded.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<ProcedureEvent>,
}

impl ChannelListener {
    pub fn new(tx: mpsc::UnboundedSender<ProcedureEvent>) -> Self {
        Self { tx }
    }

    /// Convenience constructor returning the receiving half as well.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProcedureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ProcedureEvent) {
        if self.tx.send(event).is_err() {
            debug!("procedure event receiver dropped; discarding event");
        }
    }
}

impl ProcedureListener for ChannelListener {
    fn on_block_completed(&self, task: &TaskView) {
        self.emit(ProcedureEvent::BlockCompleted(task.clone()));
    }

    fn on_block_failed(&self, task: &TaskView) {
        self.emit(ProcedureEvent::BlockFailed(task.clone()));
    }

    fn on_progress(&self, task: &TaskView, percent: u8, description: Option<&str>) {
        self.emit(ProcedureEvent::Progress {
            task: task.clone(),
            percent,
            description: description.map(str::to_string),
        });
    }

    fn on_completed(&self) {
        self.emit(ProcedureEvent::Completed);
    }

    fn on_failed(&self, task: &TaskView) {
        self.emit(ProcedureEvent::Failed(task.clone()));
    }

    fn on_cancel(&self, code: i32, reason: &str) {
        self.emit(ProcedureEvent::Cancelled {
            code,
            reason: reason.to_string(),
        });
    }
}
