// src/procedure/core.rs

//! Pure run state machine.
//!
//! [`RunCore`] consumes task signals and produces a [`CoreStep`] describing
//! what the surrounding shell must do next:
//! - dispatch the actions of a generation
//! - emit block callbacks
//! - emit the single terminal callback
//!
//! It holds no closures, no locks and no listener, so it can be driven
//! step by step in tests. The thread-safe shell lives in
//! [`super::runtime`].

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::dag::Generations;
use crate::procedure::listener::{RunOutcome, TaskView};
use crate::task::TaskState;
use crate::types::TaskName;

/// Terminal signal sent through a completion handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Complete,
    Fail(String),
    Cancel { code: i32, reason: String },
}

/// Command produced by the core, to be executed by the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Invoke the actions of these tasks. They are already `Running`.
    Dispatch {
        generation: usize,
        tasks: Vec<TaskName>,
    },
    BlockCompleted(TaskView),
    BlockFailed(TaskView),
    /// The run is over. `task` is the failed/cancelled task, if any.
    Finish {
        outcome: RunOutcome,
        task: Option<TaskView>,
    },
}

/// Commands returned by a single core transition, in emission order.
#[derive(Debug, Clone, Default)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
}

impl CoreStep {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone)]
struct TaskSlot {
    generation: usize,
    state: TaskState,
    reason: Option<String>,
}

#[derive(Debug)]
pub struct RunCore {
    run_id: u64,
    blocks: Vec<Vec<TaskName>>,
    tasks: HashMap<TaskName, TaskSlot>,
    /// Generation currently in flight.
    current: Option<usize>,
    /// Tasks of `current` that are not terminal yet.
    outstanding: usize,
    /// First task that failed or was cancelled in `current`.
    abort: Option<(TaskName, Signal)>,
    outcome: Option<RunOutcome>,
}

impl RunCore {
    pub fn new(run_id: u64, generations: Generations) -> Self {
        let blocks = generations.into_blocks();
        let mut tasks = HashMap::new();
        for (generation, block) in blocks.iter().enumerate() {
            for name in block {
                tasks.insert(
                    name.clone(),
                    TaskSlot {
                        generation,
                        state: TaskState::Pending,
                        reason: None,
                    },
                );
            }
        }

        Self {
            run_id,
            blocks,
            tasks,
            current: None,
            outstanding: 0,
            abort: None,
            outcome: None,
        }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Dispatch generation 0, or finish immediately if there are no tasks.
    pub fn begin(&mut self) -> CoreStep {
        let mut step = CoreStep::default();
        if self.current.is_some() || self.outcome.is_some() {
            warn!(run_id = self.run_id, "run already started; ignoring begin");
            return step;
        }
        self.advance(0, &mut step);
        step
    }

    /// Apply a terminal signal for `task`.
    ///
    /// Signals for tasks that are not `Running` (unknown, still pending, or
    /// already terminal) are ignored.
    pub fn step(&mut self, task: &str, signal: Signal) -> CoreStep {
        let mut step = CoreStep::default();

        if self.outcome.is_some() {
            debug!(run_id = self.run_id, task = %task, ?signal, "run already finished; ignoring signal");
            return step;
        }

        let Some(slot) = self.tasks.get_mut(task) else {
            warn!(run_id = self.run_id, task = %task, "signal for unknown task; ignoring");
            return step;
        };

        if slot.state != TaskState::Running {
            debug!(
                run_id = self.run_id,
                task = %task,
                state = %slot.state,
                "task not running; ignoring repeated signal"
            );
            return step;
        }

        match &signal {
            Signal::Complete => {
                slot.state = TaskState::Completed;
                debug!(run_id = self.run_id, task = %task, "task completed");
            }
            Signal::Fail(reason) => {
                slot.state = TaskState::Failed;
                slot.reason = Some(reason.clone());
                warn!(run_id = self.run_id, task = %task, reason = %reason, "task failed; aborting run");
            }
            Signal::Cancel { code, reason } => {
                slot.state = TaskState::Cancelled;
                slot.reason = Some(reason.clone());
                info!(run_id = self.run_id, task = %task, code, reason = %reason, "task cancelled; aborting run");
            }
        }

        if self.abort.is_some() {
            debug!(
                run_id = self.run_id,
                task = %task,
                "run already aborted; discarding sibling result"
            );
        } else if !matches!(signal, Signal::Complete) {
            self.abort = Some((task.to_string(), signal));
        }

        self.outstanding = self.outstanding.saturating_sub(1);
        if self.outstanding > 0 {
            return step;
        }

        // Barrier reached for the current generation.
        let generation = self.current.unwrap_or(0);
        match self.abort.take() {
            None => {
                if let Some(view) = self.view_of(task) {
                    step.commands.push(CoreCommand::BlockCompleted(view));
                }
                self.advance(generation + 1, &mut step);
            }
            Some((failed, Signal::Fail(reason))) => {
                let view = self.view_of(&failed);
                if let Some(view) = view.clone() {
                    step.commands.push(CoreCommand::BlockFailed(view));
                }
                self.finish(
                    RunOutcome::Failed {
                        task: failed,
                        reason,
                    },
                    view,
                    &mut step,
                );
            }
            Some((cancelled, Signal::Cancel { code, reason })) => {
                let view = self.view_of(&cancelled);
                self.finish(
                    RunOutcome::Cancelled {
                        task: cancelled,
                        code,
                        reason,
                    },
                    view,
                    &mut step,
                );
            }
            Some((_, Signal::Complete)) => {
                // `abort` only ever holds Fail/Cancel.
            }
        }

        step
    }

    /// Snapshot of `task` if a progress report for it should be forwarded.
    pub fn progress_target(&self, task: &str) -> Option<TaskView> {
        if self.outcome.is_some() {
            return None;
        }
        match self.tasks.get(task) {
            Some(slot) if slot.state == TaskState::Running => self.view_of(task),
            _ => None,
        }
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.tasks.get(task).map(|slot| slot.state)
    }

    pub fn view_of(&self, task: &str) -> Option<TaskView> {
        self.tasks.get(task).map(|slot| TaskView {
            name: task.to_string(),
            generation: slot.generation,
            state: slot.state,
            reason: slot.reason.clone(),
        })
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_some()
            || matches!(
                self.outcome,
                Some(RunOutcome::Failed { .. }) | Some(RunOutcome::Cancelled { .. })
            )
    }

    pub fn current_generation(&self) -> Option<usize> {
        self.current
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn generation_count(&self) -> usize {
        self.blocks.len()
    }

    /// Move to `generation`: mark its tasks `Running` and ask the shell to
    /// dispatch them, or finish the run if no generation is left.
    fn advance(&mut self, generation: usize, step: &mut CoreStep) {
        let Some(block) = self.blocks.get(generation) else {
            info!(run_id = self.run_id, "all generations completed");
            self.finish(RunOutcome::Completed, None, step);
            return;
        };

        let tasks = block.clone();
        for name in &tasks {
            if let Some(slot) = self.tasks.get_mut(name) {
                slot.state = TaskState::Running;
            }
        }

        self.current = Some(generation);
        self.outstanding = tasks.len();

        debug!(
            run_id = self.run_id,
            generation,
            tasks = ?tasks,
            "dependencies satisfied; dispatching generation"
        );

        step.commands.push(CoreCommand::Dispatch { generation, tasks });
    }

    fn finish(&mut self, outcome: RunOutcome, task: Option<TaskView>, step: &mut CoreStep) {
        self.current = None;
        self.outstanding = 0;
        self.outcome = Some(outcome.clone());
        step.commands.push(CoreCommand::Finish { outcome, task });
    }
}
