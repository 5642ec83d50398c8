// src/procedure/mod.rs

//! Dependency-graph task orchestration.
//!
//! A [`Procedure`] is built by registering root tasks and tasks that depend
//! on previously registered names, then consumed by [`Procedure::start`].
//! Tasks are grouped into generations: every task of a generation is
//! dispatched together, and the next generation starts only once all of
//! them completed. The first failure or cancellation aborts the run.
//!
//! - [`core`] is the pure, synchronous run state machine.
//! - [`runtime`] is the thread-safe shell that owns actions and listener.
//! - [`listener`] is the observer contract and a few stock listeners.

pub mod core;
pub mod listener;
pub(crate) mod runtime;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::debug;

pub use self::core::{CoreCommand, CoreStep, RunCore, Signal};
pub use self::listener::{
    ChannelListener, ProcedureEvent, ProcedureListener, RunOutcome, TaskView, TracingListener,
};

use crate::dag::DagGraph;
use crate::errors::{PermflowError, Result};
use crate::procedure::runtime::RunShared;
use crate::task::{Action, Task, TaskState};
use crate::types::TaskName;

static NEXT_RUN_ID: AtomicU64 = AtomicU64::new(1);

/// Builder for a single run of a task graph.
///
/// Build errors (duplicate names, unknown predecessors) are returned by the
/// registering call. `start` consumes the procedure, so the graph cannot be
/// changed or run again afterwards.
#[derive(Default)]
pub struct Procedure {
    graph: DagGraph,
    actions: HashMap<TaskName, Action>,
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

impl Procedure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root task (no predecessors).
    pub fn add_task(&mut self, task: Task) -> Result<&mut Self> {
        self.insert(Vec::new(), task)
    }

    /// Register `task` to run after every task named in `pre_names`.
    ///
    /// Each predecessor must already be registered. An empty `pre_names`
    /// registers a root task.
    pub fn add_task_by_pre_task_name<I, S>(&mut self, pre_names: I, task: Task) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut deps: Vec<TaskName> = Vec::new();
        for pre in pre_names {
            let pre = pre.as_ref();
            if !self.graph.contains(pre) {
                return Err(PermflowError::TaskNotFound(format!(
                    "task '{}' has unknown predecessor '{}'",
                    task.name(),
                    pre
                )));
            }
            if !deps.iter().any(|d| d == pre) {
                deps.push(pre.to_string());
            }
        }
        self.insert(deps, task)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.graph.contains(name)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Freeze the graph, compute generations and dispatch the first one.
    ///
    /// Returns once generation 0 has been dispatched (task bodies that
    /// complete synchronously may drive the run further before this
    /// returns). Generation errors are reported here, before any task runs.
    pub fn start<L>(self, listener: L) -> Result<RunHandle>
    where
        L: ProcedureListener + 'static,
    {
        self.start_shared(Arc::new(listener))
    }

    pub fn start_shared(self, listener: Arc<dyn ProcedureListener>) -> Result<RunHandle> {
        let generations = self.graph.generations()?;
        let run_id = NEXT_RUN_ID.fetch_add(1, Ordering::Relaxed);

        debug!(
            run_id,
            tasks = generations.task_count(),
            generations = generations.len(),
            "procedure graph frozen"
        );

        let core = RunCore::new(run_id, generations);
        let (shared, outcome_rx) = RunShared::new(core, self.actions, listener);
        let handle = RunHandle {
            shared: Arc::clone(&shared),
            outcome_rx,
        };

        shared.begin();
        Ok(handle)
    }

    fn insert(&mut self, deps: Vec<TaskName>, task: Task) -> Result<&mut Self> {
        let (name, action) = task.into_parts();
        if !self.graph.insert(name.clone(), deps) {
            return Err(PermflowError::DuplicateTask(format!(
                "task '{}' is already registered",
                name
            )));
        }
        self.actions.insert(name, action);
        Ok(self)
    }
}

/// Observer handle for a started run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    shared: Arc<RunShared>,
    outcome_rx: watch::Receiver<Option<RunOutcome>>,
}

impl RunHandle {
    pub fn run_id(&self) -> u64 {
        self.shared.run_id()
    }

    /// Terminal outcome, once decided.
    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome_rx.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome_rx.borrow().is_some()
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.shared.state_of(task)
    }

    /// Wait for the terminal outcome.
    ///
    /// There is no timeout: a task that never signals its handle stalls the
    /// run forever. Wrap this in `tokio::time::timeout` if that matters.
    pub async fn wait(&self) -> Result<RunOutcome> {
        let mut rx = self.outcome_rx.clone();
        let outcome = rx
            .wait_for(|outcome| outcome.is_some())
            .await
            .map_err(|e| anyhow::anyhow!("procedure run {} dropped: {e}", self.run_id()))?;
        outcome
            .clone()
            .ok_or_else(|| anyhow::anyhow!("procedure run {} has no outcome", self.run_id()).into())
    }
}
