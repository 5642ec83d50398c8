// src/procedure/runtime.rs

//! Thread-safe shell around [`RunCore`].
//!
//! Completion handles can fire from any thread. Every transition goes
//! through the single core mutex. Listener callbacks produced by a
//! transition are queued while that mutex is still held, so the queue order
//! is the order the core decided things in. Whichever thread finds the
//! queue idle drains it; a thread that signals while another one is
//! delivering only enqueues. Callbacks for one run are therefore never
//! concurrent, never reordered, and nothing follows the terminal callback.
//!
//! Action dispatch happens after delivery, outside both locks, on the
//! thread that caused the transition.

use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::procedure::core::{CoreCommand, CoreStep, RunCore, Signal};
use crate::procedure::listener::{ProcedureListener, RunOutcome, TaskView};
use crate::task::{Action, TaskHandle, TaskState};
use crate::types::TaskName;

/// A listener callback waiting to be delivered.
#[derive(Debug)]
enum Delivery {
    BlockCompleted(TaskView),
    BlockFailed(TaskView),
    Progress {
        task: TaskView,
        percent: u8,
        description: Option<String>,
    },
    Finish {
        outcome: RunOutcome,
        task: Option<TaskView>,
    },
}

#[derive(Debug, Default)]
struct DeliveryQueue {
    pending: VecDeque<Delivery>,
    draining: bool,
}

type Dispatches = Vec<(usize, Vec<TaskName>)>;

pub(crate) struct RunShared {
    run_id: u64,
    core: Mutex<RunCore>,
    /// Actions not dispatched yet. Cleared when the run finishes.
    actions: Mutex<HashMap<TaskName, Action>>,
    deliveries: Mutex<DeliveryQueue>,
    listener: Arc<dyn ProcedureListener>,
    outcome_tx: watch::Sender<Option<RunOutcome>>,
}

impl fmt::Debug for RunShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunShared")
            .field("run_id", &self.run_id)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl RunShared {
    pub(crate) fn new(
        core: RunCore,
        actions: HashMap<TaskName, Action>,
        listener: Arc<dyn ProcedureListener>,
    ) -> (Arc<Self>, watch::Receiver<Option<RunOutcome>>) {
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let shared = Arc::new(Self {
            run_id: core.run_id(),
            core: Mutex::new(core),
            actions: Mutex::new(actions),
            deliveries: Mutex::new(DeliveryQueue::default()),
            listener,
            outcome_tx,
        });
        (shared, outcome_rx)
    }

    pub(crate) fn run_id(&self) -> u64 {
        self.run_id
    }

    pub(crate) fn begin(self: &Arc<Self>) {
        info!(run_id = self.run_id, "procedure started");
        let dispatches = {
            let mut core = self.lock_core();
            let step = core.begin();
            self.enqueue(step)
        };
        self.drain();
        self.dispatch_all(dispatches);
    }

    pub(crate) fn signal(self: &Arc<Self>, task: &str, signal: Signal) {
        let dispatches = {
            let mut core = self.lock_core();
            let step = core.step(task, signal);
            self.enqueue(step)
        };
        self.drain();
        self.dispatch_all(dispatches);
    }

    pub(crate) fn progress(&self, task: &str, percent: u8, description: Option<&str>) {
        {
            let core = self.lock_core();
            match core.progress_target(task) {
                Some(view) => self.lock_deliveries().pending.push_back(Delivery::Progress {
                    task: view,
                    percent,
                    description: description.map(str::to_string),
                }),
                None => {
                    debug!(
                        run_id = self.run_id,
                        task = %task,
                        "progress for task that is not running; ignoring"
                    );
                    return;
                }
            }
        }
        self.drain();
    }

    pub(crate) fn state_of(&self, task: &str) -> Option<TaskState> {
        self.lock_core().state_of(task)
    }

    /// The core is never left half-updated by a panic (listener callbacks
    /// and actions run outside the lock), so a poisoned guard is usable.
    fn lock_core(&self) -> MutexGuard<'_, RunCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_actions(&self) -> MutexGuard<'_, HashMap<TaskName, Action>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_deliveries(&self) -> MutexGuard<'_, DeliveryQueue> {
        self.deliveries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the callbacks of `step` and return its dispatches.
    ///
    /// Must be called with the core lock held.
    fn enqueue(&self, step: CoreStep) -> Dispatches {
        let mut dispatches = Vec::new();
        let mut queue = self.lock_deliveries();
        for command in step.commands {
            match command {
                CoreCommand::Dispatch { generation, tasks } => {
                    dispatches.push((generation, tasks));
                }
                CoreCommand::BlockCompleted(view) => {
                    queue.pending.push_back(Delivery::BlockCompleted(view));
                }
                CoreCommand::BlockFailed(view) => {
                    queue.pending.push_back(Delivery::BlockFailed(view));
                }
                CoreCommand::Finish { outcome, task } => {
                    queue.pending.push_back(Delivery::Finish { outcome, task });
                }
            }
        }
        dispatches
    }

    /// Deliver queued callbacks unless another thread already is.
    fn drain(&self) {
        {
            let mut queue = self.lock_deliveries();
            if queue.draining {
                return;
            }
            queue.draining = true;
        }

        loop {
            let next = {
                let mut queue = self.lock_deliveries();
                match queue.pending.pop_front() {
                    Some(delivery) => delivery,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };
            self.deliver(next);
        }
    }

    fn deliver(&self, delivery: Delivery) {
        match delivery {
            Delivery::BlockCompleted(view) => {
                self.notify("on_block_completed", || self.listener.on_block_completed(&view));
            }
            Delivery::BlockFailed(view) => {
                self.notify("on_block_failed", || self.listener.on_block_failed(&view));
            }
            Delivery::Progress {
                task,
                percent,
                description,
            } => {
                self.notify("on_progress", || {
                    self.listener
                        .on_progress(&task, percent, description.as_deref())
                });
            }
            Delivery::Finish { outcome, task } => self.finish(outcome, task),
        }
    }

    /// Invoke one listener callback. A panicking listener is logged and
    /// does not stop the run.
    fn notify(&self, callback: &str, call: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(call)) {
            error!(
                run_id = self.run_id,
                callback,
                reason = %panic_message(payload.as_ref()),
                "procedure listener panicked"
            );
        }
    }

    fn dispatch_all(self: &Arc<Self>, dispatches: Dispatches) {
        for (generation, tasks) in dispatches {
            self.dispatch(generation, tasks);
        }
    }

    fn dispatch(self: &Arc<Self>, generation: usize, tasks: Vec<TaskName>) {
        debug!(run_id = self.run_id, generation, tasks = ?tasks, "dispatching ready tasks");

        for name in tasks {
            let action = self.lock_actions().remove(&name);
            match action {
                Some(action) => self.run_action(name, action),
                None => {
                    warn!(run_id = self.run_id, task = %name, "no action registered for task; failing it");
                    self.signal(&name, Signal::Fail("task has no action".to_string()));
                }
            }
        }
    }

    fn run_action(self: &Arc<Self>, name: TaskName, action: Action) {
        let handle = TaskHandle::new(name.clone(), Arc::clone(self));

        match panic::catch_unwind(AssertUnwindSafe(move || action(handle))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(run_id = self.run_id, task = %name, error = %err, "task action returned an error");
                self.signal(&name, Signal::Fail(format!("{err:#}")));
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(run_id = self.run_id, task = %name, reason = %reason, "task action panicked");
                self.signal(&name, Signal::Fail(format!("task panicked: {reason}")));
            }
        }
    }

    fn finish(&self, outcome: RunOutcome, task: Option<TaskView>) {
        // Release the bodies of generations that will never run.
        let dropped = std::mem::take(&mut *self.lock_actions());
        if !dropped.is_empty() {
            debug!(run_id = self.run_id, count = dropped.len(), "dropping undispatched actions");
        }
        drop(dropped);

        match (&outcome, task) {
            (RunOutcome::Completed, _) => {
                info!(run_id = self.run_id, "procedure completed");
                self.notify("on_completed", || self.listener.on_completed());
            }
            (RunOutcome::Failed { task: name, reason }, view) => {
                warn!(run_id = self.run_id, task = %name, reason = %reason, "procedure failed");
                match view {
                    Some(view) => self.notify("on_failed", || self.listener.on_failed(&view)),
                    None => error!(run_id = self.run_id, task = %name, "failed task missing from run"),
                }
            }
            (RunOutcome::Cancelled { task: name, code, reason }, _) => {
                info!(run_id = self.run_id, task = %name, code, reason = %reason, "procedure cancelled");
                self.notify("on_cancel", || self.listener.on_cancel(*code, reason));
            }
        }

        self.outcome_tx.send_replace(Some(outcome));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
