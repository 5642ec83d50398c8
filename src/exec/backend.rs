// src/exec/backend.rs

//! Executor abstraction.
//!
//! Task bodies use an `Executor` to choose the thread class their work runs
//! on (UI thread, single IO thread, worker pool). The procedure engine never
//! calls an executor itself.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::error;

/// A unit of work submitted to an executor.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

pub trait Executor: Send + Sync {
    /// Run `work` at some point, on some thread owned by this executor.
    fn execute(&self, work: Work);

    /// Stop accepting work. Already queued work may still run.
    fn shutdown(&self) {}
}

/// Executor that can also delay work.
pub trait ScheduleExecutor: Executor {
    fn schedule(&self, work: Work, delay: Duration);
}

/// Closure-friendly wrappers around [`Executor`] / [`ScheduleExecutor`].
pub trait ExecutorExt {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static;
}

impl<E: Executor + ?Sized> ExecutorExt for E {
    fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.execute(Box::new(f));
    }
}

/// Runs work immediately on the calling thread.
///
/// Handy for tests and headless embedding where there is no UI thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, work: Work) {
        run_work("inline", work);
    }
}

impl ScheduleExecutor for InlineExecutor {
    fn schedule(&self, work: Work, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        run_work("inline", work);
    }
}

/// Run a unit of work, logging (rather than propagating) a panic so that a
/// misbehaving closure does not take an executor thread down with it.
pub(crate) fn run_work(executor: &str, work: Work) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(work)) {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        error!(executor, panic = %msg, "work item panicked");
    }
}
