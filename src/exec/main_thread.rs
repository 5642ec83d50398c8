// src/exec/main_thread.rs

//! "Post to the UI thread" executor.
//!
//! [`MainThreadExecutor`] only enqueues; whichever thread owns the paired
//! [`MainLoop`] runs the work, in posting order.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::backend::{Executor, Work, run_work};

#[derive(Debug, Clone)]
pub struct MainThreadExecutor {
    tx: mpsc::UnboundedSender<Work>,
}

/// Receiving side of a [`MainThreadExecutor`], driven by the UI thread.
#[derive(Debug)]
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Work>,
}

impl MainThreadExecutor {
    pub fn new() -> (Self, MainLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, MainLoop { rx })
    }
}

impl Executor for MainThreadExecutor {
    fn execute(&self, work: Work) {
        if self.tx.send(work).is_err() {
            warn!("main loop dropped; discarding posted work");
        }
    }
}

impl MainLoop {
    /// Run everything posted so far (and anything that work posts in turn)
    /// without waiting. Returns the number of items run.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(work) = self.rx.try_recv() {
            run_work("main", work);
            count += 1;
        }
        if count > 0 {
            debug!(count, "main loop drained posted work");
        }
        count
    }

    /// Run posted work until every executor handle is dropped.
    pub async fn run(mut self) {
        while let Some(work) = self.rx.recv().await {
            run_work("main", work);
        }
        debug!("main loop finished (all executors dropped)");
    }
}
