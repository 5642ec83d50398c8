// src/exec/single.rs

//! Single background thread, work runs strictly in submission order.

use std::sync::{Mutex, PoisonError};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{Executor, Work, run_work};

pub const SINGLE_THREAD_NAME: &str = "single-thread";

#[derive(Debug)]
pub struct SingleThreadExecutor {
    /// `None` once shut down.
    tx: Mutex<Option<mpsc::UnboundedSender<Work>>>,
}

impl SingleThreadExecutor {
    /// Spawn the background thread.
    pub fn new() -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Work>();

        thread::Builder::new()
            .name(SINGLE_THREAD_NAME.to_string())
            .spawn(move || {
                info!("single-thread executor loop started");
                while let Some(work) = rx.blocking_recv() {
                    run_work(SINGLE_THREAD_NAME, work);
                }
                info!("single-thread executor loop finished (channel closed)");
            })?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
        })
    }
}

impl Executor for SingleThreadExecutor {
    fn execute(&self, work: Work) {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(work).is_err() {
                    warn!("single-thread executor loop gone; discarding work");
                }
            }
            None => warn!("single-thread executor shut down; discarding work"),
        }
    }

    /// Closes the channel; the thread exits after draining queued work.
    fn shutdown(&self) {
        let previous = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!("single-thread executor shutting down");
        }
    }
}
