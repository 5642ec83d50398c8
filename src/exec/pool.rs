// src/exec/pool.rs

//! Tokio-backed worker pools: the general "core" pool and the scheduled
//! (delay-capable) pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, warn};

use super::backend::{Executor, ScheduleExecutor, Work, run_work};
use crate::config::ExecutorConfig;

pub const CORE_THREAD_PREFIX: &str = "core-thread";
pub const SCHEDULED_THREAD_PREFIX: &str = "scheduled-thread";

/// Owns a dedicated runtime and shuts it down without blocking, so the
/// executor may be dropped from inside another runtime.
#[derive(Debug)]
struct OwnedRuntime {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
}

impl OwnedRuntime {
    fn build(
        prefix: &'static str,
        workers: usize,
        max_blocking: usize,
        keep_alive: Duration,
    ) -> std::io::Result<Self> {
        let counter = Arc::new(AtomicUsize::new(0));
        let runtime = Builder::new_multi_thread()
            .worker_threads(workers)
            .max_blocking_threads(max_blocking)
            .thread_keep_alive(keep_alive)
            .thread_name_fn(move || {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                format!("{prefix}-{n}")
            })
            .enable_all()
            .build()?;

        debug!(prefix, workers, max_blocking, ?keep_alive, "executor runtime built");

        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            handle,
        })
    }

    fn is_running(&self) -> bool {
        self.runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn shutdown(&self) {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// General purpose pool for blocking work.
///
/// `core_threads` runtime workers plus a blocking pool of up to
/// `max_threads`, idle threads reclaimed after `keep_alive_secs`.
#[derive(Debug)]
pub struct PoolExecutor {
    rt: OwnedRuntime,
}

impl PoolExecutor {
    pub fn new(cfg: &ExecutorConfig) -> std::io::Result<Self> {
        let rt = OwnedRuntime::build(
            CORE_THREAD_PREFIX,
            cfg.effective_core_threads(),
            cfg.effective_max_threads(),
            Duration::from_secs(cfg.keep_alive_secs),
        )?;
        Ok(Self { rt })
    }
}

impl Executor for PoolExecutor {
    fn execute(&self, work: Work) {
        if !self.rt.is_running() {
            warn!(executor = CORE_THREAD_PREFIX, "executor shut down; discarding work");
            return;
        }
        self.rt
            .handle
            .spawn_blocking(move || run_work(CORE_THREAD_PREFIX, work));
    }

    fn shutdown(&self) {
        debug!(executor = CORE_THREAD_PREFIX, "shutting down");
        self.rt.shutdown();
    }
}

/// Pool that runs work after an optional delay.
#[derive(Debug)]
pub struct ScheduledExecutor {
    rt: OwnedRuntime,
}

impl ScheduledExecutor {
    pub fn new(cfg: &ExecutorConfig) -> std::io::Result<Self> {
        let threads = cfg.effective_scheduled_threads();
        let rt = OwnedRuntime::build(
            SCHEDULED_THREAD_PREFIX,
            threads,
            threads,
            Duration::from_secs(cfg.keep_alive_secs),
        )?;
        Ok(Self { rt })
    }
}

impl Executor for ScheduledExecutor {
    fn execute(&self, work: Work) {
        self.schedule(work, Duration::ZERO);
    }

    fn shutdown(&self) {
        debug!(executor = SCHEDULED_THREAD_PREFIX, "shutting down");
        self.rt.shutdown();
    }
}

impl ScheduleExecutor for ScheduledExecutor {
    fn schedule(&self, work: Work, delay: Duration) {
        if !self.rt.is_running() {
            warn!(executor = SCHEDULED_THREAD_PREFIX, "executor shut down; discarding work");
            return;
        }
        self.rt.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            run_work(SCHEDULED_THREAD_PREFIX, work);
        });
    }
}
