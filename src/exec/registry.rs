// src/exec/registry.rs

//! Explicit registry of the executors an application uses.
//!
//! One value per application, passed to whoever needs to hop threads.
//! Background executors are created lazily on first use.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use super::backend::{Executor, ScheduleExecutor};
use super::pool::{PoolExecutor, ScheduledExecutor};
use super::single::SingleThreadExecutor;
use crate::config::ExecutorConfig;
use crate::errors::Result;
use crate::types::ExecutorKind;

pub struct Executors {
    config: ExecutorConfig,
    main: Arc<dyn Executor>,
    io: Mutex<Option<Arc<SingleThreadExecutor>>>,
    core: Mutex<Option<Arc<PoolExecutor>>>,
    scheduled: Mutex<Option<Arc<ScheduledExecutor>>>,
}

impl std::fmt::Debug for Executors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executors")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Fetch `slot`, creating it with `make` on first use.
fn get_or_create<T>(
    slot: &Mutex<Option<Arc<T>>>,
    kind: ExecutorKind,
    make: impl FnOnce() -> std::io::Result<T>,
) -> Result<Arc<T>> {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = guard.as_ref() {
        return Ok(Arc::clone(existing));
    }
    let created = Arc::new(make()?);
    debug!(%kind, "executor created");
    *guard = Some(Arc::clone(&created));
    Ok(created)
}

impl Executors {
    /// `main` is the UI-thread executor (usually a
    /// [`MainThreadExecutor`](super::MainThreadExecutor)).
    pub fn new(config: ExecutorConfig, main: Arc<dyn Executor>) -> Self {
        Self {
            config,
            main,
            io: Mutex::new(None),
            core: Mutex::new(None),
            scheduled: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn main(&self) -> Arc<dyn Executor> {
        Arc::clone(&self.main)
    }

    pub fn io(&self) -> Result<Arc<dyn Executor>> {
        let io = get_or_create(&self.io, ExecutorKind::Io, SingleThreadExecutor::new)?;
        Ok(io)
    }

    pub fn core(&self) -> Result<Arc<dyn Executor>> {
        let cfg = &self.config;
        let core = get_or_create(&self.core, ExecutorKind::Core, || PoolExecutor::new(cfg))?;
        Ok(core)
    }

    pub fn scheduled(&self) -> Result<Arc<dyn ScheduleExecutor>> {
        let scheduled = self.scheduled_pool()?;
        Ok(scheduled)
    }

    pub fn get(&self, kind: ExecutorKind) -> Result<Arc<dyn Executor>> {
        match kind {
            ExecutorKind::Main => Ok(self.main()),
            ExecutorKind::Io => self.io(),
            ExecutorKind::Core => self.core(),
            ExecutorKind::Scheduled => {
                let scheduled = self.scheduled_pool()?;
                Ok(scheduled)
            }
        }
    }

    fn scheduled_pool(&self) -> Result<Arc<ScheduledExecutor>> {
        let cfg = &self.config;
        get_or_create(&self.scheduled, ExecutorKind::Scheduled, || {
            ScheduledExecutor::new(cfg)
        })
    }

    /// Shut down every background executor created so far. The main
    /// executor belongs to the UI thread and is left alone.
    pub fn shutdown(&self) {
        info!("shutting down executors");
        if let Some(io) = self.io.lock().unwrap_or_else(PoisonError::into_inner).take() {
            io.shutdown();
        }
        if let Some(core) = self.core.lock().unwrap_or_else(PoisonError::into_inner).take() {
            core.shutdown();
        }
        if let Some(scheduled) = self
            .scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            scheduled.shutdown();
        }
    }
}
