// src/lib.rs

pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod permission;
pub mod procedure;
pub mod task;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use tracing::info;

pub use crate::errors::{PermflowError, Result};
pub use crate::procedure::{
    Procedure, ProcedureListener, RunHandle, RunOutcome, TaskView, TracingListener,
};
pub use crate::task::{Task, TaskHandle, TaskState};

use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::exec::{Executor, Executors};

/// Everything an application needs to run procedures and permission flows.
#[derive(Debug)]
pub struct Runtime {
    pub config: ConfigFile,
    pub executors: Arc<Executors>,
}

impl Runtime {
    /// Install logging from `config` and build the executor registry around
    /// `main` (the UI-thread executor).
    ///
    /// Logging is process-global; a subscriber that is already installed is
    /// left in place.
    pub fn new(config: ConfigFile, main: Arc<dyn Executor>) -> Self {
        if let Err(e) = logging::init_logging(config.logging.level) {
            tracing::debug!(error = %e, "logging already initialised");
        }

        info!(
            core_threads = config.executors.effective_core_threads(),
            max_threads = config.executors.effective_max_threads(),
            scheduled_threads = config.executors.effective_scheduled_threads(),
            "permflow runtime initialised"
        );

        let executors = Arc::new(Executors::new(config.executors.clone(), main));
        Self { config, executors }
    }

    /// Load and validate `path`, then build the runtime.
    pub fn from_path(path: impl AsRef<Path>, main: Arc<dyn Executor>) -> Result<Self> {
        let config = load_and_validate(path)?;
        Ok(Self::new(config, main))
    }

    pub fn shutdown(&self) {
        self.executors.shutdown();
    }
}
