// src/config/model.rs

use serde::Deserialize;

use crate::logging::LogLevel;

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [executors]
/// core_threads = 4
/// max_threads = 17
/// keep_alive_secs = 30
/// scheduled_threads = 2
///
/// [permission]
/// show_tips_on_first_time = true
/// tips = "We need the camera to scan documents"
/// settings_request_code = 1010
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub executors: ExecutorConfig,

    #[serde(default)]
    pub permission: PermissionSection,
}

/// Validated configuration. Obtain one via `ConfigFile::try_from(raw)` or
/// the loader functions.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub logging: LoggingSection,
    pub executors: ExecutorConfig,
    pub permission: PermissionSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        logging: LoggingSection,
        executors: ExecutorConfig,
        permission: PermissionSection,
    ) -> Self {
        Self {
            logging,
            executors,
            permission,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.logging, raw.executors, raw.permission)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// Overrides `PERMFLOW_LOG` when set.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// `[executors]` section. Unset thread counts are derived from the number
/// of available CPUs.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub core_threads: Option<usize>,

    #[serde(default)]
    pub max_threads: Option<usize>,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    #[serde(default)]
    pub scheduled_threads: Option<usize>,
}

fn default_keep_alive_secs() -> u64 {
    30
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            core_threads: None,
            max_threads: None,
            keep_alive_secs: default_keep_alive_secs(),
            scheduled_threads: None,
        }
    }
}

fn cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `max(2, min(cpus - 1, 4))`
fn default_pool_size(cpus: usize) -> usize {
    cpus.saturating_sub(1).min(4).max(2)
}

impl ExecutorConfig {
    pub fn effective_core_threads(&self) -> usize {
        self.core_threads
            .unwrap_or_else(|| default_pool_size(cpu_count()))
    }

    /// `cpus * 2 + 1` unless configured, never below the core pool size.
    pub fn effective_max_threads(&self) -> usize {
        self.max_threads
            .unwrap_or_else(|| (cpu_count() * 2 + 1).max(self.effective_core_threads()))
    }

    pub fn effective_scheduled_threads(&self) -> usize {
        self.scheduled_threads
            .unwrap_or_else(|| default_pool_size(cpu_count()))
    }
}

/// `[permission]` section: defaults applied to permission requests.
#[derive(Debug, Clone, Deserialize)]
pub struct PermissionSection {
    /// Show the rationale dialog even on the very first request.
    #[serde(default = "default_show_tips_on_first_time")]
    pub show_tips_on_first_time: bool,

    /// Custom rationale text. Empty means "build one from permission names".
    #[serde(default)]
    pub tips: String,

    /// Request code used when opening the app settings screen.
    #[serde(default = "default_settings_request_code")]
    pub settings_request_code: i32,
}

fn default_show_tips_on_first_time() -> bool {
    true
}

fn default_settings_request_code() -> i32 {
    1010
}

impl Default for PermissionSection {
    fn default() -> Self {
        Self {
            show_tips_on_first_time: default_show_tips_on_first_time(),
            tips: String::new(),
            settings_request_code: default_settings_request_code(),
        }
    }
}
