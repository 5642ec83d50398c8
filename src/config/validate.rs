// src/config/validate.rs

use crate::config::model::{ConfigFile, ExecutorConfig, PermissionSection, RawConfigFile};
use crate::errors::{PermflowError, Result};

/// Request codes travel in the low 16 bits on the platform side.
pub const MAX_REQUEST_CODE: i32 = 0xFFFF;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PermflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.logging,
            raw.executors,
            raw.permission,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_executors(&cfg.executors)?;
    validate_permission(&cfg.permission)?;
    Ok(())
}

fn validate_executors(cfg: &ExecutorConfig) -> Result<()> {
    for (key, value) in [
        ("core_threads", cfg.core_threads),
        ("max_threads", cfg.max_threads),
        ("scheduled_threads", cfg.scheduled_threads),
    ] {
        if value == Some(0) {
            return Err(PermflowError::ConfigError(format!(
                "[executors].{key} must be >= 1 (got 0)"
            )));
        }
    }

    let core = cfg.effective_core_threads();
    if let Some(max) = cfg.max_threads
        && max < core
    {
        return Err(PermflowError::ConfigError(format!(
            "[executors].max_threads ({max}) must be >= core_threads ({core})"
        )));
    }

    Ok(())
}

fn validate_permission(cfg: &PermissionSection) -> Result<()> {
    if !(0..=MAX_REQUEST_CODE).contains(&cfg.settings_request_code) {
        return Err(PermflowError::ConfigError(format!(
            "[permission].settings_request_code must be within 0..={} (got {})",
            MAX_REQUEST_CODE, cfg.settings_request_code
        )));
    }
    Ok(())
}
