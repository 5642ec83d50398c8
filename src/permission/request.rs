// src/permission/request.rs

use crate::config::PermissionSection;
use crate::errors::{PermflowError, Result};

/// An immutable permission request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRequest {
    permissions: Vec<String>,
    tips: String,
    show_tips_on_first_time: bool,
}

impl PermissionRequest {
    pub fn builder<I, S>(permissions: I) -> PermissionRequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionRequestBuilder::new(permissions)
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// Custom rationale text; empty means "derive from the permission names".
    pub fn tips(&self) -> &str {
        &self.tips
    }

    pub fn show_tips_on_first_time(&self) -> bool {
        self.show_tips_on_first_time
    }
}

#[derive(Debug, Clone)]
pub struct PermissionRequestBuilder {
    permissions: Vec<String>,
    tips: String,
    show_tips_on_first_time: bool,
}

impl PermissionRequestBuilder {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = PermissionSection::default();
        Self {
            permissions: permissions.into_iter().map(Into::into).collect(),
            tips: defaults.tips,
            show_tips_on_first_time: defaults.show_tips_on_first_time,
        }
    }

    /// Take `tips` and `show_tips_on_first_time` from configuration.
    pub fn defaults(mut self, section: &PermissionSection) -> Self {
        self.tips = section.tips.clone();
        self.show_tips_on_first_time = section.show_tips_on_first_time;
        self
    }

    pub fn tips(mut self, tips: impl Into<String>) -> Self {
        self.tips = tips.into();
        self
    }

    pub fn show_tips_on_first_time(mut self, show: bool) -> Self {
        self.show_tips_on_first_time = show;
        self
    }

    /// Fails on an empty permission list. Duplicates are dropped, keeping
    /// the first occurrence.
    pub fn build(self) -> Result<PermissionRequest> {
        let mut permissions: Vec<String> = Vec::with_capacity(self.permissions.len());
        for p in self.permissions {
            if p.is_empty() {
                return Err(PermflowError::ConfigError(
                    "permission names must not be empty".to_string(),
                ));
            }
            if !permissions.contains(&p) {
                permissions.push(p);
            }
        }
        if permissions.is_empty() {
            return Err(PermflowError::ConfigError(
                "a permission request needs at least one permission".to_string(),
            ));
        }
        Ok(PermissionRequest {
            permissions,
            tips: self.tips,
            show_tips_on_first_time: self.show_tips_on_first_time,
        })
    }
}

/// How a permission request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// Every requested permission is granted.
    Granted(Vec<String>),
    /// The request screen returned with these permissions still denied.
    Denied(Vec<String>),
    /// The user declined the rationale dialog or the request screen went away.
    Cancelled { code: i32, reason: String },
    /// A platform call failed.
    Failed(String),
}

impl PermissionOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionOutcome::Granted(_))
    }
}
