// src/permission/session.rs

//! Pending permission requests, keyed by the token handed to the request
//! screen.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{PermflowError, Result};
use crate::permission::request::PermissionOutcome;
use crate::task::TaskHandle;

/// Opaque id linking a request screen to its waiting task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionToken {
    type Err = PermflowError;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s)
            .map_err(|e| PermflowError::SessionNotFound(format!("malformed token '{s}': {e}")))?;
        Ok(Self(uuid))
    }
}

/// A request screen that has been launched and not yet reported back.
#[derive(Debug)]
pub struct PendingRequest {
    pub permissions: Vec<String>,
    /// Handle of the task waiting for the screen's result.
    pub handle: TaskHandle,
    /// Filled in right before `handle` completes, read by the run listener.
    pub result: Arc<Mutex<Option<PermissionOutcome>>>,
}

impl PendingRequest {
    pub fn set_result(&self, outcome: PermissionOutcome) {
        *self.result.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    }
}

/// In-memory store of pending requests, owned by the application.
///
/// Entries are inserted when a request screen is launched and removed when
/// it reports back or goes away.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionToken, PendingRequest>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, PendingRequest>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `request` under a fresh token.
    pub fn insert(&self, request: PendingRequest) -> SessionToken {
        let token = SessionToken::new();
        debug!(%token, task = %request.handle.task_name(), "session registered");
        self.lock().insert(token, request);
        token
    }

    /// Remove and return the request for `token`.
    pub fn take(&self, token: &SessionToken) -> Result<PendingRequest> {
        let request = self
            .lock()
            .remove(token)
            .ok_or_else(|| PermflowError::SessionNotFound(token.to_string()))?;
        info!(%token, "session resumed");
        Ok(request)
    }

    /// Drop the request for `token`, if any.
    pub fn remove(&self, token: &SessionToken) -> bool {
        self.lock().remove(token).is_some()
    }

    pub fn contains(&self, token: &SessionToken) -> bool {
        self.lock().contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
