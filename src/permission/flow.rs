// src/permission/flow.rs

//! Permission request flows expressed as small procedures.
//!
//! A runtime request is at most two generations: an optional rationale
//! dialog, then the request screen. Settings pages follow the same shape:
//! a confirmation dialog, then the settings screen.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::PermissionSection;
use crate::errors::Result;
use crate::exec::{Executor, ExecutorExt, Executors};
use crate::permission::dialog::{ConfirmDialog, DialogChoice, DialogPresenter};
use crate::permission::model::SYSTEM_ALERT_WINDOW;
use crate::permission::platform::{
    PermissionPlatform, SDK_M, filter_denied, filter_granted, filter_rationale,
};
use crate::permission::request::{PermissionOutcome, PermissionRequest};
use crate::permission::session::{PendingRequest, SessionStore, SessionToken};
use crate::permission::settings::{SettingsIntent, app_settings_intent, overlay_settings_intent};
use crate::permission::text::{
    DefaultCatalog, StringCatalog, app_settings_message, rationale_message,
};
use crate::procedure::{Procedure, ProcedureListener, RunHandle, TaskView, TracingListener};
use crate::task::{Task, TaskHandle};

/// Cancellation code used when the user presses the negative dialog button.
pub const CODE_USER_DECLINED: i32 = 1;

/// Cancellation code used when the request screen closes without a result.
pub const CODE_REQUEST_ABANDONED: i32 = 2;

const TASK_RATIONALE: &str = "rationale";
const TASK_REQUEST: &str = "request";
const TASK_CONFIRM: &str = "confirm";
const TASK_OPEN_SETTINGS: &str = "open-settings";

type OutcomeCallback = Box<dyn FnOnce(PermissionOutcome) + Send + 'static>;

pub struct PermissionFlow {
    platform: Arc<dyn PermissionPlatform>,
    dialogs: Arc<dyn DialogPresenter>,
    catalog: Arc<dyn StringCatalog>,
    executors: Arc<Executors>,
    sessions: Arc<SessionStore>,
    config: PermissionSection,
}

impl std::fmt::Debug for PermissionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionFlow")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PermissionFlow {
    pub fn new(
        platform: Arc<dyn PermissionPlatform>,
        dialogs: Arc<dyn DialogPresenter>,
        executors: Arc<Executors>,
    ) -> Self {
        Self {
            platform,
            dialogs,
            catalog: Arc::new(DefaultCatalog),
            executors,
            sessions: Arc::new(SessionStore::new()),
            config: PermissionSection::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn StringCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_config(mut self, config: PermissionSection) -> Self {
        self.config = config;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn config(&self) -> &PermissionSection {
        &self.config
    }

    /// Ask for `request`'s permissions.
    ///
    /// `on_outcome` is called exactly once. When nothing needs asking (old
    /// platform, everything already granted) it is called before this
    /// returns and no run is started.
    pub fn request<F>(&self, request: PermissionRequest, on_outcome: F) -> Result<Option<RunHandle>>
    where
        F: FnOnce(PermissionOutcome) + Send + 'static,
    {
        let permissions = request.permissions().to_vec();

        if self.platform.sdk_int() < SDK_M {
            debug!(sdk = self.platform.sdk_int(), "runtime permissions not supported; granting");
            on_outcome(PermissionOutcome::Granted(permissions));
            return Ok(None);
        }

        let granted = filter_granted(self.platform.as_ref(), &permissions);
        if granted.len() == permissions.len() {
            debug!(?permissions, "all permissions already granted");
            on_outcome(PermissionOutcome::Granted(permissions));
            return Ok(None);
        }

        let mut rationale = filter_rationale(self.platform.as_ref(), &permissions);
        let show_dialog = !rationale.is_empty() || request.show_tips_on_first_time();
        if rationale.is_empty() {
            rationale = permissions.clone();
        }
        let message = rationale_message(self.catalog.as_ref(), &rationale, request.tips());

        let result = Arc::new(Mutex::new(None));
        let mut procedure = Procedure::new();
        let request_task = self.request_task(permissions.clone(), Arc::clone(&result));
        if show_dialog && !message.is_empty() {
            procedure.add_task(self.confirm_task(TASK_RATIONALE, message))?;
            procedure.add_task_by_pre_task_name([TASK_RATIONALE], request_task)?;
        } else {
            procedure.add_task(request_task)?;
        }

        info!(?permissions, dialog = show_dialog, "starting permission request");
        let listener = RequestListener {
            permissions,
            result,
            on_outcome: Mutex::new(Some(Box::new(on_outcome))),
        };
        let handle = procedure.start(listener)?;
        Ok(Some(handle))
    }

    /// Result callback of the request screen identified by `token`.
    ///
    /// Re-checks the requested permissions and completes the waiting task.
    pub fn deliver_result(&self, token: &SessionToken) -> Result<PermissionOutcome> {
        let pending = self.sessions.take(token)?;
        let denied = filter_denied(self.platform.as_ref(), &pending.permissions);
        let outcome = if denied.is_empty() {
            PermissionOutcome::Granted(pending.permissions.clone())
        } else {
            PermissionOutcome::Denied(denied)
        };
        debug!(%token, ?outcome, "permission request screen returned");
        pending.set_result(outcome.clone());
        pending.handle.complete();
        Ok(outcome)
    }

    /// The request screen identified by `token` went away without a result.
    pub fn abandon(&self, token: &SessionToken) -> Result<()> {
        let pending = self.sessions.take(token)?;
        info!(%token, "permission request screen abandoned");
        pending
            .handle
            .cancel(CODE_REQUEST_ABANDONED, "permission request screen closed");
        Ok(())
    }

    /// Explain why `permissions` are needed, then open the app's settings
    /// screen.
    ///
    /// Returns `false` without showing anything when no settings screen
    /// resolves on this device. `None` uses
    /// `[permission].settings_request_code`.
    pub fn app_settings_page<S: AsRef<str>>(
        &self,
        request_code: Option<i32>,
        permissions: &[S],
        tips: &str,
    ) -> Result<bool> {
        let intent = app_settings_intent(self.platform.as_ref());
        if !self.platform.resolves(&intent) {
            warn!(%intent, "app settings screen does not resolve");
            return Ok(false);
        }
        let message = app_settings_message(self.catalog.as_ref(), permissions, tips);
        self.settings_page("app-settings-page", message, intent, request_code)?;
        Ok(true)
    }

    /// Explain the overlay permission, then open its settings screen.
    ///
    /// Returns `false` when no settings screen resolves on this device.
    pub fn overlay_settings_page(&self, request_code: Option<i32>) -> Result<bool> {
        let intent = overlay_settings_intent(self.platform.as_ref());
        if !self.platform.resolves(&intent) {
            warn!(%intent, "overlay settings screen does not resolve");
            return Ok(false);
        }
        let message = rationale_message(self.catalog.as_ref(), &[SYSTEM_ALERT_WINDOW], "");
        self.settings_page("overlay-settings-page", message, intent, request_code)?;
        Ok(true)
    }

    fn settings_page(
        &self,
        label: &str,
        message: String,
        intent: SettingsIntent,
        request_code: Option<i32>,
    ) -> Result<RunHandle> {
        let request_code = request_code.unwrap_or(self.config.settings_request_code);
        let mut procedure = Procedure::new();
        procedure.add_task(self.confirm_task(TASK_CONFIRM, message))?;
        procedure.add_task_by_pre_task_name(
            [TASK_CONFIRM],
            self.open_settings_task(intent, request_code),
        )?;
        procedure.start(TracingListener::new(label))
    }

    /// Non-cancelable dialog on the main executor. Positive completes the
    /// task, negative cancels the run.
    fn confirm_task(&self, name: &str, message: String) -> Task {
        let dialogs = Arc::clone(&self.dialogs);
        let main = self.executors.main();
        let dialog = ConfirmDialog {
            message,
            positive: self.catalog.ok(),
            negative: self.catalog.cancel(),
        };
        Task::new(name, move |handle: TaskHandle| {
            main.spawn(move || {
                dialogs.show(
                    dialog,
                    Box::new(move |choice: DialogChoice| match choice {
                        DialogChoice::Positive => handle.complete(),
                        DialogChoice::Negative => {
                            handle.cancel(CODE_USER_DECLINED, "user declined the dialog")
                        }
                    }),
                );
            });
            Ok(())
        })
    }

    /// Register a session and open the request screen. The task stays
    /// running until the screen reports back.
    fn request_task(
        &self,
        permissions: Vec<String>,
        result: Arc<Mutex<Option<PermissionOutcome>>>,
    ) -> Task {
        let platform = Arc::clone(&self.platform);
        let sessions = Arc::clone(&self.sessions);
        let main = self.executors.main();
        Task::new(TASK_REQUEST, move |handle: TaskHandle| {
            main.spawn(move || {
                let token = sessions.insert(PendingRequest {
                    permissions: permissions.clone(),
                    handle: handle.clone(),
                    result,
                });
                if let Err(err) = platform.launch_request(&token, &permissions) {
                    sessions.remove(&token);
                    handle.fail(format!("failed to launch permission request: {err:#}"));
                }
            });
            Ok(())
        })
    }

    fn open_settings_task(&self, intent: SettingsIntent, request_code: i32) -> Task {
        let platform = Arc::clone(&self.platform);
        let main: Arc<dyn Executor> = self.executors.main();
        Task::new(TASK_OPEN_SETTINGS, move |handle: TaskHandle| {
            main.spawn(move || match platform.start_settings(&intent, request_code) {
                Ok(()) => handle.complete(),
                Err(err) => handle.fail(format!("failed to open {intent}: {err:#}")),
            });
            Ok(())
        })
    }
}

/// Turns the run's terminal callback into a [`PermissionOutcome`].
struct RequestListener {
    permissions: Vec<String>,
    result: Arc<Mutex<Option<PermissionOutcome>>>,
    on_outcome: Mutex<Option<OutcomeCallback>>,
}

impl RequestListener {
    fn deliver(&self, outcome: PermissionOutcome) {
        let callback = self
            .on_outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match callback {
            Some(callback) => callback(outcome),
            None => warn!(?outcome, "permission outcome already delivered"),
        }
    }
}

impl ProcedureListener for RequestListener {
    fn on_block_completed(&self, task: &TaskView) {
        debug!(task = %task.name, generation = task.generation, "permission step done");
    }

    fn on_completed(&self) {
        let outcome = self
            .result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_else(|| PermissionOutcome::Granted(self.permissions.clone()));
        self.deliver(outcome);
    }

    fn on_failed(&self, task: &TaskView) {
        let reason = task
            .reason
            .clone()
            .unwrap_or_else(|| format!("task '{}' failed", task.name));
        self.deliver(PermissionOutcome::Failed(reason));
    }

    fn on_cancel(&self, code: i32, reason: &str) {
        self.deliver(PermissionOutcome::Cancelled {
            code,
            reason: reason.to_string(),
        });
    }
}
