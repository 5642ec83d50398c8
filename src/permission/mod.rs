// src/permission/mod.rs

//! Runtime permission requests built on [`Procedure`](crate::procedure::Procedure).
//!
//! Everything platform-specific (permission checks, dialogs, launching the
//! request screen or a settings screen) is reached through traits so the
//! flow itself stays testable.

pub mod dialog;
pub mod flow;
pub mod model;
pub mod platform;
pub mod request;
pub mod session;
pub mod settings;
pub mod text;

pub use dialog::{ConfirmDialog, DialogCallback, DialogChoice, DialogPresenter};
pub use flow::{CODE_REQUEST_ABANDONED, CODE_USER_DECLINED, PermissionFlow};
pub use model::PermissionGroup;
pub use platform::{
    PermissionPlatform, SDK_M, filter_denied, filter_granted, filter_rationale,
    has_draw_overlay_permission, has_permission, should_show_rationale,
};
pub use request::{PermissionOutcome, PermissionRequest, PermissionRequestBuilder};
pub use session::{PendingRequest, SessionStore, SessionToken};
pub use settings::{
    ACTION_APPLICATION_DETAILS_SETTINGS, ACTION_MANAGE_OVERLAY_PERMISSION, Component,
    SettingsIntent, Vendor, app_settings_intent, overlay_settings_intent,
};
pub use text::{DefaultCatalog, StringCatalog, app_settings_message, rationale_message, transform_text};
