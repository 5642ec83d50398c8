// src/permission/platform.rs

//! Access to the host platform's permission state.

use crate::permission::session::SessionToken;
use crate::permission::settings::SettingsIntent;

/// First SDK level with runtime permissions. Below it everything declared
/// in the manifest is granted at install time.
pub const SDK_M: u32 = 23;

/// Host platform operations the permission flow needs.
///
/// Implementations are called from whichever thread runs the flow's task
/// bodies (by default the main executor).
pub trait PermissionPlatform: Send + Sync {
    fn sdk_int(&self) -> u32;

    /// `true` if `permission` is currently granted.
    fn check_self_permission(&self, permission: &str) -> bool;

    /// `true` if the user denied `permission` before and the platform
    /// recommends explaining why it is needed.
    fn should_show_rationale(&self, permission: &str) -> bool;

    fn can_draw_overlays(&self) -> bool;

    fn package_name(&self) -> String;

    /// Device manufacturer as reported by the platform, any case.
    fn manufacturer(&self) -> String;

    /// `true` if some screen would handle `intent`.
    fn resolves(&self, intent: &SettingsIntent) -> bool;

    /// `true` if at least one activity matches `intent` exactly.
    fn has_activity(&self, intent: &SettingsIntent) -> bool;

    fn start_settings(&self, intent: &SettingsIntent, request_code: i32) -> anyhow::Result<()>;

    /// Open the request screen for `permissions`. The screen reports back
    /// through [`PermissionFlow::deliver_result`](super::PermissionFlow::deliver_result)
    /// or [`PermissionFlow::abandon`](super::PermissionFlow::abandon) with `token`.
    fn launch_request(&self, token: &SessionToken, permissions: &[String]) -> anyhow::Result<()>;
}

pub fn has_permission(platform: &dyn PermissionPlatform, permission: &str) -> bool {
    if platform.sdk_int() < SDK_M {
        return true;
    }
    platform.check_self_permission(permission)
}

pub fn should_show_rationale(platform: &dyn PermissionPlatform, permission: &str) -> bool {
    if platform.sdk_int() < SDK_M {
        return false;
    }
    platform.should_show_rationale(permission)
}

pub fn has_draw_overlay_permission(platform: &dyn PermissionPlatform) -> bool {
    if platform.sdk_int() < SDK_M {
        return true;
    }
    platform.can_draw_overlays()
}

pub fn filter_granted<S: AsRef<str>>(
    platform: &dyn PermissionPlatform,
    permissions: &[S],
) -> Vec<String> {
    permissions
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| has_permission(platform, p))
        .map(str::to_string)
        .collect()
}

pub fn filter_denied<S: AsRef<str>>(
    platform: &dyn PermissionPlatform,
    permissions: &[S],
) -> Vec<String> {
    permissions
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| !has_permission(platform, p))
        .map(str::to_string)
        .collect()
}

pub fn filter_rationale<S: AsRef<str>>(
    platform: &dyn PermissionPlatform,
    permissions: &[S],
) -> Vec<String> {
    permissions
        .iter()
        .map(AsRef::as_ref)
        .filter(|p| should_show_rationale(platform, p))
        .map(str::to_string)
        .collect()
}
