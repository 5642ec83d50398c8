// src/permission/settings.rs

//! Navigation targets for OS settings screens.
//!
//! Vendors ship their own permission managers; each chain below tries the
//! known screens in order and falls back to the last candidate.

use std::fmt;

use tracing::debug;

use crate::permission::platform::PermissionPlatform;

pub const ACTION_APPLICATION_DETAILS_SETTINGS: &str =
    "android.settings.APPLICATION_DETAILS_SETTINGS";
pub const ACTION_MANAGE_OVERLAY_PERMISSION: &str =
    "android.settings.action.MANAGE_OVERLAY_PERMISSION";

const HUAWEI_SYSTEM_MANAGER: &str = "com.huawei.systemmanager";
const MIUI_SECURITY_CENTER: &str = "com.miui.securitycenter";
const MEIZU_SAFE: &str = "com.meizu.safe";
const MEIZU_SHOW_APPSEC: &str = "com.meizu.safe.security.SHOW_APPSEC";
const MEIZU_APPSEC_ACTIVITY: &str = "com.meizu.safe.security.AppSecActivity";
const VIVO_SECURE: &str = "com.iqoo.secure";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub package: String,
    pub class: String,
}

/// Description of a settings screen to open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsIntent {
    pub action: Option<String>,
    /// Data URI, e.g. `package:com.example.app`.
    pub data: Option<String>,
    pub package: Option<String>,
    pub component: Option<Component>,
    pub extras: Vec<(String, String)>,
}

impl SettingsIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(action: &str) -> Self {
        Self {
            action: Some(action.to_string()),
            ..Self::default()
        }
    }

    pub fn package_uri(mut self, package_name: &str) -> Self {
        self.data = Some(format!("package:{package_name}"));
        self
    }

    pub fn package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    pub fn component(mut self, package: &str, class: &str) -> Self {
        self.component = Some(Component {
            package: package.to_string(),
            class: class.to_string(),
        });
        self
    }

    /// Set (or replace) an extra.
    pub fn extra(mut self, key: &str, value: &str) -> Self {
        match self.extras.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.extras.push((key.to_string(), value.to_string())),
        }
        self
    }

    pub fn get_extra(&self, key: &str) -> Option<&str> {
        self.extras
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn class_name(&self) -> Option<&str> {
        self.component.as_ref().map(|c| c.class.as_str())
    }
}

impl fmt::Display for SettingsIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.component, &self.action) {
            (Some(c), _) => write!(f, "{}/{}", c.package, c.class),
            (None, Some(action)) => f.write_str(action),
            (None, None) => f.write_str("<empty intent>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vendor {
    Huawei,
    Xiaomi,
    Oppo,
    Vivo,
    Meizu,
    Other,
}

impl Vendor {
    /// Case-insensitive substring match on the manufacturer string.
    pub fn from_manufacturer(manufacturer: &str) -> Self {
        let mark = manufacturer.to_lowercase();
        if mark.contains("huawei") {
            Vendor::Huawei
        } else if mark.contains("xiaomi") {
            Vendor::Xiaomi
        } else if mark.contains("oppo") {
            Vendor::Oppo
        } else if mark.contains("vivo") {
            Vendor::Vivo
        } else if mark.contains("meizu") {
            Vendor::Meizu
        } else {
            Vendor::Other
        }
    }
}

/// App permission settings screen for the current device.
pub fn app_settings_intent(platform: &dyn PermissionPlatform) -> SettingsIntent {
    let vendor = Vendor::from_manufacturer(&platform.manufacturer());
    let package_name = platform.package_name();
    let intent = match vendor {
        Vendor::Huawei => huawei_app_settings(platform),
        Vendor::Xiaomi => xiaomi_app_settings(platform, &package_name),
        Vendor::Oppo => oppo_app_settings(platform, &package_name),
        Vendor::Vivo => vivo_app_settings(platform, &package_name),
        Vendor::Meizu => meizu_app_sec(&package_name),
        Vendor::Other => app_details(&package_name),
    };
    debug!(?vendor, %intent, "resolved app settings intent");
    intent
}

/// Overlay ("draw over other apps") permission screen for the current
/// device. Falls back to the app details screen when nothing better resolves.
pub fn overlay_settings_intent(platform: &dyn PermissionPlatform) -> SettingsIntent {
    let vendor = Vendor::from_manufacturer(&platform.manufacturer());
    let package_name = platform.package_name();
    let preferred = match vendor {
        Vendor::Meizu => meizu_app_sec(&package_name),
        _ => SettingsIntent::with_action(ACTION_MANAGE_OVERLAY_PERMISSION).package_uri(&package_name),
    };
    let intent = if platform.resolves(&preferred) {
        preferred
    } else {
        app_details(&package_name)
    };
    debug!(?vendor, %intent, "resolved overlay settings intent");
    intent
}

fn app_details(package_name: &str) -> SettingsIntent {
    SettingsIntent::with_action(ACTION_APPLICATION_DETAILS_SETTINGS).package_uri(package_name)
}

fn meizu_app_sec(package_name: &str) -> SettingsIntent {
    SettingsIntent::with_action(MEIZU_SHOW_APPSEC)
        .extra("packageName", package_name)
        .component(MEIZU_SAFE, MEIZU_APPSEC_ACTIVITY)
}

/// First candidate with a matching activity, otherwise the last one.
fn first_available(
    platform: &dyn PermissionPlatform,
    candidates: Vec<SettingsIntent>,
) -> SettingsIntent {
    let last = candidates.len().saturating_sub(1);
    candidates
        .into_iter()
        .enumerate()
        .find(|(i, intent)| *i == last || platform.has_activity(intent))
        .map(|(_, intent)| intent)
        .unwrap_or_default()
}

fn huawei_app_settings(platform: &dyn PermissionPlatform) -> SettingsIntent {
    let candidates = [
        "com.huawei.permissionmanager.ui.MainActivity",
        "com.huawei.systemmanager.addviewmonitor.AddViewMonitorActivity",
        "com.huawei.notificationmanager.ui.NotificationManagmentActivity",
    ]
    .into_iter()
    .map(|class| SettingsIntent::new().component(HUAWEI_SYSTEM_MANAGER, class))
    .collect();
    first_available(platform, candidates)
}

fn xiaomi_app_settings(platform: &dyn PermissionPlatform, package_name: &str) -> SettingsIntent {
    let editor = SettingsIntent::with_action("miui.intent.action.APP_PERM_EDITOR")
        .extra("extra_pkgname", package_name);
    let scoped = editor.clone().package(MIUI_SECURITY_CENTER);
    let explicit = scoped.clone().component(
        MIUI_SECURITY_CENTER,
        "com.miui.permcenter.permissions.AppPermissionsEditorActivity",
    );
    first_available(platform, vec![editor, scoped, explicit])
}

fn oppo_app_settings(platform: &dyn PermissionPlatform, package_name: &str) -> SettingsIntent {
    let candidates = [
        (
            "com.color.safecenter",
            "com.color.safecenter.permission.floatwindow.FloatWindowListActivity",
        ),
        (
            "com.coloros.safecenter",
            "com.coloros.safecenter.sysfloatwindow.FloatWindowListActivity",
        ),
        ("com.oppo.safe", "com.oppo.safe.permission.PermissionAppListActivity"),
    ]
    .into_iter()
    .map(|(package, class)| {
        SettingsIntent::new()
            .extra("packageName", package_name)
            .component(package, class)
    })
    .collect();
    first_available(platform, candidates)
}

fn vivo_app_settings(platform: &dyn PermissionPlatform, package_name: &str) -> SettingsIntent {
    let candidates = [
        "com.iqoo.secure.ui.phoneoptimize.FloatWindowManager",
        "com.iqoo.secure.safeguard.SoftPermissionDetailActivity",
    ]
    .into_iter()
    .map(|class| {
        SettingsIntent::new()
            .component(VIVO_SECURE, class)
            .extra("packagename", package_name)
    })
    .collect();
    first_available(platform, candidates)
}
