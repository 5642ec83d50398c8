// src/permission/text.rs

//! Human-readable permission messages.

use crate::permission::model::PermissionGroup;

/// Placeholder replaced by the joined group names in message templates.
pub const PERMISSIONS_PLACEHOLDER: &str = "{permissions}";

/// String resource lookup. Swap in a localized catalog as needed.
pub trait StringCatalog: Send + Sync {
    fn group_name(&self, group: PermissionGroup) -> String;

    /// Rationale dialog template containing [`PERMISSIONS_PLACEHOLDER`].
    fn rationale_template(&self) -> String;

    /// "Go to settings" dialog template containing [`PERMISSIONS_PLACEHOLDER`].
    fn settings_template(&self) -> String;

    fn ok(&self) -> String;

    fn cancel(&self) -> String;
}

/// Built-in English strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalog;

impl StringCatalog for DefaultCatalog {
    fn group_name(&self, group: PermissionGroup) -> String {
        let name = match group {
            PermissionGroup::Calendar => "Calendar",
            PermissionGroup::Camera => "Camera",
            PermissionGroup::Contacts => "Contacts",
            PermissionGroup::Location => "Location",
            PermissionGroup::Microphone => "Microphone",
            PermissionGroup::Phone => "Phone",
            PermissionGroup::Sensors => "Body sensors",
            PermissionGroup::Sms => "SMS",
            PermissionGroup::Storage => "Storage",
            PermissionGroup::SystemAlertWindow => "Display over other apps",
        };
        name.to_string()
    }

    fn rationale_template(&self) -> String {
        "This app needs the following permissions to work properly: {permissions}.".to_string()
    }

    fn settings_template(&self) -> String {
        "Please allow the following permissions in Settings: {permissions}.".to_string()
    }

    fn ok(&self) -> String {
        "OK".to_string()
    }

    fn cancel(&self) -> String {
        "Cancel".to_string()
    }
}

/// Display names for `permissions`, one per group, in order of first
/// appearance. Unknown permissions are skipped.
pub fn transform_text<S: AsRef<str>>(catalog: &dyn StringCatalog, permissions: &[S]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for permission in permissions {
        let Some(group) = PermissionGroup::of(permission.as_ref()) else {
            continue;
        };
        let name = catalog.group_name(group);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Message for the rationale dialog. Non-empty `tips` wins; an empty
/// result means there is nothing to explain.
pub fn rationale_message<S: AsRef<str>>(
    catalog: &dyn StringCatalog,
    permissions: &[S],
    tips: &str,
) -> String {
    format_message(catalog, &catalog.rationale_template(), permissions, tips)
}

/// Message for the "open app settings" dialog. Same rules as
/// [`rationale_message`].
pub fn app_settings_message<S: AsRef<str>>(
    catalog: &dyn StringCatalog,
    permissions: &[S],
    tips: &str,
) -> String {
    format_message(catalog, &catalog.settings_template(), permissions, tips)
}

fn format_message<S: AsRef<str>>(
    catalog: &dyn StringCatalog,
    template: &str,
    permissions: &[S],
    tips: &str,
) -> String {
    if !tips.is_empty() {
        return tips.to_string();
    }
    let names = transform_text(catalog, permissions);
    if names.is_empty() {
        return String::new();
    }
    template.replacen(PERMISSIONS_PLACEHOLDER, &names.join(", "), 1)
}
