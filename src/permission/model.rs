// src/permission/model.rs

//! Permission names and the user-facing groups they belong to.

use std::fmt;

pub const READ_CALENDAR: &str = "android.permission.READ_CALENDAR";
pub const WRITE_CALENDAR: &str = "android.permission.WRITE_CALENDAR";
pub const CAMERA: &str = "android.permission.CAMERA";
pub const READ_CONTACTS: &str = "android.permission.READ_CONTACTS";
pub const WRITE_CONTACTS: &str = "android.permission.WRITE_CONTACTS";
pub const GET_ACCOUNTS: &str = "android.permission.GET_ACCOUNTS";
pub const ACCESS_FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";
pub const ACCESS_COARSE_LOCATION: &str = "android.permission.ACCESS_COARSE_LOCATION";
pub const RECORD_AUDIO: &str = "android.permission.RECORD_AUDIO";
pub const READ_PHONE_STATE: &str = "android.permission.READ_PHONE_STATE";
pub const CALL_PHONE: &str = "android.permission.CALL_PHONE";
pub const READ_CALL_LOG: &str = "android.permission.READ_CALL_LOG";
pub const WRITE_CALL_LOG: &str = "android.permission.WRITE_CALL_LOG";
pub const ADD_VOICEMAIL: &str = "com.android.voicemail.permission.ADD_VOICEMAIL";
pub const USE_SIP: &str = "android.permission.USE_SIP";
pub const PROCESS_OUTGOING_CALLS: &str = "android.permission.PROCESS_OUTGOING_CALLS";
pub const BODY_SENSORS: &str = "android.permission.BODY_SENSORS";
pub const SEND_SMS: &str = "android.permission.SEND_SMS";
pub const RECEIVE_SMS: &str = "android.permission.RECEIVE_SMS";
pub const READ_SMS: &str = "android.permission.READ_SMS";
pub const RECEIVE_WAP_PUSH: &str = "android.permission.RECEIVE_WAP_PUSH";
pub const RECEIVE_MMS: &str = "android.permission.RECEIVE_MMS";
pub const READ_EXTERNAL_STORAGE: &str = "android.permission.READ_EXTERNAL_STORAGE";
pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";
pub const SYSTEM_ALERT_WINDOW: &str = "android.permission.SYSTEM_ALERT_WINDOW";

pub const CALENDAR_GROUP: &[&str] = &[READ_CALENDAR, WRITE_CALENDAR];
pub const CAMERA_GROUP: &[&str] = &[CAMERA];
pub const CONTACTS_GROUP: &[&str] = &[READ_CONTACTS, WRITE_CONTACTS, GET_ACCOUNTS];
pub const LOCATION_GROUP: &[&str] = &[ACCESS_FINE_LOCATION, ACCESS_COARSE_LOCATION];
pub const MICROPHONE_GROUP: &[&str] = &[RECORD_AUDIO];
pub const PHONE_GROUP: &[&str] = &[
    READ_PHONE_STATE,
    CALL_PHONE,
    READ_CALL_LOG,
    WRITE_CALL_LOG,
    ADD_VOICEMAIL,
    USE_SIP,
];
pub const SENSORS_GROUP: &[&str] = &[BODY_SENSORS];
pub const SMS_GROUP: &[&str] = &[SEND_SMS, RECEIVE_SMS, READ_SMS, RECEIVE_WAP_PUSH, RECEIVE_MMS];
pub const STORAGE_GROUP: &[&str] = &[READ_EXTERNAL_STORAGE, WRITE_EXTERNAL_STORAGE];

/// User-facing permission group; the unit shown in rationale messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionGroup {
    Calendar,
    Camera,
    Contacts,
    Location,
    Microphone,
    Phone,
    Sensors,
    Sms,
    Storage,
    SystemAlertWindow,
}

impl PermissionGroup {
    pub const ALL: [PermissionGroup; 10] = [
        PermissionGroup::Calendar,
        PermissionGroup::Camera,
        PermissionGroup::Contacts,
        PermissionGroup::Location,
        PermissionGroup::Microphone,
        PermissionGroup::Phone,
        PermissionGroup::Sensors,
        PermissionGroup::Sms,
        PermissionGroup::Storage,
        PermissionGroup::SystemAlertWindow,
    ];

    /// Group a permission belongs to; `None` for names we do not describe.
    pub fn of(permission: &str) -> Option<Self> {
        let group = match permission {
            READ_CALENDAR | WRITE_CALENDAR => PermissionGroup::Calendar,
            CAMERA => PermissionGroup::Camera,
            READ_CONTACTS | WRITE_CONTACTS | GET_ACCOUNTS => PermissionGroup::Contacts,
            ACCESS_FINE_LOCATION | ACCESS_COARSE_LOCATION => PermissionGroup::Location,
            RECORD_AUDIO => PermissionGroup::Microphone,
            READ_PHONE_STATE | CALL_PHONE | READ_CALL_LOG | WRITE_CALL_LOG | ADD_VOICEMAIL
            | USE_SIP | PROCESS_OUTGOING_CALLS => PermissionGroup::Phone,
            BODY_SENSORS => PermissionGroup::Sensors,
            SEND_SMS | RECEIVE_SMS | READ_SMS | RECEIVE_WAP_PUSH | RECEIVE_MMS => {
                PermissionGroup::Sms
            }
            READ_EXTERNAL_STORAGE | WRITE_EXTERNAL_STORAGE => PermissionGroup::Storage,
            SYSTEM_ALERT_WINDOW => PermissionGroup::SystemAlertWindow,
            _ => return None,
        };
        Some(group)
    }

    /// Permissions usually requested together for this group.
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            PermissionGroup::Calendar => CALENDAR_GROUP,
            PermissionGroup::Camera => CAMERA_GROUP,
            PermissionGroup::Contacts => CONTACTS_GROUP,
            PermissionGroup::Location => LOCATION_GROUP,
            PermissionGroup::Microphone => MICROPHONE_GROUP,
            PermissionGroup::Phone => PHONE_GROUP,
            PermissionGroup::Sensors => SENSORS_GROUP,
            PermissionGroup::Sms => SMS_GROUP,
            PermissionGroup::Storage => STORAGE_GROUP,
            PermissionGroup::SystemAlertWindow => &[SYSTEM_ALERT_WINDOW],
        }
    }
}

impl fmt::Display for PermissionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermissionGroup::Calendar => "calendar",
            PermissionGroup::Camera => "camera",
            PermissionGroup::Contacts => "contacts",
            PermissionGroup::Location => "location",
            PermissionGroup::Microphone => "microphone",
            PermissionGroup::Phone => "phone",
            PermissionGroup::Sensors => "sensors",
            PermissionGroup::Sms => "sms",
            PermissionGroup::Storage => "storage",
            PermissionGroup::SystemAlertWindow => "system_alert_window",
        };
        f.write_str(s)
    }
}
