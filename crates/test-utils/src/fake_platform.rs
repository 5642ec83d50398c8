use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use permflow::permission::{
    ConfirmDialog, DialogCallback, DialogChoice, DialogPresenter, PermissionPlatform,
    SessionToken, SettingsIntent,
};

/// Key used by [`FakePlatform`] to decide whether an intent is available:
/// the component class if set, otherwise `action@package` or the action.
pub fn intent_key(intent: &SettingsIntent) -> String {
    if let Some(class) = intent.class_name() {
        return class.to_string();
    }
    let action = intent.action.clone().unwrap_or_default();
    match &intent.package {
        Some(package) => format!("{action}@{package}"),
        None => action,
    }
}

#[derive(Debug)]
struct PlatformState {
    sdk: u32,
    granted: HashSet<String>,
    rationale: HashSet<String>,
    overlays: bool,
    package: String,
    manufacturer: String,
    activities: HashSet<String>,
    resolve_all: bool,
    fail_launch: bool,
    launched: Vec<(SessionToken, Vec<String>)>,
    started: Vec<(SettingsIntent, i32)>,
}

/// In-memory [`PermissionPlatform`] with interior mutability, so a test can
/// flip permission state while a flow is in progress.
#[derive(Debug)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlatform {
    /// SDK 30, nothing granted, every intent resolves, no vendor activities.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PlatformState {
                sdk: 30,
                granted: HashSet::new(),
                rationale: HashSet::new(),
                overlays: false,
                package: "com.example.app".to_string(),
                manufacturer: "Google".to_string(),
                activities: HashSet::new(),
                resolve_all: true,
                fail_launch: false,
                launched: Vec::new(),
                started: Vec::new(),
            }),
        }
    }

    pub fn with_sdk(self, sdk: u32) -> Self {
        self.state.lock().unwrap().sdk = sdk;
        self
    }

    pub fn with_manufacturer(self, manufacturer: &str) -> Self {
        self.state.lock().unwrap().manufacturer = manufacturer.to_string();
        self
    }

    /// Make an intent with this [`intent_key`] available.
    pub fn with_activity(self, key: &str) -> Self {
        self.state.lock().unwrap().activities.insert(key.to_string());
        self
    }

    /// Only intents registered through `with_activity` resolve.
    pub fn resolve_only_known(self) -> Self {
        self.state.lock().unwrap().resolve_all = false;
        self
    }

    pub fn failing_launch(self) -> Self {
        self.state.lock().unwrap().fail_launch = true;
        self
    }

    pub fn grant(&self, permission: &str) {
        self.state.lock().unwrap().granted.insert(permission.to_string());
    }

    pub fn revoke(&self, permission: &str) {
        self.state.lock().unwrap().granted.remove(permission);
    }

    pub fn set_rationale(&self, permission: &str) {
        self.state.lock().unwrap().rationale.insert(permission.to_string());
    }

    pub fn set_overlays(&self, allowed: bool) {
        self.state.lock().unwrap().overlays = allowed;
    }

    /// Every request screen launched so far.
    pub fn launched(&self) -> Vec<(SessionToken, Vec<String>)> {
        self.state.lock().unwrap().launched.clone()
    }

    pub fn last_token(&self) -> Option<SessionToken> {
        self.state.lock().unwrap().launched.last().map(|(t, _)| *t)
    }

    /// Every settings screen opened so far, with its request code.
    pub fn started_settings(&self) -> Vec<(SettingsIntent, i32)> {
        self.state.lock().unwrap().started.clone()
    }
}

impl PermissionPlatform for FakePlatform {
    fn sdk_int(&self) -> u32 {
        self.state.lock().unwrap().sdk
    }

    fn check_self_permission(&self, permission: &str) -> bool {
        self.state.lock().unwrap().granted.contains(permission)
    }

    fn should_show_rationale(&self, permission: &str) -> bool {
        self.state.lock().unwrap().rationale.contains(permission)
    }

    fn can_draw_overlays(&self) -> bool {
        self.state.lock().unwrap().overlays
    }

    fn package_name(&self) -> String {
        self.state.lock().unwrap().package.clone()
    }

    fn manufacturer(&self) -> String {
        self.state.lock().unwrap().manufacturer.clone()
    }

    fn resolves(&self, intent: &SettingsIntent) -> bool {
        let state = self.state.lock().unwrap();
        state.resolve_all || state.activities.contains(&intent_key(intent))
    }

    fn has_activity(&self, intent: &SettingsIntent) -> bool {
        self.state
            .lock()
            .unwrap()
            .activities
            .contains(&intent_key(intent))
    }

    fn start_settings(&self, intent: &SettingsIntent, request_code: i32) -> anyhow::Result<()> {
        self.state
            .lock()
            .unwrap()
            .started
            .push((intent.clone(), request_code));
        Ok(())
    }

    fn launch_request(&self, token: &SessionToken, permissions: &[String]) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            anyhow::bail!("request screen unavailable");
        }
        state.launched.push((*token, permissions.to_vec()));
        Ok(())
    }
}

/// [`DialogPresenter`] that answers from a script.
///
/// Each shown dialog takes the next scripted choice and answers
/// synchronously. With an empty script the callback is kept until the
/// test calls [`ScriptedDialogs::answer`].
#[derive(Default)]
pub struct ScriptedDialogs {
    script: Mutex<VecDeque<DialogChoice>>,
    shown: Mutex<Vec<ConfirmDialog>>,
    pending: Mutex<VecDeque<DialogCallback>>,
}

impl ScriptedDialogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(choices: impl IntoIterator<Item = DialogChoice>) -> Self {
        let dialogs = Self::default();
        dialogs.script.lock().unwrap().extend(choices);
        dialogs
    }

    pub fn shown(&self) -> Vec<ConfirmDialog> {
        self.shown.lock().unwrap().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Answer the oldest unanswered dialog. Returns `false` if none is open.
    pub fn answer(&self, choice: DialogChoice) -> bool {
        let callback = self.pending.lock().unwrap().pop_front();
        match callback {
            Some(callback) => {
                callback(choice);
                true
            }
            None => false,
        }
    }
}

impl DialogPresenter for ScriptedDialogs {
    fn show(&self, dialog: ConfirmDialog, on_choice: DialogCallback) {
        self.shown.lock().unwrap().push(dialog);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(choice) => on_choice(choice),
            None => self.pending.lock().unwrap().push_back(on_choice),
        }
    }
}
