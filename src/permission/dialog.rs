// src/permission/dialog.rs

//! Confirmation dialogs.

/// Button the user pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Positive,
    Negative,
}

/// A non-cancelable two-button dialog: it can only be dismissed through one
/// of its buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub message: String,
    pub positive: String,
    pub negative: String,
}

pub type DialogCallback = Box<dyn FnOnce(DialogChoice) + Send + 'static>;

/// Shows dialogs on behalf of the permission flow.
///
/// `show` is called on the main executor. `on_choice` must be invoked at
/// most once, from any thread, after the dialog has been dismissed.
pub trait DialogPresenter: Send + Sync {
    fn show(&self, dialog: ConfirmDialog, on_choice: DialogCallback);
}
