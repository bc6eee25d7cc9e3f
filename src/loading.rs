// Loading state for buttons that trigger slow work

use parking_lot::Mutex;
use std::sync::Arc;

pub const LOADING_LABEL: &str = "Loading...";

// State of a rendered button the controllers own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub label: String,
    pub enabled: bool,
    pub loading: bool,
}

impl ButtonState {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            loading: false,
        }
    }
}

// Shared handle to a button; cloning yields another handle to the same button.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    state: Arc<Mutex<ButtonState>>,
}

impl ControlHandle {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ButtonState::new(label))),
        }
    }

    pub fn snapshot(&self) -> ButtonState {
        self.state.lock().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }
}

// Puts the control into its loading state and hands back the guard that
// undoes it. A control that is already disabled cannot be clicked, so this
// returns `None` for it and leaves it untouched.
pub fn toggle_loading(control: &ControlHandle) -> Option<LoadingGuard> {
    let mut state = control.state.lock();
    if !state.enabled {
        return None;
    }

    let original_label = std::mem::replace(&mut state.label, LOADING_LABEL.to_string());
    state.enabled = false;
    state.loading = true;

    Some(LoadingGuard {
        control: control.clone(),
        original_label: Some(original_label),
    })
}

// Restores the original label and re-enables the control exactly once,
// either through `restore` or when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard restores the control immediately"]
pub struct LoadingGuard {
    control: ControlHandle,
    original_label: Option<String>,
}

impl LoadingGuard {
    pub fn restore(mut self) {
        self.restore_once();
    }

    fn restore_once(&mut self) {
        if let Some(label) = self.original_label.take() {
            let mut state = self.control.state.lock();
            state.label = label;
            state.enabled = true;
            state.loading = false;
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.restore_once();
    }
}
