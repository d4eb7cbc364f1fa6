//! User preferences.
//!
//! `Settings` is the one object the rest of the app reads and writes
//! preferences through. It is cheap to clone and is handed to the monitor
//! at construction time.

use super::login_item::LoginItem;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::warn;

/// Preference key for the anchored device name.
pub const ANCHORED_DEVICE_NAME_KEY: &str = "anchoredDeviceName";

/// Preference key for the global kill switch.
pub const IS_DISABLED_KEY: &str = "isDisabled";

/// Preferences service error types.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("Failed to synchronize preferences for {domain}")]
    SyncFailed { domain: String },

    #[error("Home directory not available")]
    NoHomeDirectory,

    #[error("Failed to update login item at {path}: {source}")]
    LoginItem {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Key-value storage backing `Settings`.
///
/// Absent keys read as `None` / `false`.
pub trait PreferenceStorage {
    fn string(&self, key: &str) -> Option<String>;

    /// Store `value`, or remove the key when `None`.
    fn set_string(&self, key: &str, value: Option<&str>) -> Result<(), PreferencesError>;

    fn bool(&self, key: &str) -> bool;

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferencesError>;
}

/// Current values of every preference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPreferences {
    /// Device to keep as the default output
    pub anchored_device_name: Option<String>,

    /// Anchoring switched off entirely
    pub is_disabled: bool,

    /// Registered to start when the user logs in
    pub launch_at_login: bool,
}

/// Typed access to the app's preferences.
#[derive(Clone)]
pub struct Settings {
    storage: Rc<dyn PreferenceStorage>,
    login_item: Rc<dyn LoginItem>,
}

impl Settings {
    pub fn new(storage: Rc<dyn PreferenceStorage>, login_item: Rc<dyn LoginItem>) -> Self {
        Self {
            storage,
            login_item,
        }
    }

    /// Load preferences from storage.
    pub fn load(&self) -> UserPreferences {
        UserPreferences {
            anchored_device_name: self.anchored_device_name(),
            is_disabled: self.is_disabled(),
            launch_at_login: self.is_launch_at_login_enabled(),
        }
    }

    /// The device to keep as default. Not validated against current devices.
    pub fn anchored_device_name(&self) -> Option<String> {
        self.storage
            .string(ANCHORED_DEVICE_NAME_KEY)
            .filter(|name| !name.is_empty())
    }

    pub fn set_anchored_device_name(&self, name: Option<&str>) -> Result<(), PreferencesError> {
        self.storage.set_string(ANCHORED_DEVICE_NAME_KEY, name)
    }

    pub fn is_disabled(&self) -> bool {
        self.storage.bool(IS_DISABLED_KEY)
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<(), PreferencesError> {
        self.storage.set_bool(IS_DISABLED_KEY, disabled)
    }

    /// Delegates to the login item; nothing is stored.
    pub fn is_launch_at_login_enabled(&self) -> bool {
        self.login_item.is_enabled()
    }

    pub fn set_launch_at_login_enabled(&self, enabled: bool) -> Result<(), PreferencesError> {
        self.login_item.set_enabled(enabled)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("preferences", &self.load())
            .finish()
    }
}

/// Process-local storage, forgotten on exit.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    strings: RefCell<HashMap<String, String>>,
    bools: RefCell<HashMap<String, bool>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStorage for MemoryPreferences {
    fn string(&self, key: &str) -> Option<String> {
        self.strings.borrow().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: Option<&str>) -> Result<(), PreferencesError> {
        let mut strings = self.strings.borrow_mut();
        match value {
            Some(value) => {
                strings.insert(key.to_string(), value.to_string());
            }
            None => {
                strings.remove(key);
            }
        }
        Ok(())
    }

    fn bool(&self, key: &str) -> bool {
        self.bools.borrow().get(key).copied().unwrap_or(false)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferencesError> {
        self.bools.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

/// Log a failed preference write; callers carry on with the old value.
pub(crate) fn log_write_failure(what: &str, result: Result<(), PreferencesError>) {
    if let Err(e) = result {
        warn!(error = %e, "failed to save {}", what);
    }
}
