//! Platform module for preferences, login items and the macOS run loop.

pub mod config;
#[cfg(target_os = "macos")]
pub mod defaults;
pub mod login_item;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod preferences;

pub use config::AppConfig;
#[cfg(target_os = "macos")]
pub use defaults::UserDefaults;
pub use login_item::{LaunchAgent, LoginItem, MemoryLoginItem};
pub(crate) use preferences::log_write_failure;
pub use preferences::{
    MemoryPreferences, PreferenceStorage, PreferencesError, Settings, UserPreferences,
};
