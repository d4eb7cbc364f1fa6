//! AudioAnchor - Library
//!
//! A menu bar utility that keeps a chosen output device as the macOS default.
//!
//! ## Features
//!
//! - Anchor the default output and system output to a device by name
//! - Re-apply the anchor when devices are plugged in or start playing
//! - Temporarily disable anchoring without forgetting the device
//! - Launch at login option

pub mod app;
pub mod audio;
pub mod platform;
pub mod ui;

pub use app::{AppState, ExternalRequest};
pub use audio::{AnchorMonitor, AudioError, AudioSystem, DeviceEvent, OutputDevice};
pub use platform::{AppConfig, PreferencesError, Settings, UserPreferences};
pub use ui::{MenuAction, MenuEntry, MenuPresenter};
