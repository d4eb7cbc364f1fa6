//! Status bar menu model.
//!
//! The menu is rebuilt from `MenuState` after anything it shows changes;
//! the tray only turns entries into native items and reports which
//! `MenuAction` was chosen.

use crate::audio::DeviceSummary;

/// Everything the menu shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuState {
    /// First entry, "<name> <version>"
    pub title: String,

    /// Output device names in system order
    pub devices: Vec<String>,

    pub anchored_device_name: Option<String>,

    pub is_disabled: bool,

    pub launch_at_login: bool,
}

impl MenuState {
    pub fn device_names(devices: &[DeviceSummary]) -> Vec<String> {
        devices.iter().map(|d| d.name.clone()).collect()
    }

    /// Tooltip for the status item.
    pub fn tooltip(&self) -> String {
        if self.is_disabled {
            return "Anchoring disabled".to_string();
        }
        match &self.anchored_device_name {
            Some(name) if self.devices.contains(name) => format!("Anchored to {}", name),
            Some(name) => format!("Waiting for {}", name),
            None => "No anchor".to_string(),
        }
    }
}

/// What the user chose in the menu.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MenuAction {
    OpenHomepage,
    SelectDevice(String),
    ToggleDisabled,
    ToggleLaunchAtLogin,
    Quit,
}

/// One row of the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        label: String,
        action: MenuAction,
        /// `Some` for checkable rows
        checked: Option<bool>,
    },

    /// Greyed out, informational
    Placeholder { label: String },

    Separator,
}

impl MenuEntry {
    fn item(label: &str, action: MenuAction) -> Self {
        MenuEntry::Item {
            label: label.to_string(),
            action,
            checked: None,
        }
    }

    fn check(label: &str, action: MenuAction, checked: bool) -> Self {
        MenuEntry::Item {
            label: label.to_string(),
            action,
            checked: Some(checked),
        }
    }
}

/// Something that can show the menu.
pub trait MenuPresenter {
    fn render(&mut self, entries: &[MenuEntry], tooltip: &str, dimmed: bool);
}

pub const NO_DEVICES_LABEL: &str = "No Output Devices";
pub const DISABLE_LABEL: &str = "Disable Anchoring";
pub const LAUNCH_AT_LOGIN_LABEL: &str = "Launch at Login";
pub const QUIT_LABEL: &str = "Quit";

/// Build the menu rows for `state`.
pub fn build_menu(state: &MenuState) -> Vec<MenuEntry> {
    let mut entries = vec![
        MenuEntry::item(&state.title, MenuAction::OpenHomepage),
        MenuEntry::Separator,
    ];

    if state.devices.is_empty() {
        entries.push(MenuEntry::Placeholder {
            label: NO_DEVICES_LABEL.to_string(),
        });
    }
    for name in &state.devices {
        let anchored = state.anchored_device_name.as_deref() == Some(name.as_str());
        entries.push(MenuEntry::check(
            name,
            MenuAction::SelectDevice(name.clone()),
            anchored,
        ));
    }

    entries.push(MenuEntry::Separator);
    entries.push(MenuEntry::check(
        DISABLE_LABEL,
        MenuAction::ToggleDisabled,
        state.is_disabled,
    ));
    entries.push(MenuEntry::check(
        LAUNCH_AT_LOGIN_LABEL,
        MenuAction::ToggleLaunchAtLogin,
        state.launch_at_login,
    ));
    entries.push(MenuEntry::item(QUIT_LABEL, MenuAction::Quit));
    entries
}
