//! UI module for the menu bar status item.

pub mod icons;
pub mod menu;
#[cfg(target_os = "macos")]
pub mod tray;

pub use menu::{build_menu, MenuAction, MenuEntry, MenuPresenter, MenuState};
#[cfg(target_os = "macos")]
pub use tray::{TrayError, TrayManager};
