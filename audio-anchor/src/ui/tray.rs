//! Menu bar status item.
//!
//! Renders `MenuEntry` rows with `tray-icon` and maps clicked item ids back
//! to `MenuAction`s.

use super::icons::{generate_anchor_icon, ICON_SIZE};
use super::menu::{MenuAction, MenuEntry, MenuPresenter};
use std::collections::HashMap;
use thiserror::Error;
use tray_icon::menu::{CheckMenuItem, Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{Icon, TrayIcon, TrayIconBuilder};

/// Tray service error types.
#[derive(Debug, Error)]
pub enum TrayError {
    #[error("Failed to create tray icon: {0}")]
    CreateFailed(String),

    #[error("Failed to load icon resource")]
    IconLoadFailed,

    #[error("Tray icon not initialized")]
    NotInitialized,

    #[error("Failed to create menu: {0}")]
    MenuFailed(String),
}

/// Status item manager.
pub struct TrayManager {
    tray_icon: Option<TrayIcon>,
    actions: HashMap<MenuId, MenuAction>,
    dimmed: bool,
}

impl TrayManager {
    pub fn new() -> Self {
        Self {
            tray_icon: None,
            actions: HashMap::new(),
            dimmed: false,
        }
    }

    /// Create and show the status item with an empty menu.
    pub fn create(&mut self) -> Result<(), TrayError> {
        let tray_icon = TrayIconBuilder::new()
            .with_icon(Self::create_icon(false)?)
            .with_icon_as_template(true)
            .with_menu(Box::new(Menu::new()))
            .build()
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;

        self.tray_icon = Some(tray_icon);
        Ok(())
    }

    /// Next menu action chosen by the user, if any.
    pub fn next_action(&self) -> Option<MenuAction> {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            if let Some(action) = self.actions.get(&event.id) {
                return Some(action.clone());
            }
        }
        None
    }

    /// Replace the menu, tooltip and icon.
    pub fn update(
        &mut self,
        entries: &[MenuEntry],
        tooltip: &str,
        dimmed: bool,
    ) -> Result<(), TrayError> {
        let (menu, actions) = Self::build_menu(entries)?;

        let icon = if dimmed != self.dimmed {
            Some(Self::create_icon(dimmed)?)
        } else {
            None
        };

        let tray = self.tray_icon.as_mut().ok_or(TrayError::NotInitialized)?;
        tray.set_menu(Some(Box::new(menu)));
        tray.set_tooltip(Some(tooltip))
            .map_err(|e| TrayError::CreateFailed(e.to_string()))?;
        if let Some(icon) = icon {
            tray.set_icon(Some(icon))
                .map_err(|e| TrayError::CreateFailed(e.to_string()))?;
            tray.set_icon_as_template(true);
            self.dimmed = dimmed;
        }

        self.actions = actions;
        Ok(())
    }

    /// Destroy the status item.
    pub fn destroy(&mut self) {
        self.tray_icon = None;
        self.actions.clear();
    }

    fn build_menu(
        entries: &[MenuEntry],
    ) -> Result<(Menu, HashMap<MenuId, MenuAction>), TrayError> {
        let menu = Menu::new();
        let mut actions = HashMap::new();

        for entry in entries {
            let result = match entry {
                MenuEntry::Item {
                    label,
                    action,
                    checked: Some(checked),
                } => {
                    let item = CheckMenuItem::new(label, true, *checked, None);
                    actions.insert(item.id().clone(), action.clone());
                    menu.append(&item)
                }
                MenuEntry::Item {
                    label,
                    action,
                    checked: None,
                } => {
                    let item = MenuItem::new(label, true, None);
                    actions.insert(item.id().clone(), action.clone());
                    menu.append(&item)
                }
                MenuEntry::Placeholder { label } => menu.append(&MenuItem::new(label, false, None)),
                MenuEntry::Separator => menu.append(&PredefinedMenuItem::separator()),
            };
            result.map_err(|e| TrayError::MenuFailed(e.to_string()))?;
        }

        Ok((menu, actions))
    }

    fn create_icon(dimmed: bool) -> Result<Icon, TrayError> {
        Icon::from_rgba(generate_anchor_icon(dimmed), ICON_SIZE, ICON_SIZE)
            .map_err(|_| TrayError::IconLoadFailed)
    }
}

impl MenuPresenter for TrayManager {
    fn render(&mut self, entries: &[MenuEntry], tooltip: &str, dimmed: bool) {
        if let Err(e) = self.update(entries, tooltip, dimmed) {
            tracing::warn!(error = %e, "failed to update status item");
        }
    }
}

impl Default for TrayManager {
    fn default() -> Self {
        Self::new()
    }
}
