//! Application state and lifecycle management.
//!
//! `AppState` is the single dispatcher: device events and menu actions are
//! both handed to it, one at a time, from the main loop.
//!
//! While anchoring is disabled the monitor holds no listeners. `AppState`
//! then keeps its own device-list listener that only re-renders the menu.

use crate::audio::{AnchorMonitor, AudioSystem, DeviceEvent, MonitorUpdate, Subscription};
use crate::platform::{log_write_failure, AppConfig, Settings};
use crate::ui::{build_menu, MenuAction, MenuPresenter, MenuState};
use tracing::{debug, info, warn};

/// Work the main loop has to do outside the app state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalRequest {
    OpenUrl(String),
}

/// Main application state.
pub struct AppState<S: AudioSystem> {
    config: AppConfig,

    /// Owns the audio system and the listeners registered on it
    monitor: AnchorMonitor<S>,

    /// Device-list listener kept while the monitor is stopped
    menu_listener: Option<Subscription>,

    /// Whether the application should exit
    should_exit: bool,
}

impl<S: AudioSystem> AppState<S> {
    pub fn new(config: AppConfig, system: S, settings: Settings) -> Self {
        Self {
            config,
            monitor: AnchorMonitor::new(system, settings),
            menu_listener: None,
            should_exit: false,
        }
    }

    pub fn monitor(&self) -> &AnchorMonitor<S> {
        &self.monitor
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Start anchoring (unless disabled) and show the first menu.
    pub fn launch(&mut self, presenter: &mut impl MenuPresenter) {
        info!(preferences = ?self.monitor.settings().load(), "launching");
        self.monitor.start();
        if !self.monitor.is_active() {
            self.watch_menu();
        }
        self.render(presenter);
    }

    /// Current contents of the menu.
    pub fn menu_state(&self) -> MenuState {
        let preferences = self.monitor.settings().load();
        MenuState {
            title: self.config.title(),
            devices: MenuState::device_names(&self.monitor.device_summaries()),
            anchored_device_name: preferences.anchored_device_name,
            is_disabled: preferences.is_disabled,
            launch_at_login: preferences.launch_at_login,
        }
    }

    pub fn render(&self, presenter: &mut impl MenuPresenter) {
        let state = self.menu_state();
        presenter.render(&build_menu(&state), &state.tooltip(), state.is_disabled);
    }

    /// Handle a device event from the audio system.
    pub fn handle_device_event(
        &mut self,
        event: DeviceEvent,
        presenter: &mut impl MenuPresenter,
    ) {
        let refresh_menu =
            self.menu_listener.is_some() && event == DeviceEvent::DeviceListChanged;
        match self.monitor.handle_event(event) {
            MonitorUpdate::DevicesChanged(outcome) => {
                debug!(?outcome, "device list changed");
                self.render(presenter);
            }
            MonitorUpdate::Ignored if refresh_menu => {
                debug!("device list changed while disabled");
                self.render(presenter);
            }
            MonitorUpdate::Reconciled(_) | MonitorUpdate::Ignored => {}
        }
    }

    /// Handle a menu action chosen by the user.
    pub fn handle_menu_action(
        &mut self,
        action: MenuAction,
        presenter: &mut impl MenuPresenter,
    ) -> Option<ExternalRequest> {
        debug!(?action, "menu action");
        match action {
            MenuAction::OpenHomepage => {
                return Some(ExternalRequest::OpenUrl(self.config.homepage.clone()));
            }
            MenuAction::SelectDevice(name) => {
                self.monitor.select_anchor(&name);
            }
            MenuAction::ToggleDisabled => {
                let settings = self.monitor.settings().clone();
                let disabled = !settings.is_disabled();
                match settings.set_disabled(disabled) {
                    Ok(()) if disabled => {
                        self.monitor.stop();
                        self.watch_menu();
                        info!("anchoring disabled");
                    }
                    Ok(()) => {
                        self.unwatch_menu();
                        self.monitor.start();
                        info!("anchoring enabled");
                    }
                    Err(e) => warn!(error = %e, disabled, "failed to save disabled flag"),
                }
            }
            MenuAction::ToggleLaunchAtLogin => {
                let settings = self.monitor.settings();
                let enabled = !settings.is_launch_at_login_enabled();
                log_write_failure(
                    "launch at login",
                    settings.set_launch_at_login_enabled(enabled),
                );
            }
            MenuAction::Quit => {
                self.shutdown();
                return None;
            }
        }
        self.render(presenter);
        None
    }

    /// Remove every listener and mark the app for exit.
    pub fn shutdown(&mut self) {
        self.unwatch_menu();
        self.monitor.stop();
        self.should_exit = true;
    }

    fn watch_menu(&mut self) {
        if self.menu_listener.is_some() {
            return;
        }
        match self.monitor.system_mut().subscribe_device_list() {
            Ok(subscription) => self.menu_listener = Some(subscription),
            Err(e) => warn!(error = %e, "failed to listen for device list changes"),
        }
    }

    fn unwatch_menu(&mut self) {
        if let Some(subscription) = self.menu_listener.take() {
            self.monitor.system_mut().unsubscribe(subscription);
        }
    }
}

impl<S: AudioSystem> Drop for AppState<S> {
    fn drop(&mut self) {
        self.unwatch_menu();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MemoryAudioSystem, MonitorState};
    use crate::platform::{
        MemoryLoginItem, MemoryPreferences, PreferenceStorage, PreferencesError,
    };
    use crate::ui::MenuEntry;
    use std::rc::Rc;
    use std::sync::mpsc::{channel, Receiver};

    #[derive(Default)]
    struct RecordingPresenter {
        renders: Vec<(Vec<MenuEntry>, String, bool)>,
    }

    impl MenuPresenter for RecordingPresenter {
        fn render(&mut self, entries: &[MenuEntry], tooltip: &str, dimmed: bool) {
            self.renders
                .push((entries.to_vec(), tooltip.to_string(), dimmed));
        }
    }

    impl RecordingPresenter {
        fn last_tooltip(&self) -> &str {
            self.renders.last().map(|r| r.1.as_str()).unwrap_or("")
        }

        fn last_devices(&self) -> Vec<String> {
            let Some((entries, _, _)) = self.renders.last() else {
                return Vec::new();
            };
            entries
                .iter()
                .filter_map(|e| match e {
                    MenuEntry::Item {
                        action: MenuAction::SelectDevice(name),
                        ..
                    } => Some(name.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    /// Storage whose boolean writes always fail.
    #[derive(Default)]
    struct ReadOnlyFlags {
        inner: MemoryPreferences,
    }

    impl PreferenceStorage for ReadOnlyFlags {
        fn string(&self, key: &str) -> Option<String> {
            self.inner.string(key)
        }

        fn set_string(&self, key: &str, value: Option<&str>) -> Result<(), PreferencesError> {
            self.inner.set_string(key, value)
        }

        fn bool(&self, key: &str) -> bool {
            self.inner.bool(key)
        }

        fn set_bool(&self, _key: &str, _value: bool) -> Result<(), PreferencesError> {
            Err(PreferencesError::SyncFailed {
                domain: "test".to_string(),
            })
        }
    }

    struct Fixture {
        system: MemoryAudioSystem,
        settings: Settings,
        events: Receiver<DeviceEvent>,
        app: AppState<MemoryAudioSystem>,
        presenter: RecordingPresenter,
    }

    fn fixture(devices: &[&str], anchor: Option<&str>) -> Fixture {
        fixture_with_storage(devices, anchor, Rc::new(MemoryPreferences::new()))
    }

    fn fixture_with_storage(
        devices: &[&str],
        anchor: Option<&str>,
        storage: Rc<dyn PreferenceStorage>,
    ) -> Fixture {
        let (sender, events) = channel();
        let system = MemoryAudioSystem::new(sender);
        for name in devices {
            system.plug(name);
        }
        let settings = Settings::new(storage, Rc::new(MemoryLoginItem::new()));
        settings.set_anchored_device_name(anchor).unwrap();
        let app = AppState::new(AppConfig::default(), system.clone(), settings.clone());
        Fixture {
            system,
            settings,
            events,
            app,
            presenter: RecordingPresenter::default(),
        }
    }

    impl Fixture {
        fn pump(&mut self) {
            while let Ok(event) = self.events.try_recv() {
                self.app.handle_device_event(event, &mut self.presenter);
            }
        }
    }

    #[test]
    fn test_launch_anchors_and_renders() {
        let mut f = fixture(&["Speakers", "Headphones"], Some("Headphones"));
        f.app.launch(&mut f.presenter);

        assert_eq!(f.app.monitor().state(), MonitorState::Active);
        assert!(f.system.summary("Headphones").unwrap().is_default_output);
        assert_eq!(f.presenter.renders.len(), 1);
        assert_eq!(f.presenter.last_tooltip(), "Anchored to Headphones");
    }

    #[test]
    fn test_device_list_change_rerenders_menu() {
        let mut f = fixture(&["Speakers"], Some("Headphones"));
        f.app.launch(&mut f.presenter);
        assert_eq!(f.presenter.last_tooltip(), "Waiting for Headphones");

        f.system.plug("Headphones");
        f.pump();

        assert_eq!(f.presenter.renders.len(), 2);
        assert_eq!(f.presenter.last_tooltip(), "Anchored to Headphones");
        assert!(f.system.summary("Headphones").unwrap().is_default_output);
    }

    #[test]
    fn test_running_state_change_does_not_rerender() {
        let mut f = fixture(&["Speakers", "Headphones"], Some("Headphones"));
        f.app.launch(&mut f.presenter);

        f.system.select_default_output("Speakers");
        f.system.set_running("Speakers", true);
        f.pump();

        assert_eq!(f.presenter.renders.len(), 1);
        assert!(f.system.summary("Headphones").unwrap().is_default_output);
    }

    #[test]
    fn test_selecting_device_stores_anchor_and_applies_it() {
        let mut f = fixture(&["Speakers", "Headphones"], None);
        f.app.launch(&mut f.presenter);

        f.app.handle_menu_action(
            MenuAction::SelectDevice("Speakers".to_string()),
            &mut f.presenter,
        );

        assert_eq!(f.settings.anchored_device_name().as_deref(), Some("Speakers"));
        assert!(f.system.summary("Speakers").unwrap().is_default_output);
        assert_eq!(f.system.running_state_subscriptions(), vec!["Headphones"]);
        assert_eq!(f.presenter.last_tooltip(), "Anchored to Speakers");
    }

    #[test]
    fn test_disable_stops_and_enable_restarts() {
        let mut f = fixture(&["Speakers", "Headphones"], Some("Headphones"));
        f.app.launch(&mut f.presenter);

        f.app.handle_menu_action(MenuAction::ToggleDisabled, &mut f.presenter);
        assert!(f.settings.is_disabled());
        assert_eq!(f.app.monitor().state(), MonitorState::Stopped);
        // Only the menu's device-list listener remains.
        assert_eq!(f.system.subscription_count(), 1);
        assert!(f.system.running_state_subscriptions().is_empty());
        let (entries, tooltip, dimmed) = f.presenter.renders.last().unwrap().clone();
        assert_eq!(tooltip, "Anchoring disabled");
        assert!(dimmed);
        // Devices stay selectable while disabled.
        assert!(entries.contains(&MenuEntry::Item {
            label: "Speakers".to_string(),
            action: MenuAction::SelectDevice("Speakers".to_string()),
            checked: Some(false),
        }));

        f.system.select_default_output("Speakers");
        f.system.set_running("Speakers", true);
        f.pump();
        assert!(f.system.summary("Speakers").unwrap().is_default_output);

        f.app.handle_menu_action(MenuAction::ToggleDisabled, &mut f.presenter);
        assert!(!f.settings.is_disabled());
        assert_eq!(f.app.monitor().state(), MonitorState::Active);
        assert!(f.system.summary("Headphones").unwrap().is_default_output);
        assert_eq!(f.system.subscription_count(), 2);
    }

    #[test]
    fn test_plugged_device_appears_in_menu_while_disabled() {
        let mut f = fixture(&["Speakers"], Some("USB-DAC"));
        f.settings.set_disabled(true).unwrap();
        f.app.launch(&mut f.presenter);
        assert_eq!(f.presenter.last_devices(), vec!["Speakers"]);

        f.system.plug("USB-DAC");
        f.pump();

        assert_eq!(f.presenter.last_devices(), vec!["Speakers", "USB-DAC"]);
        assert_eq!(f.presenter.last_tooltip(), "Anchoring disabled");
        // Listing the device must not anchor it.
        assert_eq!(f.system.default_requests(), 0);
        assert!(f.system.running_state_subscriptions().is_empty());
    }

    #[test]
    fn test_failed_disable_write_keeps_anchoring() {
        let mut f = fixture_with_storage(
            &["Speakers", "Headphones"],
            Some("Headphones"),
            Rc::new(ReadOnlyFlags::default()),
        );
        f.app.launch(&mut f.presenter);

        f.app.handle_menu_action(MenuAction::ToggleDisabled, &mut f.presenter);

        assert!(!f.settings.is_disabled());
        assert_eq!(f.app.monitor().state(), MonitorState::Active);
        assert_eq!(f.system.running_state_subscriptions(), vec!["Speakers"]);
        assert_eq!(f.presenter.last_tooltip(), "Anchored to Headphones");
    }

    #[test]
    fn test_launch_while_disabled_stays_stopped() {
        let mut f = fixture(&["Speakers", "Headphones"], Some("Headphones"));
        f.settings.set_disabled(true).unwrap();

        f.app.launch(&mut f.presenter);

        assert_eq!(f.app.monitor().state(), MonitorState::Stopped);
        assert_eq!(f.system.default_requests(), 0);
        assert!(f.presenter.renders[0].2);
    }

    #[test]
    fn test_toggle_launch_at_login() {
        let mut f = fixture(&["Speakers"], None);
        f.app.launch(&mut f.presenter);

        f.app
            .handle_menu_action(MenuAction::ToggleLaunchAtLogin, &mut f.presenter);
        assert!(f.settings.is_launch_at_login_enabled());

        f.app
            .handle_menu_action(MenuAction::ToggleLaunchAtLogin, &mut f.presenter);
        assert!(!f.settings.is_launch_at_login_enabled());
    }

    #[test]
    fn test_open_homepage_is_handed_back() {
        let mut f = fixture(&["Speakers"], None);
        let request = f
            .app
            .handle_menu_action(MenuAction::OpenHomepage, &mut f.presenter);

        assert_eq!(
            request,
            Some(ExternalRequest::OpenUrl(AppConfig::default().homepage))
        );
    }

    #[test]
    fn test_quit_removes_listeners() {
        let mut f = fixture(&["Speakers", "Headphones"], None);
        f.app.launch(&mut f.presenter);

        f.app.handle_menu_action(MenuAction::Quit, &mut f.presenter);

        assert!(f.app.should_exit());
        assert_eq!(f.system.subscription_count(), 0);
    }
}
