//! Subscription lifecycle around the reconciler.
//!
//! While active the monitor holds a device snapshot, one device-list
//! listener, and one running-state listener per device other than the
//! anchor. Every relevant event re-runs the reconciler.

use super::device::{DeviceEvent, DeviceSummary};
use super::reconciler::{reconcile, ReconcileOutcome};
use super::system::{AudioSystem, OutputDevice, Subscription};
use crate::platform::{log_write_failure, Settings};
use tracing::{debug, info, warn};

/// Whether listeners are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Active,
    Stopped,
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorUpdate {
    /// The event arrived while stopped or for a stale listener
    Ignored,

    /// The reconciler ran against the existing snapshot
    Reconciled(ReconcileOutcome),

    /// The snapshot was replaced and the reconciler ran against it
    DevicesChanged(ReconcileOutcome),
}

/// Keeps the anchored device selected as devices come and go.
pub struct AnchorMonitor<S: AudioSystem> {
    system: S,
    settings: Settings,
    state: MonitorState,
    devices: Vec<S::Device>,
    device_list_subscription: Option<Subscription>,
    running_state_subscriptions: Vec<Subscription>,
}

impl<S: AudioSystem> AnchorMonitor<S> {
    /// Create a stopped monitor.
    pub fn new(system: S, settings: Settings) -> Self {
        Self {
            system,
            settings,
            state: MonitorState::Stopped,
            devices: Vec::new(),
            device_list_subscription: None,
            running_state_subscriptions: Vec::new(),
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == MonitorState::Active
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The audio system, for listeners the monitor does not manage.
    pub(crate) fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    /// Take a snapshot, reconcile once, and register listeners.
    ///
    /// Does nothing while anchoring is disabled. Calling it while active
    /// starts over from a clean slate.
    pub fn start(&mut self) {
        if self.settings.is_disabled() {
            info!("anchoring disabled, monitor stays stopped");
            return;
        }

        self.unsubscribe_all();
        self.refresh_snapshot();
        let outcome = self.reconcile_snapshot();

        match self.system.subscribe_device_list() {
            Ok(subscription) => self.device_list_subscription = Some(subscription),
            Err(e) => warn!(error = %e, "failed to listen for device list changes"),
        }
        self.subscribe_running_states();

        self.state = MonitorState::Active;
        info!(
            devices = self.devices.len(),
            listeners = self.running_state_subscriptions.len(),
            ?outcome,
            "monitor started"
        );
    }

    /// Remove every listener and forget the snapshot.
    pub fn stop(&mut self) {
        self.unsubscribe_all();
        self.devices.clear();
        if self.state == MonitorState::Active {
            info!("monitor stopped");
        }
        self.state = MonitorState::Stopped;
    }

    /// Handle one event from the audio system.
    pub fn handle_event(&mut self, event: DeviceEvent) -> MonitorUpdate {
        if self.state == MonitorState::Stopped {
            debug!(?event, "ignoring event while stopped");
            return MonitorUpdate::Ignored;
        }

        match event {
            DeviceEvent::DeviceListChanged => {
                self.refresh_snapshot();
                let outcome = self.reconcile_snapshot();
                self.rebuild_running_states();
                MonitorUpdate::DevicesChanged(outcome)
            }
            DeviceEvent::DeviceRunningStateChanged { device_name } => {
                let subscribed = self
                    .running_state_subscriptions
                    .iter()
                    .any(|s| s.device_name() == Some(device_name.as_str()));
                if !subscribed {
                    debug!(
                        device = %device_name,
                        "ignoring running state change from stale listener"
                    );
                    return MonitorUpdate::Ignored;
                }
                debug!(device = %device_name, "running state changed");
                MonitorUpdate::Reconciled(self.reconcile_snapshot())
            }
        }
    }

    /// Toggle the anchor on `name` and return the new anchor.
    ///
    /// Choosing the current anchor clears it. While active the new anchor is
    /// applied immediately and the listeners are rebuilt around it.
    pub fn select_anchor(&mut self, name: &str) -> Option<String> {
        let current = self.settings.anchored_device_name();
        let anchor = if current.as_deref() == Some(name) {
            None
        } else {
            Some(name.to_string())
        };

        log_write_failure(
            "anchored device",
            self.settings.set_anchored_device_name(anchor.as_deref()),
        );
        info!(anchor = ?anchor, "anchor selected");

        if self.state == MonitorState::Active {
            self.reconcile_snapshot();
            self.rebuild_running_states();
        }
        anchor
    }

    /// Devices to show in the menu.
    ///
    /// Uses the snapshot while active, otherwise asks the system once
    /// without registering anything.
    pub fn device_summaries(&self) -> Vec<DeviceSummary> {
        if self.state == MonitorState::Active {
            return self.devices.iter().map(|d| d.summary()).collect();
        }
        match self.system.output_devices() {
            Ok(devices) => devices.iter().map(|d| d.summary()).collect(),
            Err(e) => {
                warn!(error = %e, "failed to enumerate output devices");
                Vec::new()
            }
        }
    }

    /// Names of devices with a running-state listener.
    pub fn watched_devices(&self) -> Vec<&str> {
        self.running_state_subscriptions
            .iter()
            .filter_map(|s| s.device_name())
            .collect()
    }

    fn refresh_snapshot(&mut self) {
        self.devices = match self.system.output_devices() {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "failed to enumerate output devices");
                Vec::new()
            }
        };
        debug!(devices = self.devices.len(), "device snapshot refreshed");
    }

    fn reconcile_snapshot(&self) -> ReconcileOutcome {
        let anchor = self.settings.anchored_device_name();
        let outcome = reconcile(&self.devices, anchor.as_deref());
        debug!(?outcome, "reconciled");
        outcome
    }

    fn subscribe_running_states(&mut self) {
        let anchor = self.settings.anchored_device_name();
        for device in &self.devices {
            if anchor.as_deref() == Some(device.name()) {
                continue;
            }
            match self.system.subscribe_running_state(device) {
                Ok(subscription) => self.running_state_subscriptions.push(subscription),
                Err(e) => warn!(
                    device = device.name(),
                    error = %e,
                    "failed to listen for running state"
                ),
            }
        }
    }

    fn unsubscribe_running_states(&mut self) {
        for subscription in self.running_state_subscriptions.drain(..) {
            self.system.unsubscribe(subscription);
        }
    }

    fn rebuild_running_states(&mut self) {
        self.unsubscribe_running_states();
        self.subscribe_running_states();
        debug!(
            listeners = self.running_state_subscriptions.len(),
            "running state listeners rebuilt"
        );
    }

    fn unsubscribe_all(&mut self) {
        if let Some(subscription) = self.device_list_subscription.take() {
            self.system.unsubscribe(subscription);
        }
        self.unsubscribe_running_states();
    }
}

impl<S: AudioSystem> Drop for AnchorMonitor<S> {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
