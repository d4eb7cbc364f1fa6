//! In-memory audio system.
//!
//! Behaves like the real system from the anchoring logic's point of view:
//! handles read live state, making a device default clears the previous
//! default, and events are only delivered to registered listeners.

use super::device::{AudioError, DeviceEvent, DeviceSummary};
use super::system::{AudioSystem, OutputDevice, Subscription, SubscriptionId, SubscriptionScope};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::mpsc::Sender;

#[derive(Debug, Default)]
struct MemoryState {
    devices: Vec<DeviceSummary>,
    subscriptions: BTreeMap<SubscriptionId, SubscriptionScope>,
    next_id: u64,
    default_requests: usize,
}

impl MemoryState {
    fn device(&self, name: &str) -> Option<&DeviceSummary> {
        self.devices.iter().find(|d| d.name == name)
    }

    fn device_mut(&mut self, name: &str) -> Option<&mut DeviceSummary> {
        self.devices.iter_mut().find(|d| d.name == name)
    }

    fn has_subscription(&self, scope: &SubscriptionScope) -> bool {
        self.subscriptions.values().any(|s| s == scope)
    }
}

/// Audio system whose devices live in memory.
///
/// Clones share the same state, so a test can keep a handle while the
/// monitor owns another.
#[derive(Debug, Clone)]
pub struct MemoryAudioSystem {
    state: Rc<RefCell<MemoryState>>,
    sender: Sender<DeviceEvent>,
}

impl MemoryAudioSystem {
    pub fn new(sender: Sender<DeviceEvent>) -> Self {
        Self {
            state: Rc::new(RefCell::new(MemoryState::default())),
            sender,
        }
    }

    /// Connect a device. Notifies device-list listeners.
    pub fn plug(&self, name: &str) {
        self.state.borrow_mut().devices.push(DeviceSummary {
            name: name.to_string(),
            is_default_output: false,
            is_default_system_output: false,
            is_running_somewhere: false,
        });
        self.notify(SubscriptionScope::DeviceList, DeviceEvent::DeviceListChanged);
    }

    /// Disconnect a device. Notifies device-list listeners.
    pub fn unplug(&self, name: &str) {
        self.state.borrow_mut().devices.retain(|d| d.name != name);
        self.notify(SubscriptionScope::DeviceList, DeviceEvent::DeviceListChanged);
    }

    /// Change whether a device is in use. Notifies that device's listeners.
    pub fn set_running(&self, name: &str, running: bool) {
        if let Some(device) = self.state.borrow_mut().device_mut(name) {
            device.is_running_somewhere = running;
        }
        self.notify(
            SubscriptionScope::RunningState {
                device_name: name.to_string(),
            },
            DeviceEvent::DeviceRunningStateChanged {
                device_name: name.to_string(),
            },
        );
    }

    /// Switch the default output the way the OS does on hot-plug.
    pub fn select_default_output(&self, name: &str) {
        let mut state = self.state.borrow_mut();
        for device in &mut state.devices {
            device.is_default_output = device.name == name;
        }
    }

    pub fn summary(&self, name: &str) -> Option<DeviceSummary> {
        self.state.borrow().device(name).cloned()
    }

    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.state.borrow().devices.clone()
    }

    /// Number of default-role requests made through device handles.
    pub fn default_requests(&self) -> usize {
        self.state.borrow().default_requests
    }

    pub fn has_device_list_subscription(&self) -> bool {
        self.state
            .borrow()
            .has_subscription(&SubscriptionScope::DeviceList)
    }

    /// Names with a live running-state listener, sorted.
    pub fn running_state_subscriptions(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .borrow()
            .subscriptions
            .values()
            .filter_map(|scope| match scope {
                SubscriptionScope::RunningState { device_name } => Some(device_name.clone()),
                SubscriptionScope::DeviceList => None,
            })
            .collect();
        names.sort();
        names
    }

    pub fn subscription_count(&self) -> usize {
        self.state.borrow().subscriptions.len()
    }

    fn notify(&self, scope: SubscriptionScope, event: DeviceEvent) {
        if self.state.borrow().has_subscription(&scope) {
            let _ = self.sender.send(event);
        }
    }

    fn register(&mut self, scope: SubscriptionScope) -> Subscription {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.subscriptions.insert(id, scope.clone());
        Subscription::new(id, scope)
    }
}

impl AudioSystem for MemoryAudioSystem {
    type Device = MemoryDevice;

    fn output_devices(&self) -> Result<Vec<MemoryDevice>, AudioError> {
        Ok(self
            .state
            .borrow()
            .devices
            .iter()
            .map(|d| MemoryDevice {
                name: d.name.clone(),
                state: Rc::clone(&self.state),
            })
            .collect())
    }

    fn subscribe_device_list(&mut self) -> Result<Subscription, AudioError> {
        Ok(self.register(SubscriptionScope::DeviceList))
    }

    fn subscribe_running_state(
        &mut self,
        device: &MemoryDevice,
    ) -> Result<Subscription, AudioError> {
        Ok(self.register(SubscriptionScope::RunningState {
            device_name: device.name.clone(),
        }))
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        self.state
            .borrow_mut()
            .subscriptions
            .remove(&subscription.id());
    }
}

/// Handle to a device in a `MemoryAudioSystem`.
#[derive(Debug, Clone)]
pub struct MemoryDevice {
    name: String,
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryDevice {
    fn flag(&self, read: impl Fn(&DeviceSummary) -> bool) -> bool {
        self.state.borrow().device(&self.name).map(read).unwrap_or(false)
    }

    fn set_role(
        &self,
        value: bool,
        role: impl Fn(&mut DeviceSummary) -> &mut bool,
    ) -> Result<(), AudioError> {
        let mut state = self.state.borrow_mut();
        if value {
            state.default_requests += 1;
        }
        if state.device(&self.name).is_none() {
            return Err(AudioError::DeviceNotFound {
                name: self.name.clone(),
            });
        }
        for device in &mut state.devices {
            if device.name == self.name {
                *role(device) = value;
            } else if value {
                *role(device) = false;
            }
        }
        Ok(())
    }
}

impl OutputDevice for MemoryDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_default_output(&self) -> bool {
        self.flag(|d| d.is_default_output)
    }

    fn is_default_system_output(&self) -> bool {
        self.flag(|d| d.is_default_system_output)
    }

    fn is_running_somewhere(&self) -> bool {
        self.flag(|d| d.is_running_somewhere)
    }

    fn set_default_output(&self, value: bool) -> Result<(), AudioError> {
        self.set_role(value, |d| &mut d.is_default_output)
    }

    fn set_default_system_output(&self, value: bool) -> Result<(), AudioError> {
        self.set_role(value, |d| &mut d.is_default_system_output)
    }
}
