//! Seams between the anchoring logic and an audio backend.
//!
//! A backend hands out live device handles and registers listeners that
//! report into the `DeviceEvent` channel it was created with.

use super::device::{AudioError, DeviceSummary};

/// A live handle to an output device owned by the audio system.
///
/// Setting a flag immediately asks the system to change its default device.
pub trait OutputDevice {
    fn name(&self) -> &str;

    fn is_default_output(&self) -> bool;

    fn is_default_system_output(&self) -> bool;

    fn is_running_somewhere(&self) -> bool;

    fn set_default_output(&self, value: bool) -> Result<(), AudioError>;

    fn set_default_system_output(&self, value: bool) -> Result<(), AudioError>;

    /// Read every flag into a detached summary.
    fn summary(&self) -> DeviceSummary {
        DeviceSummary {
            name: self.name().to_string(),
            is_default_output: self.is_default_output(),
            is_default_system_output: self.is_default_system_output(),
            is_running_somewhere: self.is_running_somewhere(),
        }
    }
}

/// Backend providing device snapshots and change notifications.
pub trait AudioSystem {
    type Device: OutputDevice;

    /// Enumerate the current output devices, in system order. Never cached.
    fn output_devices(&self) -> Result<Vec<Self::Device>, AudioError>;

    /// Listen for devices being added, removed or reconfigured.
    fn subscribe_device_list(&mut self) -> Result<Subscription, AudioError>;

    /// Listen for `device` starting or stopping IO.
    fn subscribe_running_state(&mut self, device: &Self::Device)
        -> Result<Subscription, AudioError>;

    /// Remove a listener. Unknown handles are ignored.
    fn unsubscribe(&mut self, subscription: Subscription);
}

/// Identifier of a registered listener, unique per backend instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// What a listener is registered on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    DeviceList,
    RunningState { device_name: String },
}

/// Handle for a registered listener.
///
/// Deliberately not `Clone`: the holder is the only party that can remove it.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: SubscriptionId,
    scope: SubscriptionScope,
}

impl Subscription {
    pub fn new(id: SubscriptionId, scope: SubscriptionScope) -> Self {
        Self { id, scope }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Device name for running-state subscriptions.
    pub fn device_name(&self) -> Option<&str> {
        match &self.scope {
            SubscriptionScope::RunningState { device_name } => Some(device_name),
            SubscriptionScope::DeviceList => None,
        }
    }
}
