//! Output device data models.
//!
//! Defines the events delivered by the audio system, the error type shared
//! by every backend, and the snapshot view of a device used by the menu.

use thiserror::Error;

/// Events from the audio system, delivered serially to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Devices were added, removed or reconfigured
    DeviceListChanged,

    /// A device started or stopped being used by some process
    DeviceRunningStateChanged { device_name: String },
}

/// Point-in-time view of an output device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    /// Human-readable device name (the join key with the stored anchor)
    pub name: String,

    /// Whether this is the default output device
    pub is_default_output: bool,

    /// Whether this is the default device for alerts and sound effects
    pub is_default_system_output: bool,

    /// Whether any process is currently doing IO on the device
    pub is_running_somewhere: bool,
}

/// Audio service error types.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    #[error("Failed to enumerate devices: OSStatus {0}")]
    EnumerationFailed(i32),

    #[error("Failed to read property {property} of device {device}: OSStatus {status}")]
    PropertyReadFailed {
        device: String,
        property: &'static str,
        status: i32,
    },

    #[error("Failed to set default device {device}: OSStatus {status}")]
    SetDefaultFailed { device: String, status: i32 },

    #[error("Failed to register listener for {target}: OSStatus {status}")]
    ListenerFailed { target: String, status: i32 },

    #[error("String conversion error: {0}")]
    StringConversion(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_device() {
        let err = AudioError::SetDefaultFailed {
            device: "USB-DAC".to_string(),
            status: -50,
        };
        assert_eq!(
            err.to_string(),
            "Failed to set default device USB-DAC: OSStatus -50"
        );
    }
}
