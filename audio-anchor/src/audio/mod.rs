//! Audio module for output device discovery and default device anchoring.
//!
//! `AudioSystem` is the seam between the anchoring logic and the OS. Core
//! Audio backs it on macOS; `MemoryAudioSystem` backs it in tests.

#[cfg(target_os = "macos")]
pub mod coreaudio;
pub mod device;
pub mod memory;
pub mod monitor;
pub mod reconciler;
pub mod system;

#[cfg(target_os = "macos")]
pub use coreaudio::{CoreAudioDevice, CoreAudioSystem};
pub use device::{AudioError, DeviceEvent, DeviceSummary};
pub use memory::{MemoryAudioSystem, MemoryDevice};
pub use monitor::{AnchorMonitor, MonitorState, MonitorUpdate};
pub use reconciler::{reconcile, ReconcileOutcome};
pub use system::{AudioSystem, OutputDevice, Subscription, SubscriptionId, SubscriptionScope};
