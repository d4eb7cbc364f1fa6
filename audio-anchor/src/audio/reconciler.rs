//! Re-applies the anchor preference to a device snapshot.

use super::system::OutputDevice;
use tracing::{debug, warn};

/// Result of a single reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No anchor is configured
    NoAnchor,

    /// The anchor is configured but not among the current devices
    AnchorUnavailable,

    /// The anchor was already default for both roles
    AlreadyDefault,

    /// At least one default role was requested for the anchor
    Applied,
}

/// Make the anchored device the default output and system output device.
///
/// Other devices are never touched: the audio system clears the previous
/// default itself. Requests that fail are logged and dropped; the next
/// device event retries.
pub fn reconcile<D: OutputDevice>(devices: &[D], anchor: Option<&str>) -> ReconcileOutcome {
    let Some(anchor) = anchor else {
        return ReconcileOutcome::NoAnchor;
    };

    let Some(device) = devices.iter().find(|d| d.name() == anchor) else {
        debug!(anchor, "anchored device not present");
        return ReconcileOutcome::AnchorUnavailable;
    };

    let mut applied = false;

    if !device.is_default_output() {
        if let Err(e) = device.set_default_output(true) {
            warn!(anchor, error = %e, "failed to set default output device");
        }
        applied = true;
    }

    if !device.is_default_system_output() {
        if let Err(e) = device.set_default_system_output(true) {
            warn!(anchor, error = %e, "failed to set default system output device");
        }
        applied = true;
    }

    if applied {
        debug!(anchor, "anchored device made default");
        ReconcileOutcome::Applied
    } else {
        ReconcileOutcome::AlreadyDefault
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::DeviceEvent;
    use crate::audio::memory::MemoryAudioSystem;
    use crate::audio::system::AudioSystem;
    use std::sync::mpsc::channel;

    fn system_with(names: &[&str]) -> MemoryAudioSystem {
        let (sender, _receiver) = channel::<DeviceEvent>();
        let system = MemoryAudioSystem::new(sender);
        for name in names {
            system.plug(name);
        }
        system
    }

    #[test]
    fn test_no_anchor_leaves_flags_unchanged() {
        let system = system_with(&["Speakers", "Headphones"]);
        system.select_default_output("Speakers");
        let before = system.summaries();

        let devices = system.output_devices().unwrap();
        assert_eq!(reconcile(&devices, None), ReconcileOutcome::NoAnchor);
        assert_eq!(system.summaries(), before);
        assert_eq!(system.default_requests(), 0);
    }

    #[test]
    fn test_missing_anchor_leaves_flags_unchanged() {
        let system = system_with(&["Speakers", "Headphones"]);
        system.select_default_output("Speakers");
        let before = system.summaries();

        let devices = system.output_devices().unwrap();
        assert_eq!(
            reconcile(&devices, Some("USB-DAC")),
            ReconcileOutcome::AnchorUnavailable
        );
        assert_eq!(system.summaries(), before);
        assert_eq!(system.default_requests(), 0);
    }

    #[test]
    fn test_anchor_becomes_default_for_both_roles() {
        let system = system_with(&["Speakers", "Headphones"]);
        system.select_default_output("Speakers");

        let devices = system.output_devices().unwrap();
        assert_eq!(
            reconcile(&devices, Some("Headphones")),
            ReconcileOutcome::Applied
        );

        let headphones = system.summary("Headphones").unwrap();
        assert!(headphones.is_default_output);
        assert!(headphones.is_default_system_output);

        // The system, not the reconciler, cleared the previous default.
        let speakers = system.summary("Speakers").unwrap();
        assert!(!speakers.is_default_output);
    }

    #[test]
    fn test_second_pass_changes_nothing() {
        let system = system_with(&["Speakers", "Headphones"]);
        let devices = system.output_devices().unwrap();

        reconcile(&devices, Some("Headphones"));
        let after_first = system.summaries();
        let requests = system.default_requests();

        assert_eq!(
            reconcile(&devices, Some("Headphones")),
            ReconcileOutcome::AlreadyDefault
        );
        assert_eq!(system.summaries(), after_first);
        assert_eq!(system.default_requests(), requests);
    }

    #[test]
    fn test_only_missing_role_is_requested() {
        let system = system_with(&["Speakers", "Headphones"]);
        system.select_default_output("Headphones");
        let devices = system.output_devices().unwrap();

        assert_eq!(
            reconcile(&devices, Some("Headphones")),
            ReconcileOutcome::Applied
        );
        assert_eq!(system.default_requests(), 1);
        assert!(system.summary("Headphones").unwrap().is_default_system_output);
    }

    #[test]
    fn test_failed_request_is_not_fatal() {
        let system = system_with(&["Speakers", "Headphones"]);
        let devices = system.output_devices().unwrap();
        system.unplug("Headphones");

        // The handle outlived its device; the request fails quietly.
        assert_eq!(
            reconcile(&devices, Some("Headphones")),
            ReconcileOutcome::Applied
        );
        assert!(system.summary("Headphones").is_none());
    }
}
