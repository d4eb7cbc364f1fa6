//! Core Audio backend.
//!
//! Device handles wrap `AudioObjectID`s. Listeners registered with
//! `AudioObjectAddPropertyListener` are called on a Core Audio thread. They
//! only forward a `DeviceEvent` into the channel and wake the main loop; all
//! handling happens on the main thread.

use super::device::{AudioError, DeviceEvent};
use super::system::{AudioSystem, OutputDevice, Subscription, SubscriptionId, SubscriptionScope};
use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use coreaudio_sys::{
    kAudioDevicePropertyStreams, kAudioHardwarePropertyDefaultOutputDevice,
    kAudioHardwarePropertyDevices, kAudioObjectPropertyScopeGlobal,
    kAudioObjectPropertyScopeOutput, kAudioObjectSystemObject, AudioObjectAddPropertyListener,
    AudioObjectGetPropertyData, AudioObjectGetPropertyDataSize, AudioObjectID,
    AudioObjectPropertyAddress, AudioObjectRemovePropertyListener, AudioObjectSetPropertyData,
    OSStatus,
};
use std::collections::HashMap;
use std::ffi::c_void;
use std::mem;
use std::ptr;
use std::sync::mpsc::Sender;
use tracing::{debug, warn};

const KAUDIO_HARDWARE_PROPERTY_DEFAULT_SYSTEM_OUTPUT_DEVICE: u32 = 0x734F_7574; // 'sOut'
const KAUDIO_DEVICE_PROPERTY_DEVICE_IS_RUNNING_SOMEWHERE: u32 = 0x676F_6E65; // 'gone'
const KAUDIO_OBJECT_PROPERTY_NAME: u32 = 0x6C6E_616D; // 'lnam'
const KAUDIO_OBJECT_PROPERTY_ELEMENT_MAIN: u32 = 0;

fn address(selector: u32, scope: u32) -> AudioObjectPropertyAddress {
    AudioObjectPropertyAddress {
        mSelector: selector,
        mScope: scope,
        mElement: KAUDIO_OBJECT_PROPERTY_ELEMENT_MAIN,
    }
}

fn global(selector: u32) -> AudioObjectPropertyAddress {
    address(selector, kAudioObjectPropertyScopeGlobal)
}

/// Read a `UInt32` sized property.
fn read_u32(object: AudioObjectID, address: &AudioObjectPropertyAddress) -> Result<u32, OSStatus> {
    let mut value: u32 = 0;
    let mut size = mem::size_of::<u32>() as u32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            object,
            address,
            0,
            ptr::null(),
            &mut size,
            &mut value as *mut u32 as *mut c_void,
        )
    };
    if status != 0 {
        return Err(status);
    }
    Ok(value)
}

fn default_device(selector: u32) -> Option<AudioObjectID> {
    read_u32(kAudioObjectSystemObject, &global(selector))
        .ok()
        .filter(|id| *id != 0)
}

fn device_ids() -> Result<Vec<AudioObjectID>, AudioError> {
    let address = global(kAudioHardwarePropertyDevices);
    let mut data_size: u32 = 0;
    let status = unsafe {
        AudioObjectGetPropertyDataSize(
            kAudioObjectSystemObject,
            &address,
            0,
            ptr::null(),
            &mut data_size,
        )
    };
    if status != 0 {
        return Err(AudioError::EnumerationFailed(status));
    }

    let count = data_size as usize / mem::size_of::<AudioObjectID>();
    let mut ids: Vec<AudioObjectID> = vec![0; count];
    if count == 0 {
        return Ok(ids);
    }

    let status = unsafe {
        AudioObjectGetPropertyData(
            kAudioObjectSystemObject,
            &address,
            0,
            ptr::null(),
            &mut data_size,
            ids.as_mut_ptr() as *mut c_void,
        )
    };
    if status != 0 {
        return Err(AudioError::EnumerationFailed(status));
    }

    ids.truncate(data_size as usize / mem::size_of::<AudioObjectID>());
    Ok(ids)
}

fn has_output_streams(id: AudioObjectID) -> bool {
    let address = address(kAudioDevicePropertyStreams, kAudioObjectPropertyScopeOutput);
    let mut data_size: u32 = 0;
    let status = unsafe {
        AudioObjectGetPropertyDataSize(id, &address, 0, ptr::null(), &mut data_size)
    };
    status == 0 && data_size > 0
}

fn device_name(id: AudioObjectID) -> Result<String, AudioError> {
    let address = global(KAUDIO_OBJECT_PROPERTY_NAME);
    let mut name_ref: CFStringRef = ptr::null();
    let mut size = mem::size_of::<CFStringRef>() as u32;
    let status = unsafe {
        AudioObjectGetPropertyData(
            id,
            &address,
            0,
            ptr::null(),
            &mut size,
            &mut name_ref as *mut CFStringRef as *mut c_void,
        )
    };
    if status != 0 {
        return Err(AudioError::PropertyReadFailed {
            device: id.to_string(),
            property: "name",
            status,
        });
    }
    if name_ref.is_null() {
        return Err(AudioError::StringConversion(format!(
            "device {} has no name",
            id
        )));
    }
    let name = unsafe { CFString::wrap_under_create_rule(name_ref) };
    Ok(name.to_string())
}

/// Live handle to a Core Audio output device.
#[derive(Debug, Clone)]
pub struct CoreAudioDevice {
    id: AudioObjectID,
    name: String,
}

impl CoreAudioDevice {
    fn make_default(&self, selector: u32, value: bool) -> Result<(), AudioError> {
        if !value {
            // There is always some default device; it can only be replaced.
            debug!(device = %self.name, "ignoring request to clear default role");
            return Ok(());
        }

        let address = global(selector);
        let status = unsafe {
            AudioObjectSetPropertyData(
                kAudioObjectSystemObject,
                &address,
                0,
                ptr::null(),
                mem::size_of::<AudioObjectID>() as u32,
                &self.id as *const AudioObjectID as *const c_void,
            )
        };
        if status != 0 {
            return Err(AudioError::SetDefaultFailed {
                device: self.name.clone(),
                status,
            });
        }
        Ok(())
    }
}

impl OutputDevice for CoreAudioDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_default_output(&self) -> bool {
        default_device(kAudioHardwarePropertyDefaultOutputDevice) == Some(self.id)
    }

    fn is_default_system_output(&self) -> bool {
        default_device(KAUDIO_HARDWARE_PROPERTY_DEFAULT_SYSTEM_OUTPUT_DEVICE) == Some(self.id)
    }

    fn is_running_somewhere(&self) -> bool {
        read_u32(
            self.id,
            &global(KAUDIO_DEVICE_PROPERTY_DEVICE_IS_RUNNING_SOMEWHERE),
        )
        .map(|running| running != 0)
        .unwrap_or(false)
    }

    fn set_default_output(&self, value: bool) -> Result<(), AudioError> {
        self.make_default(kAudioHardwarePropertyDefaultOutputDevice, value)
    }

    fn set_default_system_output(&self, value: bool) -> Result<(), AudioError> {
        self.make_default(KAUDIO_HARDWARE_PROPERTY_DEFAULT_SYSTEM_OUTPUT_DEVICE, value)
    }
}

/// Called from the listener thread after an event is queued.
pub type WakeFn = fn();

/// Data handed to a property listener. Boxed so its address is stable
/// while registered.
struct ListenerContext {
    sender: Sender<DeviceEvent>,
    event: DeviceEvent,
    wake: WakeFn,
}

struct Registration {
    object: AudioObjectID,
    address: AudioObjectPropertyAddress,
    context: Box<ListenerContext>,
}

impl Registration {
    fn client_data(&self) -> *mut c_void {
        &*self.context as *const ListenerContext as *mut c_void
    }
}

/// Forward the registered event into the channel.
unsafe extern "C" fn property_listener(
    _object: AudioObjectID,
    _number_addresses: u32,
    _addresses: *const AudioObjectPropertyAddress,
    client_data: *mut c_void,
) -> OSStatus {
    if let Some(context) = (client_data as *const ListenerContext).as_ref() {
        if context.sender.send(context.event.clone()).is_ok() {
            (context.wake)();
        }
    }
    0
}

/// Output devices and notifications from the Core Audio HAL.
pub struct CoreAudioSystem {
    sender: Sender<DeviceEvent>,
    wake: WakeFn,
    registrations: HashMap<SubscriptionId, Registration>,

    /// Contexts of removed listeners. The HAL may still be running a
    /// callback with one of them, so they live as long as the system.
    retired: Vec<Box<ListenerContext>>,

    next_id: u64,
}

impl CoreAudioSystem {
    /// Listeners will report into `sender`, then call `wake`.
    pub fn new(sender: Sender<DeviceEvent>, wake: WakeFn) -> Self {
        Self {
            sender,
            wake,
            registrations: HashMap::new(),
            retired: Vec::new(),
            next_id: 0,
        }
    }

    fn register(
        &mut self,
        object: AudioObjectID,
        selector: u32,
        scope: SubscriptionScope,
        event: DeviceEvent,
    ) -> Result<Subscription, AudioError> {
        let registration = Registration {
            object,
            address: global(selector),
            context: Box::new(ListenerContext {
                sender: self.sender.clone(),
                event,
                wake: self.wake,
            }),
        };

        let status = unsafe {
            AudioObjectAddPropertyListener(
                registration.object,
                &registration.address,
                Some(property_listener),
                registration.client_data(),
            )
        };
        if status != 0 {
            let target = match &scope {
                SubscriptionScope::DeviceList => "device list".to_string(),
                SubscriptionScope::RunningState { device_name } => device_name.clone(),
            };
            return Err(AudioError::ListenerFailed { target, status });
        }

        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.registrations.insert(id, registration);
        Ok(Subscription::new(id, scope))
    }

    fn remove(registration: &Registration) {
        let status = unsafe {
            AudioObjectRemovePropertyListener(
                registration.object,
                &registration.address,
                Some(property_listener),
                registration.client_data(),
            )
        };
        if status != 0 {
            warn!(object = registration.object, status, "failed to remove property listener");
        }
    }
}

impl AudioSystem for CoreAudioSystem {
    type Device = CoreAudioDevice;

    fn output_devices(&self) -> Result<Vec<CoreAudioDevice>, AudioError> {
        let mut devices = Vec::new();
        for id in device_ids()? {
            if !has_output_streams(id) {
                continue;
            }
            match device_name(id) {
                Ok(name) => devices.push(CoreAudioDevice { id, name }),
                Err(e) => warn!(device = id, error = %e, "skipping device without a name"),
            }
        }
        Ok(devices)
    }

    fn subscribe_device_list(&mut self) -> Result<Subscription, AudioError> {
        self.register(
            kAudioObjectSystemObject,
            kAudioHardwarePropertyDevices,
            SubscriptionScope::DeviceList,
            DeviceEvent::DeviceListChanged,
        )
    }

    fn subscribe_running_state(
        &mut self,
        device: &CoreAudioDevice,
    ) -> Result<Subscription, AudioError> {
        self.register(
            device.id,
            KAUDIO_DEVICE_PROPERTY_DEVICE_IS_RUNNING_SOMEWHERE,
            SubscriptionScope::RunningState {
                device_name: device.name.clone(),
            },
            DeviceEvent::DeviceRunningStateChanged {
                device_name: device.name.clone(),
            },
        )
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        if let Some(registration) = self.registrations.remove(&subscription.id()) {
            Self::remove(&registration);
            self.retired.push(registration.context);
        }
    }
}

impl Drop for CoreAudioSystem {
    fn drop(&mut self) {
        for (_, registration) in self.registrations.drain() {
            Self::remove(&registration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::channel;

    static WAKES: AtomicUsize = AtomicUsize::new(0);

    fn count_wake() {
        WAKES.fetch_add(1, Ordering::SeqCst);
    }

    fn no_wake() {}

    #[test]
    fn test_listener_queues_event_then_wakes() {
        let (sender, receiver) = channel();
        let context = ListenerContext {
            sender,
            event: DeviceEvent::DeviceListChanged,
            wake: count_wake,
        };
        let before = WAKES.load(Ordering::SeqCst);

        let status = unsafe {
            property_listener(
                kAudioObjectSystemObject,
                0,
                ptr::null(),
                &context as *const ListenerContext as *mut c_void,
            )
        };

        assert_eq!(status, 0);
        assert_eq!(receiver.try_recv(), Ok(DeviceEvent::DeviceListChanged));
        assert_eq!(WAKES.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_unsubscribe_keeps_context_alive() {
        let (sender, _receiver) = channel();
        let mut system = CoreAudioSystem::new(sender, no_wake);

        let subscription = system.subscribe_device_list().unwrap();
        system.unsubscribe(subscription);

        assert!(system.registrations.is_empty());
        assert_eq!(system.retired.len(), 1);
    }
}
