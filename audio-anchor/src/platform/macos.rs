//! AppKit glue for a menu bar only application.
//!
//! The status item needs `NSApplication` running on the main thread. Rather
//! than handing control to `[NSApp run]`, the main loop blocks in `pump`
//! until AppKit has an event, then drains its own channels, keeping every
//! callback on one thread. Listener threads call `wake_event_loop` to post
//! an application-defined event after queueing work.

use objc2::rc::autoreleasepool;
use objc2::runtime::AnyObject;
use objc2::{class, msg_send};
use objc2_foundation::{NSDate, NSDefaultRunLoopMode, NSPoint};
use std::process::Command;
use std::ptr;
use tracing::warn;

/// `NSApplicationActivationPolicyAccessory`: no Dock icon, no main menu.
const ACTIVATION_POLICY_ACCESSORY: isize = 1;

/// `NSEventMaskAny`
const EVENT_MASK_ANY: usize = usize::MAX;

/// `NSEventTypeApplicationDefined`
const EVENT_TYPE_APPLICATION_DEFINED: usize = 15;

/// The shared `NSApplication`, set up as a menu bar accessory.
pub struct AppKitEventLoop {
    app: *mut AnyObject,
}

impl AppKitEventLoop {
    /// Must be called on the main thread before any status item is created.
    pub fn new() -> anyhow::Result<Self> {
        let app: *mut AnyObject = unsafe { msg_send![class!(NSApplication), sharedApplication] };
        if app.is_null() {
            anyhow::bail!("NSApplication is not available");
        }

        unsafe {
            let _: bool = msg_send![app, setActivationPolicy: ACTIVATION_POLICY_ACCESSORY];
            let _: () = msg_send![app, finishLaunching];
        }

        Ok(Self { app })
    }

    /// Block until AppKit has an event, then dispatch everything queued.
    pub fn pump(&self) {
        autoreleasepool(|_| unsafe {
            let mut until = NSDate::distantFuture();
            loop {
                let event: *mut AnyObject = msg_send![
                    self.app,
                    nextEventMatchingMask: EVENT_MASK_ANY,
                    untilDate: &*until,
                    inMode: NSDefaultRunLoopMode,
                    dequeue: true
                ];
                if event.is_null() {
                    break;
                }
                let _: () = msg_send![self.app, sendEvent: event];
                until = NSDate::distantPast();
            }
            let _: () = msg_send![self.app, updateWindows];
        });
    }
}

/// Wake a thread blocked in `AppKitEventLoop::pump`. Safe to call from any
/// thread.
pub fn wake_event_loop() {
    autoreleasepool(|_| unsafe {
        let app: *mut AnyObject = msg_send![class!(NSApplication), sharedApplication];
        if app.is_null() {
            return;
        }
        let event: *mut AnyObject = msg_send![
            class!(NSEvent),
            otherEventWithType: EVENT_TYPE_APPLICATION_DEFINED,
            location: NSPoint::new(0.0, 0.0),
            modifierFlags: 0usize,
            timestamp: 0.0f64,
            windowNumber: 0isize,
            context: ptr::null_mut::<AnyObject>(),
            subtype: 0i16,
            data1: 0isize,
            data2: 0isize
        ];
        if event.is_null() {
            return;
        }
        let _: () = msg_send![app, postEvent: event, atStart: false];
    });
}

/// Open `url` with the default handler.
pub fn open_url(url: &str) {
    if let Err(e) = Command::new("open").arg(url).spawn() {
        warn!(url, error = %e, "failed to open url");
    }
}
