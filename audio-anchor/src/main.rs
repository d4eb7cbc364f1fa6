//! AudioAnchor entry point.
//!
//! Everything runs on the main thread: the loop sleeps until AppKit has an
//! event (a click, or a wake-up posted by a Core Audio listener), then
//! dispatches pending device events and menu actions to `AppState` one at a
//! time.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("audio_anchor=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_logging();
    run()
}

#[cfg(target_os = "macos")]
fn run() -> Result<()> {
    use anyhow::Context;
    use audio_anchor::audio::CoreAudioSystem;
    use audio_anchor::platform::macos::{open_url, wake_event_loop, AppKitEventLoop};
    use audio_anchor::platform::{AppConfig, LaunchAgent, Settings, UserDefaults};
    use audio_anchor::ui::TrayManager;
    use audio_anchor::{AppState, ExternalRequest};
    use std::rc::Rc;
    use std::sync::mpsc::channel;
    use tracing::info;

    let config = AppConfig::from_env();
    info!(domain = %config.preferences_domain, version = %config.version, "starting");

    let event_loop = AppKitEventLoop::new()?;

    let login_item =
        LaunchAgent::for_current_user(&config).context("Failed to locate launch agent")?;
    let settings = Settings::new(
        Rc::new(UserDefaults::new(&config.preferences_domain)),
        Rc::new(login_item),
    );

    let (sender, events) = channel();
    let system = CoreAudioSystem::new(sender, wake_event_loop);

    let mut tray = TrayManager::new();
    tray.create().context("Failed to create status item")?;

    let mut app = AppState::new(config, system, settings);
    app.launch(&mut tray);

    while !app.should_exit() {
        event_loop.pump();

        while let Ok(event) = events.try_recv() {
            app.handle_device_event(event, &mut tray);
        }

        while let Some(action) = tray.next_action() {
            if let Some(ExternalRequest::OpenUrl(url)) = app.handle_menu_action(action, &mut tray) {
                open_url(&url);
            }
            if app.should_exit() {
                break;
            }
        }
    }

    tray.destroy();
    info!("exiting");
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run() -> Result<()> {
    anyhow::bail!("AudioAnchor only runs on macOS")
}
