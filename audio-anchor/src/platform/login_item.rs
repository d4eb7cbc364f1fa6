//! Launch at login.
//!
//! On macOS a per-user LaunchAgent with `RunAtLoad` starts the app when the
//! user logs in. The agent file existing is the enabled state.

use super::config::AppConfig;
use super::preferences::PreferencesError;
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// OS login-item registration.
pub trait LoginItem {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool) -> Result<(), PreferencesError>;
}

/// LaunchAgent property list in a `LaunchAgents` directory.
#[derive(Debug, Clone)]
pub struct LaunchAgent {
    label: String,
    program: PathBuf,
    plist_path: PathBuf,
}

impl LaunchAgent {
    /// Agent for `program` stored in `directory`.
    pub fn new(label: &str, program: PathBuf, directory: &Path) -> Self {
        Self {
            label: label.to_string(),
            program,
            plist_path: directory.join(format!("{}.plist", label)),
        }
    }

    /// Agent for the running executable in `~/Library/LaunchAgents`.
    pub fn for_current_user(config: &AppConfig) -> Result<Self, PreferencesError> {
        let home = dirs::home_dir().ok_or(PreferencesError::NoHomeDirectory)?;
        let program = std::env::current_exe().map_err(|e| PreferencesError::LoginItem {
            path: "current executable".to_string(),
            source: e,
        })?;
        Ok(Self::new(
            &config.launch_agent_label,
            program,
            &home.join("Library").join("LaunchAgents"),
        ))
    }

    pub fn plist_path(&self) -> &Path {
        &self.plist_path
    }

    fn plist(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{}</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>ProcessType</key>
    <string>Interactive</string>
</dict>
</plist>
"#,
            xml_escape(&self.label),
            xml_escape(&self.program.to_string_lossy())
        )
    }

    fn io_error(&self, source: std::io::Error) -> PreferencesError {
        PreferencesError::LoginItem {
            path: self.plist_path.display().to_string(),
            source,
        }
    }
}

impl LoginItem for LaunchAgent {
    fn is_enabled(&self) -> bool {
        self.plist_path.is_file()
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), PreferencesError> {
        if enabled {
            if let Some(parent) = self.plist_path.parent() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
            fs::write(&self.plist_path, self.plist()).map_err(|e| self.io_error(e))?;
            info!(path = %self.plist_path.display(), "launch at login enabled");
        } else if self.plist_path.exists() {
            fs::remove_file(&self.plist_path).map_err(|e| self.io_error(e))?;
            info!(path = %self.plist_path.display(), "launch at login disabled");
        }
        Ok(())
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Login item that only remembers its state for this process.
#[derive(Debug, Default)]
pub struct MemoryLoginItem {
    enabled: Cell<bool>,
}

impl MemoryLoginItem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoginItem for MemoryLoginItem {
    fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), PreferencesError> {
        self.enabled.set(enabled);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_writes_agent_and_disable_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let agents = dir.path().join("LaunchAgents");
        let agent = LaunchAgent::new(
            "io.github.audio-anchor",
            PathBuf::from("/Applications/Audio Anchor.app/Contents/MacOS/audio-anchor"),
            &agents,
        );
        assert!(!agent.is_enabled());

        agent.set_enabled(true).unwrap();
        assert!(agent.is_enabled());
        let plist = fs::read_to_string(agent.plist_path()).unwrap();
        assert!(plist.contains("<string>io.github.audio-anchor</string>"));
        assert!(plist.contains("Audio Anchor.app/Contents/MacOS/audio-anchor"));
        assert!(plist.contains("<key>RunAtLoad</key>"));

        agent.set_enabled(false).unwrap();
        assert!(!agent.is_enabled());
    }

    #[test]
    fn test_disable_when_absent_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let agent = LaunchAgent::new("label", PathBuf::from("/bin/true"), dir.path());
        agent.set_enabled(false).unwrap();
        assert!(!agent.is_enabled());
    }

    #[test]
    fn test_program_path_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let agent = LaunchAgent::new("label", PathBuf::from("/tmp/a&b"), dir.path());
        assert!(agent.plist().contains("/tmp/a&amp;b"));
    }
}
