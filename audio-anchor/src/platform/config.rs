//! Application configuration.

/// Environment variable overriding the preferences domain.
pub const DOMAIN_ENV: &str = "AUDIO_ANCHOR_DOMAIN";

/// Fixed application settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Display name shown at the top of the menu
    pub display_name: String,

    /// Version shown next to the display name
    pub version: String,

    /// Preferences domain the settings are stored under
    pub preferences_domain: String,

    /// LaunchAgent label used for launch at login
    pub launch_agent_label: String,

    /// Page opened from the menu
    pub homepage: String,
}

impl AppConfig {
    const APP_IDENTIFIER: &'static str = "io.github.audio-anchor";
    const DISPLAY_NAME: &'static str = "AudioAnchor";
    const HOMEPAGE: &'static str = "https://github.com/wata/AudioAnchor";

    /// Defaults, with the preferences domain taken from the environment
    /// when set.
    pub fn from_env() -> Self {
        Self::with_domain_override(std::env::var(DOMAIN_ENV).ok())
    }

    fn with_domain_override(domain: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(domain) = domain.filter(|d| !d.trim().is_empty()) {
            config.preferences_domain = domain.trim().to_string();
        }
        config
    }

    /// Title of the first menu entry.
    pub fn title(&self) -> String {
        format!("{} {}", self.display_name, self.version)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            display_name: Self::DISPLAY_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            preferences_domain: Self::APP_IDENTIFIER.to_string(),
            launch_agent_label: Self::APP_IDENTIFIER.to_string(),
            homepage: Self::HOMEPAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_includes_version() {
        let config = AppConfig::default();
        assert_eq!(
            config.title(),
            format!("AudioAnchor {}", env!("CARGO_PKG_VERSION"))
        );
    }

    #[test]
    fn test_domain_override() {
        let config = AppConfig::with_domain_override(Some(" dev.audio-anchor ".to_string()));
        assert_eq!(config.preferences_domain, "dev.audio-anchor");
        // The login item keeps its label.
        assert_eq!(config.launch_agent_label, "io.github.audio-anchor");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let config = AppConfig::with_domain_override(Some("  ".to_string()));
        assert_eq!(config, AppConfig::default());
    }
}
