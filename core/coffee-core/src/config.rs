//! User preferences, loaded from `config.toml`.
//!
//! A missing file yields defaults. A malformed file is an error; callers
//! decide whether to fall back (the CLI warns and uses defaults).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CoffeeError, Result};
use crate::notify::Surface;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoffeeConfig {
    pub inhibit: InhibitOptions,
    pub monitor: MonitorConfig,
    pub ui: UiConfig,
    pub notifications: NotificationConfig,
    pub surfaces: SurfaceCommands,
}

/// What the inhibitor should keep awake.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InhibitOptions {
    pub prevent_display: bool,
    pub prevent_system: bool,
    pub prevent_disk: bool,
}

impl Default for InhibitOptions {
    fn default() -> Self {
        Self {
            prevent_display: true,
            prevent_system: true,
            prevent_disk: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub icon: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icon: "pot".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub desktop: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { desktop: true }
    }
}

/// Shell command run to refresh each surface after a state change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SurfaceCommands {
    pub menubar: Option<String>,
    pub status: Option<String>,
}

impl SurfaceCommands {
    pub fn command(&self, surface: Surface) -> Option<&str> {
        match surface {
            Surface::MenuBar => self.menubar.as_deref(),
            Surface::Status => self.status.as_deref(),
        }
        .filter(|command| !command.trim().is_empty())
    }
}

pub fn load_config(path: &Path) -> Result<CoffeeConfig> {
    if !path.exists() {
        return Ok(CoffeeConfig::default());
    }

    let content = fs_err::read_to_string(path)
        .map_err(|e| CoffeeError::io(format!("read config {}", path.display()), e))?;
    toml::from_str::<CoffeeConfig>(&content).map_err(|e| CoffeeError::ConfigMalformed {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(&temp_dir.path().join("missing.toml")).expect("load config");
        assert_eq!(config, CoffeeConfig::default());
        assert!(config.inhibit.prevent_display);
        assert!(config.inhibit.prevent_system);
        assert!(!config.inhibit.prevent_disk);
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.ui.icon, "pot");
    }

    #[test]
    fn load_config_parses_sections() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[inhibit]
prevent_display = false
prevent_disk = true

[monitor]
poll_interval_secs = 5

[ui]
icon = "mug"

[notifications]
desktop = false

[surfaces]
menubar = "echo refresh"
"#,
        )
        .expect("write config");

        let config = load_config(&path).expect("load config");
        assert!(!config.inhibit.prevent_display);
        assert!(config.inhibit.prevent_system);
        assert!(config.inhibit.prevent_disk);
        assert_eq!(config.monitor.poll_interval_secs, 5);
        assert_eq!(config.ui.icon, "mug");
        assert!(!config.notifications.desktop);
        assert_eq!(config.surfaces.command(Surface::MenuBar), Some("echo refresh"));
        assert!(config.surfaces.command(Surface::Status).is_none());
    }

    #[test]
    fn load_config_rejects_malformed_toml() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[inhibit\nprevent_display = ").expect("write config");
        assert!(matches!(
            load_config(&path),
            Err(CoffeeError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn poll_interval_never_zero() {
        let config = MonitorConfig {
            poll_interval_secs: 0,
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }
}
