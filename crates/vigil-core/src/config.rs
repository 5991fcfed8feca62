//! Browser configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vigil_privacy::{TooltipText, PREF_ENABLED_GLOBALLY, PREF_ENABLED_IN_PRIVATE_WINDOWS};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Tracking protection preference defaults, used until the user sets a value
    pub tracking_protection: TrackingProtectionDefaults,
    /// Shield icon tooltips
    pub tooltips: TooltipText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingProtectionDefaults {
    pub enabled: bool,
    pub enabled_in_private_windows: bool,
}

impl Default for TrackingProtectionDefaults {
    fn default() -> Self {
        Self {
            enabled: false,
            enabled_in_private_windows: true,
        }
    }
}

impl Config {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            database_path: data_dir.join("vigil.db"),
            tracking_protection: TrackingProtectionDefaults::default(),
            tooltips: TooltipText::default(),
        }
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("Vigil"))
            .unwrap_or_else(|| PathBuf::from(".vigil"))
    }

    /// Load a JSON config file. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(CoreError::Config("database_path is empty".to_string()));
        }
        if self.tooltips.active.trim().is_empty() || self.tooltips.disabled.trim().is_empty() {
            return Err(CoreError::Config("tooltip text cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Default value of a boolean preference, if this config defines one.
    pub fn default_pref(&self, key: &str) -> Option<bool> {
        match key {
            PREF_ENABLED_GLOBALLY => Some(self.tracking_protection.enabled),
            PREF_ENABLED_IN_PRIVATE_WINDOWS => {
                Some(self.tracking_protection.enabled_in_private_windows)
            }
            _ => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::data_dir())
    }
}

// Simple dirs implementation for common directories
mod dirs {
    use std::path::PathBuf;

    pub fn data_local_dir() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            std::env::var("LOCALAPPDATA").ok().map(PathBuf::from)
        }
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new(PathBuf::from("/tmp/vigil"));
        assert_eq!(config.database_path, PathBuf::from("/tmp/vigil/vigil.db"));
        assert_eq!(config.default_pref(PREF_ENABLED_GLOBALLY), Some(false));
        assert_eq!(config.default_pref(PREF_ENABLED_IN_PRIVATE_WINDOWS), Some(true));
        assert_eq!(config.default_pref("browser.startup.page"), None);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"database_path": "/tmp/x.db", "tracking_protection": {"enabled": true}}"#;
        let config = Config::from_json(json).unwrap();
        assert!(config.tracking_protection.enabled);
        assert!(config.tracking_protection.enabled_in_private_windows);
        assert_eq!(config.tooltips, TooltipText::default());
    }

    #[test]
    fn test_empty_tooltip_rejected() {
        let json = r#"{"database_path": "/tmp/x.db", "tooltips": {"active": " "}}"#;
        let err = Config::from_json(json).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("missing.json")).unwrap();
        assert!(!config.tracking_protection.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"database_path": "/tmp/y.db", "tracking_protection": {"enabled_in_private_windows": false}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/y.db"));
        assert!(!config.tracking_protection.enabled_in_private_windows);
    }
}
