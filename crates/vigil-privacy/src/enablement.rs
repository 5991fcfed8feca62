//! Effective enablement
//!
//! Tracking protection is on for a window when it is enabled globally, or
//! when it is enabled for private windows and the window is private.

use serde::{Deserialize, Serialize};

/// The two user-facing switches, as read from preferences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnablementConfig {
    pub enabled_globally: bool,
    pub enabled_in_private_windows: bool,
}

/// Privacy context of a window. Fixed for the window's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowContext {
    pub is_private: bool,
}

impl WindowContext {
    pub fn normal() -> Self {
        Self { is_private: false }
    }

    pub fn private() -> Self {
        Self { is_private: true }
    }
}

pub fn resolve(config: &EnablementConfig, window: &WindowContext) -> bool {
    config.enabled_globally || (config.enabled_in_private_windows && window.is_private)
}

/// The shield container is shown exactly when protection is effective.
pub fn should_show_container(enabled: bool) -> bool {
    enabled
}
