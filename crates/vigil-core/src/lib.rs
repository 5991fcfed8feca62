//! Vigil Core
//!
//! Central coordination layer for the Vigil browser.
//! Rust owns all state; the frontend renders the chrome it is handed.

mod browser;
mod chrome;
mod config;
mod error;
mod prefs;

pub use browser::Browser;
pub use chrome::{
    ChromeAction, ElementAttributes, WindowChrome, ATTR_ANIMATE, ATTR_STATE, ATTR_TOOLTIP,
};
pub use config::{Config, TrackingProtectionDefaults};
pub use error::CoreError;
pub use prefs::Preferences;

// Re-export core components
pub use vigil_privacy::{
    AllowlistEntry, AllowlistScope, HistogramId, Histograms, PrivacyError, SecurityStateSignal,
    TooltipText, UiState, WindowContext, PREF_ENABLED_GLOBALLY, PREF_ENABLED_IN_PRIVATE_WINDOWS,
};
pub use vigil_storage::{Database, PermissionRecord, StorageError};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
