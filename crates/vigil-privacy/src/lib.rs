//! Vigil Tracking Protection
//!
//! Per-window tracking protection state for the browser chrome:
//! - whether protection is effective for a window (global and private-window switches)
//! - what the shield shows for the current page (blocked / loaded / neutral)
//! - per-site exceptions, persistent for normal windows and session-scoped
//!   for private ones
//!
//! The blocking engine itself lives elsewhere; this crate only reacts to the
//! security state it reports.

mod allowlist;
mod controller;
mod enablement;
mod error;
mod prefs;
mod security_state;
mod telemetry;

pub use allowlist::{
    normalize_address, normalize_origin, AllowlistEntry, AllowlistManager, AllowlistScope,
    AllowlistStore, PrivateSessionAllowlist, TRACKING_PROTECTION_PERMISSION,
};
pub use controller::{ShieldChrome, TooltipText, TrackingProtectionController};
pub use enablement::{resolve, should_show_container, EnablementConfig, WindowContext};
pub use error::PrivacyError;
pub use prefs::{
    PrefChange, PrefSubscription, PreferenceSource, PREF_ENABLED_GLOBALLY,
    PREF_ENABLED_IN_PRIVATE_WINDOWS, TRACKING_PROTECTION_PREFS,
};
pub use security_state::{
    classify, Classification, SecurityStateSignal, UiState, STATE_BLOCKED_TRACKING_CONTENT,
    STATE_LOADED_TRACKING_CONTENT,
};
pub use telemetry::{
    AllowlistAction, HistogramId, Histograms, TrackingProtectionEvent, TrackingProtectionObserver,
};

pub type Result<T> = std::result::Result<T, PrivacyError>;
