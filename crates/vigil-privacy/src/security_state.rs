//! Security state classification
//!
//! The engine reports a bitmask per page load. It is decoded once into
//! [`SecurityStateSignal`] and then mapped to a [`UiState`]:
//! ```text
//! blocked tracking content  -> Blocked   (wins even if loaded is also set)
//! loaded tracking content   -> Loaded
//! neither                   -> Neutral
//! ```

use serde::{Deserialize, Serialize};

/// Tracking content was blocked on the page.
pub const STATE_BLOCKED_TRACKING_CONTENT: u32 = 0x0000_1000;
/// Tracking content was loaded on the page.
pub const STATE_LOADED_TRACKING_CONTENT: u32 = 0x0000_2000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityStateSignal {
    pub blocked_tracking_content: bool,
    pub loaded_tracking_content: bool,
}

impl SecurityStateSignal {
    /// Decode the engine bitmask. Unrelated bits are ignored.
    pub fn from_bits(state: u32) -> Self {
        Self {
            blocked_tracking_content: state & STATE_BLOCKED_TRACKING_CONTENT != 0,
            loaded_tracking_content: state & STATE_LOADED_TRACKING_CONTENT != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiState {
    Blocked,
    Loaded,
    #[default]
    Neutral,
}

impl UiState {
    /// Value of the `state` attribute on the icon and content elements.
    pub fn attribute(&self) -> Option<&'static str> {
        match self {
            UiState::Blocked => Some("blocked-tracking-content"),
            UiState::Loaded => Some("loaded-tracking-content"),
            UiState::Neutral => None,
        }
    }

    /// Shield histogram bucket: 0 not shown, 1 loaded, 2 blocked.
    pub fn shield_bucket(&self) -> usize {
        match self {
            UiState::Neutral => 0,
            UiState::Loaded => 1,
            UiState::Blocked => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UiState::Blocked => "blocked",
            UiState::Loaded => "loaded",
            UiState::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for UiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of classifying one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub state: UiState,
    pub should_animate: bool,
}

/// Classify a signal. Only call this for windows where protection is enabled.
///
/// `is_simulated` marks signals replayed on tab switch rather than produced
/// by a live load; those never animate the shield but classify the same way.
pub fn classify(signal: &SecurityStateSignal, is_simulated: bool) -> Classification {
    let state = if signal.blocked_tracking_content {
        UiState::Blocked
    } else if signal.loaded_tracking_content {
        UiState::Loaded
    } else {
        UiState::Neutral
    };

    Classification {
        state,
        should_animate: !is_simulated,
    }
}
