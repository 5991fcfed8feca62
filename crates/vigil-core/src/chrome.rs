//! Window chrome state for the tracking protection shield
//!
//! Rust owns the chrome state; the frontend only renders it. The shield is
//! three elements:
//! ```text
//! #tracking-protection-container   hidden when protection is off
//!   #tracking-protection-icon      animate, tooltiptext, state
//!   #tracking-protection-content   state
//! ```
//! Requests the frontend must act on (closing the identity popup, reloading
//! the page) are queued and drained with [`WindowChrome::take_actions`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use vigil_privacy::ShieldChrome;

pub const ATTR_ANIMATE: &str = "animate";
pub const ATTR_TOOLTIP: &str = "tooltiptext";
pub const ATTR_STATE: &str = "state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChromeAction {
    HideIdentityPopup,
    Reload,
}

/// Attributes of one chrome element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementAttributes(BTreeMap<String, String>);

impl ElementAttributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowChrome {
    pub container_hidden: bool,
    pub icon: ElementAttributes,
    pub content: ElementAttributes,
    #[serde(skip)]
    pending: Vec<ChromeAction>,
}

impl WindowChrome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queued actions, oldest first. The queue is left empty.
    pub fn take_actions(&mut self) -> Vec<ChromeAction> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending_actions(&self) -> &[ChromeAction] {
        &self.pending
    }
}

impl ShieldChrome for WindowChrome {
    fn set_container_hidden(&mut self, hidden: bool) {
        self.container_hidden = hidden;
    }

    fn set_icon_animate(&mut self, animate: bool) {
        if animate {
            self.icon.set(ATTR_ANIMATE, "true");
        } else {
            self.icon.remove(ATTR_ANIMATE);
        }
    }

    fn set_icon_tooltip(&mut self, tooltip: Option<&str>) {
        match tooltip {
            Some(text) => self.icon.set(ATTR_TOOLTIP, text),
            None => self.icon.remove(ATTR_TOOLTIP),
        }
    }

    fn set_state_attribute(&mut self, state: Option<&'static str>) {
        match state {
            Some(value) => {
                self.icon.set(ATTR_STATE, value);
                self.content.set(ATTR_STATE, value);
            }
            None => {
                self.icon.remove(ATTR_STATE);
                self.content.remove(ATTR_STATE);
            }
        }
    }

    fn hide_identity_popup(&mut self) {
        self.pending.push(ChromeAction::HideIdentityPopup);
    }

    fn reload(&mut self) {
        self.pending.push(ChromeAction::Reload);
    }
}
