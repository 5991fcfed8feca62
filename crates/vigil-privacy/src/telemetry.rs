//! Tracking protection telemetry
//!
//! The controller reports what happened through [`TrackingProtectionObserver`];
//! it never records counters itself. [`Histograms`] is the stock observer.
//!
//! | Histogram                          | Buckets                                  |
//! |------------------------------------|------------------------------------------|
//! | `TRACKING_PROTECTION_ENABLED`      | 0 off, 1 on (at window init)             |
//! | `TRACKING_PROTECTION_PBM_DISABLED` | 0 private pref on, 1 off (at window init)|
//! | `TRACKING_PROTECTION_SHIELD`       | 0 none, 1 loaded, 2 blocked              |
//! | `TRACKING_PROTECTION_EVENTS`       | 0 state change, 1 disable, 2 enable      |
//!
//! Nothing is recorded for private windows.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::enablement::WindowContext;
use crate::security_state::UiState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowlistAction {
    /// Protection turned off for a site (entry added).
    Disabled,
    /// Protection turned back on for a site (entry removed).
    Enabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingProtectionEvent {
    Initialized {
        enabled_globally: bool,
        enabled_in_private_windows: bool,
    },
    EnablementChanged {
        enabled: bool,
    },
    StateClassified {
        state: UiState,
        animated: bool,
    },
    AllowlistToggled(AllowlistAction),
}

pub trait TrackingProtectionObserver: Send + Sync {
    fn notify(&self, window: &WindowContext, event: &TrackingProtectionEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistogramId {
    Enabled,
    PrivateModeDisabled,
    Shield,
    Events,
}

impl HistogramId {
    pub fn name(&self) -> &'static str {
        match self {
            HistogramId::Enabled => "TRACKING_PROTECTION_ENABLED",
            HistogramId::PrivateModeDisabled => "TRACKING_PROTECTION_PBM_DISABLED",
            HistogramId::Shield => "TRACKING_PROTECTION_SHIELD",
            HistogramId::Events => "TRACKING_PROTECTION_EVENTS",
        }
    }

    fn bucket_count(&self) -> usize {
        match self {
            HistogramId::Enabled | HistogramId::PrivateModeDisabled => 2,
            HistogramId::Shield | HistogramId::Events => 3,
        }
    }
}

/// Shared bucket counters. Clones record into the same histograms.
#[derive(Debug, Clone, Default)]
pub struct Histograms {
    buckets: Arc<Mutex<HashMap<HistogramId, Vec<u64>>>>,
}

impl Histograms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, id: HistogramId, bucket: usize) {
        let size = id.bucket_count();
        if bucket >= size {
            tracing::warn!(histogram = id.name(), bucket, "Histogram bucket out of range");
            return;
        }

        let mut buckets = self.buckets.lock();
        buckets.entry(id).or_insert_with(|| vec![0; size])[bucket] += 1;
    }

    pub fn add_bool(&self, id: HistogramId, value: bool) {
        self.add(id, usize::from(value));
    }

    /// Per-bucket counts. All zero if nothing was recorded.
    pub fn snapshot(&self, id: HistogramId) -> Vec<u64> {
        self.buckets
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| vec![0; id.bucket_count()])
    }

    pub fn total(&self, id: HistogramId) -> u64 {
        self.snapshot(id).iter().sum()
    }
}

impl TrackingProtectionObserver for Histograms {
    fn notify(&self, window: &WindowContext, event: &TrackingProtectionEvent) {
        if window.is_private {
            return;
        }

        match event {
            TrackingProtectionEvent::Initialized {
                enabled_globally,
                enabled_in_private_windows,
            } => {
                self.add_bool(HistogramId::Enabled, *enabled_globally);
                self.add_bool(HistogramId::PrivateModeDisabled, !enabled_in_private_windows);
            }
            TrackingProtectionEvent::EnablementChanged { .. } => {}
            TrackingProtectionEvent::StateClassified { state, .. } => {
                self.add(HistogramId::Shield, state.shield_bucket());
                self.add(HistogramId::Events, 0);
            }
            TrackingProtectionEvent::AllowlistToggled(AllowlistAction::Disabled) => {
                self.add(HistogramId::Events, 1);
            }
            TrackingProtectionEvent::AllowlistToggled(AllowlistAction::Enabled) => {
                self.add(HistogramId::Events, 2);
            }
        }
    }
}
