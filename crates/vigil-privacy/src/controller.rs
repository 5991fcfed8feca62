//! Per-window tracking protection controller
//!
//! One controller exists per browser window and owns all tracking protection
//! state for it. Two axes drive it:
//!
//! ```text
//! preference change ──► enablement (container shown / hidden)
//!                           │ enabled only
//! security signal ──────────┴──► classify ──► Blocked | Loaded | Neutral
//! user toggle ──► allowlist store ──► hide identity popup + reload
//! ```
//!
//! Pending preference changes are always applied before a security signal
//! is classified.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::allowlist::{AllowlistEntry, AllowlistManager};
use crate::enablement::{self, EnablementConfig, WindowContext};
use crate::prefs::{
    PrefSubscription, PreferenceSource, PREF_ENABLED_GLOBALLY, PREF_ENABLED_IN_PRIVATE_WINDOWS,
    TRACKING_PROTECTION_PREFS,
};
use crate::security_state::{self, SecurityStateSignal, UiState};
use crate::telemetry::{AllowlistAction, TrackingProtectionEvent, TrackingProtectionObserver};
use crate::Result;

/// The window chrome the controller drives: the shield icon, the
/// control-center content region and the container holding both.
pub trait ShieldChrome {
    fn set_container_hidden(&mut self, hidden: bool);
    fn set_icon_animate(&mut self, animate: bool);
    fn set_icon_tooltip(&mut self, tooltip: Option<&str>);
    /// Sets (or removes, for `None`) the `state` attribute on icon and content.
    fn set_state_attribute(&mut self, state: Option<&'static str>);
    fn hide_identity_popup(&mut self);
    fn reload(&mut self);
}

/// Localized tooltip strings for the shield icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipText {
    /// Shown while tracking content is being blocked.
    pub active: String,
    /// Shown while tracking content loads because protection is off for the site.
    pub disabled: String,
}

impl Default for TooltipText {
    fn default() -> Self {
        Self {
            active: "Tracking attempts on this page are being blocked".to_string(),
            disabled: "Tracking content is being loaded on this page".to_string(),
        }
    }
}

pub struct TrackingProtectionController<C: ShieldChrome> {
    window: WindowContext,
    config: EnablementConfig,
    enabled: bool,
    state: UiState,
    tooltips: TooltipText,
    chrome: C,
    allowlist: AllowlistManager,
    observer: Arc<dyn TrackingProtectionObserver>,
    subscription: Option<PrefSubscription>,
}

impl<C: ShieldChrome> TrackingProtectionController<C> {
    /// Read the preferences, subscribe to their changes and set up the chrome.
    pub fn init(
        window: WindowContext,
        prefs: &dyn PreferenceSource,
        chrome: C,
        allowlist: AllowlistManager,
        tooltips: TooltipText,
        observer: Arc<dyn TrackingProtectionObserver>,
    ) -> Self {
        let subscription = prefs.subscribe(&TRACKING_PROTECTION_PREFS);
        let config = EnablementConfig {
            enabled_globally: prefs.get_bool(PREF_ENABLED_GLOBALLY),
            enabled_in_private_windows: prefs.get_bool(PREF_ENABLED_IN_PRIVATE_WINDOWS),
        };

        let mut controller = Self {
            window,
            config,
            enabled: false,
            state: UiState::Neutral,
            tooltips,
            chrome,
            allowlist,
            observer,
            subscription: Some(subscription),
        };
        controller.update_enabled(config);

        controller.observer.notify(
            &controller.window,
            &TrackingProtectionEvent::Initialized {
                enabled_globally: config.enabled_globally,
                enabled_in_private_windows: config.enabled_in_private_windows,
            },
        );

        tracing::debug!(
            private = window.is_private,
            enabled = controller.enabled,
            "Tracking protection initialized"
        );

        controller
    }

    /// Stop listening for preference changes. Safe to call more than once.
    pub fn uninit(&mut self) {
        if self.subscription.take().is_some() {
            tracing::debug!(private = self.window.is_private, "Tracking protection detached");
        }
    }

    /// Apply any preference changes received since the last call.
    /// Returns `true` if at least one change was applied.
    pub fn observe(&mut self) -> bool {
        let changes = match &mut self.subscription {
            Some(subscription) => subscription.drain(),
            None => return false,
        };

        if changes.is_empty() {
            return false;
        }

        let mut config = self.config;
        for change in &changes {
            match change.key.as_str() {
                PREF_ENABLED_GLOBALLY => config.enabled_globally = change.value,
                PREF_ENABLED_IN_PRIVATE_WINDOWS => config.enabled_in_private_windows = change.value,
                other => tracing::debug!(key = other, "Ignoring unrelated preference"),
            }
        }

        self.update_enabled(config);
        true
    }

    fn update_enabled(&mut self, config: EnablementConfig) {
        self.config = config;

        let was_enabled = self.enabled;
        self.enabled = enablement::resolve(&config, &self.window);
        self.chrome
            .set_container_hidden(!enablement::should_show_container(self.enabled));

        if was_enabled && !self.enabled {
            // Hidden elements must not keep a state into the next enabled period.
            self.chrome.set_icon_animate(false);
            self.apply_state(UiState::Neutral);
        }

        if was_enabled != self.enabled {
            tracing::info!(
                private = self.window.is_private,
                enabled = self.enabled,
                "Tracking protection enablement changed"
            );
            self.observer.notify(
                &self.window,
                &TrackingProtectionEvent::EnablementChanged {
                    enabled: self.enabled,
                },
            );
        }
    }

    /// Handle the security state reported for the displayed page.
    ///
    /// Returns the new UI state, or `None` when protection is off for this
    /// window and the signal was ignored.
    pub fn on_security_change(
        &mut self,
        signal: SecurityStateSignal,
        is_simulated: bool,
    ) -> Option<UiState> {
        self.observe();

        if !self.enabled {
            return None;
        }

        let classification = security_state::classify(&signal, is_simulated);
        self.chrome.set_icon_animate(classification.should_animate);
        self.apply_state(classification.state);

        self.observer.notify(
            &self.window,
            &TrackingProtectionEvent::StateClassified {
                state: classification.state,
                animated: classification.should_animate,
            },
        );

        Some(classification.state)
    }

    fn apply_state(&mut self, state: UiState) {
        let tooltip = match state {
            UiState::Blocked => Some(self.tooltips.active.as_str()),
            UiState::Loaded => Some(self.tooltips.disabled.as_str()),
            UiState::Neutral => None,
        };
        self.chrome.set_icon_tooltip(tooltip);
        self.chrome.set_state_attribute(state.attribute());
        self.state = state;
    }

    /// Add the current page's origin to the allowlist and reload it.
    pub fn disable_for_current_page(&mut self, current: &Url) -> Result<AllowlistEntry> {
        let entry = self.allowlist.disable(current, &self.window)?;
        self.after_toggle(AllowlistAction::Disabled);
        Ok(entry)
    }

    /// Remove the current page's origin from the allowlist and reload it.
    pub fn enable_for_current_page(&mut self, current: &Url) -> Result<()> {
        self.allowlist.enable(current, &self.window)?;
        self.after_toggle(AllowlistAction::Enabled);
        Ok(())
    }

    fn after_toggle(&mut self, action: AllowlistAction) {
        self.observer
            .notify(&self.window, &TrackingProtectionEvent::AllowlistToggled(action));
        self.chrome.hide_identity_popup();
        self.chrome.reload();
    }

    /// Whether the current page's origin is on the allowlist for this window.
    pub fn is_allowlisted(&self, current: &Url) -> Result<bool> {
        self.allowlist.is_allowlisted(current, &self.window)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn window(&self) -> &WindowContext {
        &self.window
    }

    pub fn config(&self) -> &EnablementConfig {
        &self.config
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn chrome(&self) -> &C {
        &self.chrome
    }

    pub fn chrome_mut(&mut self) -> &mut C {
        &mut self.chrome
    }
}

impl<C: ShieldChrome> Drop for TrackingProtectionController<C> {
    fn drop(&mut self) {
        self.uninit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::{AllowlistScope, PrivateSessionAllowlist};
    use crate::prefs::PrefChange;
    use crate::telemetry::{HistogramId, Histograms};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tokio::sync::mpsc::{self, UnboundedSender};
    use vigil_storage::Database;

    #[derive(Default)]
    struct TestPrefs {
        values: Mutex<HashMap<String, bool>>,
        senders: Arc<Mutex<Vec<UnboundedSender<PrefChange>>>>,
    }

    impl TestPrefs {
        fn with(enabled_globally: bool, enabled_in_private_windows: bool) -> Self {
            let prefs = Self::default();
            prefs.set(PREF_ENABLED_GLOBALLY, enabled_globally);
            prefs.set(PREF_ENABLED_IN_PRIVATE_WINDOWS, enabled_in_private_windows);
            prefs
        }

        fn set(&self, key: &str, value: bool) {
            self.values.lock().insert(key.to_string(), value);
            for sender in self.senders.lock().iter() {
                let _ = sender.send(PrefChange {
                    key: key.to_string(),
                    value,
                });
            }
        }

        fn subscriber_count(&self) -> usize {
            self.senders.lock().len()
        }
    }

    impl PreferenceSource for TestPrefs {
        fn get_bool(&self, key: &str) -> bool {
            self.values.lock().get(key).copied().unwrap_or(false)
        }

        fn subscribe(&self, _keys: &[&str]) -> PrefSubscription {
            let (tx, rx) = mpsc::unbounded_channel();
            self.senders.lock().push(tx);
            let senders = Arc::clone(&self.senders);
            PrefSubscription::new(rx, move || senders.lock().clear())
        }
    }

    #[derive(Debug, Default)]
    struct TestChrome {
        container_hidden: bool,
        animate: bool,
        tooltip: Option<String>,
        state: Option<&'static str>,
        popup_hidden: usize,
        reloads: usize,
    }

    impl ShieldChrome for TestChrome {
        fn set_container_hidden(&mut self, hidden: bool) {
            self.container_hidden = hidden;
        }

        fn set_icon_animate(&mut self, animate: bool) {
            self.animate = animate;
        }

        fn set_icon_tooltip(&mut self, tooltip: Option<&str>) {
            self.tooltip = tooltip.map(str::to_string);
        }

        fn set_state_attribute(&mut self, state: Option<&'static str>) {
            self.state = state;
        }

        fn hide_identity_popup(&mut self) {
            self.popup_hidden += 1;
        }

        fn reload(&mut self) {
            self.reloads += 1;
        }
    }

    fn controller(
        prefs: &TestPrefs,
        window: WindowContext,
    ) -> (TrackingProtectionController<TestChrome>, Histograms) {
        let histograms = Histograms::new();
        let allowlist = AllowlistManager::new(
            Database::open_in_memory().unwrap(),
            PrivateSessionAllowlist::new(),
        );
        let controller = TrackingProtectionController::init(
            window,
            prefs,
            TestChrome::default(),
            allowlist,
            TooltipText::default(),
            Arc::new(histograms.clone()),
        );
        (controller, histograms)
    }

    fn blocked_signal() -> SecurityStateSignal {
        SecurityStateSignal {
            blocked_tracking_content: true,
            loaded_tracking_content: true,
        }
    }

    #[test]
    fn test_init_hides_container_when_disabled() {
        let prefs = TestPrefs::with(false, true);

        let (normal, _) = controller(&prefs, WindowContext::normal());
        assert!(!normal.enabled());
        assert!(normal.chrome().container_hidden);

        let (private, _) = controller(&prefs, WindowContext::private());
        assert!(private.enabled());
        assert!(!private.chrome().container_hidden);
    }

    #[test]
    fn test_classifies_only_when_enabled() {
        let prefs = TestPrefs::with(false, false);
        let (mut tp, histograms) = controller(&prefs, WindowContext::normal());

        assert_eq!(tp.on_security_change(blocked_signal(), false), None);
        assert_eq!(tp.chrome().state, None);
        assert!(!tp.chrome().animate);
        assert_eq!(histograms.total(HistogramId::Shield), 0);
    }

    #[test]
    fn test_security_change_sets_attributes() {
        let prefs = TestPrefs::with(true, false);
        let (mut tp, histograms) = controller(&prefs, WindowContext::normal());

        assert_eq!(
            tp.on_security_change(blocked_signal(), false),
            Some(UiState::Blocked)
        );
        assert_eq!(tp.chrome().state, Some("blocked-tracking-content"));
        assert_eq!(
            tp.chrome().tooltip.as_deref(),
            Some(TooltipText::default().active.as_str())
        );
        assert!(tp.chrome().animate);

        let loaded = SecurityStateSignal {
            blocked_tracking_content: false,
            loaded_tracking_content: true,
        };
        assert_eq!(tp.on_security_change(loaded, true), Some(UiState::Loaded));
        assert_eq!(tp.chrome().state, Some("loaded-tracking-content"));
        assert_eq!(
            tp.chrome().tooltip.as_deref(),
            Some(TooltipText::default().disabled.as_str())
        );
        assert!(!tp.chrome().animate);

        assert_eq!(
            tp.on_security_change(SecurityStateSignal::default(), false),
            Some(UiState::Neutral)
        );
        assert_eq!(tp.chrome().state, None);
        assert_eq!(tp.chrome().tooltip, None);

        assert_eq!(histograms.snapshot(HistogramId::Shield), vec![1, 1, 1]);
    }

    #[test]
    fn test_pref_change_applies_before_next_signal() {
        let prefs = TestPrefs::with(false, false);
        let (mut tp, _) = controller(&prefs, WindowContext::normal());
        assert!(!tp.enabled());

        // No explicit observe(): the signal handler must pick the change up first.
        prefs.set(PREF_ENABLED_GLOBALLY, true);
        assert_eq!(
            tp.on_security_change(blocked_signal(), false),
            Some(UiState::Blocked)
        );
        assert!(tp.enabled());
        assert!(!tp.chrome().container_hidden);
    }

    #[test]
    fn test_disabling_clears_stale_state() {
        let prefs = TestPrefs::with(true, false);
        let (mut tp, _) = controller(&prefs, WindowContext::normal());
        tp.on_security_change(blocked_signal(), false);
        assert_eq!(tp.chrome().state, Some("blocked-tracking-content"));

        prefs.set(PREF_ENABLED_GLOBALLY, false);
        assert!(tp.observe());
        assert!(!tp.enabled());
        assert!(tp.chrome().container_hidden);
        assert_eq!(tp.chrome().state, None);
        assert_eq!(tp.chrome().tooltip, None);
        assert!(!tp.chrome().animate);
        assert_eq!(tp.state(), UiState::Neutral);

        // Re-enabling starts from a clean slate
        prefs.set(PREF_ENABLED_GLOBALLY, true);
        assert!(tp.observe());
        assert!(tp.enabled());
        assert_eq!(tp.chrome().state, None);
    }

    #[test]
    fn test_private_pref_only_affects_private_windows() {
        let prefs = TestPrefs::with(false, false);
        let (mut normal, _) = controller(&prefs, WindowContext::normal());
        let (mut private, _) = controller(&prefs, WindowContext::private());

        prefs.set(PREF_ENABLED_IN_PRIVATE_WINDOWS, true);
        normal.observe();
        private.observe();

        assert!(!normal.enabled());
        assert!(private.enabled());
    }

    #[test]
    fn test_toggle_requests_popup_close_and_reload() {
        let prefs = TestPrefs::with(true, false);
        let (mut tp, histograms) = controller(&prefs, WindowContext::normal());
        let page = Url::parse("http://news.test/story").unwrap();

        let entry = tp.disable_for_current_page(&page).unwrap();
        assert_eq!(entry.origin, "https://news.test");
        assert_eq!(entry.scope, AllowlistScope::Persistent);
        assert!(tp.is_allowlisted(&page).unwrap());
        assert_eq!(tp.chrome().popup_hidden, 1);
        assert_eq!(tp.chrome().reloads, 1);

        tp.enable_for_current_page(&page).unwrap();
        assert!(!tp.is_allowlisted(&page).unwrap());
        assert_eq!(tp.chrome().popup_hidden, 2);
        assert_eq!(tp.chrome().reloads, 2);

        assert_eq!(histograms.snapshot(HistogramId::Events), vec![0, 1, 1]);
    }

    #[test]
    fn test_failed_toggle_has_no_side_effects() {
        let prefs = TestPrefs::with(true, false);
        let (mut tp, histograms) = controller(&prefs, WindowContext::normal());
        let page = Url::parse("about:blank").unwrap();

        assert!(tp.disable_for_current_page(&page).is_err());
        assert_eq!(tp.chrome().reloads, 0);
        assert_eq!(tp.chrome().popup_hidden, 0);
        assert_eq!(histograms.total(HistogramId::Events), 0);
    }

    #[test]
    fn test_private_window_toggle_uses_session_scope() {
        let prefs = TestPrefs::with(false, true);
        let (mut tp, histograms) = controller(&prefs, WindowContext::private());
        let page = Url::parse("https://news.test/").unwrap();

        let entry = tp.disable_for_current_page(&page).unwrap();
        assert_eq!(entry.scope, AllowlistScope::PrivateSession);
        assert_eq!(histograms.total(HistogramId::Events), 0);
    }

    #[test]
    fn test_uninit_detaches() {
        let prefs = TestPrefs::with(true, false);
        let (mut tp, _) = controller(&prefs, WindowContext::normal());
        assert_eq!(prefs.subscriber_count(), 1);

        tp.uninit();
        tp.uninit();
        assert!(!tp.is_attached());
        assert_eq!(prefs.subscriber_count(), 0);

        // Changes after teardown are not seen
        prefs.set(PREF_ENABLED_GLOBALLY, false);
        assert!(!tp.observe());
        assert!(tp.enabled());
    }

    #[test]
    fn test_init_records_telemetry() {
        let prefs = TestPrefs::with(true, false);
        let (_tp, histograms) = controller(&prefs, WindowContext::normal());
        assert_eq!(histograms.snapshot(HistogramId::Enabled), vec![0, 1]);
        assert_eq!(histograms.snapshot(HistogramId::PrivateModeDisabled), vec![0, 1]);
    }
}
