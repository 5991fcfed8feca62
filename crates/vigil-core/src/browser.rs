//! Main browser state container
//!
//! Owns the database, preferences, the private-session allowlist and one
//! tracking protection controller per open window.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use vigil_privacy::{
    normalize_address, AllowlistEntry, AllowlistManager, Histograms, PrivateSessionAllowlist,
    SecurityStateSignal, TrackingProtectionController, UiState, WindowContext,
    TRACKING_PROTECTION_PERMISSION,
};
use vigil_storage::{Database, PermissionRecord};

use crate::chrome::{ChromeAction, WindowChrome};
use crate::config::Config;
use crate::error::CoreError;
use crate::prefs::Preferences;
use crate::Result;

struct Window {
    tracking_protection: TrackingProtectionController<WindowChrome>,
    current_uri: Option<Url>,
}

/// Main browser instance
pub struct Browser {
    config: Arc<Config>,
    db: Database,
    prefs: Preferences,
    /// Exceptions made in private windows; cleared when the last one closes
    private_session: PrivateSessionAllowlist,
    histograms: Histograms,
    windows: Arc<Mutex<HashMap<Uuid, Window>>>,
}

impl Browser {
    /// Open (or create) the database at the configured path.
    pub fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: Config, db: Database) -> Self {
        let config = Arc::new(config);
        let prefs = Preferences::new(db.clone(), Arc::clone(&config));

        tracing::info!("Browser initialized");

        Self {
            config,
            db,
            prefs,
            private_session: PrivateSessionAllowlist::new(),
            histograms: Histograms::new(),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // === Windows ===

    pub fn open_window(&self, is_private: bool) -> Uuid {
        let id = Uuid::new_v4();
        let allowlist = AllowlistManager::new(self.db.clone(), self.private_session.clone());

        let tracking_protection = TrackingProtectionController::init(
            WindowContext { is_private },
            &self.prefs,
            WindowChrome::new(),
            allowlist,
            self.config.tooltips.clone(),
            Arc::new(self.histograms.clone()),
        );

        self.windows.lock().insert(
            id,
            Window {
                tracking_protection,
                current_uri: None,
            },
        );

        tracing::info!(%id, is_private, "Window opened");
        id
    }

    pub fn close_window(&self, id: Uuid) -> Result<()> {
        let mut windows = self.windows.lock();
        let mut window = windows.remove(&id).ok_or(CoreError::UnknownWindow(id))?;
        window.tracking_protection.uninit();

        let was_private = window.tracking_protection.window().is_private;
        let private_remaining = windows
            .values()
            .any(|w| w.tracking_protection.window().is_private);
        drop(windows);

        tracing::info!(%id, "Window closed");

        if was_private && !private_remaining {
            self.end_private_session();
        }

        Ok(())
    }

    fn end_private_session(&self) {
        let count = self.private_session.len();
        self.private_session.clear();
        tracing::info!(exceptions = count, "Last private window closed, private session ended");
    }

    pub fn window_ids(&self) -> Vec<Uuid> {
        self.windows.lock().keys().copied().collect()
    }

    fn with_window<F, T>(&self, id: Uuid, f: F) -> Result<T>
    where
        F: FnOnce(&mut Window) -> Result<T>,
    {
        let mut windows = self.windows.lock();
        let window = windows.get_mut(&id).ok_or(CoreError::UnknownWindow(id))?;
        f(window)
    }

    pub fn window_context(&self, id: Uuid) -> Result<WindowContext> {
        self.with_window(id, |w| Ok(*w.tracking_protection.window()))
    }

    // === Preferences ===

    /// Current value of a boolean preference.
    ///
    /// Writes go through [`Browser::set_pref`] and [`Browser::clear_pref`] only,
    /// so every window is refreshed before the write returns.
    pub fn pref(&self, key: &str) -> Result<bool> {
        self.prefs.bool_pref(key)
    }

    /// Store a preference and bring every window up to date before returning.
    pub fn set_pref(&self, key: &str, value: bool) -> Result<()> {
        self.prefs.set_bool(key, value)?;
        self.refresh_windows();
        Ok(())
    }

    pub fn clear_pref(&self, key: &str) -> Result<()> {
        self.prefs.clear_user_pref(key)?;
        self.refresh_windows();
        Ok(())
    }

    fn refresh_windows(&self) {
        for window in self.windows.lock().values_mut() {
            window.tracking_protection.observe();
        }
    }

    // === Navigation and security state ===

    pub fn navigate(&self, id: Uuid, url: Url) -> Result<()> {
        self.with_window(id, |w| {
            tracing::debug!(%id, %url, "Location changed");
            w.current_uri = Some(url);
            Ok(())
        })
    }

    pub fn current_uri(&self, id: Uuid) -> Result<Option<Url>> {
        self.with_window(id, |w| Ok(w.current_uri.clone()))
    }

    /// Security state reported by the engine for the window's page.
    /// `is_simulated` is set when the state is replayed on a tab switch.
    pub fn on_security_change(
        &self,
        id: Uuid,
        state: u32,
        is_simulated: bool,
    ) -> Result<Option<UiState>> {
        let signal = SecurityStateSignal::from_bits(state);
        self.with_window(id, |w| {
            Ok(w.tracking_protection.on_security_change(signal, is_simulated))
        })
    }

    pub fn is_tracking_protection_enabled(&self, id: Uuid) -> Result<bool> {
        self.with_window(id, |w| Ok(w.tracking_protection.enabled()))
    }

    pub fn shield_state(&self, id: Uuid) -> Result<UiState> {
        self.with_window(id, |w| Ok(w.tracking_protection.state()))
    }

    // === Allowlist ===

    pub fn disable_for_current_page(&self, id: Uuid) -> Result<AllowlistEntry> {
        self.with_window(id, |w| {
            let current = w.current_uri.as_ref().ok_or(CoreError::NoCurrentPage(id))?;
            Ok(w.tracking_protection.disable_for_current_page(current)?)
        })
    }

    pub fn enable_for_current_page(&self, id: Uuid) -> Result<()> {
        self.with_window(id, |w| {
            let current = w.current_uri.as_ref().ok_or(CoreError::NoCurrentPage(id))?;
            Ok(w.tracking_protection.enable_for_current_page(current)?)
        })
    }

    /// Whether a load of `url` in window `id` should skip tracking protection.
    pub fn is_tracking_exempt(&self, id: Uuid, url: &Url) -> Result<bool> {
        self.with_window(id, |w| Ok(w.tracking_protection.is_allowlisted(url)?))
    }

    /// Persistent exceptions as JSON. Private-session exceptions are never exported.
    pub fn export_tracking_exceptions(&self) -> Result<String> {
        let records = self.db.list_permissions(TRACKING_PROTECTION_PERMISSION)?;
        Ok(serde_json::to_string_pretty(&records)?)
    }

    /// Replace the persistent exceptions with those in `json`.
    /// Records of another permission type, and entries whose origin cannot be
    /// canonicalized, are skipped.
    pub fn import_tracking_exceptions(&self, json: &str) -> Result<usize> {
        let records: Vec<PermissionRecord> = serde_json::from_str(json)?;

        let mut seen = HashSet::new();
        let mut accepted = Vec::with_capacity(records.len());
        for record in records {
            if record.permission_type != TRACKING_PROTECTION_PERMISSION {
                tracing::warn!(
                    origin = %record.origin,
                    permission_type = %record.permission_type,
                    "Skipping permission of another type"
                );
                continue;
            }
            match normalize_address(&record.origin) {
                Ok(origin) => {
                    if seen.insert(origin.clone()) {
                        accepted.push(PermissionRecord {
                            origin,
                            permission_type: TRACKING_PROTECTION_PERMISSION.to_string(),
                            created_at: record.created_at,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        origin = %record.origin,
                        error = %e,
                        "Skipping tracking exception"
                    );
                }
            }
        }

        self.db
            .replace_permissions(TRACKING_PROTECTION_PERMISSION, &accepted)?;
        tracing::info!(count = accepted.len(), "Imported tracking exceptions");
        Ok(accepted.len())
    }

    // === Chrome ===

    /// Run `f` on a snapshot of the window's chrome. The window registry is
    /// not locked while `f` runs, so `f` may call back into the browser.
    pub fn with_chrome<F, T>(&self, id: Uuid, f: F) -> Result<T>
    where
        F: FnOnce(&WindowChrome) -> T,
    {
        let chrome = self.with_window(id, |w| Ok(w.tracking_protection.chrome().clone()))?;
        Ok(f(&chrome))
    }

    pub fn take_chrome_actions(&self, id: Uuid) -> Result<Vec<ChromeAction>> {
        self.with_window(id, |w| Ok(w.tracking_protection.chrome_mut().take_actions()))
    }

    // === Accessors ===

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn private_session(&self) -> &PrivateSessionAllowlist {
        &self.private_session
    }

    pub fn histograms(&self) -> &Histograms {
        &self.histograms
    }
}
