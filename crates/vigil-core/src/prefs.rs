//! Boolean preferences backed by the settings table
//!
//! Values are stored as `"true"` / `"false"`. A key with no stored value
//! reads as its configured default. Every write notifies the subscribers
//! registered for that key before `set_bool` returns.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedSender};

use vigil_privacy::{PrefChange, PrefSubscription, PreferenceSource};
use vigil_storage::Database;

use crate::config::Config;
use crate::Result;

struct Observer {
    keys: HashSet<String>,
    sender: UnboundedSender<PrefChange>,
}

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: HashMap<u64, Observer>,
}

#[derive(Clone)]
pub struct Preferences {
    db: Database,
    config: Arc<Config>,
    observers: Arc<Mutex<Observers>>,
}

impl Preferences {
    pub fn new(db: Database, config: Arc<Config>) -> Self {
        Self {
            db,
            config,
            observers: Arc::new(Mutex::new(Observers::default())),
        }
    }

    fn default_for(&self, key: &str) -> bool {
        self.config.default_pref(key).unwrap_or(false)
    }

    /// Stored value, or the default when unset or unreadable.
    pub fn bool_pref(&self, key: &str) -> Result<bool> {
        match self.db.get_setting(key)?.as_deref() {
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => {
                tracing::warn!(key, value = other, "Ignoring non-boolean preference value");
                Ok(self.default_for(key))
            }
            None => Ok(self.default_for(key)),
        }
    }

    pub fn has_user_value(&self, key: &str) -> Result<bool> {
        Ok(self.db.get_setting(key)?.is_some())
    }

    pub fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.db.set_setting(key, if value { "true" } else { "false" })?;
        tracing::debug!(key, value, "Preference set");
        self.notify(key, value);
        Ok(())
    }

    /// Drop the stored value so the default applies again.
    pub fn clear_user_pref(&self, key: &str) -> Result<()> {
        if self.db.remove_setting(key)? {
            self.notify(key, self.default_for(key));
        }
        Ok(())
    }

    fn notify(&self, key: &str, value: bool) {
        let mut observers = self.observers.lock();
        observers.entries.retain(|id, observer| {
            if !observer.keys.contains(key) {
                return true;
            }
            let delivered = observer
                .sender
                .send(PrefChange {
                    key: key.to_string(),
                    value,
                })
                .is_ok();
            if !delivered {
                tracing::debug!(id, "Dropping disconnected preference observer");
            }
            delivered
        });
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().entries.len()
    }
}

impl PreferenceSource for Preferences {
    fn get_bool(&self, key: &str) -> bool {
        self.bool_pref(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "Cannot read preference, using default");
            self.default_for(key)
        })
    }

    fn subscribe(&self, keys: &[&str]) -> PrefSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();

        let id = {
            let mut observers = self.observers.lock();
            let id = observers.next_id;
            observers.next_id += 1;
            observers.entries.insert(
                id,
                Observer {
                    keys: keys.iter().map(|k| k.to_string()).collect(),
                    sender,
                },
            );
            id
        };

        let observers = Arc::clone(&self.observers);
        PrefSubscription::new(receiver, move || {
            observers.lock().entries.remove(&id);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_privacy::{PREF_ENABLED_GLOBALLY, PREF_ENABLED_IN_PRIVATE_WINDOWS};

    fn prefs() -> Preferences {
        Preferences::new(
            Database::open_in_memory().unwrap(),
            Arc::new(Config::new("/tmp/vigil-test".into())),
        )
    }

    #[test]
    fn test_defaults_until_set() {
        let prefs = prefs();
        assert!(!prefs.bool_pref(PREF_ENABLED_GLOBALLY).unwrap());
        assert!(prefs.bool_pref(PREF_ENABLED_IN_PRIVATE_WINDOWS).unwrap());
        assert!(!prefs.has_user_value(PREF_ENABLED_GLOBALLY).unwrap());

        prefs.set_bool(PREF_ENABLED_GLOBALLY, true).unwrap();
        assert!(prefs.get_bool(PREF_ENABLED_GLOBALLY));
        assert!(prefs.has_user_value(PREF_ENABLED_GLOBALLY).unwrap());

        prefs.clear_user_pref(PREF_ENABLED_GLOBALLY).unwrap();
        assert!(!prefs.get_bool(PREF_ENABLED_GLOBALLY));
    }

    #[test]
    fn test_garbage_value_reads_as_default() {
        let prefs = prefs();
        prefs
            .db
            .set_setting(PREF_ENABLED_IN_PRIVATE_WINDOWS, "yes")
            .unwrap();
        assert!(prefs.get_bool(PREF_ENABLED_IN_PRIVATE_WINDOWS));
    }

    #[test]
    fn test_subscribers_receive_only_their_keys() {
        let prefs = prefs();
        let mut subscription = prefs.subscribe(&[PREF_ENABLED_GLOBALLY]);

        prefs.set_bool(PREF_ENABLED_IN_PRIVATE_WINDOWS, false).unwrap();
        prefs.set_bool(PREF_ENABLED_GLOBALLY, true).unwrap();

        assert_eq!(
            subscription.drain(),
            vec![PrefChange {
                key: PREF_ENABLED_GLOBALLY.to_string(),
                value: true,
            }]
        );
    }

    #[test]
    fn test_clear_notifies_default() {
        let prefs = prefs();
        prefs.set_bool(PREF_ENABLED_GLOBALLY, true).unwrap();
        let mut subscription = prefs.subscribe(&[PREF_ENABLED_GLOBALLY]);

        prefs.clear_user_pref(PREF_ENABLED_GLOBALLY).unwrap();
        let changes = subscription.drain();
        assert_eq!(changes.len(), 1);
        assert!(!changes[0].value);

        // Nothing stored, nothing to clear
        prefs.clear_user_pref(PREF_ENABLED_GLOBALLY).unwrap();
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn test_dropping_subscription_deregisters() {
        let prefs = prefs();
        let subscription = prefs.subscribe(&[PREF_ENABLED_GLOBALLY]);
        assert_eq!(prefs.observer_count(), 1);

        drop(subscription);
        assert_eq!(prefs.observer_count(), 0);
        prefs.set_bool(PREF_ENABLED_GLOBALLY, true).unwrap();
    }
}
