//! Preference access for tracking protection
//!
//! The controller never talks to a concrete preference service. It reads
//! booleans through [`PreferenceSource`] and receives change notifications
//! over the channel held by a [`PrefSubscription`]. Dropping the
//! subscription deregisters it from the source.

use tokio::sync::mpsc::UnboundedReceiver;

pub const PREF_ENABLED_GLOBALLY: &str = "privacy.trackingprotection.enabled";
pub const PREF_ENABLED_IN_PRIVATE_WINDOWS: &str = "privacy.trackingprotection.pbmode.enabled";

/// Keys the controller subscribes to.
pub const TRACKING_PROTECTION_PREFS: [&str; 2] =
    [PREF_ENABLED_GLOBALLY, PREF_ENABLED_IN_PRIVATE_WINDOWS];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefChange {
    pub key: String,
    pub value: bool,
}

pub trait PreferenceSource {
    fn get_bool(&self, key: &str) -> bool;

    /// Register interest in `keys`. Changes are delivered until the returned
    /// subscription is dropped.
    fn subscribe(&self, keys: &[&str]) -> PrefSubscription;
}

/// Live registration with a [`PreferenceSource`].
pub struct PrefSubscription {
    receiver: UnboundedReceiver<PrefChange>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl PrefSubscription {
    /// `release` runs once when the subscription is dropped.
    pub fn new<F>(receiver: UnboundedReceiver<PrefChange>, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            receiver,
            release: Some(Box::new(release)),
        }
    }

    /// Changes received since the last call, oldest first.
    pub fn drain(&mut self) -> Vec<PrefChange> {
        let mut changes = Vec::new();
        while let Ok(change) = self.receiver.try_recv() {
            changes.push(change);
        }
        changes
    }
}

impl Drop for PrefSubscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for PrefSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefSubscription")
            .field("released", &self.release.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[test]
    fn test_drain_returns_changes_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = PrefSubscription::new(rx, || {});

        tx.send(PrefChange {
            key: PREF_ENABLED_GLOBALLY.to_string(),
            value: true,
        })
        .unwrap();
        tx.send(PrefChange {
            key: PREF_ENABLED_GLOBALLY.to_string(),
            value: false,
        })
        .unwrap();

        let changes = subscription.drain();
        assert_eq!(changes.len(), 2);
        assert!(changes[0].value);
        assert!(!changes[1].value);
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn test_drop_releases() {
        let released = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = mpsc::unbounded_channel();

        let flag = Arc::clone(&released);
        let subscription = PrefSubscription::new(rx, move || flag.store(true, Ordering::SeqCst));
        assert!(!released.load(Ordering::SeqCst));

        drop(subscription);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_drain_after_sender_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscription = PrefSubscription::new(rx, || {});
        tx.send(PrefChange {
            key: PREF_ENABLED_IN_PRIVATE_WINDOWS.to_string(),
            value: false,
        })
        .unwrap();
        drop(tx);

        assert_eq!(subscription.drain().len(), 1);
        assert!(subscription.drain().is_empty());
    }
}
