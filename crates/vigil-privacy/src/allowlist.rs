//! Tracking protection allowlist
//!
//! A page's address is reduced to a canonical `https://host[:port]` origin
//! before it is stored, because the channel classifier looks exceptions up
//! in that form whatever the page's real scheme was.
//!
//! Where the exception lives depends on the window:
//! - normal windows write to the persistent permission table
//! - private windows write to an in-memory set owned by the private session,
//!   which is never written to disk and is cleared when the session ends

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

use vigil_storage::Database;

use crate::enablement::WindowContext;
use crate::error::PrivacyError;
use crate::Result;

/// Permission type under which exceptions are stored.
pub const TRACKING_PROTECTION_PERMISSION: &str = "trackingprotection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowlistScope {
    Persistent,
    PrivateSession,
}

impl AllowlistScope {
    pub fn for_window(window: &WindowContext) -> Self {
        if window.is_private {
            AllowlistScope::PrivateSession
        } else {
            AllowlistScope::Persistent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub origin: String,
    pub scope: AllowlistScope,
}

/// Canonical origin for `address`: scheme replaced by `https`, host and any
/// explicit non-default port kept.
pub fn normalize_origin(address: &Url) -> Result<String> {
    let host = address
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| PrivacyError::MissingHost(address.to_string()))?;

    let host_port = match address.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let canonical =
        Url::parse(&format!("https://{host_port}")).map_err(|e| PrivacyError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })?;

    Ok(canonical.origin().ascii_serialization())
}

/// Parse and canonicalize a raw address string.
pub fn normalize_address(address: &str) -> Result<String> {
    let url = Url::parse(address).map_err(|e| PrivacyError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })?;
    normalize_origin(&url)
}

/// A set of canonical origins that are exempt from tracking protection.
pub trait AllowlistStore {
    /// Returns `false` if the origin was already present.
    fn add(&self, origin: &str) -> Result<bool>;
    /// Returns `false` if the origin was absent.
    fn remove(&self, origin: &str) -> Result<bool>;
    fn contains(&self, origin: &str) -> Result<bool>;
}

impl AllowlistStore for Database {
    fn add(&self, origin: &str) -> Result<bool> {
        Ok(self.add_permission(origin, TRACKING_PROTECTION_PERMISSION)?)
    }

    fn remove(&self, origin: &str) -> Result<bool> {
        Ok(self.remove_permission(origin, TRACKING_PROTECTION_PERMISSION)?)
    }

    fn contains(&self, origin: &str) -> Result<bool> {
        Ok(self.has_permission(origin, TRACKING_PROTECTION_PERMISSION)?)
    }
}

/// Exceptions made in private windows. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct PrivateSessionAllowlist {
    origins: Arc<RwLock<HashSet<String>>>,
}

impl PrivateSessionAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.origins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.read().is_empty()
    }

    /// Drop every exception. Called when the private session ends.
    pub fn clear(&self) {
        let mut origins = self.origins.write();
        let count = origins.len();
        origins.clear();
        tracing::debug!(count, "Cleared private session allowlist");
    }
}

impl AllowlistStore for PrivateSessionAllowlist {
    fn add(&self, origin: &str) -> Result<bool> {
        Ok(self.origins.write().insert(origin.to_string()))
    }

    fn remove(&self, origin: &str) -> Result<bool> {
        Ok(self.origins.write().remove(origin))
    }

    fn contains(&self, origin: &str) -> Result<bool> {
        Ok(self.origins.read().contains(origin))
    }
}

/// Adds and removes per-origin exceptions in the store the window's scope selects.
#[derive(Clone)]
pub struct AllowlistManager {
    persistent: Database,
    private_session: PrivateSessionAllowlist,
}

impl AllowlistManager {
    pub fn new(persistent: Database, private_session: PrivateSessionAllowlist) -> Self {
        Self {
            persistent,
            private_session,
        }
    }

    fn store(&self, scope: AllowlistScope) -> &dyn AllowlistStore {
        match scope {
            AllowlistScope::Persistent => &self.persistent,
            AllowlistScope::PrivateSession => &self.private_session,
        }
    }

    /// Exempt the origin of `address` from tracking protection.
    pub fn disable(&self, address: &Url, window: &WindowContext) -> Result<AllowlistEntry> {
        let origin = normalize_origin(address)?;
        let scope = AllowlistScope::for_window(window);

        if self.store(scope).add(&origin)? {
            tracing::info!(%origin, ?scope, "Tracking protection disabled for site");
        } else {
            tracing::debug!(%origin, ?scope, "Site already allowlisted");
        }

        Ok(AllowlistEntry { origin, scope })
    }

    /// Remove the exception for the origin of `address`. Absent entries are not an error.
    pub fn enable(&self, address: &Url, window: &WindowContext) -> Result<()> {
        let origin = normalize_origin(address)?;
        let scope = AllowlistScope::for_window(window);

        if self.store(scope).remove(&origin)? {
            tracing::info!(%origin, ?scope, "Tracking protection re-enabled for site");
        }

        Ok(())
    }

    /// Whether the classifier should skip tracking protection for `address`.
    pub fn is_allowlisted(&self, address: &Url, window: &WindowContext) -> Result<bool> {
        let origin = normalize_origin(address)?;
        self.store(AllowlistScope::for_window(window)).contains(&origin)
    }
}
