//! Persistent per-origin permissions
//!
//! Rows are keyed by `(origin, type)`. A row's presence is the grant; removing
//! it restores the default behavior for that origin.

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    pub origin: String,
    #[serde(rename = "type")]
    pub permission_type: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Grant `permission_type` to `origin`. Returns `false` if it was already granted.
    pub fn add_permission(&self, origin: &str, permission_type: &str) -> Result<bool> {
        let created_at = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO permissions (origin, type, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![origin, permission_type, created_at],
            )?;
            Ok(inserted > 0)
        })
    }

    /// Revoke `permission_type` for `origin`. Returns `false` if nothing was stored.
    pub fn remove_permission(&self, origin: &str, permission_type: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM permissions WHERE origin = ?1 AND type = ?2",
                rusqlite::params![origin, permission_type],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn has_permission(&self, origin: &str, permission_type: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let found: Option<i32> = conn
                .query_row(
                    "SELECT 1 FROM permissions WHERE origin = ?1 AND type = ?2",
                    rusqlite::params![origin, permission_type],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// All grants of one type, ordered by origin.
    pub fn list_permissions(&self, permission_type: &str) -> Result<Vec<PermissionRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT origin, type, created_at FROM permissions
                 WHERE type = ?1 ORDER BY origin",
            )?;

            let records = stmt
                .query_map([permission_type], |row| {
                    let created_str: String = row.get(2)?;
                    let created_at = DateTime::parse_from_rfc3339(&created_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                2,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?;

                    Ok(PermissionRecord {
                        origin: row.get(0)?,
                        permission_type: row.get(1)?,
                        created_at,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
    }

    /// Replace every grant of `permission_type` with `records` in one transaction.
    pub fn replace_permissions(
        &self,
        permission_type: &str,
        records: &[PermissionRecord],
    ) -> Result<()> {
        self.transaction(|conn| {
            conn.execute("DELETE FROM permissions WHERE type = ?1", [permission_type])?;
            for record in records {
                conn.execute(
                    "INSERT OR IGNORE INTO permissions (origin, type, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![
                        record.origin,
                        permission_type,
                        record.created_at.to_rfc3339()
                    ],
                )?;
            }
            Ok(())
        })?;

        tracing::debug!(
            permission_type,
            count = records.len(),
            "Replaced stored permissions"
        );
        Ok(())
    }
}
