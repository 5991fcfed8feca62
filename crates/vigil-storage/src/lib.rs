//! Vigil Storage Layer
//!
//! SQLite-based persistence for browser settings and site permissions.
//! Only state that must outlive the process lives here; private-browsing
//! data never reaches this crate.

mod database;
mod error;
mod migrations;
mod permissions;
mod settings;

pub use database::Database;
pub use error::StorageError;
pub use permissions::PermissionRecord;

pub type Result<T> = std::result::Result<T, StorageError>;
