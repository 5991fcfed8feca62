//! Core error types

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] vigil_storage::StorageError),

    #[error("Privacy error: {0}")]
    Privacy(#[from] vigil_privacy::PrivacyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Window not found: {0}")]
    UnknownWindow(Uuid),

    #[error("Window {0} has no page loaded")]
    NoCurrentPage(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}
