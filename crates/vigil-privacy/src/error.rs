//! Privacy error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrivacyError {
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Address has no host to build an origin from: {0}")]
    MissingHost(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vigil_storage::StorageError),
}
