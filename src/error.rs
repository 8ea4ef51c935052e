//! Domain error type shared by the services.
//!
//! The web layer maps each variant to an HTTP status in `web::error`.

use thiserror::Error;

use crate::cloud::StorageError;
use crate::models::{InvalidNote, InvalidReminderTime};

#[derive(Debug, Error)]
pub enum Error {
    /// The requested row does not exist for this user.
    #[error("{0} not found")]
    NotFound(String),

    /// User input failed validation.
    #[error("{0}")]
    Validation(String),

    /// The write collides with existing data.
    #[error("{0}")]
    Conflict(String),

    /// Cloud client credentials are not configured on this server.
    #[error("cloud storage is not configured")]
    CloudNotConfigured,

    /// The user has not linked a cloud storage account.
    #[error("no cloud storage account is connected")]
    CloudNotConnected,

    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<InvalidNote> for Error {
    fn from(err: InvalidNote) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<InvalidReminderTime> for Error {
    fn from(err: InvalidReminderTime) -> Self {
        Self::Validation(err.to_string())
    }
}
