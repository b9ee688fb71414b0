//! Command implementations.

pub mod catalog;
pub mod orders;
pub mod seed;
pub mod store;
pub mod users;

use thiserror::Error;

use mocktail_storefront::services::AuthError;
use mocktail_storefront::storage::StorageError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// A command-line value was not understood.
    #[error("{0}")]
    InvalidArgument(String),

    /// The store could not be read or written.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Registering a seeded user failed server-side.
    #[error("registration error: {0}")]
    Auth(#[from] AuthError),

    /// The fixture file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    /// The fixture file is not valid YAML of the expected shape.
    #[error("invalid fixture: {0}")]
    Fixture(#[from] serde_yaml::Error),

    /// No user has the given email.
    #[error("no user registered with email {0}")]
    UnknownUser(String),
}
