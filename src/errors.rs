/*!
 * Error types for the pronouns library.
 *
 * This module contains custom error types for the storage and catalog
 * subsystems, using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors raised when parsing a pronoun set string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PronounSetError {
    /// The input did not split into exactly six tokens
    #[error("Invalid number of pronouns in set: expected 6, found {found}")]
    TokenCount {
        /// Number of tokens actually found
        found: usize,
    },

    /// One of the six tokens was blank
    #[error("Pronoun at position {index} is empty")]
    EmptyToken {
        /// Zero-based position of the blank token
        index: usize,
    },
}

/// Errors surfaced by the user pronoun store
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// The store could not be brought up (driver, connection or migration failure)
    #[error("Failed to initialize pronoun storage: {0}")]
    Initialization(String),

    /// The backing store could not serve a read or scan
    #[error("Pronoun storage unavailable: {0}")]
    Unavailable(String),

    /// The write-behind worker is no longer running
    #[error("Pronoun storage worker has stopped")]
    WorkerStopped,

    /// A user identifier was not a valid UUID
    #[error("Invalid user id: {0}")]
    InvalidUserId(String),
}

/// Errors that can occur when talking to the remote catalog or its local cache file
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The HTTP request could not be completed (connect, timeout, body read)
    #[error("Catalog request failed: {0}")]
    Request(String),

    /// The catalog service answered with a non-2xx status
    #[error("Catalog service responded with error: {status_code} - {message}")]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The catalog document could not be parsed
    #[error("Failed to parse catalog document: {0}")]
    Parse(String),

    /// Reading or writing the local cache file failed
    #[error("Catalog cache file error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for CatalogError {
    fn from(error: reqwest::Error) -> Self {
        Self::Request(error.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the pronoun store
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Error from the catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Malformed pronoun set input
    #[error("Pronoun set error: {0}")]
    PronounSet(#[from] PronounSetError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(format!("{:#}", error))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
