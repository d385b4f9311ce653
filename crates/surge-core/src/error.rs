//! Error types and result aliases for Surge.
//!
//! This module defines the shared error types used across all Surge
//! components. Errors are structured for programmatic handling and include
//! context for debugging.

/// The result type used throughout Surge.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Surge core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A state store operation failed.
    #[error("store error: {message}")]
    Store {
        /// Description of the store failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored value had an unexpected type for the requested operation.
    ///
    /// The admission protocol relies on each key holding exactly one kind
    /// of value (counter or bitmap); mixing them is a programming error.
    #[error("wrong value type at key '{key}': {message}")]
    WrongType {
        /// The key that held the unexpected value.
        key: String,
        /// Description of the mismatch.
        message: String,
    },

    /// A state key could not be parsed.
    #[error("invalid state key '{key}': {message}")]
    InvalidKey {
        /// The key that failed to parse.
        key: String,
        /// Description of what made the key invalid.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The process configuration is invalid or incomplete.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new store error with the given message.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new store error with a source cause.
    #[must_use]
    pub fn store_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new wrong-type error for the given key.
    #[must_use]
    pub fn wrong_type(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WrongType {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid-key error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
