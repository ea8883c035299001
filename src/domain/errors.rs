//! Domain error types
//!
//! This module defines the error hierarchy for Dmed. All errors are
//! domain-specific and don't expose third-party types: store implementations
//! translate driver failures into [`DmedError`] before they cross the
//! service boundary.

use thiserror::Error;

/// Main Dmed error type
///
/// This is the primary error type used throughout the application. Each
/// variant maps to a distinct caller-facing outcome, so a boundary layer
/// (HTTP, CLI, ...) can translate it without inspecting message strings.
#[derive(Debug, Error)]
pub enum DmedError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested row is absent
    #[error("{resource} with id={id} not found")]
    NotFound {
        /// Resource kind, e.g. "Patient"
        resource: &'static str,
        /// Identifier that failed to resolve
        id: i64,
    },

    /// Cross-field or referential check failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness violation, detected pre-write or reported by the store
    #[error("{resource} with {field}={value} already exists")]
    AlreadyExists {
        /// Resource kind, e.g. "User"
        resource: &'static str,
        /// Field carrying the unique constraint
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// Identifier allocation gave up after its attempt budget
    #[error("{operation} exhausted after {attempts} attempts")]
    ExhaustedRetries {
        /// Operation that ran out of attempts
        operation: &'static str,
        /// Attempt budget that was consumed
        attempts: usize,
    },

    /// Credential verification failed (uniform message on purpose)
    #[error("Invalid JSHSHIR or password")]
    InvalidCredentials,

    /// Underlying persistence error; propagated, not swallowed
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl DmedError {
    /// Shorthand for a [`DmedError::NotFound`]
    pub fn not_found(resource: &'static str, id: i64) -> Self {
        DmedError::NotFound { resource, id }
    }

    /// Shorthand for a [`DmedError::AlreadyExists`]
    pub fn already_exists(
        resource: &'static str,
        field: &'static str,
        value: impl Into<String>,
    ) -> Self {
        DmedError::AlreadyExists {
            resource,
            field,
            value: value.into(),
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for DmedError {
    fn from(err: std::io::Error) -> Self {
        DmedError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for DmedError {
    fn from(err: serde_json::Error) -> Self {
        DmedError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for DmedError {
    fn from(err: toml::de::Error) -> Self {
        DmedError::Configuration(format!("TOML parse error: {err}"))
    }
}
