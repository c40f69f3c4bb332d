//! Shared Error Types
//!
//! This module defines error types raised by the platform-agnostic domain layer.
//! They describe input that can never be turned into a valid attendance cell or
//! roster entry, independent of any remote store.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON serialization/deserialization failures
//! - `ValidationError` - Data validation failures (blank justification note, bad status code)
//! - `InvalidDate` - A date that does not normalize to a `YYYY-MM-DD` calendar day
//!
//! # Usage
//!
//! ```rust
//! use rollcall::shared::error::SharedError;
//!
//! let error = SharedError::validation("note", "Justified absences need a note");
//! assert!(error.to_string().contains("note"));
//! ```
use thiserror::Error;

/// Shared error types for the attendance domain
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Date input that cannot be used as a cell key
    #[error("Invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The raw input as received
        input: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid date error
    pub fn invalid_date(input: impl Into<String>) -> Self {
        Self::InvalidDate {
            input: input.into(),
        }
    }
}

/// Helper trait for converting serialization errors
impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
