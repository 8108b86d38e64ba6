//! Error handling for score extraction.
//!
//! Covers the three failure classes a run can hit: the PDF does not have the
//! expected table layout, a numeric cell cannot be coerced, or a file cannot
//! be read or written.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GymScoreError {
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("Unexpected layout in {path}: {reason}")]
    MalformedInput { path: PathBuf, reason: String },

    #[error("Cannot read {field} value '{value}' as a number ({context})")]
    FieldCoercion {
        field: String,
        value: String,
        context: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl GymScoreError {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a PDF loading/decoding error
    pub fn pdf(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Pdf {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a layout error for a PDF that lacks the expected table structure
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a numeric coercion error
    pub fn field_coercion(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::FieldCoercion {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for GymScoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

pub type Result<T> = std::result::Result<T, GymScoreError>;
