//! Error types for document operations, persistence and configuration

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while decoding a serialized home document
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected document shape: {message}")]
    Shape { message: String },
}

impl ParseError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape {
            message: message.into(),
        }
    }
}

/// Errors surfaced by the home engine and its service boundary
#[derive(Debug, Error)]
pub enum HomeError {
    /// Malformed input; the document is left untouched
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Referenced document, widget or snapshot does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// I/O failure while reading or writing durable state
    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// The three outcomes a caller of the boundary must tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NotFound,
    Invalid,
    Failed,
}

impl HomeError {
    /// Create a validation error for a named input field
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a storage error for the given path
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Classify this error for the boundary
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::NotFound { .. } => Outcome::NotFound,
            Self::Validation { .. } | Self::Parse(_) => Outcome::Invalid,
            Self::Storage { .. } | Self::Config(_) => Outcome::Failed,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.outcome() == Outcome::NotFound
    }
}
