//! Configuration Error Types
//!
//! Errors raised while loading, decoding and validating check configuration.
//! Any of these prevents the check from starting.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// A size string that does not match `<digits>[b|k|m|g|t]`
    #[error("Invalid size: {0}")]
    InvalidSize(String),

    /// Failure in the layered source loader (file or environment)
    #[error("Failed to load configuration from {source_name}: {error}")]
    SourceError { source_name: String, error: String },
}

impl ConfigurationError {
    pub fn missing_required_field<F: Into<String>, C: Into<String>>(field: F, context: C) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value<F, V, C>(field: F, value: V, context: C) -> Self
    where
        F: Into<String>,
        V: ToString,
        C: Into<String>,
    {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            context: context.into(),
        }
    }

    pub fn source_error<S: Into<String>, E: std::fmt::Display>(source_name: S, error: E) -> Self {
        Self::SourceError {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
