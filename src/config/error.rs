//! Configuration error types.

use thiserror::Error;

/// Errors that occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying config crate failure (missing vars, type mismatches).
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors that occur while validating loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required setting is missing.
    #[error("missing required configuration: {0}")]
    MissingRequired(&'static str),

    /// No AI provider has an API key configured.
    #[error("no AI provider configured")]
    NoAiProviderConfigured,

    /// A setting is outside its valid range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Creates an invalid-value error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
