//! Domain error types
//!
//! One taxonomy covers every failure the provider core can surface to the
//! API layer. Storage failures that carry no domain meaning are wrapped in
//! [`ProviderError::Repository`].

use thiserror::Error;

/// Errors surfaced by provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The registration is disabled or in the wrong state for the operation
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Deletion is blocked by dependent resources
    #[error("Not empty: {0}")]
    NotEmpty(String),

    /// A referenced resource does not exist
    #[error("{resource} {reference} not found")]
    NotFound {
        /// Category of the missing resource (e.g. "Region", "Cloud account")
        resource: String,
        /// The id or name that failed to resolve
        reference: String,
    },

    /// Malformed input (e.g. an unparsable sync range payload)
    #[error("Invalid input: {0}")]
    InputParameter(String),

    /// The stored secret could not be decrypted
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The requester lacks the privilege for the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A concurrent writer won the race on the same registration
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Opaque upstream failure (e.g. the live cloud endpoint)
    #[error("General error: {0}")]
    General(String),

    /// Storage failure without domain classification
    #[error(transparent)]
    Repository(#[from] anyhow::Error),
}

impl ProviderError {
    /// Shorthand for a [`ProviderError::NotFound`]
    pub fn not_found(resource: impl Into<String>, reference: impl Into<String>) -> Self {
        ProviderError::NotFound {
            resource: resource.into(),
            reference: reference.into(),
        }
    }

    /// Stable machine-readable kind, used by the API layer for status mapping
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::InvalidStatus(_) => "invalid_status",
            ProviderError::NotEmpty(_) => "not_empty",
            ProviderError::NotFound { .. } => "not_found",
            ProviderError::InputParameter(_) => "input_parameter",
            ProviderError::Decryption(_) => "decryption",
            ProviderError::Forbidden(_) => "forbidden",
            ProviderError::Conflict(_) => "conflict",
            ProviderError::General(_) => "general",
            ProviderError::Repository(_) => "repository",
        }
    }
}
