//! Error types for the PromptMaster domain.
//!
//! Uses `thiserror` for ergonomic error definitions. `EngineError` is the
//! closed, caller-facing set: every failure that leaves the engine is exactly
//! one of its variants. The remaining enums belong to their bounded contexts
//! and are classified into `EngineError` at the engine boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The caller-facing error type for all engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Missing or malformed credential, or an unknown model profile id.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Missing query/image for the chosen mode, non-PDF document, oversized image.
    #[error("Invalid input: {0}")]
    InputValidation(String),

    /// The remote service rejected the credential.
    #[error("Authentication error: {0}. Re-enter your API key and try again.")]
    Auth(String),

    /// The remote service refused the content on policy grounds.
    #[error("Safety error: content blocked ({0})")]
    SafetyBlocked(String),

    /// Any other remote-call failure (network, quota, malformed response).
    #[error("Remote error: {0}")]
    Remote(String),
}

/// Discriminant of [`EngineError`], convenient for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    InputValidation,
    Auth,
    SafetyBlocked,
    Remote,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::InputValidation(_) => ErrorKind::InputValidation,
            Self::Auth(_) => ErrorKind::Auth,
            Self::SafetyBlocked(_) => ErrorKind::SafetyBlocked,
            Self::Remote(_) => ErrorKind::Remote,
        }
    }

    /// The underlying message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(m)
            | Self::InputValidation(m)
            | Self::Auth(m)
            | Self::SafetyBlocked(m)
            | Self::Remote(m) => m,
        }
    }
}

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

// --- Bounded context errors ---

/// Failures reported by a remote-model [`Provider`](crate::provider::Provider).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Response blocked by safety filter: {0}")]
    SafetyBlocked(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    retry_after_secs
        .map(|secs| format!(", retry after {secs}s"))
        .unwrap_or_default()
}

/// Failures reading or writing a persisted slot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read slot '{slot}': {reason}")]
    Read { slot: String, reason: String },

    #[error("Failed to write slot '{slot}': {reason}")]
    Write { slot: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
