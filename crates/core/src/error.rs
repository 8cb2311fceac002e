//! Error types for the SevaSaathi domain.
//!
//! Each bounded context has its own `thiserror` enum. Configuration errors
//! live in `sevasaathi-config`; gateway failures are outcomes, not errors.

use thiserror::Error;

// --- Bounded context errors ---

/// Failures while reading or validating the scheme catalog source.
///
/// All of these are fatal at load time.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    #[error("Failed to read scheme data at {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Scheme data is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Scheme data must be a JSON array of objects, found {found}")]
    NotAnArray { found: String },

    #[error("Scheme record #{index} is malformed: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Scheme record #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Scheme record #{index} duplicates the name '{name}'")]
    DuplicateName { index: usize, name: String },
}

/// Typed failures reported by a language-model backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether another attempt at the same request could succeed.
    ///
    /// Transport failures, timeouts, rate limits, 5xx and garbled bodies are
    /// transient. Credentials, quota, bad requests and unknown models are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::RateLimited { .. }
            | Self::MalformedResponse(_)
            | Self::Timeout(_)
            | Self::Network(_) => true,
            Self::QuotaExceeded(_)
            | Self::AuthenticationFailed(_)
            | Self::InvalidRequest(_)
            | Self::ModelNotFound(_)
            | Self::NotConfigured(_) => false,
        }
    }
}
