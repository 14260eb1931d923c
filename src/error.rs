//! Error types for newsdesk.

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Review error: {0}")]
    Review(#[from] ReviewError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failures talking to the onboarding service.
///
/// The `Display` output is the human-readable message surfaced to users as
/// the controller's `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Non-success HTTP response.
    #[error("Erro {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The request never produced a response (connect, timeout, TLS...).
    #[error("{0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The service answered successfully but the flow cannot continue.
    #[error("{0}")]
    Flow(String),
}

impl ApiError {
    pub fn flow(message: impl Into<String>) -> Self {
        Self::Flow(message.into())
    }
}

/// Draft review errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("Draft {id} not found")]
    NotFound { id: Uuid },

    #[error("Draft {id} is {status}, only pending drafts can be reviewed")]
    NotPending { id: Uuid, status: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
