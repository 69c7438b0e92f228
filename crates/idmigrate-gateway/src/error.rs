//! Error types for the identity gateway.

use thiserror::Error;

/// How the pipeline should react to a gateway failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// The record already exists upstream. Not a failure.
    Conflict,
    /// The provider throttled us; back off and retry.
    RateLimited,
    /// Anything else. The caller abandons the record.
    Fatal,
}

/// Errors that can occur when talking to the identity service.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The identity already exists (HTTP 422 on user creation).
    #[error("identity already exists: {0}")]
    Conflict(String),

    /// Rate limited (HTTP 429).
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying (from Retry-After header, optional).
        retry_after_secs: Option<u64>,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success response from the API.
    #[error("request failed ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Invalid response or client configuration.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Build an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Api {
            status,
            code: None,
            message: message.into(),
        }
    }

    /// Classify this error for retry and bookkeeping decisions.
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            GatewayError::Conflict(_) => GatewayErrorKind::Conflict,
            GatewayError::RateLimited { .. } => GatewayErrorKind::RateLimited,
            _ => GatewayErrorKind::Fatal,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == GatewayErrorKind::RateLimited
    }
}
