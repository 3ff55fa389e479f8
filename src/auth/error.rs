use thiserror::Error;

use crate::error::DocAgentError;

/// Authentication errors for the Microsoft identity platform.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Authorization pending")]
    AuthorizationPending,
    #[error("Access denied")]
    AccessDenied,
    #[error("Device code expired, please try again")]
    DeviceCodeExpired,
    #[error("Expired or invalid grant")]
    ExpiredOrInvalidGrant,
    #[error("Rate limited")]
    RateLimited { retry_after_ms: Option<u64> },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for DocAgentError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::RateLimited { retry_after_ms } => {
                DocAgentError::RateLimited { retry_after_ms }
            }
            AuthError::NotConfigured(msg) => DocAgentError::Configuration(msg),
            AuthError::Network(msg) => DocAgentError::Authentication(format!("network: {msg}")),
            other => DocAgentError::Authentication(other.to_string()),
        }
    }
}
