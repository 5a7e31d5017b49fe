//! Error types for querybot services

/// Result type alias using QueryBotError
pub type Result<T> = std::result::Result<T, QueryBotError>;

/// Main error type for querybot services
#[derive(Debug, thiserror::Error)]
pub enum QueryBotError {
    /// Credential rejected by a remote service
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Natural-language translation failed
    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Daily budget or similar quota exhausted
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Dependent service missing or down
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl QueryBotError {
    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            QueryBotError::AuthenticationFailed(_) => "UNAUTHENTICATED",
            QueryBotError::TranslationFailed(_) => "TRANSLATION_FAILED",
            QueryBotError::ConfigError(_) => "CONFIG_ERROR",
            QueryBotError::RateLimited(_) => "RESOURCE_EXHAUSTED",
            QueryBotError::ServiceUnavailable(_) => "UNAVAILABLE",
        }
    }
}

impl From<config::ConfigError> for QueryBotError {
    fn from(err: config::ConfigError) -> Self {
        QueryBotError::ConfigError(err.to_string())
    }
}
