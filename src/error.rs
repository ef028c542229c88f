//! Error types for the coaching bot.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Questionnaire error: {0}")]
    Graph(#[from] GraphError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// A questionnaire definition that cannot be traversed safely.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate question key: {0}")]
    DuplicateKey(String),

    #[error("Question {0} is a single choice without options")]
    NoOptions(String),

    #[error("Question {key} has min {min} greater than max {max}")]
    InvertedBounds { key: String, min: f64, max: f64 },

    #[error("Question {key} depends on {depends_on}, which is not asked before it")]
    ForwardReference { key: String, depends_on: String },
}

/// A reply that does not satisfy the current question.
///
/// Always recoverable: the same question is asked again.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Not a number")]
    NotANumber,

    #[error("Below minimum of {min}")]
    BelowMinimum { min: f64 },

    #[error("Above maximum of {max}")]
    AboveMaximum { max: f64 },

    #[error("Not one of the offered options")]
    NotAnOption,

    #[error("Empty answer")]
    EmptyAnswer,
}

/// Onboarding session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Onboarding already in progress for conversation {0}")]
    AlreadyInProgress(String),

    #[error("No onboarding in progress for conversation {0}")]
    NoActiveSession(String),

    #[error("Selection for question {key} does not match the current question")]
    StaleSelection { key: String },

    #[error("Session store failed: {0}")]
    Store(#[from] StoreError),
}

/// Persistence errors raised by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by an outbound transport for a single send attempt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Send failed: {0}")]
    Failed(String),
}

/// Final outcome of a queued delivery that did not go through.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    #[error("Still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Delivery worker for conversation {0} stopped")]
    WorkerGone(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
