//! Error types for TaskFlow.

/// Startup and initialization errors. Per-input failures are reported as
/// [`PipelineError`] inside a failed result envelope instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while normalizing raw input (email parsing, transcription).
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Malformed email: {0}")]
    MalformedEmail(String),

    #[error("Audio file not found: {0}")]
    AudioNotFound(String),

    #[error("Transcription via {service} failed: {reason}")]
    Transcription { service: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Task-tracker backend errors.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Not authenticated with the task tracker")]
    NotAuthenticated,

    #[error("Authentication failed ({status}): {body}")]
    AuthFailed { status: u16, body: String },

    #[error("Tracker returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Hard failures of a single pipeline invocation.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Input normalization failed: {0}")]
    Intake(#[from] IntakeError),

    #[error("Task creation failed: {0}")]
    Tracker(#[from] TrackerError),
}
