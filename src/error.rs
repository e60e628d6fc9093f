use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the schedule assistant
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Validation error: {0}")]
    #[diagnostic(code(schedule_assistant::validation))]
    Validation(String),

    #[error("Not found: {0}")]
    #[diagnostic(code(schedule_assistant::not_found))]
    NotFound(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(schedule_assistant::config),
        help("check config/models.toml and the provider credentials in the environment")
    )]
    Configuration(String),

    #[error("Model completion failed: {0}")]
    #[diagnostic(code(schedule_assistant::upstream_model))]
    UpstreamModel(String),

    #[error("Schedule store error: {0}")]
    #[diagnostic(code(schedule_assistant::store))]
    Store(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(schedule_assistant::environment))]
    Environment(String),

    #[error(transparent)]
    #[diagnostic(code(schedule_assistant::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(schedule_assistant::serialization))]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Store(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AssistantResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create validation errors
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// Helper to create not-found errors
pub fn not_found_error(message: &str) -> Error {
    Error::NotFound(message.to_string())
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Configuration(message.to_string())
}

/// Helper to create store errors
pub fn store_error(message: &str) -> Error {
    Error::Store(message.to_string())
}

/// Helper to create upstream model errors
pub fn upstream_error(message: &str) -> Error {
    Error::UpstreamModel(message.to_string())
}
