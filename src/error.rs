//! Error types for the Bedrock client and CLI

use thiserror::Error;

/// Boxed cause carried out of the transport layer
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    /// Required settings are unset; holds the comma-separated variable names
    #[error("Missing required configuration: {0}. Set it in the environment or a .env file")]
    ConfigurationMissing(String),

    /// Config file, config directory or a configured value is unusable
    #[error("Failed to read configuration: {0}")]
    ConfigError(String),

    /// The remote call failed to open or broke mid-stream
    #[error("Can't invoke '{model_id}'. Reason: {reason}")]
    Invocation {
        /// Model the request was aimed at
        model_id: String,
        /// Underlying transport error
        reason: BoxError,
    },

    /// The service answered a streaming call without a stream handle
    #[error("Can't stream conversation for '{model_id}'. Reason: No stream in response")]
    StreamUnavailable {
        /// Model the request was aimed at
        model_id: String,
    },

    /// A blocking response lacked the answer or the reasoning
    #[error("Response from '{model_id}' has no {block} content block")]
    MissingContentBlock {
        /// Model that produced the response
        model_id: String,
        /// `"text"` or `"reasoning"`
        block: &'static str,
    },

    /// The user message was empty
    #[error("User message must not be empty")]
    EmptyMessage,

    /// A chat command carried a bad or out-of-range value
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// JSON (de)serialization failed
    #[error("Failed to parse data: {0}")]
    ParseError(#[from] serde_json::Error),

    /// File or terminal IO failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reading from the interactive prompt failed
    #[error("Input error: {0}")]
    Prompt(String),
}

impl AppError {
    /// Wrap a transport failure together with the model it was aimed at
    pub fn invocation(model_id: &str, reason: impl Into<BoxError>) -> Self {
        Self::Invocation {
            model_id: model_id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
