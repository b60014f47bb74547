// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use berth_scheduler::SchedulerError;
use miette::Diagnostic;
use thiserror::Error;

/// API client error type
#[derive(Error, Debug, Diagnostic)]
pub enum ClientError {
    /// The API server answered with a non-success status
    #[error("{operation} failed with status {status}: {body}")]
    #[diagnostic(
        code(client::http_error),
        help("Check that the scheduler's credentials allow this request")
    )]
    Http {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("HTTP request failed: {message}")]
    #[diagnostic(
        code(client::transport_error),
        help("Check that the API server at the configured URL is reachable")
    )]
    Transport { message: String },

    /// The response body could not be decoded
    #[error("Failed to decode {what}: {message}")]
    #[diagnostic(code(client::decode_error))]
    Decode { what: String, message: String },

    /// Client setup failed
    #[error("Invalid client configuration: {message}")]
    #[diagnostic(code(client::invalid_config), help("{suggestion}"))]
    InvalidConfig { message: String, suggestion: String },
}

/// Result type for API client operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create an Http error
    pub fn http(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a Decode error
    pub fn decode(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::transport(e.to_string())
    }
}

impl From<ClientError> for SchedulerError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Http { status, body, .. } => SchedulerError::api_error(status, body),
            ClientError::Transport { message } => SchedulerError::transport_error(message),
            other => SchedulerError::transport_error(other.to_string()),
        }
    }
}
