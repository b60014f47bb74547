// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// The orchestrator API answered with a non-success status
    #[error("API request failed with status {code}: {body}")]
    #[diagnostic(
        code(scheduler::api_error),
        help("Check RBAC permissions for the scheduler's service account")
    )]
    ApiError { code: u16, body: String },

    /// The orchestrator API could not be reached
    #[error("Transport error: {message}")]
    #[diagnostic(
        code(scheduler::transport_error),
        help("Check the API server URL and network connectivity")
    )]
    TransportError { message: String },

    /// A watch event could not be decoded or lacks required fields
    #[error("Malformed event: {message}")]
    #[diagnostic(
        code(scheduler::malformed_event),
        help("The event is skipped; the watch continues")
    )]
    MalformedEvent { message: String },

    /// Binding a pod to the chosen node failed
    #[error("Failed to bind pod {pod_name} to node {node_name}: {source}")]
    #[diagnostic(
        code(scheduler::bind_failed),
        help("The binding is not retried; the pod stays pending until it is observed again")
    )]
    BindFailed {
        pod_name: String,
        node_name: String,
        #[source]
        source: Box<SchedulerError>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(scheduler::invalid_config), help("{suggestion}"))]
    InvalidConfig { message: String, suggestion: String },

    /// Core error
    #[error("Core error: {0}")]
    #[diagnostic(
        code(scheduler::core_error),
        help("This is an internal error")
    )]
    CoreError(#[from] berth_core::BerthError),
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create an ApiError
    pub fn api_error(code: u16, body: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            body: body.into(),
        }
    }

    /// Create a TransportError
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Create a MalformedEvent error
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            message: message.into(),
        }
    }

    /// Create a BindFailed error
    pub fn bind_failed(
        pod_name: impl Into<String>,
        node_name: impl Into<String>,
        source: SchedulerError,
    ) -> Self {
        Self::BindFailed {
            pod_name: pod_name.into(),
            node_name: node_name.into(),
            source: Box::new(source),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Whether a stream item with this error ends the watch connection.
    ///
    /// Malformed events are skipped; everything else triggers a reconnect.
    pub fn ends_watch(&self) -> bool {
        !matches!(self, Self::MalformedEvent { .. })
    }
}
