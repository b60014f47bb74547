// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for Berth resource handling
#[derive(Error, Debug, Diagnostic)]
pub enum BerthError {
    /// A resource quantity string could not be parsed
    #[error("Invalid quantity '{value}': {reason}")]
    #[diagnostic(
        code(berth::invalid_quantity),
        help("Use Kubernetes quantity syntax, e.g. '500m' or '2' for CPU and '512Mi' or '1Gi' for memory")
    )]
    InvalidQuantity {
        #[allow(unused)]
        value: String,
        #[allow(unused)]
        reason: String,
    },

    /// A resource is missing a field the scheduler cannot do without
    #[error("Malformed {kind}: {reason}")]
    #[diagnostic(
        code(berth::malformed_resource),
        help("The object is missing metadata or spec; it will be skipped")
    )]
    MalformedResource {
        #[allow(unused)]
        kind: String,
        #[allow(unused)]
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(berth::serialization_error),
        help("Ensure the resource format is valid JSON or YAML")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for Berth core operations
pub type Result<T> = std::result::Result<T, BerthError>;

impl BerthError {
    /// Create an InvalidQuantity error
    pub fn invalid_quantity(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQuantity {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MalformedResource error
    pub fn malformed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResource {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}
