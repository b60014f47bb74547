use crate::error::{BerthError, Result};
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// Watch event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WatchEventType {
    Added,
    Modified,
    Deleted,
    Bookmark,
    Error,
}

/// One event from a pod watch stream, in Kubernetes wire format.
///
/// The object is kept as raw JSON so a malformed object can be reported
/// without losing the event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: WatchEventType,
    pub object: serde_json::Value,
}

impl WatchEvent {
    /// Create an ADDED event
    pub fn added(object: serde_json::Value) -> Self {
        Self {
            event_type: WatchEventType::Added,
            object,
        }
    }

    /// Create a MODIFIED event
    pub fn modified(object: serde_json::Value) -> Self {
        Self {
            event_type: WatchEventType::Modified,
            object,
        }
    }

    /// Create a DELETED event
    pub fn deleted(object: serde_json::Value) -> Self {
        Self {
            event_type: WatchEventType::Deleted,
            object,
        }
    }

    /// Decode the carried object as a Pod
    pub fn decode_pod(&self) -> Result<Pod> {
        serde_json::from_value(self.object.clone()).map_err(|e| {
            BerthError::serialization_error(
                format!("Failed to decode pod from {:?} event: {}", self.event_type, e),
                Some(Box::new(e)),
            )
        })
    }

    /// Short description of an ERROR event's status object
    pub fn error_message(&self) -> String {
        self.object
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("no message")
            .to_string()
    }
}
