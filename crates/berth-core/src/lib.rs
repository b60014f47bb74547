//! Berth Core - Resource model for the Berth pod scheduler
//!
//! This crate provides:
//! - Quantity normalization (CPU millicores, memory MiB)
//! - Typed pod and node views with central zero-value fallbacks
//! - Taints, tolerations, and node affinity
//! - Watch event wire types
//! - Error types with miette diagnostics

pub mod error;
pub mod events;
pub mod resources;

// Re-export commonly used types
pub use error::{BerthError, Result};
pub use events::{WatchEvent, WatchEventType};
pub use resources::{
    MatchExpression, NodeAffinity, NodeInfo, NodeSelectorTerm, PodInfo, QosClass,
    ResourceQuantities, SelectorOperator, Taint, TaintEffect, Toleration, TolerationOperator,
};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::core::v1::{Node, Pod};

/// Deserialize a resource from JSON bytes
pub fn from_json_slice<T: for<'de> serde::Deserialize<'de>>(data: &[u8]) -> Result<T> {
    serde_json::from_slice(data).map_err(|e| {
        BerthError::serialization_error(
            format!("Failed to deserialize from JSON: {}", e),
            Some(Box::new(e)),
        )
    })
}

/// Deserialize a resource from YAML
pub fn from_yaml<T: for<'de> serde::Deserialize<'de>>(data: &str) -> Result<T> {
    serde_yaml::from_str(data).map_err(|e| {
        BerthError::serialization_error(
            format!("Failed to deserialize from YAML: {}", e),
            Some(Box::new(e)),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_pod_manifest() {
        let yaml = r#"
apiVersion: v1
kind: Pod
metadata:
  name: nginx
spec:
  schedulerName: berth-scheduler
  containers:
    - name: nginx
      image: nginx
      resources:
        requests:
          cpu: 500m
          memory: 512Mi
"#;
        let pod: Pod = from_yaml(yaml).unwrap();
        let info = PodInfo::from_pod(&pod).unwrap();
        assert_eq!(info.scheduler_name.as_deref(), Some("berth-scheduler"));
        assert_eq!(info.requests, ResourceQuantities::new(500, 512));
    }

    #[test]
    fn test_json_slice() {
        let event: WatchEvent =
            from_json_slice(br#"{"type":"DELETED","object":{}}"#).unwrap();
        assert_eq!(event.event_type, WatchEventType::Deleted);
        assert!(from_json_slice::<WatchEvent>(b"{not json").is_err());
    }
}
