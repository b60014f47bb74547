use super::constraints::{NodeAffinity, Toleration};
use super::quantities::ResourceQuantities;
use crate::error::{BerthError, Result};
use k8s_openapi::api::core::v1::Pod;
use std::fmt;

/// Namespace assumed when a pod does not carry one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Pod quality-of-service class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosClass {
    Guaranteed,
    Burstable,
    BestEffort,
}

impl QosClass {
    /// Derive the class from normalized requests and limits.
    ///
    /// `BestEffort` when nothing is set, `Guaranteed` when limits are set and
    /// equal the requests for every resource, otherwise `Burstable`.
    pub fn classify(requests: &ResourceQuantities, limits: &ResourceQuantities) -> Self {
        if requests.is_empty() && limits.is_empty() {
            return Self::BestEffort;
        }

        if !limits.is_empty()
            && limits.cpu_millicores() == requests.cpu_millicores()
            && limits.memory_mib() == requests.memory_mib()
        {
            return Self::Guaranteed;
        }

        Self::Burstable
    }
}

impl fmt::Display for QosClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Guaranteed => write!(f, "Guaranteed"),
            Self::Burstable => write!(f, "Burstable"),
            Self::BestEffort => write!(f, "BestEffort"),
        }
    }
}

/// The scheduler's view of one pod awaiting placement
#[derive(Debug, Clone, PartialEq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub scheduler_name: Option<String>,
    /// Set once the pod has been placed
    pub node_name: Option<String>,
    pub phase: Option<String>,
    /// Set once deletion of the pod has been requested
    pub terminating: bool,
    /// First-container requests, normalized
    pub requests: ResourceQuantities,
    /// First-container limits, normalized
    pub limits: ResourceQuantities,
    pub tolerations: Vec<Toleration>,
    pub node_affinity: Option<NodeAffinity>,
}

impl PodInfo {
    /// Create a bare pod view with no constraints or resources
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            scheduler_name: None,
            node_name: None,
            phase: None,
            terminating: false,
            requests: ResourceQuantities::default(),
            limits: ResourceQuantities::default(),
            tolerations: Vec::new(),
            node_affinity: None,
        }
    }

    /// Build the view from a k8s-openapi Pod.
    ///
    /// A pod without a name or without a spec is malformed.
    pub fn from_pod(pod: &Pod) -> Result<Self> {
        let name = pod
            .metadata
            .name
            .clone()
            .ok_or_else(|| BerthError::malformed("Pod", "missing metadata.name"))?;
        let namespace = pod
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let spec = pod
            .spec
            .as_ref()
            .ok_or_else(|| BerthError::malformed("Pod", format!("{}/{} has no spec", namespace, name)))?;

        let resources = spec
            .containers
            .first()
            .and_then(|c| c.resources.as_ref());
        let requests = resources
            .and_then(|r| r.requests.as_ref())
            .map(ResourceQuantities::from_k8s_resource_map)
            .unwrap_or_default();
        let limits = resources
            .and_then(|r| r.limits.as_ref())
            .map(ResourceQuantities::from_k8s_resource_map)
            .unwrap_or_default();

        let tolerations = spec
            .tolerations
            .iter()
            .flatten()
            .map(Toleration::from)
            .collect();

        let node_affinity = spec
            .affinity
            .as_ref()
            .and_then(NodeAffinity::from_affinity);

        Ok(Self {
            name,
            namespace,
            scheduler_name: spec.scheduler_name.clone(),
            node_name: spec.node_name.clone().filter(|n| !n.is_empty()),
            phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
            terminating: pod.metadata.deletion_timestamp.is_some(),
            requests,
            limits,
            tolerations,
            node_affinity,
        })
    }

    pub fn qos_class(&self) -> QosClass {
        QosClass::classify(&self.requests, &self.limits)
    }

    /// True when the pod has reached `Succeeded` or `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self.phase.as_deref(), Some("Succeeded") | Some("Failed"))
    }

    /// `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec, ResourceRequirements};
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    fn resource_map(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(memory.to_string())),
        ])
    }

    fn pod_with_resources(
        requests: Option<BTreeMap<String, Quantity>>,
        limits: Option<BTreeMap<String, Quantity>>,
    ) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some("web".to_string());
        pod.spec = Some(PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                resources: Some(ResourceRequirements {
                    requests,
                    limits,
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        });
        pod
    }

    #[test]
    fn test_qos_classification() {
        let guaranteed = pod_with_resources(
            Some(resource_map("500m", "512Mi")),
            Some(resource_map("500m", "512Mi")),
        );
        assert_eq!(
            PodInfo::from_pod(&guaranteed).unwrap().qos_class(),
            QosClass::Guaranteed
        );

        let burstable = pod_with_resources(
            Some(resource_map("500m", "512Mi")),
            Some(resource_map("1", "512Mi")),
        );
        assert_eq!(
            PodInfo::from_pod(&burstable).unwrap().qos_class(),
            QosClass::Burstable
        );

        let requests_only = pod_with_resources(Some(resource_map("500m", "512Mi")), None);
        assert_eq!(
            PodInfo::from_pod(&requests_only).unwrap().qos_class(),
            QosClass::Burstable
        );

        let best_effort = pod_with_resources(None, None);
        assert_eq!(
            PodInfo::from_pod(&best_effort).unwrap().qos_class(),
            QosClass::BestEffort
        );
    }

    #[test]
    fn test_equal_units_compare_after_normalization() {
        let pod = pod_with_resources(
            Some(resource_map("0.5", "536870912")),
            Some(resource_map("500m", "512Mi")),
        );
        assert_eq!(PodInfo::from_pod(&pod).unwrap().qos_class(), QosClass::Guaranteed);
    }

    #[test]
    fn test_from_pod_defaults() {
        let pod = pod_with_resources(None, None);
        let info = PodInfo::from_pod(&pod).unwrap();
        assert_eq!(info.namespace, DEFAULT_NAMESPACE);
        assert_eq!(info.key(), "default/web");
        assert!(info.node_name.is_none());
        assert!(info.tolerations.is_empty());
        assert!(info.node_affinity.is_none());
        assert!(!info.is_terminal());
    }

    #[test]
    fn test_from_pod_rejects_malformed() {
        let mut no_spec = Pod::default();
        no_spec.metadata.name = Some("web".to_string());
        assert!(PodInfo::from_pod(&no_spec).is_err());

        let mut no_name = pod_with_resources(None, None);
        no_name.metadata.name = None;
        assert!(PodInfo::from_pod(&no_name).is_err());
    }
}
