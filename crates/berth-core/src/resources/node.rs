use super::constraints::Taint;
use super::quantities::ResourceQuantities;
use k8s_openapi::api::core::v1::Node;
use std::collections::BTreeMap;

/// The scheduler's view of one candidate node.
///
/// Built from a k8s-openapi Node without failing: missing pieces are recorded
/// so the filter can reject the node instead of aborting the whole pass.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    /// Empty when the node object carried no name
    pub name: String,
    pub capacity: ResourceQuantities,
    pub allocatable: ResourceQuantities,
    pub labels: BTreeMap<String, String>,
    pub taints: Vec<Taint>,
    /// `Ready=True` among the reported conditions
    pub ready: bool,
    pub unschedulable: bool,
    pub spec_reported: bool,
    pub status_reported: bool,
}

impl NodeInfo {
    /// A ready, schedulable node with the given capacity, also used as allocatable
    pub fn new(name: impl Into<String>, capacity: ResourceQuantities) -> Self {
        Self {
            name: name.into(),
            capacity,
            allocatable: capacity,
            labels: BTreeMap::new(),
            taints: Vec::new(),
            ready: true,
            unschedulable: false,
            spec_reported: true,
            status_reported: true,
        }
    }

    pub fn with_allocatable(mut self, allocatable: ResourceQuantities) -> Self {
        self.allocatable = allocatable;
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_taint(mut self, taint: Taint) -> Self {
        self.taints.push(taint);
        self
    }

    /// Resources currently held back from scheduling (`capacity - allocatable`)
    pub fn used(&self) -> ResourceQuantities {
        ResourceQuantities::new(
            (self.capacity.cpu_millicores() - self.allocatable.cpu_millicores()).max(0),
            (self.capacity.memory_mib() - self.allocatable.memory_mib()).max(0),
        )
    }
}

impl From<&Node> for NodeInfo {
    fn from(node: &Node) -> Self {
        let status = node.status.as_ref();

        let capacity = status
            .and_then(|s| s.capacity.as_ref())
            .map(ResourceQuantities::from_k8s_resource_map)
            .unwrap_or_default();
        let allocatable = status
            .and_then(|s| s.allocatable.as_ref())
            .map(ResourceQuantities::from_k8s_resource_map)
            .unwrap_or_default();

        let ready = status
            .and_then(|s| s.conditions.as_ref())
            .is_some_and(|conditions| {
                conditions
                    .iter()
                    .any(|c| c.type_ == "Ready" && c.status == "True")
            });

        let taints = node
            .spec
            .as_ref()
            .and_then(|s| s.taints.as_ref())
            .map(|t| t.iter().map(Taint::from).collect())
            .unwrap_or_default();

        Self {
            name: node.metadata.name.clone().unwrap_or_default(),
            capacity,
            allocatable,
            labels: node.metadata.labels.clone().unwrap_or_default(),
            taints,
            ready,
            unschedulable: node
                .spec
                .as_ref()
                .and_then(|s| s.unschedulable)
                .unwrap_or(false),
            spec_reported: node.spec.is_some(),
            status_reported: status.is_some(),
        }
    }
}
