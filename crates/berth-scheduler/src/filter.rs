use crate::types::FilterResult;
use berth_core::{NodeInfo, PodInfo, TaintEffect};
use tracing::debug;

/// Filter predicate trait
pub trait FilterPredicate: Send + Sync {
    /// Filter a node for the given pod
    fn filter(&self, pod: &PodInfo, node: &NodeInfo) -> FilterResult;

    /// Name of the filter
    fn name(&self) -> &str;
}

/// Rejects nodes whose object lacks a name, spec, or status
pub struct NodeWellFormed;

impl FilterPredicate for NodeWellFormed {
    fn filter(&self, _pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        if node.name.is_empty() {
            return FilterResult::fail(node.name.clone(), "Node has no name".to_string());
        }
        if !node.spec_reported {
            return FilterResult::fail(node.name.clone(), "Node has no spec".to_string());
        }
        if !node.status_reported {
            return FilterResult::fail(node.name.clone(), "Node has no status".to_string());
        }
        FilterResult::pass(node.name.clone())
    }

    fn name(&self) -> &str {
        "NodeWellFormed"
    }
}

/// Requires the node to report `Ready=True`
pub struct NodeReady;

impl FilterPredicate for NodeReady {
    fn filter(&self, _pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        if node.ready {
            FilterResult::pass(node.name.clone())
        } else {
            FilterResult::fail(node.name.clone(), "Node is not ready".to_string())
        }
    }

    fn name(&self) -> &str {
        "NodeReady"
    }
}

/// Vetoes cordoned nodes
pub struct NodeSchedulable;

impl FilterPredicate for NodeSchedulable {
    fn filter(&self, _pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        if node.unschedulable {
            FilterResult::fail(node.name.clone(), "Node is marked unschedulable".to_string())
        } else {
            FilterResult::pass(node.name.clone())
        }
    }

    fn name(&self) -> &str {
        "NodeSchedulable"
    }
}

/// Filter for taints and tolerations.
///
/// Only `NoSchedule` taints block placement. `PreferNoSchedule` and
/// `NoExecute` taints are currently not enforced.
pub struct TaintToleration;

impl FilterPredicate for TaintToleration {
    fn filter(&self, pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        for taint in node
            .taints
            .iter()
            .filter(|t| t.effect == TaintEffect::NoSchedule)
        {
            if !pod.tolerations.iter().any(|t| t.tolerates(taint)) {
                return FilterResult::fail(
                    node.name.clone(),
                    format!("Pod does not tolerate taint: {}", taint),
                );
            }
        }

        FilterResult::pass(node.name.clone())
    }

    fn name(&self) -> &str {
        "TaintToleration"
    }
}

/// Filter for required node affinity
pub struct NodeAffinityMatch;

impl FilterPredicate for NodeAffinityMatch {
    fn filter(&self, pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        match &pod.node_affinity {
            None => FilterResult::pass(node.name.clone()),
            Some(affinity) if affinity.matches(&node.labels) => {
                FilterResult::pass(node.name.clone())
            }
            Some(_) => FilterResult::fail(
                node.name.clone(),
                "Node labels match no required affinity term".to_string(),
            ),
        }
    }

    fn name(&self) -> &str {
        "NodeAffinity"
    }
}

/// Pod anti-affinity extension point.
///
/// Not evaluated: every node passes.
pub struct PodAntiAffinity;

impl FilterPredicate for PodAntiAffinity {
    fn filter(&self, _pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        FilterResult::pass(node.name.clone())
    }

    fn name(&self) -> &str {
        "PodAntiAffinity"
    }
}

/// Filter for pod resource requirements
pub struct PodFitsResources;

impl FilterPredicate for PodFitsResources {
    fn filter(&self, pod: &PodInfo, node: &NodeInfo) -> FilterResult {
        let requested = &pod.requests;
        let available = &node.allocatable;

        debug!(
            "Node {} has CPU: {} milli, Memory: {} MiB",
            node.name,
            available.cpu_millicores(),
            available.memory_mib()
        );

        if requested.cpu_millicores() > available.cpu_millicores() {
            return FilterResult::fail(
                node.name.clone(),
                format!(
                    "Insufficient CPU: requested {} milli, available {} milli",
                    requested.cpu_millicores(),
                    available.cpu_millicores()
                ),
            );
        }

        if requested.memory_mib() > available.memory_mib() {
            return FilterResult::fail(
                node.name.clone(),
                format!(
                    "Insufficient memory: requested {} MiB, available {} MiB",
                    requested.memory_mib(),
                    available.memory_mib()
                ),
            );
        }

        FilterResult::pass(node.name.clone())
    }

    fn name(&self) -> &str {
        "PodFitsResources"
    }
}

/// Get default filter predicates, cheapest first
pub fn default_filters() -> Vec<Box<dyn FilterPredicate>> {
    vec![
        Box::new(NodeWellFormed),
        Box::new(NodeReady),
        Box::new(NodeSchedulable),
        Box::new(TaintToleration),
        Box::new(NodeAffinityMatch),
        Box::new(PodAntiAffinity),
        Box::new(PodFitsResources),
    ]
}

/// Run the predicates in order and return the first failure as
/// `(predicate name, reason)`, or `None` when the node is eligible.
pub fn first_failure(
    filters: &[Box<dyn FilterPredicate>],
    pod: &PodInfo,
    node: &NodeInfo,
) -> Option<(String, String)> {
    filters.iter().find_map(|filter| {
        let result = filter.filter(pod, node);
        if result.passed {
            None
        } else {
            Some((filter.name().to_string(), result.reason.unwrap_or_default()))
        }
    })
}

/// Reduce `nodes` to the ones `pod` may run on, preserving input order.
pub fn filter_eligible(
    filters: &[Box<dyn FilterPredicate>],
    pod: &PodInfo,
    nodes: &[NodeInfo],
) -> Vec<NodeInfo> {
    nodes
        .iter()
        .filter(|node| match first_failure(filters, pod, node) {
            None => true,
            Some((predicate, reason)) => {
                debug!(
                    "Node {} filtered out by {}: {}",
                    node.name, predicate, reason
                );
                false
            }
        })
        .cloned()
        .collect()
}
