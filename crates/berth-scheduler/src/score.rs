use crate::config::ScoringWeights;
use crate::types::{PlacementDecision, ScoreResult};
use berth_core::{NodeInfo, PodInfo, QosClass};
use tracing::debug;

/// Traffic cost extension point.
///
/// Intended to penalize nodes with costly network paths to the pod's
/// dependent workloads.
pub trait TrafficCost: Send + Sync {
    fn cost(&self, pod: &PodInfo, node: &NodeInfo) -> f64;

    /// Name of the cost model
    fn name(&self) -> &str;
}

/// Default traffic model: every node costs nothing
pub struct NoTrafficCost;

impl TrafficCost for NoTrafficCost {
    fn cost(&self, _pod: &PodInfo, _node: &NodeInfo) -> f64 {
        0.0
    }

    fn name(&self) -> &str {
        "NoTrafficCost"
    }
}

/// Multiplier applied to a pod's node score by QoS class
pub fn qos_factor(class: QosClass) -> f64 {
    match class {
        QosClass::Guaranteed => 1.0,
        QosClass::Burstable => 0.5,
        QosClass::BestEffort => 0.1,
    }
}

/// Ranks eligible nodes for a pod.
///
/// ```text
/// resource_cost = (avail_cpu*cf + avail_mem*mf) - (req_cpu*cf + req_mem*mf)
/// saturation    = (used_cpu + used_mem) / (total_cpu + total_mem)
/// score         = qos * (alpha*resource_cost - beta*traffic_cost - gamma*saturation)
/// ```
pub struct ScoringEngine {
    weights: ScoringWeights,
    traffic: Box<dyn TrafficCost>,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self::with_traffic_cost(weights, Box::new(NoTrafficCost))
    }

    pub fn with_traffic_cost(weights: ScoringWeights, traffic: Box<dyn TrafficCost>) -> Self {
        Self { weights, traffic }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score a single node. The node must already be eligible.
    pub fn score_node(&self, pod: &PodInfo, node: &NodeInfo) -> ScoreResult {
        let w = &self.weights;
        let weighted = |cpu: i64, mem: i64| cpu as f64 * w.cpu_factor + mem as f64 * w.memory_factor;

        let available = &node.allocatable;
        let requested = &pod.requests;
        let resource_cost = weighted(available.cpu_millicores(), available.memory_mib())
            - weighted(requested.cpu_millicores(), requested.memory_mib());

        let traffic_cost = self.traffic.cost(pod, node);

        let used = node.used();
        let used = used.cpu_millicores() as f64 + used.memory_mib() as f64;
        let total = node.capacity.cpu_millicores() as f64 + node.capacity.memory_mib() as f64;
        let saturation = if total == 0.0 { 0.0 } else { used / total };

        let qos_factor = qos_factor(pod.qos_class());
        let score =
            qos_factor * (w.alpha * resource_cost - w.beta * traffic_cost - w.gamma * saturation);

        debug!(
            "Node {} score: {:.3} (resource cost: {:.1}, {}: {:.1}, saturation: {:.3}, qos: {})",
            node.name,
            score,
            resource_cost,
            self.traffic.name(),
            traffic_cost,
            saturation,
            qos_factor
        );

        ScoreResult {
            node_name: node.name.clone(),
            score,
            resource_cost,
            traffic_cost,
            saturation,
            qos_factor,
        }
    }

    /// Pick the node with the strictly greatest score.
    ///
    /// Ties keep the first node in input order. An empty input yields `None`.
    pub fn score(&self, pod: &PodInfo, eligible: &[NodeInfo]) -> Option<PlacementDecision> {
        let mut best: Option<ScoreResult> = None;

        for node in eligible {
            let result = self.score_node(pod, node);
            if best.as_ref().is_none_or(|b| result.score > b.score) {
                best = Some(result);
            }
        }

        best.map(|b| PlacementDecision {
            pod_name: pod.name.clone(),
            namespace: pod.namespace.clone(),
            node_name: b.node_name,
            score: b.score,
        })
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}
