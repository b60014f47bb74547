/// Result of filtering a node
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult {
    /// Node name
    pub node_name: String,
    /// Whether the node passed the filter
    pub passed: bool,
    /// Reason for failure (if any)
    pub reason: Option<String>,
}

impl FilterResult {
    /// Create a passing filter result
    pub fn pass(node_name: String) -> Self {
        Self {
            node_name,
            passed: true,
            reason: None,
        }
    }

    /// Create a failing filter result
    pub fn fail(node_name: String, reason: String) -> Self {
        Self {
            node_name,
            passed: false,
            reason: Some(reason),
        }
    }
}

/// Result of scoring a node, with the terms that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Node name
    pub node_name: String,
    /// Final score (higher is better)
    pub score: f64,
    pub resource_cost: f64,
    pub traffic_cost: f64,
    pub saturation: f64,
    pub qos_factor: f64,
}

/// The node chosen for a pod. Produced by scoring, consumed by the binder.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDecision {
    pub pod_name: String,
    pub namespace: String,
    pub node_name: String,
    pub score: f64,
}

/// Per-node diagnostic view of one scheduling pass
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvaluation {
    pub node_name: String,
    /// Name of the first predicate that rejected the node
    pub failed_predicate: Option<String>,
    pub reason: Option<String>,
    /// Present only for eligible nodes
    pub score: Option<ScoreResult>,
}

impl NodeEvaluation {
    pub fn is_eligible(&self) -> bool {
        self.failed_predicate.is_none()
    }
}
