use crate::config::ScoringWeights;
use crate::filter::{default_filters, filter_eligible, first_failure, FilterPredicate};
use crate::score::ScoringEngine;
use crate::traits::{Binder, NodeInventory};
use crate::types::{NodeEvaluation, PlacementDecision};
use crate::{Result, SchedulerError};
use berth_core::{NodeInfo, PodInfo};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one scheduling attempt that did not error
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    /// The pod was bound to the decision's node
    Bound(PlacementDecision),
    /// No node passed the filter; the pod stays pending
    NoEligibleNode { nodes_considered: usize },
}

/// Pod scheduler: filter, score, bind
pub struct Scheduler {
    inventory: Arc<dyn NodeInventory>,
    binder: Arc<dyn Binder>,
    filters: Vec<Box<dyn FilterPredicate>>,
    engine: ScoringEngine,
}

impl Scheduler {
    /// Create a new scheduler with the default predicates
    pub fn new(
        inventory: Arc<dyn NodeInventory>,
        binder: Arc<dyn Binder>,
        weights: ScoringWeights,
    ) -> Self {
        Self {
            inventory,
            binder,
            filters: default_filters(),
            engine: ScoringEngine::new(weights),
        }
    }

    /// Replace the scoring engine, e.g. to plug in a traffic cost model
    pub fn with_scoring_engine(mut self, engine: ScoringEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Fetch a fresh node inventory
    pub async fn fetch_nodes(&self) -> Result<Vec<NodeInfo>> {
        let nodes = self.inventory.list_nodes().await?;
        Ok(nodes.iter().map(NodeInfo::from).collect())
    }

    /// Choose a node without binding
    pub fn select_node(&self, pod: &PodInfo, nodes: &[NodeInfo]) -> Option<PlacementDecision> {
        let eligible = filter_eligible(&self.filters, pod, nodes);
        debug!(
            "Pod {} has {} eligible nodes out of {}",
            pod.key(),
            eligible.len(),
            nodes.len()
        );
        self.engine.score(pod, &eligible)
    }

    /// Filter verdict and score for every node, in input order
    pub fn evaluate(&self, pod: &PodInfo, nodes: &[NodeInfo]) -> Vec<NodeEvaluation> {
        nodes
            .iter()
            .map(|node| match first_failure(&self.filters, pod, node) {
                Some((predicate, reason)) => NodeEvaluation {
                    node_name: node.name.clone(),
                    failed_predicate: Some(predicate),
                    reason: Some(reason),
                    score: None,
                },
                None => NodeEvaluation {
                    node_name: node.name.clone(),
                    failed_predicate: None,
                    reason: None,
                    score: Some(self.engine.score_node(pod, node)),
                },
            })
            .collect()
    }

    /// Schedule a single pod: fetch nodes, filter, score, bind once.
    ///
    /// A failed bind is returned as [`SchedulerError::BindFailed`] and is not
    /// retried.
    pub async fn schedule_pod(&self, pod: &PodInfo) -> Result<ScheduleOutcome> {
        let nodes = self.fetch_nodes().await?;

        let decision = match self.select_node(pod, &nodes) {
            Some(decision) => decision,
            None => {
                warn!(
                    "No suitable node found for pod {} among {} nodes",
                    pod.key(),
                    nodes.len()
                );
                return Ok(ScheduleOutcome::NoEligibleNode {
                    nodes_considered: nodes.len(),
                });
            }
        };

        info!(
            "Selected node {} for pod {} with score {:.3}",
            decision.node_name,
            pod.key(),
            decision.score
        );

        self.binder
            .bind(&decision.pod_name, &decision.namespace, &decision.node_name)
            .await
            .map_err(|e| SchedulerError::bind_failed(pod.key(), &decision.node_name, e))?;

        info!(
            "Successfully bound pod {} to node {}",
            pod.key(),
            decision.node_name
        );

        Ok(ScheduleOutcome::Bound(decision))
    }
}
