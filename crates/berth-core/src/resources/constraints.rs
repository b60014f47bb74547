//! Node-side exclusion markers and pod-side placement constraints.
//!
//! These are typed views over the k8s-openapi structures. Conversion happens
//! once, here, so the filter never has to reason about optional wire fields.

use k8s_openapi::api::core::v1 as api;
use std::collections::BTreeMap;
use std::fmt;

/// Taint effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
    Other(String),
}

impl TaintEffect {
    pub fn parse(s: &str) -> Self {
        match s {
            "NoSchedule" => Self::NoSchedule,
            "PreferNoSchedule" => Self::PreferNoSchedule,
            "NoExecute" => Self::NoExecute,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSchedule => write!(f, "NoSchedule"),
            Self::PreferNoSchedule => write!(f, "PreferNoSchedule"),
            Self::NoExecute => write!(f, "NoExecute"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A node taint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taint {
    pub key: String,
    pub value: Option<String>,
    pub effect: TaintEffect,
}

impl Taint {
    pub fn new(key: impl Into<String>, value: Option<&str>, effect: TaintEffect) -> Self {
        Self {
            key: key.into(),
            value: value.map(str::to_string),
            effect,
        }
    }
}

impl From<&api::Taint> for Taint {
    fn from(taint: &api::Taint) -> Self {
        Self {
            key: taint.key.clone(),
            value: taint.value.clone(),
            effect: TaintEffect::parse(&taint.effect),
        }
    }
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}:{}", self.key, v, self.effect),
            None => write!(f, "{}:{}", self.key, self.effect),
        }
    }
}

/// Toleration operator; an absent operator means `Equal`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TolerationOperator {
    Exists,
    Equal,
}

/// A pod toleration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toleration {
    pub key: Option<String>,
    pub operator: TolerationOperator,
    pub value: Option<String>,
    /// `None` tolerates every effect
    pub effect: Option<TaintEffect>,
}

impl Toleration {
    pub fn exists(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            operator: TolerationOperator::Exists,
            value: None,
            effect: None,
        }
    }

    pub fn equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            operator: TolerationOperator::Equal,
            value: Some(value.into()),
            effect: None,
        }
    }

    pub fn with_effect(mut self, effect: TaintEffect) -> Self {
        self.effect = Some(effect);
        self
    }

    /// Whether this toleration cancels the given taint.
    ///
    /// Keys must match. `Exists` ignores the value; `Equal` requires equal
    /// values, with an unset toleration value acting as a wildcard.
    pub fn tolerates(&self, taint: &Taint) -> bool {
        if self.key.as_deref() != Some(taint.key.as_str()) {
            return false;
        }

        if let Some(effect) = &self.effect {
            if *effect != taint.effect {
                return false;
            }
        }

        match self.operator {
            TolerationOperator::Exists => true,
            TolerationOperator::Equal => match &self.value {
                None => true,
                Some(v) => taint.value.as_deref() == Some(v.as_str()),
            },
        }
    }
}

impl From<&api::Toleration> for Toleration {
    fn from(toleration: &api::Toleration) -> Self {
        let operator = match toleration.operator.as_deref() {
            Some("Exists") => TolerationOperator::Exists,
            _ => TolerationOperator::Equal,
        };

        Self {
            key: toleration.key.clone(),
            operator,
            value: toleration.value.clone(),
            effect: toleration.effect.as_deref().map(TaintEffect::parse),
        }
    }
}

/// Label match operator in a node selector requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorOperator {
    In,
    Exists,
    /// Any operator the scheduler does not evaluate; never matches
    Unsupported(String),
}

impl SelectorOperator {
    pub fn parse(s: &str) -> Self {
        match s {
            "In" => Self::In,
            "Exists" => Self::Exists,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// One `key <op> values` label requirement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchExpression {
    pub key: String,
    pub operator: SelectorOperator,
    pub values: Vec<String>,
}

impl MatchExpression {
    pub fn new(key: impl Into<String>, operator: SelectorOperator, values: &[&str]) -> Self {
        Self {
            key: key.into(),
            operator,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Evaluate against a node's labels.
    ///
    /// `In` compares only against the first listed value. Multi-value `In`
    /// is left unresolved rather than widened to an OR over all values.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match &self.operator {
            SelectorOperator::In => match (labels.get(&self.key), self.values.first()) {
                (Some(actual), Some(expected)) => actual == expected,
                _ => false,
            },
            SelectorOperator::Exists => labels.contains_key(&self.key),
            SelectorOperator::Unsupported(_) => false,
        }
    }
}

impl From<&api::NodeSelectorRequirement> for MatchExpression {
    fn from(req: &api::NodeSelectorRequirement) -> Self {
        Self {
            key: req.key.clone(),
            operator: SelectorOperator::parse(&req.operator),
            values: req.values.clone().unwrap_or_default(),
        }
    }
}

/// A conjunction of match expressions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeSelectorTerm {
    pub match_expressions: Vec<MatchExpression>,
}

impl NodeSelectorTerm {
    pub fn new(match_expressions: Vec<MatchExpression>) -> Self {
        Self { match_expressions }
    }

    /// All expressions must hold. A term with no expressions selects nothing.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        !self.match_expressions.is_empty()
            && self.match_expressions.iter().all(|e| e.matches(labels))
    }
}

/// Required node affinity: a disjunction of selector terms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAffinity {
    pub required_terms: Vec<NodeSelectorTerm>,
}

impl NodeAffinity {
    pub fn new(required_terms: Vec<NodeSelectorTerm>) -> Self {
        Self { required_terms }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.required_terms.iter().any(|t| t.matches(labels))
    }

    /// Extract the required-during-scheduling part of a pod's affinity.
    ///
    /// Returns `None` when the pod declares no required node affinity.
    /// `matchFields` selectors are not evaluated.
    pub fn from_affinity(affinity: &api::Affinity) -> Option<Self> {
        let selector = affinity
            .node_affinity
            .as_ref()?
            .required_during_scheduling_ignored_during_execution
            .as_ref()?;

        let required_terms = selector
            .node_selector_terms
            .iter()
            .map(|term| {
                NodeSelectorTerm::new(
                    term.match_expressions
                        .iter()
                        .flatten()
                        .map(MatchExpression::from)
                        .collect(),
                )
            })
            .collect();

        Some(Self { required_terms })
    }
}
