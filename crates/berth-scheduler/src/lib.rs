//! Berth Scheduler - Pod to Node scheduling
//!
//! This crate provides:
//! - Filter predicates (readiness, taints, node affinity, resource fit)
//! - Weighted node scoring with QoS gating
//! - Pod binding through an injectable binder
//! - The watch controller that drives scheduling from pod events

pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod scheduler;
pub mod score;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{SchedulerConfig, ScoringWeights, DEFAULT_SCHEDULER_NAME};
pub use controller::{EventOutcome, SkipReason, WatchController, WatchState};
pub use error::{Result, SchedulerError};
pub use filter::FilterPredicate;
pub use scheduler::{ScheduleOutcome, Scheduler};
pub use score::{ScoringEngine, TrafficCost};
pub use traits::{Binder, NodeInventory, PodEventSource, PodEventStream, Sleeper, TokioSleeper};
pub use types::{FilterResult, NodeEvaluation, PlacementDecision, ScoreResult};
