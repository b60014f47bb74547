use crate::config::SchedulerConfig;
use crate::scheduler::{ScheduleOutcome, Scheduler};
use crate::traits::{PodEventSource, PodEventStream, Sleeper, TokioSleeper};
use crate::types::PlacementDecision;
use berth_core::{PodInfo, WatchEvent, WatchEventType};
use futures_util::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection state of the watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Connecting,
    Streaming,
    Backoff,
    Stopped,
}

impl fmt::Display for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Streaming => write!(f, "streaming"),
            Self::Backoff => write!(f, "backoff"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Why an event did not lead to a scheduling attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Only ADDED events are scheduled
    NotAdded(WatchEventType),
    /// Missing metadata or spec, or not a pod at all
    Malformed(String),
    /// Pod asks for a different scheduler
    OtherScheduler(Option<String>),
    /// Pod already has a node
    AlreadyAssigned(String),
    /// Pod has succeeded or failed
    Terminal,
    /// Pod is being deleted
    Terminating,
}

/// What happened to one watch event
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Skipped(SkipReason),
    Scheduled(PlacementDecision),
    /// No eligible node; the pod stays pending
    Unschedulable,
    /// Inventory or bind failure; logged and dropped
    Failed(String),
}

/// Top-level control loop: watches pods and drives the scheduler per event.
///
/// One event is the unit of failure isolation; one watch connection is the
/// unit of retry.
pub struct WatchController {
    scheduler: Scheduler,
    events: Arc<dyn PodEventSource>,
    sleeper: Arc<dyn Sleeper>,
    config: SchedulerConfig,
    state: watch::Sender<WatchState>,
}

impl WatchController {
    pub fn new(
        scheduler: Scheduler,
        events: Arc<dyn PodEventSource>,
        config: SchedulerConfig,
    ) -> Self {
        let (state, _) = watch::channel(WatchState::Connecting);
        Self {
            scheduler,
            events,
            sleeper: Arc::new(TokioSleeper),
            config,
            state,
        }
    }

    /// Replace the backoff sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Current loop state
    pub fn state(&self) -> WatchState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<WatchState> {
        self.state.subscribe()
    }

    fn transition(&self, next: WatchState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!("Watch controller: {} -> {}", previous, next);
        }
    }

    /// Run the watch loop until `token` is cancelled
    pub async fn run(&self, token: CancellationToken) {
        info!(
            "Starting watch controller for scheduler '{}' (watch timeout {}s, retry delay {}ms)",
            self.config.scheduler_name, self.config.watch_timeout_secs, self.config.retry_delay_ms
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            self.transition(WatchState::Connecting);
            let subscribed = tokio::select! {
                _ = token.cancelled() => break,
                result = self.events.watch_pods(self.config.watch_timeout()) => result,
            };

            match subscribed {
                Ok(stream) => {
                    self.transition(WatchState::Streaming);
                    self.stream_events(stream, &token).await;
                }
                Err(e) => {
                    warn!("Failed to watch pods: {}", e);
                }
            }

            if token.is_cancelled() {
                break;
            }

            self.transition(WatchState::Backoff);
            tokio::select! {
                _ = token.cancelled() => break,
                _ = self.sleeper.sleep(self.config.retry_delay()) => {}
            }
        }

        self.transition(WatchState::Stopped);
        info!("Watch controller stopped");
    }

    /// Consume one watch connection until it ends or shutdown is requested
    async fn stream_events(&self, mut stream: PodEventStream, token: &CancellationToken) {
        loop {
            let next = tokio::select! {
                _ = token.cancelled() => return,
                next = stream.next() => next,
            };

            match next {
                None => {
                    debug!("Pod watch closed by server");
                    return;
                }
                Some(Ok(event)) if event.event_type == WatchEventType::Error => {
                    warn!("Pod watch returned an error: {}", event.error_message());
                    return;
                }
                Some(Ok(event)) => {
                    self.handle_event(event).await;
                }
                Some(Err(e)) if !e.ends_watch() => {
                    warn!("Skipping malformed pod event: {}", e);
                }
                Some(Err(e)) => {
                    warn!("Pod watch failed: {}", e);
                    return;
                }
            }
        }
    }

    /// Admission check plus, for admitted pods, one scheduling attempt.
    ///
    /// Never fails: every error is logged and folded into the outcome.
    pub async fn handle_event(&self, event: WatchEvent) -> EventOutcome {
        let pod = match self.admit(&event) {
            Ok(pod) => pod,
            Err(reason) => {
                match &reason {
                    SkipReason::Malformed(message) => {
                        warn!("Received invalid pod event {:?}: {}", event.event_type, message)
                    }
                    other => debug!("Ignoring pod event: {:?}", other),
                }
                return EventOutcome::Skipped(reason);
            }
        };

        info!("Found unscheduled pod {} (QoS {})", pod.key(), pod.qos_class());

        match self.scheduler.schedule_pod(&pod).await {
            Ok(ScheduleOutcome::Bound(decision)) => EventOutcome::Scheduled(decision),
            Ok(ScheduleOutcome::NoEligibleNode { .. }) => EventOutcome::Unschedulable,
            Err(e) => {
                error!("Failed to schedule pod {}: {}", pod.key(), e);
                EventOutcome::Failed(e.to_string())
            }
        }
    }

    fn admit(&self, event: &WatchEvent) -> std::result::Result<PodInfo, SkipReason> {
        match event.event_type {
            WatchEventType::Added => {}
            WatchEventType::Modified
            | WatchEventType::Deleted
            | WatchEventType::Bookmark
            | WatchEventType::Error => return Err(SkipReason::NotAdded(event.event_type)),
        }

        let pod = event
            .decode_pod()
            .and_then(|p| PodInfo::from_pod(&p))
            .map_err(|e| SkipReason::Malformed(e.to_string()))?;

        if pod.scheduler_name.as_deref() != Some(self.config.scheduler_name.as_str()) {
            return Err(SkipReason::OtherScheduler(pod.scheduler_name));
        }

        if let Some(node) = pod.node_name {
            return Err(SkipReason::AlreadyAssigned(node));
        }

        if pod.terminating {
            return Err(SkipReason::Terminating);
        }

        if pod.is_terminal() {
            return Err(SkipReason::Terminal);
        }

        Ok(pod)
    }
}
