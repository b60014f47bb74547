use crate::error::Result;
use async_trait::async_trait;
use berth_core::{Node, WatchEvent};
use futures_util::stream::BoxStream;
use std::time::Duration;

/// Stream of pod watch events. An `Err` item that [`ends_watch`] ends the
/// connection; malformed-event errors are skipped.
///
/// [`ends_watch`]: crate::SchedulerError::ends_watch
pub type PodEventStream = BoxStream<'static, Result<WatchEvent>>;

/// Source of the current node inventory
#[async_trait]
pub trait NodeInventory: Send + Sync {
    /// List every node in the cluster. Called once per scheduling attempt.
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Long-lived subscription to pod lifecycle events across all namespaces
#[async_trait]
pub trait PodEventSource: Send + Sync {
    /// Open a watch. The server may close it after `timeout` of idleness.
    async fn watch_pods(&self, timeout: Duration) -> Result<PodEventStream>;
}

/// Commits a pod-to-node placement
#[async_trait]
pub trait Binder: Send + Sync {
    async fn bind(&self, pod_name: &str, namespace: &str, node_name: &str) -> Result<()>;
}

/// Backoff delay between watch connections, replaceable in tests
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
