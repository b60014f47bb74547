//! In-memory collaborators for unit tests

use crate::error::{Result, SchedulerError};
use crate::traits::{Binder, NodeInventory, PodEventSource, PodEventStream, Sleeper};
use async_trait::async_trait;
use berth_core::{Node, Pod, WatchEvent};
use futures_util::stream::{self, StreamExt};
use k8s_openapi::api::core::v1::{
    Container, NodeCondition, NodeSpec, NodeStatus, PodSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

fn resource_map(cpu: &str, memory: &str) -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(cpu.to_string())),
        ("memory".to_string(), Quantity(memory.to_string())),
    ])
}

/// A ready, schedulable node whose capacity equals its allocatable
pub fn create_test_node(name: &str, cpu: &str, memory: &str) -> Node {
    let mut node = Node::default();
    node.metadata.name = Some(name.to_string());
    node.spec = Some(NodeSpec::default());
    node.status = Some(NodeStatus {
        capacity: Some(resource_map(cpu, memory)),
        allocatable: Some(resource_map(cpu, memory)),
        conditions: Some(vec![NodeCondition {
            type_: "Ready".to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    });
    node
}

/// An unscheduled pod with Guaranteed resources
pub fn create_test_pod(name: &str, scheduler_name: &str, cpu: &str, memory: &str) -> Pod {
    let mut pod = Pod::default();
    pod.metadata.name = Some(name.to_string());
    pod.metadata.namespace = Some("default".to_string());
    pod.spec = Some(PodSpec {
        scheduler_name: Some(scheduler_name.to_string()),
        containers: vec![Container {
            name: "app".to_string(),
            resources: Some(ResourceRequirements {
                requests: Some(resource_map(cpu, memory)),
                limits: Some(resource_map(cpu, memory)),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..Default::default()
    });
    pod
}

/// Wrap a pod in an ADDED event
pub fn added(pod: &Pod) -> WatchEvent {
    WatchEvent::added(serde_json::to_value(pod).expect("pod serializes"))
}

pub struct FakeInventory {
    nodes: Vec<Node>,
    fail: bool,
}

impl FakeInventory {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            nodes: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl NodeInventory for FakeInventory {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        if self.fail {
            return Err(SchedulerError::transport_error("connection refused"));
        }
        Ok(self.nodes.clone())
    }
}

/// Records every bind call; optionally fails all of them
pub struct RecordingBinder {
    calls: Mutex<Vec<(String, String, String)>>,
    fail: bool,
}

impl RecordingBinder {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub async fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Binder for RecordingBinder {
    async fn bind(&self, pod_name: &str, namespace: &str, node_name: &str) -> Result<()> {
        self.calls.lock().await.push((
            pod_name.to_string(),
            namespace.to_string(),
            node_name.to_string(),
        ));
        if self.fail {
            return Err(SchedulerError::transport_error("connection reset by peer"));
        }
        Ok(())
    }
}

/// One scripted watch connection
pub enum Connection {
    /// Subscribing fails
    Refused,
    /// The stream yields these items, then closes
    Events(Vec<Result<WatchEvent>>),
    /// The stream never yields and never closes
    Stalled,
}

/// Hands out scripted connections in order; once exhausted, every further
/// subscription is refused.
pub struct ScriptedEvents {
    connections: Mutex<VecDeque<Connection>>,
    opened: Mutex<Vec<Duration>>,
}

impl ScriptedEvents {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections: Mutex::new(connections.into()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Timeouts passed to each subscription attempt
    pub async fn attempts(&self) -> Vec<Duration> {
        self.opened.lock().await.clone()
    }
}

#[async_trait]
impl PodEventSource for ScriptedEvents {
    async fn watch_pods(&self, timeout: Duration) -> Result<PodEventStream> {
        self.opened.lock().await.push(timeout);
        match self.connections.lock().await.pop_front() {
            Some(Connection::Events(items)) => Ok(stream::iter(items).boxed()),
            Some(Connection::Stalled) => Ok(stream::pending::<Result<WatchEvent>>().boxed()),
            Some(Connection::Refused) | None => {
                Err(SchedulerError::transport_error("watch refused"))
            }
        }
    }
}

/// Records backoff delays without waiting; cancels `token` once `limit`
/// delays have been requested.
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
    limit: usize,
    token: CancellationToken,
}

impl RecordingSleeper {
    pub fn new(limit: usize, token: CancellationToken) -> Self {
        Self {
            delays: Mutex::new(Vec::new()),
            limit,
            token,
        }
    }

    pub async fn delays(&self) -> Vec<Duration> {
        self.delays.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let mut delays = self.delays.lock().await;
        delays.push(duration);
        if delays.len() >= self.limit {
            self.token.cancel();
        }
    }
}
