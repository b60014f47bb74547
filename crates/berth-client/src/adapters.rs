//! Scheduler seams backed by the API server

use crate::api_client::ApiClient;
use async_trait::async_trait;
use berth_core::Node;
use berth_scheduler::{Binder, NodeInventory, PodEventSource, PodEventStream, Result};
use std::time::Duration;

#[async_trait]
impl NodeInventory for ApiClient {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.get_nodes().await?)
    }
}

#[async_trait]
impl PodEventSource for ApiClient {
    async fn watch_pods(&self, timeout: Duration) -> Result<PodEventStream> {
        Ok(self.open_pod_watch(timeout).await?)
    }
}

#[async_trait]
impl Binder for ApiClient {
    async fn bind(&self, pod_name: &str, namespace: &str, node_name: &str) -> Result<()> {
        Ok(self.bind_pod(pod_name, namespace, node_name).await?)
    }
}
