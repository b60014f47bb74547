use crate::error::{ClientError, Result};
use crate::watch::decode_watch_lines;
use berth_scheduler::PodEventStream;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::{Binding, Node, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::Resource;
use reqwest::{Client, RequestBuilder, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default API endpoint, as exposed by `kubectl proxy`
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8001";

/// Extra time a watch request may run past its server-side timeout before
/// the client gives up on it
const WATCH_READ_GRACE: Duration = Duration::from_secs(5);

/// Connection settings for the orchestrator API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    /// File holding a bearer token, e.g. a mounted service account token
    pub token_file: Option<PathBuf>,
    /// PEM bundle to trust in addition to the system roots
    pub ca_cert: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token_file: None,
            ca_cert: None,
        }
    }
}

/// HTTP client for the three API calls the scheduler makes
pub struct ApiClient {
    base_url: String,
    client: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            token: None,
        }
    }

    /// Build a client with optional bearer token and extra CA
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();

        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                ClientError::invalid_config(
                    format!("cannot read CA certificate {}: {}", path.display(), e),
                    "Pass a readable PEM file with --ca-cert",
                )
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                ClientError::invalid_config(
                    format!("invalid CA certificate {}: {}", path.display(), e),
                    "The file must contain a PEM-encoded certificate",
                )
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build().map_err(|e| {
            ClientError::invalid_config(
                format!("cannot build HTTP client: {}", e),
                "Check the TLS settings",
            )
        })?;

        let token = config.token_file.as_deref().map(read_token).transpose()?;

        info!(
            "Configured API client for {} ({})",
            config.api_url,
            if token.is_some() { "bearer token" } else { "no credentials" }
        );

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        let resp = self.authorize(request).send().await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::http(operation, status, body));
        }

        Ok(resp)
    }

    pub(crate) fn nodes_url(&self) -> String {
        format!("{}/api/v1/nodes", self.base_url)
    }

    pub(crate) fn pod_watch_url(&self, timeout: Duration) -> String {
        format!(
            "{}/api/v1/pods?watch=true&timeoutSeconds={}",
            self.base_url,
            timeout.as_secs()
        )
    }

    pub(crate) fn binding_url(&self, namespace: &str, name: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/pods/{}/binding",
            self.base_url, namespace, name
        )
    }

    /// GET /api/v1/nodes
    pub async fn get_nodes(&self) -> Result<Vec<Node>> {
        let url = self.nodes_url();
        debug!("GET {}", url);

        let resp = self.send("GET nodes", self.client.get(&url)).await?;
        let list: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ClientError::decode("node list", e.to_string()))?;

        decode_list_items(list)
    }

    /// GET /api/v1/pods?watch=true, decoded line by line
    pub async fn open_pod_watch(&self, timeout: Duration) -> Result<PodEventStream> {
        let url = self.pod_watch_url(timeout);
        debug!("GET {}", url);

        let request = self.client.get(&url).timeout(timeout + WATCH_READ_GRACE);
        let resp = self.send("watch pods", request).await?;

        Ok(decode_watch_lines(resp.bytes_stream().boxed()))
    }

    /// POST /api/v1/namespaces/{namespace}/pods/{name}/binding
    pub async fn bind_pod(&self, pod_name: &str, namespace: &str, node_name: &str) -> Result<()> {
        let url = self.binding_url(namespace, pod_name);
        debug!("POST {}", url);

        let binding = binding_for(pod_name, namespace, node_name);
        self.send("POST binding", self.client.post(&url).json(&binding))
            .await?;
        Ok(())
    }
}

/// Binding object targeting `node_name`
pub fn binding_for(pod_name: &str, namespace: &str, node_name: &str) -> Binding {
    Binding {
        metadata: ObjectMeta {
            name: Some(pod_name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        target: ObjectReference {
            api_version: Some(Node::API_VERSION.to_string()),
            kind: Some(Node::KIND.to_string()),
            name: Some(node_name.to_string()),
            ..Default::default()
        },
    }
}

/// Decode the `items` of a list response.
///
/// List items omit `apiVersion` and `kind`, which the typed resources
/// require, so they are filled in first.
fn decode_list_items(list: serde_json::Value) -> Result<Vec<Node>> {
    let items = match list.get("items") {
        Some(serde_json::Value::Array(items)) => items.clone(),
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(_) => return Err(ClientError::decode("node list", "items is not an array")),
    };

    items
        .into_iter()
        .map(|mut item| {
            if let Some(obj) = item.as_object_mut() {
                obj.entry("apiVersion")
                    .or_insert_with(|| Node::API_VERSION.into());
                obj.entry("kind").or_insert_with(|| Node::KIND.into());
            }
            serde_json::from_value(item).map_err(|e| ClientError::decode("node", e.to_string()))
        })
        .collect()
}

fn read_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path).map_err(|e| {
        ClientError::invalid_config(
            format!("cannot read token file {}: {}", path.display(), e),
            "Pass a readable file with --token-file",
        )
    })?;

    let token = token.trim();
    if token.is_empty() {
        return Err(ClientError::invalid_config(
            format!("token file {} is empty", path.display()),
            "The token file must contain a bearer token",
        ));
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response and hand back the raw request
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn ok_response(body: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
    }

    #[test]
    fn test_urls() {
        let client = ApiClient::new("https://api.example:6443/");
        assert_eq!(client.base_url(), "https://api.example:6443");
        assert_eq!(client.nodes_url(), "https://api.example:6443/api/v1/nodes");
        assert_eq!(
            client.pod_watch_url(Duration::from_secs(10)),
            "https://api.example:6443/api/v1/pods?watch=true&timeoutSeconds=10"
        );
        assert_eq!(
            client.binding_url("prod", "web-0"),
            "https://api.example:6443/api/v1/namespaces/prod/pods/web-0/binding"
        );
    }

    #[test]
    fn test_binding_body() {
        let body = serde_json::to_value(binding_for("web-0", "prod", "n1")).unwrap();
        assert_eq!(body["apiVersion"], "v1");
        assert_eq!(body["kind"], "Binding");
        assert_eq!(body["metadata"]["name"], "web-0");
        assert_eq!(body["metadata"]["namespace"], "prod");
        assert_eq!(body["target"]["kind"], "Node");
        assert_eq!(body["target"]["name"], "n1");
    }

    #[test]
    fn test_token_is_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  s3cret  ").unwrap();
        assert_eq!(read_token(file.path()).unwrap(), "s3cret");
    }

    #[test]
    fn test_empty_token_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_token(file.path()),
            Err(ClientError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_ca_cert_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            ca_cert: Some(dir.path().join("missing.pem")),
            ..Default::default()
        };
        assert!(matches!(
            ApiClient::from_config(&config),
            Err(ClientError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_list_items_get_type_meta() {
        let list = serde_json::json!({
            "kind": "NodeList",
            "apiVersion": "v1",
            "items": [
                {"metadata": {"name": "n1"}},
                {"metadata": {"name": "n2"}, "spec": {"unschedulable": true}}
            ]
        });

        let nodes = decode_list_items(list).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].metadata.name.as_deref(), Some("n1"));
        assert_eq!(
            nodes[1].spec.as_ref().and_then(|s| s.unschedulable),
            Some(true)
        );
    }

    #[test]
    fn test_list_without_items_is_empty() {
        let list = serde_json::json!({"kind": "NodeList", "items": null});
        assert!(decode_list_items(list).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_nodes_sends_bearer_token() {
        let body = r#"{"kind":"NodeList","apiVersion":"v1","items":[{"metadata":{"name":"n1"}}]}"#;
        let (url, server) = serve_once(ok_response(body)).await;
        let client = ApiClient {
            token: Some("s3cret".to_string()),
            ..ApiClient::new(&url)
        };

        let nodes = client.get_nodes().await.unwrap();
        let request = server.await.unwrap();

        assert_eq!(nodes.len(), 1);
        assert!(request.starts_with("GET /api/v1/nodes "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer s3cret"));
    }

    #[tokio::test]
    async fn test_bind_pod_posts_binding() {
        let (url, server) = serve_once(ok_response("{}")).await;
        let client = ApiClient::new(&url);

        client.bind_pod("web-0", "prod", "n1").await.unwrap();
        let request = server.await.unwrap();

        assert!(request.starts_with("POST /api/v1/namespaces/prod/pods/web-0/binding "));
        assert!(request.contains(r#""target":{"#));
        assert!(request.contains(r#""name":"n1""#));
    }

    #[tokio::test]
    async fn test_bind_conflict_is_http_error() {
        let body = r#"{"kind":"Status","message":"pod web-0 is already assigned"}"#;
        let response = format!(
            "HTTP/1.1 409 Conflict\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (url, _server) = serve_once(response).await;
        let client = ApiClient::new(&url);

        let err = client.bind_pod("web-0", "prod", "n1").await.unwrap_err();
        assert!(matches!(err, ClientError::Http { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_watch_streams_events() {
        let body = concat!(
            r#"{"type":"ADDED","object":{"metadata":{"name":"a"}}}"#,
            "\n",
            r#"{"type":"MODIFIED","object":{"metadata":{"name":"a"}}}"#,
            "\n"
        );
        let (url, server) = serve_once(ok_response(body)).await;
        let client = ApiClient::new(&url);

        let stream = client.open_pod_watch(Duration::from_secs(3)).await.unwrap();
        let events: Vec<_> = stream.collect().await;
        let request = server.await.unwrap();

        assert!(request.starts_with("GET /api/v1/pods?watch=true&timeoutSeconds=3 "));
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.is_ok()));
    }
}
