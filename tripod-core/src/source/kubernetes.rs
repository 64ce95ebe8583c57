//! Kubernetes API source.
//!
//! Lists the pods of one namespace and fetches the node of every scheduled
//! pod over the core/v1 REST API, authenticating with the pod's service
//! account. Only the fields the aggregator needs are deserialized.

use super::MetadataSource;
use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::types::{ClusterSnapshot, HostInfo, WorkloadUnit};
use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Where Kubernetes mounts the service account credentials.
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    annotations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct Pod {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: Option<PodSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    node_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Node {
    metadata: ObjectMeta,
}

fn parse<T: DeserializeOwned>(what: &str, body: &str) -> Result<T, SourceError> {
    serde_json::from_str(body).map_err(|e| SourceError::Parse {
        what: what.to_string(),
        message: e.to_string(),
    })
}

/// Convert a `PodList` response body into units, in listing order.
///
/// Pods not yet scheduled get an empty host name.
pub fn units_from_pod_list(body: &str) -> Result<Vec<WorkloadUnit>, SourceError> {
    let list: ObjectList<Pod> = parse("pod list", body)?;
    Ok(list
        .items
        .into_iter()
        .map(|pod| WorkloadUnit {
            name: pod.metadata.name,
            host: pod.spec.and_then(|s| s.node_name).unwrap_or_default(),
            annotations: pod.metadata.annotations.unwrap_or_default(),
        })
        .collect())
}

/// Convert a `Node` response body into host metadata.
pub fn host_from_node(body: &str) -> Result<HostInfo, SourceError> {
    let node: Node = parse("node", body)?;
    Ok(HostInfo {
        labels: node.metadata.labels.unwrap_or_default(),
        annotations: node.metadata.annotations.unwrap_or_default(),
    })
}

/// Reads pods and nodes from the Kubernetes API server.
#[derive(Debug, Clone)]
pub struct KubernetesSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    namespace: String,
}

impl KubernetesSource {
    /// Create a source against an explicit API server.
    ///
    /// `client` carries any TLS trust configuration; `token` is sent as a
    /// bearer token when present.
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        namespace: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            namespace: namespace.into(),
        }
    }

    /// Create a source from the pod's in-cluster environment.
    ///
    /// Reads the service account token and CA bundle from
    /// [`SERVICE_ACCOUNT_DIR`] and the API address from
    /// `KUBERNETES_SERVICE_HOST` / `KUBERNETES_SERVICE_PORT`, unless
    /// `config.api_server` overrides it.
    pub fn in_cluster(config: &SourceConfig) -> Result<Self, SourceError> {
        let sa_dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = read_file(&sa_dir.join("token"))?;
        let ca = std::fs::read(sa_dir.join("ca.crt")).map_err(|source| SourceError::Io {
            path: sa_dir.join("ca.crt"),
            source,
        })?;

        let client = root_certificates(&ca)?
            .into_iter()
            .fold(Client::builder(), |builder, cert| {
                builder.add_root_certificate(cert)
            })
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = match &config.api_server {
            Some(url) => url.clone(),
            None => api_server_from_env()?,
        };

        info!(
            api_server = %base_url,
            namespace = %config.namespace,
            "Using in-cluster Kubernetes source"
        );
        Ok(Self::new(
            client,
            base_url,
            &config.namespace,
            Some(token.trim().to_string()),
        ))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// GET `path`; `Ok(None)` on 404.
    async fn get(&self, path: &str) -> Result<Option<String>, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(Some(response.text().await?))
    }
}

#[async_trait]
impl MetadataSource for KubernetesSource {
    async fn snapshot(&self) -> Result<ClusterSnapshot, SourceError> {
        let pods_path = format!("/api/v1/namespaces/{}/pods", self.namespace);
        let body = self.get(&pods_path).await?.ok_or_else(|| SourceError::Status {
            status: StatusCode::NOT_FOUND.as_u16(),
            url: format!("{}{}", self.base_url, pods_path),
        })?;
        let units = units_from_pod_list(&body)?;

        let mut hosts = BTreeMap::new();
        for unit in &units {
            if unit.host.is_empty() || hosts.contains_key(&unit.host) {
                continue;
            }
            match self.get(&format!("/api/v1/nodes/{}", unit.host)).await? {
                Some(body) => {
                    hosts.insert(unit.host.clone(), host_from_node(&body)?);
                }
                None => debug!(node = %unit.host, "Node not found"),
            }
        }

        debug!(
            namespace = %self.namespace,
            units = units.len(),
            hosts = hosts.len(),
            "Fetched cluster snapshot"
        );
        Ok(ClusterSnapshot { units, hosts })
    }

    fn describe(&self) -> String {
        format!("kubernetes {} (namespace {})", self.base_url, self.namespace)
    }
}

/// Every certificate in a PEM bundle. `ca.crt` holds more than one while the
/// cluster CA is being rotated.
pub fn root_certificates(pem: &[u8]) -> Result<Vec<Certificate>, SourceError> {
    let certs = Certificate::from_pem_bundle(pem)?;
    if certs.is_empty() {
        return Err(SourceError::Config {
            message: "CA bundle contains no certificates".into(),
        });
    }
    Ok(certs)
}

fn read_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn api_server_from_env() -> Result<String, SourceError> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").map_err(|_| SourceError::Config {
        message: "KUBERNETES_SERVICE_HOST is not set; not running in a cluster?".into(),
    })?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".into());
    Ok(api_server_url(&host, &port))
}

fn api_server_url(host: &str, port: &str) -> String {
    if host.contains(':') {
        format!("https://[{host}]:{port}")
    } else {
        format!("https://{host}:{port}")
    }
}
