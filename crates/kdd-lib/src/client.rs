//! Resource access facade for the dashboard API
//!
//! One operation per collection. Every call either resolves with the full
//! decoded payload or fails; there is no fallback to empty data.

use crate::error::DashboardError;
use crate::kind::WorkloadKind;
use crate::models::{
    ApiResponse, CombinedWorkloadInfo, CronJobWorkload, DaemonSetWorkload, DeploymentWorkload,
    JobWorkload, Namespace, NamespaceDetail, Node, PodWorkload, StatefulSetWorkload, Workload,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the dashboard service (e.g., "http://localhost:8080")
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Read-only access to the dashboard API
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, DashboardError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, DashboardError>;

    /// Every workload of every kind
    async fn list_workloads(&self) -> Result<Vec<Workload>, DashboardError>;

    async fn list_deployments(&self) -> Result<Vec<DeploymentWorkload>, DashboardError>;

    async fn list_daemonsets(&self) -> Result<Vec<DaemonSetWorkload>, DashboardError>;

    async fn list_statefulsets(&self) -> Result<Vec<StatefulSetWorkload>, DashboardError>;

    async fn list_pods(&self) -> Result<Vec<PodWorkload>, DashboardError>;

    async fn list_jobs(&self) -> Result<Vec<JobWorkload>, DashboardError>;

    async fn list_cronjobs(&self) -> Result<Vec<CronJobWorkload>, DashboardError>;

    /// Workload with its pods and their metrics, joined by the service
    async fn get_workload_detail(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<CombinedWorkloadInfo, DashboardError>;

    async fn get_namespace_detail(&self, name: &str) -> Result<NamespaceDetail, DashboardError>;

    /// One kind's collection as union-typed workloads
    async fn list_kind(&self, kind: WorkloadKind) -> Result<Vec<Workload>, DashboardError> {
        let workloads = match kind {
            WorkloadKind::Deployment => wrap(self.list_deployments().await?, Workload::Deployment),
            WorkloadKind::DaemonSet => wrap(self.list_daemonsets().await?, Workload::DaemonSet),
            WorkloadKind::StatefulSet => {
                wrap(self.list_statefulsets().await?, Workload::StatefulSet)
            }
            WorkloadKind::Pod => wrap(self.list_pods().await?, Workload::Pod),
            WorkloadKind::Job => wrap(self.list_jobs().await?, Workload::Job),
            WorkloadKind::CronJob => wrap(self.list_cronjobs().await?, Workload::CronJob),
        };
        Ok(workloads)
    }
}

fn wrap<T>(items: Vec<T>, variant: fn(T) -> Workload) -> Vec<Workload> {
    items.into_iter().map(variant).collect()
}

/// HTTP implementation of [`ResourceApi`]
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for `base_url` with default settings
    pub fn new(base_url: &str) -> Result<Self, DashboardError> {
        Self::with_config(ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn with_config(config: ClientConfig) -> Result<Self, DashboardError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()?;

        // Relative joins replace the last segment unless the base ends in '/'
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// GET `path` and unwrap the `data` field of the envelope
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, DashboardError> {
        let url = self.base_url.join(path)?;
        debug!(url = %url, "GET");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed");
            DashboardError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "API returned an error status");
            return Err(DashboardError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
            warn!(url = %url, error = %e, "Failed to parse response");
            DashboardError::Decode(e)
        })?;

        Ok(envelope.data)
    }
}

/// Path segments are inserted verbatim; reject separators smuggled in names
/// and dot segments, which `Url::join` would collapse
fn segment(value: &str) -> Result<&str, DashboardError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(&['/', '?', '#'][..])
    {
        return Err(DashboardError::InvalidSegment(value.to_string()));
    }
    Ok(value)
}

#[async_trait]
impl ResourceApi for ApiClient {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, DashboardError> {
        self.get("api/v1/namespaces").await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, DashboardError> {
        self.get("api/v1/nodes").await
    }

    async fn list_workloads(&self) -> Result<Vec<Workload>, DashboardError> {
        self.get("api/v1/workloads").await
    }

    async fn list_deployments(&self) -> Result<Vec<DeploymentWorkload>, DashboardError> {
        self.get("api/v1/workloads/deployments").await
    }

    async fn list_daemonsets(&self) -> Result<Vec<DaemonSetWorkload>, DashboardError> {
        self.get("api/v1/workloads/daemonsets").await
    }

    async fn list_statefulsets(&self) -> Result<Vec<StatefulSetWorkload>, DashboardError> {
        self.get("api/v1/workloads/statefulsets").await
    }

    async fn list_pods(&self) -> Result<Vec<PodWorkload>, DashboardError> {
        self.get("api/v1/workloads/pods").await
    }

    async fn list_jobs(&self) -> Result<Vec<JobWorkload>, DashboardError> {
        self.get("api/v1/workloads/jobs").await
    }

    async fn list_cronjobs(&self) -> Result<Vec<CronJobWorkload>, DashboardError> {
        self.get("api/v1/workloads/cronjobs").await
    }

    async fn get_workload_detail(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<CombinedWorkloadInfo, DashboardError> {
        let path = format!(
            "api/v1/workloads/{}/{}/{}",
            kind.slug(),
            segment(namespace)?,
            segment(name)?
        );
        self.get(&path).await
    }

    async fn get_namespace_detail(&self, name: &str) -> Result<NamespaceDetail, DashboardError> {
        let path = format!("api/v1/namespaces/{}", segment(name)?);
        self.get(&path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = ApiClient::new("http://dashboard.local:9000/kdd").unwrap();
        assert_eq!(client.base_url().as_str(), "http://dashboard.local:9000/kdd/");
        assert_eq!(
            client.base_url().join("api/v1/nodes").unwrap().as_str(),
            "http://dashboard.local:9000/kdd/api/v1/nodes"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(DashboardError::Url(_))
        ));
    }

    #[test]
    fn test_segment_rejects_separators() {
        assert!(segment("web").is_ok());
        assert!(segment("").is_err());
        assert!(matches!(segment("a/b"), Err(DashboardError::InvalidSegment(s)) if s == "a/b"));
        assert!(segment("a?b").is_err());
        assert!(segment("a#b").is_err());
        assert!(matches!(segment(".."), Err(DashboardError::InvalidSegment(s)) if s == ".."));
        assert!(segment(".").is_err());
        assert!(segment("web.v2").is_ok());
        assert!(segment("...").is_ok());
    }
}
