//! Combined detail assembly for single-workload views

use crate::client::ResourceApi;
use crate::error::DashboardError;
use crate::kind::WorkloadKind;
use crate::models::CombinedWorkloadInfo;
use std::sync::Arc;
use tracing::debug;

/// Resolves a kind slug and fetches one workload with its pods and metrics.
///
/// The service already joins the three parts, so this only validates the
/// kind and passes the result through.
#[derive(Clone)]
pub struct DetailAssembler {
    api: Arc<dyn ResourceApi>,
}

impl DetailAssembler {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self { api }
    }

    /// Fetch the combined detail for `kind_slug/namespace/name`.
    ///
    /// Unknown slugs fail with [`DashboardError::UnknownKind`] before any
    /// request is made.
    pub async fn assemble(
        &self,
        kind_slug: &str,
        namespace: &str,
        name: &str,
    ) -> Result<CombinedWorkloadInfo, DashboardError> {
        let kind = WorkloadKind::from_slug(kind_slug)
            .ok_or_else(|| DashboardError::UnknownKind(kind_slug.to_string()))?;
        self.assemble_kind(kind, namespace, name).await
    }

    pub async fn assemble_kind(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<CombinedWorkloadInfo, DashboardError> {
        debug!(kind = %kind, namespace, name, "Fetching workload detail");
        self.api.get_workload_detail(kind, namespace, name).await
    }
}
