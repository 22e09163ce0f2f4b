//! Ready-made views for the [`Poller`](crate::poller::Poller)
//!
//! Each view is one page of the dashboard: it calls the facade and runs the
//! pure transforms over the raw result. Nothing is kept between fetches.

use crate::aggregate::{aggregate_namespaces, NamespaceRow, WorkloadCounts};
use crate::charts::{
    chart_options, cpu_series, memory_series, ChartOptions, ChartSeries, MetricDimension,
};
use crate::client::ResourceApi;
use crate::detail::DetailAssembler;
use crate::error::DashboardError;
use crate::kind::WorkloadKind;
use crate::models::{CombinedWorkloadInfo, Event, Namespace, Workload};
use crate::poller::View;
use crate::rows::{node_row, workload_rows, GridRow, NodeRow};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Namespace list with per-namespace workload counts
pub struct NamespacesView {
    api: Arc<dyn ResourceApi>,
}

impl NamespacesView {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl View for NamespacesView {
    type Output = Vec<NamespaceRow>;

    fn name(&self) -> &str {
        "namespaces"
    }

    async fn fetch(&self) -> Result<Self::Output, DashboardError> {
        // Both collections come from independent endpoints
        let (namespaces, workloads) =
            tokio::try_join!(self.api.list_namespaces(), self.api.list_workloads())?;
        Ok(aggregate_namespaces(&namespaces, &workloads))
    }
}

/// Grid rows for one workload kind
pub struct WorkloadRowsView {
    api: Arc<dyn ResourceApi>,
    kind: WorkloadKind,
    name: String,
}

impl WorkloadRowsView {
    pub fn new(api: Arc<dyn ResourceApi>, kind: WorkloadKind) -> Self {
        Self {
            api,
            kind,
            name: format!("workloads/{}", kind.slug()),
        }
    }

    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }
}

#[async_trait]
impl View for WorkloadRowsView {
    type Output = Vec<GridRow>;

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Self::Output, DashboardError> {
        let workloads = self.api.list_kind(self.kind).await?;
        Ok(workload_rows(&workloads))
    }
}

/// Grid rows for every workload in the cluster
pub struct AllWorkloadRowsView {
    api: Arc<dyn ResourceApi>,
}

impl AllWorkloadRowsView {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl View for AllWorkloadRowsView {
    type Output = Vec<GridRow>;

    fn name(&self) -> &str {
        "workloads"
    }

    async fn fetch(&self) -> Result<Self::Output, DashboardError> {
        let workloads = self.api.list_workloads().await?;
        Ok(workload_rows(&workloads))
    }
}

pub struct NodesView {
    api: Arc<dyn ResourceApi>,
}

impl NodesView {
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl View for NodesView {
    type Output = Vec<NodeRow>;

    fn name(&self) -> &str {
        "nodes"
    }

    async fn fetch(&self) -> Result<Self::Output, DashboardError> {
        let nodes = self.api.list_nodes().await?;
        Ok(nodes.iter().map(node_row).collect())
    }
}

/// Everything the workload detail page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadDetail {
    pub info: CombinedWorkloadInfo,
    pub cpu: Vec<ChartSeries>,
    pub memory: Vec<ChartSeries>,
    pub cpu_options: ChartOptions,
    pub memory_options: ChartOptions,
}

impl WorkloadDetail {
    /// Derive the chart series of every pod from the assembled info
    pub fn from_info(info: CombinedWorkloadInfo) -> Self {
        let cpu = cpu_series(&info.pods, &info.metrics);
        let memory = memory_series(&info.pods, &info.metrics);
        let cpu_options = chart_options(MetricDimension::Cpu, &cpu);
        let memory_options = chart_options(MetricDimension::Memory, &memory);

        Self {
            info,
            cpu,
            memory,
            cpu_options,
            memory_options,
        }
    }
}

/// One workload with its pods, metrics and charts
pub struct WorkloadDetailView {
    assembler: DetailAssembler,
    kind: WorkloadKind,
    namespace: String,
    workload_name: String,
    name: String,
}

impl WorkloadDetailView {
    /// Resolve `kind_slug` up front; an unknown slug never reaches the poller
    pub fn new(
        api: Arc<dyn ResourceApi>,
        kind_slug: &str,
        namespace: &str,
        workload_name: &str,
    ) -> Result<Self, DashboardError> {
        let kind = WorkloadKind::from_slug(kind_slug)
            .ok_or_else(|| DashboardError::UnknownKind(kind_slug.to_string()))?;

        Ok(Self::for_kind(api, kind, namespace, workload_name))
    }

    pub fn for_kind(
        api: Arc<dyn ResourceApi>,
        kind: WorkloadKind,
        namespace: &str,
        workload_name: &str,
    ) -> Self {
        Self {
            assembler: DetailAssembler::new(api),
            kind,
            namespace: namespace.to_string(),
            workload_name: workload_name.to_string(),
            name: format!("workload/{}", kind.slug()),
        }
    }

    pub fn kind(&self) -> WorkloadKind {
        self.kind
    }
}

#[async_trait]
impl View for WorkloadDetailView {
    type Output = WorkloadDetail;

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Self::Output, DashboardError> {
        let info = self
            .assembler
            .assemble_kind(self.kind, &self.namespace, &self.workload_name)
            .await?;
        Ok(WorkloadDetail::from_info(info))
    }
}

/// Everything the namespace detail page shows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespacePage {
    pub namespace: Namespace,
    pub workloads: WorkloadCounts,
    pub rows: Vec<GridRow>,
    /// Most recently seen first
    pub events: Vec<Event>,
}

pub struct NamespaceDetailView {
    api: Arc<dyn ResourceApi>,
    namespace: String,
}

impl NamespaceDetailView {
    pub fn new(api: Arc<dyn ResourceApi>, namespace: &str) -> Self {
        Self {
            api,
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl View for NamespaceDetailView {
    type Output = NamespacePage;

    fn name(&self) -> &str {
        "namespace"
    }

    async fn fetch(&self) -> Result<Self::Output, DashboardError> {
        let detail = self.api.get_namespace_detail(&self.namespace).await?;

        // Unknown kinds are reported once, while building rows
        let rows = workload_rows(&detail.workloads);
        let known: Vec<Workload> = detail
            .workloads
            .into_iter()
            .filter(|w| !matches!(w, Workload::Unrecognized { .. }))
            .collect();

        let workloads = aggregate_namespaces(std::slice::from_ref(&detail.namespace), &known)
            .pop()
            .map(|row| row.workloads)
            .unwrap_or_default();

        let mut events = detail.events;
        events.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));

        Ok(NamespacePage {
            namespace: detail.namespace,
            workloads,
            rows,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Container, CronJobWorkload, DaemonSetWorkload, DeploymentStatus, DeploymentWorkload,
        GeneralInfo, JobWorkload, NamespaceDetail, Node, PodContainerMetric, PodWorkload,
        StatefulSetWorkload, Workload,
    };
    use crate::observability::{unknown_kinds_guard, DashboardMetrics};
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, minute, 0).unwrap()
    }

    fn info(name: &str, namespace: &str, containers: Vec<Container>) -> GeneralInfo {
        GeneralInfo {
            workload_name: name.to_string(),
            namespace: namespace.to_string(),
            labels: Default::default(),
            annotations: Default::default(),
            selector: Default::default(),
            containers,
            creation_date: at(0),
        }
    }

    fn deployment(name: &str, namespace: &str) -> DeploymentWorkload {
        DeploymentWorkload {
            workload_info: info(name, namespace, vec![]),
            status: DeploymentStatus {
                desired: 2,
                ready: 2,
                available: 2,
                up2date: 2,
            },
        }
    }

    fn namespace(name: &str) -> Namespace {
        Namespace {
            name: name.to_string(),
            status: "Active".to_string(),
            labels: Default::default(),
            annotations: Default::default(),
            creation_date: at(0),
        }
    }

    fn event(name: &str, minute: u32) -> Event {
        Event {
            last_seen: at(minute),
            first_seen: at(0),
            count: 1,
            name: name.to_string(),
            namespace: "shop".to_string(),
            event_type: "Normal".to_string(),
            reason: "Scheduled".to_string(),
            message: String::new(),
            object: String::new(),
            source: String::new(),
        }
    }

    /// In-memory cluster with a request counter
    #[derive(Default)]
    struct FakeApi {
        requests: AtomicUsize,
        fail_namespaces: bool,
    }

    impl FakeApi {
        fn hit(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ResourceApi for FakeApi {
        async fn list_namespaces(&self) -> Result<Vec<Namespace>, DashboardError> {
            self.hit();
            if self.fail_namespaces {
                return Err(DashboardError::Status {
                    status: 502,
                    body: String::new(),
                });
            }
            Ok(vec![namespace("shop"), namespace("empty")])
        }
        async fn list_nodes(&self) -> Result<Vec<Node>, DashboardError> {
            self.hit();
            Ok(vec![])
        }
        async fn list_workloads(&self) -> Result<Vec<Workload>, DashboardError> {
            self.hit();
            Ok(vec![
                Workload::Deployment(deployment("web", "shop")),
                Workload::Deployment(deployment("api", "shop")),
                Workload::Unrecognized {
                    kind: "ReplicaSet".to_string(),
                    namespace: "shop".to_string(),
                },
            ])
        }
        async fn list_deployments(&self) -> Result<Vec<DeploymentWorkload>, DashboardError> {
            self.hit();
            Ok(vec![deployment("web", "shop")])
        }
        async fn list_daemonsets(&self) -> Result<Vec<DaemonSetWorkload>, DashboardError> {
            self.hit();
            Ok(vec![])
        }
        async fn list_statefulsets(&self) -> Result<Vec<StatefulSetWorkload>, DashboardError> {
            self.hit();
            Ok(vec![])
        }
        async fn list_pods(&self) -> Result<Vec<PodWorkload>, DashboardError> {
            self.hit();
            Ok(vec![])
        }
        async fn list_jobs(&self) -> Result<Vec<JobWorkload>, DashboardError> {
            self.hit();
            Ok(vec![])
        }
        async fn list_cronjobs(&self) -> Result<Vec<CronJobWorkload>, DashboardError> {
            self.hit();
            Ok(vec![])
        }
        async fn get_workload_detail(
            &self,
            _kind: WorkloadKind,
            namespace: &str,
            name: &str,
        ) -> Result<CombinedWorkloadInfo, DashboardError> {
            self.hit();
            let container = Container {
                container_name: "app".to_string(),
                image: "nginx".to_string(),
                image_version: "1.25".to_string(),
                request_cpu: 100,
                limit_cpu: 0,
                request_memory: 64 * 1024 * 1024,
                limit_memory: 128 * 1024 * 1024,
                restarts: 0,
                init_container: false,
            };
            let pod = PodWorkload {
                workload_info: info("web-1", namespace, vec![container]),
                status: "Running".to_string(),
                restarts: 0,
                owners: vec![],
            };
            let sample = |minute, cpu| PodContainerMetric {
                podname: "web-1".to_string(),
                namespace: namespace.to_string(),
                container_name: "app".to_string(),
                cpu_usage: cpu,
                memory_usage: 1024,
                creation_date: at(minute),
            };
            Ok(CombinedWorkloadInfo {
                workload: Workload::Deployment(deployment(name, namespace)),
                pods: vec![pod],
                metrics: vec![sample(2, 30), sample(1, 10)],
            })
        }
        async fn get_namespace_detail(
            &self,
            name: &str,
        ) -> Result<NamespaceDetail, DashboardError> {
            self.hit();
            Ok(NamespaceDetail {
                namespace: namespace(name),
                workloads: vec![
                    Workload::Deployment(deployment("web", name)),
                    Workload::Unrecognized {
                        kind: "ReplicaSet".to_string(),
                        namespace: name.to_string(),
                    },
                ],
                events: vec![event("old", 1), event("new", 5)],
            })
        }
    }

    #[tokio::test]
    async fn test_namespaces_view_aggregates() {
        let _guard = unknown_kinds_guard();
        let api = Arc::new(FakeApi::default());
        let view = NamespacesView::new(api.clone());

        let rows = view.fetch().await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].workloads.deployments, 2);
        assert_eq!(rows[1].workloads.total(), 0);
        assert_eq!(api.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_namespaces_view_fails_as_a_whole() {
        let api = Arc::new(FakeApi {
            fail_namespaces: true,
            ..Default::default()
        });
        let view = NamespacesView::new(api);

        let err = view.fetch().await.unwrap_err();
        assert!(matches!(err, DashboardError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_workload_rows_view_uses_kind_endpoint() {
        let view = WorkloadRowsView::new(Arc::new(FakeApi::default()), WorkloadKind::Deployment);
        assert_eq!(view.name(), "workloads/deployments");

        let rows = view.fetch().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind(), WorkloadKind::Deployment);
        assert_eq!(rows[0].status_text().as_deref(), Some("running"));
    }

    #[tokio::test]
    async fn test_all_workloads_view_skips_unknown() {
        let _guard = unknown_kinds_guard();
        let view = AllWorkloadRowsView::new(Arc::new(FakeApi::default()));
        let rows = view.fetch().await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_detail_view_builds_charts() {
        let view =
            WorkloadDetailView::new(Arc::new(FakeApi::default()), "deployments", "shop", "web")
                .unwrap();

        let detail = view.fetch().await.unwrap();

        assert_eq!(detail.info.workload.name(), Some("web"));
        assert_eq!(detail.cpu.len(), 1);
        let ys: Vec<i64> = detail.cpu[0].data.iter().map(|p| p.y).collect();
        assert_eq!(ys, vec![10, 30]);
        // Zero CPU limit is not drawn
        assert_eq!(detail.cpu_options.annotations.len(), 1);
        assert!(detail.cpu_options.annotations.contains_key("web-1_app_request"));
        assert_eq!(detail.memory_options.annotations.len(), 2);
    }

    #[tokio::test]
    async fn test_detail_view_for_resolved_kind() {
        let api = Arc::new(FakeApi::default());
        let view = WorkloadDetailView::for_kind(api.clone(), WorkloadKind::StatefulSet, "shop", "web");

        assert_eq!(view.kind(), WorkloadKind::StatefulSet);
        assert_eq!(view.name(), "workload/statefulsets");
        assert_eq!(api.requests.load(Ordering::SeqCst), 0);

        view.fetch().await.unwrap();
        assert_eq!(api.requests.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detail_view_rejects_unknown_kind() {
        let api = Arc::new(FakeApi::default());
        let result = WorkloadDetailView::new(api.clone(), "replicasets", "shop", "web");

        assert!(matches!(result, Err(DashboardError::UnknownKind(_))));
        assert_eq!(api.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_namespace_detail_view() {
        let _guard = unknown_kinds_guard();
        let metrics = DashboardMetrics::new();
        let view = NamespaceDetailView::new(Arc::new(FakeApi::default()), "shop");

        let before = metrics.unknown_kinds();
        let page = view.fetch().await.unwrap();

        // The ReplicaSet is skipped and reported once
        assert_eq!(metrics.unknown_kinds() - before, 1);
        assert_eq!(page.namespace.name, "shop");
        assert_eq!(page.workloads.deployments, 1);
        assert_eq!(page.workloads.total(), 1);
        assert_eq!(page.rows.len(), 1);
        let names: Vec<&str> = page.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);
    }
}
