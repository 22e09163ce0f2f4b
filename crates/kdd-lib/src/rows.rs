//! Row transformers
//!
//! Pure mappings from one raw workload to one flattened grid row. Every
//! derived field (status, ratios, durations) is recomputed from the input on
//! each call; nothing is cached between polls.

use crate::error::DashboardError;
use crate::kind::WorkloadKind;
use crate::models::{
    CronJobWorkload, DaemonSetWorkload, DeploymentWorkload, GeneralInfo, JobStatus, JobWorkload,
    Node, PodWorkload, StatefulSetWorkload, StringMap, Workload,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Synthetic status shown for controller-managed workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadStatus {
    Running,
    Loading,
    Failed,
    Succeeded,
    Unknown,
}

impl WorkloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadStatus::Running => "running",
            WorkloadStatus::Loading => "loading",
            WorkloadStatus::Failed => "failed",
            WorkloadStatus::Succeeded => "succeeded",
            WorkloadStatus::Unknown => "unknown",
        }
    }

    /// `running` once every wanted replica is ready, `loading` otherwise
    fn from_readiness(ready: i32, wanted: i32) -> Self {
        if ready != wanted {
            WorkloadStatus::Loading
        } else {
            WorkloadStatus::Running
        }
    }

    /// Active beats failed beats succeeded
    fn from_job(status: &JobStatus) -> Self {
        if status.active > 0 {
            WorkloadStatus::Running
        } else if status.failed > 0 {
            WorkloadStatus::Failed
        } else if status.succeeded > 0 {
            WorkloadStatus::Succeeded
        } else {
            WorkloadStatus::Unknown
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Columns every workload row starts with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommonColumns {
    pub workload_name: String,
    pub namespace: String,
    pub creation_date: DateTime<Utc>,
    pub labels: StringMap,
    pub annotations: StringMap,
    pub selector: StringMap,
}

impl From<&GeneralInfo> for CommonColumns {
    fn from(info: &GeneralInfo) -> Self {
        Self {
            workload_name: info.workload_name.clone(),
            namespace: info.namespace.clone(),
            creation_date: info.creation_date,
            labels: info.labels.clone(),
            annotations: info.annotations.clone(),
            selector: info.selector.clone(),
        }
    }
}

/// Row shape shared by deployments and daemon sets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicaRow {
    #[serde(flatten)]
    pub common: CommonColumns,
    pub status: WorkloadStatus,
    pub status_ready: String,
    pub status_available: i32,
    pub status_up2date: i32,
}

pub type DeploymentRow = ReplicaRow;
pub type DaemonSetRow = ReplicaRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatefulSetRow {
    #[serde(flatten)]
    pub common: CommonColumns,
    pub status: WorkloadStatus,
    pub status_ready: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodRow {
    #[serde(flatten)]
    pub common: CommonColumns,
    pub count_containers: usize,
    pub restarts: i32,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRow {
    #[serde(flatten)]
    pub common: CommonColumns,
    pub start_time: Option<DateTime<Utc>>,
    pub completion_time: Option<DateTime<Utc>>,
    pub status: WorkloadStatus,
    pub status_active: i32,
    pub status_failed: i32,
    pub status_succeeded: i32,
    /// Whole seconds between start and completion
    #[serde(serialize_with = "serialize_duration_secs")]
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CronJobRow {
    #[serde(flatten)]
    pub common: CommonColumns,
    pub active_jobs: usize,
    pub last_scheduled_time: Option<DateTime<Utc>>,
    pub last_successful_time: Option<DateTime<Utc>>,
    pub suspend: Option<bool>,
    pub schedule: String,
}

pub type NodeRow = Node;

/// Row of any kind, as produced by [`workload_row`].
///
/// Serialized with the canonical kind token in `type`, the same field the
/// API uses on raw workloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum GridRow {
    #[serde(rename = "Deployment")]
    Deployment(DeploymentRow),
    #[serde(rename = "Daemonset")]
    DaemonSet(DaemonSetRow),
    #[serde(rename = "Statefulset")]
    StatefulSet(StatefulSetRow),
    #[serde(rename = "Pod")]
    Pod(PodRow),
    #[serde(rename = "Job")]
    Job(JobRow),
    #[serde(rename = "Cronjob")]
    CronJob(CronJobRow),
}

impl GridRow {
    pub fn kind(&self) -> WorkloadKind {
        match self {
            GridRow::Deployment(_) => WorkloadKind::Deployment,
            GridRow::DaemonSet(_) => WorkloadKind::DaemonSet,
            GridRow::StatefulSet(_) => WorkloadKind::StatefulSet,
            GridRow::Pod(_) => WorkloadKind::Pod,
            GridRow::Job(_) => WorkloadKind::Job,
            GridRow::CronJob(_) => WorkloadKind::CronJob,
        }
    }

    pub fn common(&self) -> &CommonColumns {
        match self {
            GridRow::Deployment(row) | GridRow::DaemonSet(row) => &row.common,
            GridRow::StatefulSet(row) => &row.common,
            GridRow::Pod(row) => &row.common,
            GridRow::Job(row) => &row.common,
            GridRow::CronJob(row) => &row.common,
        }
    }

    /// Status column as text; cron jobs have none
    pub fn status_text(&self) -> Option<String> {
        match self {
            GridRow::Deployment(row) | GridRow::DaemonSet(row) => Some(row.status.to_string()),
            GridRow::StatefulSet(row) => Some(row.status.to_string()),
            GridRow::Pod(row) => Some(row.status.clone()),
            GridRow::Job(row) => Some(row.status.to_string()),
            GridRow::CronJob(_) => None,
        }
    }
}

fn serialize_duration_secs<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(d) => serializer.serialize_some(&d.num_seconds()),
        None => serializer.serialize_none(),
    }
}

pub fn deployment_row(workload: &DeploymentWorkload) -> DeploymentRow {
    let status = &workload.status;
    ReplicaRow {
        common: CommonColumns::from(&workload.workload_info),
        status: WorkloadStatus::from_readiness(status.ready, status.desired),
        status_ready: format!("{}/{}", status.ready, status.desired),
        status_available: status.available,
        status_up2date: status.up2date,
    }
}

pub fn daemonset_row(workload: &DaemonSetWorkload) -> DaemonSetRow {
    let status = &workload.status;
    ReplicaRow {
        common: CommonColumns::from(&workload.workload_info),
        status: WorkloadStatus::from_readiness(status.ready, status.desired),
        status_ready: format!("{}/{}", status.ready, status.desired),
        status_available: status.available,
        status_up2date: status.up2date,
    }
}

pub fn statefulset_row(workload: &StatefulSetWorkload) -> StatefulSetRow {
    let status = &workload.status;
    StatefulSetRow {
        common: CommonColumns::from(&workload.workload_info),
        status: WorkloadStatus::from_readiness(status.ready, status.replicas),
        status_ready: format!("{}/{}", status.ready, status.replicas),
    }
}

pub fn pod_row(workload: &PodWorkload) -> PodRow {
    PodRow {
        common: CommonColumns::from(&workload.workload_info),
        count_containers: workload.workload_info.containers.len(),
        restarts: workload.restarts,
        status: workload.status.clone(),
    }
}

pub fn job_row(workload: &JobWorkload) -> JobRow {
    let status = &workload.status;
    JobRow {
        common: CommonColumns::from(&workload.workload_info),
        start_time: status.start_time,
        completion_time: status.completion_time,
        status: WorkloadStatus::from_job(status),
        status_active: status.active,
        status_failed: status.failed,
        status_succeeded: status.succeeded,
        duration: job_duration(status),
    }
}

pub fn cronjob_row(workload: &CronJobWorkload) -> CronJobRow {
    CronJobRow {
        common: CommonColumns::from(&workload.workload_info),
        active_jobs: workload.status.active_jobs.len(),
        last_scheduled_time: workload.status.last_scheduled_time,
        last_successful_time: workload.status.last_successful_time,
        suspend: workload.suspend,
        schedule: workload.schedule.clone(),
    }
}

pub fn node_row(node: &Node) -> NodeRow {
    node.clone()
}

/// Elapsed time of a finished job; `None` while either end is missing
pub fn job_duration(status: &JobStatus) -> Option<Duration> {
    match (status.start_time, status.completion_time) {
        (Some(start), Some(completion)) => Some(completion - start),
        _ => None,
    }
}

/// Dispatch a union-typed workload to its kind's transformer
pub fn workload_row(workload: &Workload) -> Result<GridRow, DashboardError> {
    let row = match workload {
        Workload::Deployment(w) => GridRow::Deployment(deployment_row(w)),
        Workload::DaemonSet(w) => GridRow::DaemonSet(daemonset_row(w)),
        Workload::StatefulSet(w) => GridRow::StatefulSet(statefulset_row(w)),
        Workload::Pod(w) => GridRow::Pod(pod_row(w)),
        Workload::Job(w) => GridRow::Job(job_row(w)),
        Workload::CronJob(w) => GridRow::CronJob(cronjob_row(w)),
        Workload::Unrecognized { kind, .. } => {
            return Err(DashboardError::UnknownKind(kind.clone()));
        }
    };
    Ok(row)
}

/// Transform a mixed collection, skipping entries of unknown kind
pub fn workload_rows(workloads: &[Workload]) -> Vec<GridRow> {
    workloads
        .iter()
        .filter_map(|workload| match workload_row(workload) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    namespace = workload.namespace(),
                    "Skipping workload of unknown kind"
                );
                crate::observability::DashboardMetrics::new().inc_unknown_kinds();
                None
            }
        })
        .collect()
}
