//! Raw resource snapshots as returned by the dashboard API

use crate::kind::WorkloadKind;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type StringMap = BTreeMap<String, String>;

/// Treats an explicit `null` the same as an absent field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Envelope wrapped around every API payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub msg: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: String,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: StringMap,
    #[serde(default, deserialize_with = "nullable")]
    pub annotations: StringMap,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// Capacity in millicores
    #[serde(default)]
    pub cpu: i64,
    /// Capacity in bytes
    #[serde(default)]
    pub memory: i64,
    #[serde(default)]
    pub os_image: String,
    #[serde(default)]
    pub kubelet_version: String,
    #[serde(default)]
    pub roles: String,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: StringMap,
    #[serde(default, deserialize_with = "nullable")]
    pub annotations: StringMap,
    pub creation_date: DateTime<Utc>,
}

/// Container spec owned by exactly one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub container_name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub image_version: String,
    /// Millicores
    #[serde(default)]
    pub request_cpu: i64,
    /// Bytes
    #[serde(default)]
    pub request_memory: i64,
    #[serde(default)]
    pub limit_cpu: i64,
    #[serde(default)]
    pub limit_memory: i64,
    #[serde(default)]
    pub restarts: i32,
    #[serde(default)]
    pub init_container: bool,
}

/// Fields shared by every workload kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    pub workload_name: String,
    pub namespace: String,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: StringMap,
    #[serde(default, deserialize_with = "nullable")]
    pub annotations: StringMap,
    #[serde(default, deserialize_with = "nullable")]
    pub selector: StringMap,
    #[serde(default, deserialize_with = "nullable")]
    pub containers: Vec<Container>,
    pub creation_date: DateTime<Utc>,
}

/// Anything that carries a [`GeneralInfo`]
pub trait HasWorkloadInfo {
    fn workload_info(&self) -> &GeneralInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub desired: i32,
    pub ready: i32,
    pub available: i32,
    pub up2date: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentWorkload {
    pub workload_info: GeneralInfo,
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DaemonSetStatus {
    pub desired: i32,
    #[serde(default)]
    pub current: i32,
    pub ready: i32,
    #[serde(default)]
    pub up2date: i32,
    #[serde(default)]
    pub available: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonSetWorkload {
    pub workload_info: GeneralInfo,
    pub status: DaemonSetStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatefulSetStatus {
    #[serde(default)]
    pub current: i32,
    pub ready: i32,
    #[serde(default)]
    pub up2date: i32,
    #[serde(default)]
    pub available: i32,
    pub replicas: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatefulSetWorkload {
    pub workload_info: GeneralInfo,
    pub status: StatefulSetStatus,
}

/// Controller that owns a pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodOwnerReference {
    pub api_version: String,
    pub kind: String,
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodWorkload {
    pub workload_info: GeneralInfo,
    /// Phase reported by the cluster, passed through untouched
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub restarts: i32,
    #[serde(
        rename = "pod_owner_ressources",
        default,
        deserialize_with = "nullable"
    )]
    pub owners: Vec<PodOwnerReference>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub active: i32,
    #[serde(default)]
    pub ready: Option<i32>,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub succeeded: i32,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completion_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobWorkload {
    pub workload_info: GeneralInfo,
    pub status: JobStatus,
}

/// Reference to a job spawned by a cron job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveJobReference {
    #[serde(default)]
    pub api_version: String,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CronJobStatus {
    #[serde(default, deserialize_with = "nullable")]
    pub active_jobs: Vec<ActiveJobReference>,
    #[serde(default)]
    pub last_scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_successful_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronJobWorkload {
    pub workload_info: GeneralInfo,
    #[serde(default)]
    pub suspend: Option<bool>,
    #[serde(default)]
    pub concurrency_policy: String,
    #[serde(default)]
    pub backoff_limit: Option<i32>,
    #[serde(default)]
    pub failed_jobs_history: Option<i32>,
    #[serde(default)]
    pub successful_jobs_history: Option<i32>,
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub status: CronJobStatus,
}

macro_rules! impl_has_workload_info {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl HasWorkloadInfo for $ty {
                fn workload_info(&self) -> &GeneralInfo {
                    &self.workload_info
                }
            }
        )+
    };
}

impl_has_workload_info!(
    DeploymentWorkload,
    DaemonSetWorkload,
    StatefulSetWorkload,
    PodWorkload,
    JobWorkload,
    CronJobWorkload,
);

/// Any workload, tagged by its `type` field on the wire
///
/// Entries whose tag is not a known kind decode into
/// [`Workload::Unrecognized`] so that one bad element does not poison a
/// whole collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Workload {
    Deployment(DeploymentWorkload),
    DaemonSet(DaemonSetWorkload),
    StatefulSet(StatefulSetWorkload),
    Pod(PodWorkload),
    Job(JobWorkload),
    CronJob(CronJobWorkload),
    Unrecognized { kind: String, namespace: String },
}

impl Workload {
    pub fn kind(&self) -> Option<WorkloadKind> {
        match self {
            Workload::Deployment(_) => Some(WorkloadKind::Deployment),
            Workload::DaemonSet(_) => Some(WorkloadKind::DaemonSet),
            Workload::StatefulSet(_) => Some(WorkloadKind::StatefulSet),
            Workload::Pod(_) => Some(WorkloadKind::Pod),
            Workload::Job(_) => Some(WorkloadKind::Job),
            Workload::CronJob(_) => Some(WorkloadKind::CronJob),
            Workload::Unrecognized { .. } => None,
        }
    }

    /// The raw `type` token, including unrecognized ones
    pub fn kind_token(&self) -> &str {
        match self {
            Workload::Unrecognized { kind, .. } => kind,
            _ => self.kind().map(WorkloadKind::token).unwrap_or_default(),
        }
    }

    pub fn info(&self) -> Option<&GeneralInfo> {
        match self {
            Workload::Deployment(w) => Some(&w.workload_info),
            Workload::DaemonSet(w) => Some(&w.workload_info),
            Workload::StatefulSet(w) => Some(&w.workload_info),
            Workload::Pod(w) => Some(&w.workload_info),
            Workload::Job(w) => Some(&w.workload_info),
            Workload::CronJob(w) => Some(&w.workload_info),
            Workload::Unrecognized { .. } => None,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Workload::Unrecognized { namespace, .. } => namespace,
            _ => self.info().map(|info| info.namespace.as_str()).unwrap_or_default(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.info().map(|info| info.workload_name.as_str())
    }
}

impl<'de> Deserialize<'de> for Workload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let token = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let Some(kind) = WorkloadKind::from_token(&token) else {
            let namespace = value
                .pointer("/workload_info/namespace")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(Workload::Unrecognized {
                kind: token,
                namespace,
            });
        };

        let workload = match kind {
            WorkloadKind::Deployment => serde_json::from_value(value).map(Workload::Deployment),
            WorkloadKind::DaemonSet => serde_json::from_value(value).map(Workload::DaemonSet),
            WorkloadKind::StatefulSet => serde_json::from_value(value).map(Workload::StatefulSet),
            WorkloadKind::Pod => serde_json::from_value(value).map(Workload::Pod),
            WorkloadKind::Job => serde_json::from_value(value).map(Workload::Job),
            WorkloadKind::CronJob => serde_json::from_value(value).map(Workload::CronJob),
        };

        workload.map_err(de::Error::custom)
    }
}

impl Serialize for Workload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct Tagged<'a, T: Serialize> {
            #[serde(rename = "type")]
            kind: &'a str,
            #[serde(flatten)]
            inner: &'a T,
        }

        let kind = self.kind_token();
        match self {
            Workload::Deployment(inner) => Tagged { kind, inner }.serialize(serializer),
            Workload::DaemonSet(inner) => Tagged { kind, inner }.serialize(serializer),
            Workload::StatefulSet(inner) => Tagged { kind, inner }.serialize(serializer),
            Workload::Pod(inner) => Tagged { kind, inner }.serialize(serializer),
            Workload::Job(inner) => Tagged { kind, inner }.serialize(serializer),
            Workload::CronJob(inner) => Tagged { kind, inner }.serialize(serializer),
            Workload::Unrecognized { namespace, .. } => serde_json::json!({
                "type": kind,
                "workload_info": { "namespace": namespace },
            })
            .serialize(serializer),
        }
    }
}

/// Point-in-time usage sample for one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodContainerMetric {
    pub podname: String,
    pub namespace: String,
    pub container_name: String,
    /// Millicores
    pub cpu_usage: i64,
    /// Bytes
    pub memory_usage: i64,
    pub creation_date: DateTime<Utc>,
}

/// Workload together with its pods and their metrics, joined server-side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedWorkloadInfo {
    pub workload: Workload,
    #[serde(default, deserialize_with = "nullable")]
    pub pods: Vec<PodWorkload>,
    #[serde(default, deserialize_with = "nullable")]
    pub metrics: Vec<PodContainerMetric>,
}

/// Cluster event attached to a namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub last_seen: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
    #[serde(default)]
    pub count: u64,
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub source: String,
}

/// One namespace with its workloads and recent events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceDetail {
    pub namespace: Namespace,
    #[serde(default, deserialize_with = "nullable")]
    pub workloads: Vec<Workload>,
    #[serde(default, deserialize_with = "nullable")]
    pub events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deployment_json() -> Value {
        json!({
            "type": "Deployment",
            "workload_info": {
                "workload_name": "web",
                "namespace": "shop",
                "labels": {"app": "web"},
                "annotations": null,
                "containers": [{
                    "container_name": "nginx",
                    "image": "nginx",
                    "image_version": "1.25",
                    "request_cpu": 100,
                    "request_memory": 134217728,
                    "limit_cpu": 200,
                    "limit_memory": 268435456,
                    "restarts": 0,
                    "init_container": false
                }],
                "creation_date": "2023-05-01T10:00:00Z"
            },
            "status": {"desired": 3, "ready": 2, "available": 2, "up2date": 3}
        })
    }

    #[test]
    fn test_workload_decodes_by_type_tag() {
        let workload: Workload = serde_json::from_value(deployment_json()).unwrap();

        assert_eq!(workload.kind(), Some(WorkloadKind::Deployment));
        assert_eq!(workload.namespace(), "shop");
        assert_eq!(workload.name(), Some("web"));

        let Workload::Deployment(deployment) = workload else {
            panic!("expected a deployment");
        };
        assert_eq!(deployment.status.ready, 2);
        assert_eq!(deployment.workload_info.containers[0].limit_cpu, 200);
    }

    #[test]
    fn test_null_and_missing_maps_default_to_empty() {
        let workload: Workload = serde_json::from_value(deployment_json()).unwrap();
        let info = workload.info().unwrap();

        assert!(info.annotations.is_empty());
        assert!(info.selector.is_empty());
        assert_eq!(info.labels.get("app").map(String::as_str), Some("web"));
    }

    #[test]
    fn test_unknown_type_decodes_as_unrecognized() {
        let value = json!({
            "type": "ReplicaSet",
            "workload_info": {"workload_name": "rs", "namespace": "shop"}
        });
        let workload: Workload = serde_json::from_value(value).unwrap();

        assert_eq!(
            workload,
            Workload::Unrecognized {
                kind: "ReplicaSet".to_string(),
                namespace: "shop".to_string()
            }
        );
        assert_eq!(workload.kind(), None);
        assert_eq!(workload.kind_token(), "ReplicaSet");
    }

    #[test]
    fn test_known_type_with_bad_payload_is_an_error() {
        let value = json!({"type": "Job", "workload_info": {"workload_name": "j"}});
        assert!(serde_json::from_value::<Workload>(value).is_err());
    }

    #[test]
    fn test_workload_serializes_with_type_tag() {
        let workload: Workload = serde_json::from_value(deployment_json()).unwrap();
        let value = serde_json::to_value(&workload).unwrap();

        assert_eq!(value["type"], "Deployment");
        assert_eq!(value["workload_info"]["workload_name"], "web");
        assert_eq!(value["status"]["desired"], 3);
    }

    #[test]
    fn test_job_status_with_null_times() {
        let value = json!({
            "type": "Job",
            "workload_info": {
                "workload_name": "migrate",
                "namespace": "db",
                "containers": null,
                "creation_date": "2023-05-01T10:00:00Z"
            },
            "status": {
                "active": 1,
                "ready": null,
                "failed": 0,
                "succeeded": 0,
                "start_time": "2023-05-01T10:00:05Z",
                "completion_time": null
            }
        });
        let Workload::Job(job) = serde_json::from_value::<Workload>(value).unwrap() else {
            panic!("expected a job");
        };

        assert!(job.workload_info.containers.is_empty());
        assert!(job.status.start_time.is_some());
        assert!(job.status.completion_time.is_none());
        assert!(job.status.ready.is_none());
    }

    #[test]
    fn test_api_response_envelope() {
        let body = r#"{"code":200,"msg":"ok","data":[{"name":"default","status":"Active","labels":null,"annotations":{},"creation_date":"2023-01-01T00:00:00Z"}]}"#;
        let response: ApiResponse<Vec<Namespace>> = serde_json::from_str(body).unwrap();

        assert_eq!(response.code, 200);
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].name, "default");
        assert!(response.data[0].labels.is_empty());
    }

    #[test]
    fn test_pod_owner_field_name() {
        let value = json!({
            "type": "Pod",
            "workload_info": {
                "workload_name": "web-abc",
                "namespace": "shop",
                "creation_date": "2023-05-01T10:00:00Z"
            },
            "status": "Running",
            "restarts": 4,
            "pod_owner_ressources": [
                {"api_version": "apps/v1", "kind": "ReplicaSet", "uid": "u1", "name": "web-5d8"}
            ]
        });
        let Workload::Pod(pod) = serde_json::from_value::<Workload>(value).unwrap() else {
            panic!("expected a pod");
        };

        assert_eq!(pod.status, "Running");
        assert_eq!(pod.restarts, 4);
        assert_eq!(pod.owners[0].kind, "ReplicaSet");
    }
}
