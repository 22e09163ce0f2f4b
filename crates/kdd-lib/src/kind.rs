//! Workload kind registry
//!
//! Single source of truth for the six workload kinds: canonical wire tokens,
//! URL slugs, and the link layout of detail views. Every other module
//! dispatches on [`WorkloadKind`] instead of matching raw strings.

use crate::error::DashboardError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of detail-view links
const DETAIL_LINK_PREFIX: &str = "/ui/workloads";

/// The closed set of workload kinds served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    #[serde(rename = "Deployment")]
    Deployment,
    #[serde(rename = "Daemonset")]
    DaemonSet,
    #[serde(rename = "Statefulset")]
    StatefulSet,
    #[serde(rename = "Pod")]
    Pod,
    #[serde(rename = "Job")]
    Job,
    #[serde(rename = "Cronjob")]
    CronJob,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 6] = [
        WorkloadKind::Deployment,
        WorkloadKind::DaemonSet,
        WorkloadKind::StatefulSet,
        WorkloadKind::Pod,
        WorkloadKind::Job,
        WorkloadKind::CronJob,
    ];

    /// Canonical token as carried in the `type` field of a workload
    pub fn token(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::DaemonSet => "Daemonset",
            WorkloadKind::StatefulSet => "Statefulset",
            WorkloadKind::Pod => "Pod",
            WorkloadKind::Job => "Job",
            WorkloadKind::CronJob => "Cronjob",
        }
    }

    /// URL slug used by the API collection endpoints
    pub fn slug(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployments",
            WorkloadKind::DaemonSet => "daemonsets",
            WorkloadKind::StatefulSet => "statefulsets",
            WorkloadKind::Pod => "pods",
            WorkloadKind::Job => "jobs",
            WorkloadKind::CronJob => "cronjobs",
        }
    }

    /// Headline used by detail views
    pub fn display_name(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::DaemonSet => "DaemonSet",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::Pod => "Pod",
            WorkloadKind::Job => "Job",
            WorkloadKind::CronJob => "CronJob",
        }
    }

    /// Whether the kind contributes to per-namespace workload counts
    pub fn is_counted(self) -> bool {
        matches!(
            self,
            WorkloadKind::Deployment | WorkloadKind::DaemonSet | WorkloadKind::StatefulSet
        )
    }

    /// Resolve a slug from a URL or command line.
    ///
    /// Matching ignores ASCII case and accepts both the plural API slug
    /// (`deployments`) and the singular token (`deployment`). Anything else
    /// yields `None`, which callers must handle explicitly.
    pub fn from_slug(slug: &str) -> Option<WorkloadKind> {
        let slug = slug.trim();
        Self::ALL.into_iter().find(|kind| {
            slug.eq_ignore_ascii_case(kind.slug()) || slug.eq_ignore_ascii_case(kind.token())
        })
    }

    /// Resolve a canonical token exactly as sent by the API
    pub fn from_token(token: &str) -> Option<WorkloadKind> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for WorkloadKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkloadKind::from_slug(s).ok_or_else(|| DashboardError::UnknownKind(s.to_string()))
    }
}

/// Case-sensitive check against the canonical tokens
pub fn is_kind(value: &str) -> bool {
    WorkloadKind::from_token(value).is_some()
}

/// Path of the detail view for one workload, keyed by the lowercased token
pub fn detail_link(kind: WorkloadKind, namespace: &str, name: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        DETAIL_LINK_PREFIX,
        kind.token().to_ascii_lowercase(),
        namespace,
        name
    )
}
