//! Namespace aggregation
//!
//! Joins the namespace and workload collections, which come from separate
//! endpoints, and counts the controller workloads living in each namespace.

use crate::kind::WorkloadKind;
use crate::models::{Namespace, Workload};
use crate::observability::DashboardMetrics;
use serde::Serialize;
use tracing::warn;

/// Per-namespace counts of controller workloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadCounts {
    pub deployments: usize,
    pub daemonsets: usize,
    pub statefulsets: usize,
}

impl WorkloadCounts {
    pub fn total(&self) -> usize {
        self.deployments + self.daemonsets + self.statefulsets
    }

    /// Bump the counter for `kind`; kinds outside the counted set are ignored
    fn record(&mut self, kind: WorkloadKind) {
        match kind {
            WorkloadKind::Deployment => self.deployments += 1,
            WorkloadKind::DaemonSet => self.daemonsets += 1,
            WorkloadKind::StatefulSet => self.statefulsets += 1,
            WorkloadKind::Pod | WorkloadKind::Job | WorkloadKind::CronJob => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceRow {
    #[serde(flatten)]
    pub namespace: Namespace,
    pub workloads: WorkloadCounts,
}

/// Build one row per namespace with its workload counts.
///
/// Runs in O(namespaces × workloads). Workloads of unknown kind are logged
/// and skipped.
pub fn aggregate_namespaces(namespaces: &[Namespace], workloads: &[Workload]) -> Vec<NamespaceRow> {
    let metrics = DashboardMetrics::new();

    namespaces
        .iter()
        .map(|ns| {
            let mut counts = WorkloadCounts::default();

            for workload in workloads.iter().filter(|w| w.namespace() == ns.name) {
                match workload.kind() {
                    Some(kind) => counts.record(kind),
                    None => {
                        warn!(
                            kind = workload.kind_token(),
                            namespace = %ns.name,
                            "Unknown workload type found"
                        );
                        metrics.inc_unknown_kinds();
                    }
                }
            }

            NamespaceRow {
                namespace: ns.clone(),
                workloads: counts,
            }
        })
        .collect()
}
