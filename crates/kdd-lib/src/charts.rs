//! Chart series builder
//!
//! Correlates the containers of a set of workloads with a batch of metric
//! samples and produces one time series per container, together with the
//! request/limit threshold lines drawn over it. Chart options are built
//! fresh from the series on every call.

use crate::models::{Container, HasWorkloadInfo, PodContainerMetric};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metric dimension plotted by a chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricDimension {
    Cpu,
    Memory,
}

impl MetricDimension {
    pub fn title(self) -> &'static str {
        match self {
            MetricDimension::Cpu => "CPU",
            MetricDimension::Memory => "Memory",
        }
    }

    fn sample(self, metric: &PodContainerMetric) -> i64 {
        match self {
            MetricDimension::Cpu => metric.cpu_usage,
            MetricDimension::Memory => metric.memory_usage,
        }
    }

    fn request(self, container: &Container) -> i64 {
        match self {
            MetricDimension::Cpu => container.request_cpu,
            MetricDimension::Memory => container.request_memory,
        }
    }

    fn limit(self, container: &Container) -> i64 {
        match self {
            MetricDimension::Cpu => container.limit_cpu,
            MetricDimension::Memory => container.limit_memory,
        }
    }

    /// Human readable value: millicores for CPU, binary units for memory
    pub fn format_value(self, value: i64) -> String {
        match self {
            MetricDimension::Cpu => format!("{}m", value),
            MetricDimension::Memory => format_bytes(value),
        }
    }
}

/// Format bytes with binary prefixes
pub fn format_bytes(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let value = bytes as f64;
    if value.abs() >= GB {
        format!("{:.2}Gi", value / GB)
    } else if value.abs() >= MB {
        format!("{:.2}Mi", value / MB)
    } else if value.abs() >= KB {
        format!("{:.2}Ki", value / KB)
    } else {
        format!("{}B", bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataPoint {
    pub x: DateTime<Utc>,
    pub y: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    Request,
    Limit,
}

/// Horizontal line marking a container's request or limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Threshold {
    pub kind: ThresholdKind,
    pub value: i64,
}

/// Time series for one container of one pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub pod_name: String,
    pub container_name: String,
    pub label: String,
    pub request: i64,
    pub limit: i64,
    /// Samples in ascending timestamp order
    pub data: Vec<DataPoint>,
    /// Request/limit lines; zero values are not drawn
    pub thresholds: Vec<Threshold>,
}

impl ChartSeries {
    /// Most recent sample, if any
    pub fn latest(&self) -> Option<&DataPoint> {
        self.data.last()
    }
}

/// CPU usage series, one per container
pub fn cpu_series<W: HasWorkloadInfo>(
    workloads: &[W],
    metrics: &[PodContainerMetric],
) -> Vec<ChartSeries> {
    build_series(MetricDimension::Cpu, workloads, metrics)
}

/// Memory usage series, one per container
pub fn memory_series<W: HasWorkloadInfo>(
    workloads: &[W],
    metrics: &[PodContainerMetric],
) -> Vec<ChartSeries> {
    build_series(MetricDimension::Memory, workloads, metrics)
}

pub fn build_series<W: HasWorkloadInfo>(
    dimension: MetricDimension,
    workloads: &[W],
    metrics: &[PodContainerMetric],
) -> Vec<ChartSeries> {
    workloads
        .iter()
        .flat_map(|workload| {
            let info = workload.workload_info();
            info.containers
                .iter()
                .map(move |container| container_series(dimension, &info.workload_name, container, metrics))
        })
        .collect()
}

fn container_series(
    dimension: MetricDimension,
    pod_name: &str,
    container: &Container,
    metrics: &[PodContainerMetric],
) -> ChartSeries {
    let mut data: Vec<DataPoint> = metrics
        .iter()
        .filter(|m| m.podname == pod_name && m.container_name == container.container_name)
        .map(|m| DataPoint {
            x: m.creation_date,
            y: dimension.sample(m),
        })
        .collect();
    // Source order is arbitrary
    data.sort_by_key(|point| point.x);

    let request = dimension.request(container);
    let limit = dimension.limit(container);
    let thresholds = [(ThresholdKind::Request, request), (ThresholdKind::Limit, limit)]
        .into_iter()
        .filter(|(_, value)| *value != 0)
        .map(|(kind, value)| Threshold { kind, value })
        .collect();

    ChartSeries {
        pod_name: pod_name.to_string(),
        container_name: container.container_name.clone(),
        label: format!("{} - {}", pod_name, container.container_name),
        request,
        limit,
        data,
        thresholds,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendPosition {
    Left,
    Right,
}

/// Line annotation drawn across the value axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineAnnotation {
    pub value: i64,
    pub label: String,
}

/// Immutable rendering options for one chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartOptions {
    pub title: String,
    pub legend: LegendPosition,
    /// Keyed `{pod}_{container}_{request|limit}`
    pub annotations: BTreeMap<String, LineAnnotation>,
}

/// Build chart options for a set of series
pub fn chart_options(dimension: MetricDimension, series: &[ChartSeries]) -> ChartOptions {
    let legend = match dimension {
        MetricDimension::Cpu => LegendPosition::Left,
        MetricDimension::Memory => LegendPosition::Right,
    };

    let annotations = series
        .iter()
        .flat_map(|s| {
            s.thresholds.iter().map(move |threshold| {
                let suffix = match threshold.kind {
                    ThresholdKind::Request => "request",
                    ThresholdKind::Limit => "limit",
                };
                let key = format!("{}_{}_{}", s.pod_name, s.container_name, suffix);
                let label = format!(
                    "{} - {} - {} {}: {}",
                    s.pod_name,
                    s.container_name,
                    if threshold.kind == ThresholdKind::Request { "Request" } else { "Limit" },
                    dimension.title(),
                    dimension.format_value(threshold.value)
                );
                (
                    key,
                    LineAnnotation {
                        value: threshold.value,
                        label,
                    },
                )
            })
        })
        .collect();

    ChartOptions {
        title: dimension.title().to_string(),
        legend,
        annotations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeneralInfo, PodWorkload};
    use chrono::TimeZone;

    fn container(name: &str, request_cpu: i64, limit_cpu: i64) -> Container {
        Container {
            container_name: name.to_string(),
            image: "nginx".to_string(),
            image_version: "1.25".to_string(),
            request_cpu,
            request_memory: 64 * 1024 * 1024,
            limit_cpu,
            limit_memory: 0,
            restarts: 0,
            init_container: false,
        }
    }

    fn pod(name: &str, containers: Vec<Container>) -> PodWorkload {
        PodWorkload {
            workload_info: GeneralInfo {
                workload_name: name.to_string(),
                namespace: "default".to_string(),
                labels: Default::default(),
                annotations: Default::default(),
                selector: Default::default(),
                containers,
                creation_date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            },
            status: "Running".to_string(),
            restarts: 0,
            owners: vec![],
        }
    }

    fn metric(pod: &str, container: &str, secs: u32, cpu: i64, memory: i64) -> PodContainerMetric {
        PodContainerMetric {
            podname: pod.to_string(),
            namespace: "default".to_string(),
            container_name: container.to_string(),
            cpu_usage: cpu,
            memory_usage: memory,
            creation_date: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, secs).unwrap(),
        }
    }

    #[test]
    fn test_series_data_is_sorted() {
        let pods = vec![pod("web-1", vec![container("app", 100, 200)])];
        let metrics = vec![metric("web-1", "app", 2, 5, 50), metric("web-1", "app", 1, 3, 30)];

        let series = cpu_series(&pods, &metrics);

        assert_eq!(series.len(), 1);
        assert_eq!(
            series[0].data,
            vec![
                DataPoint { x: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 1).unwrap(), y: 3 },
                DataPoint { x: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 2).unwrap(), y: 5 },
            ]
        );
    }

    #[test]
    fn test_series_is_non_decreasing_for_shuffled_input() {
        let pods = vec![pod("web-1", vec![container("app", 100, 200)])];
        let metrics: Vec<_> = [7, 3, 9, 1, 5, 3, 8]
            .into_iter()
            .map(|secs| metric("web-1", "app", secs, secs as i64, 0))
            .collect();

        for series in memory_series(&pods, &metrics).iter().chain(cpu_series(&pods, &metrics).iter()) {
            assert_eq!(series.data.len(), 7);
            assert!(series.data.windows(2).all(|w| w[0].x <= w[1].x));
        }
    }

    #[test]
    fn test_series_per_container_with_matching_samples_only() {
        let pods = vec![
            pod("web-1", vec![container("app", 100, 200), container("sidecar", 10, 0)]),
            pod("web-2", vec![container("app", 100, 200)]),
        ];
        let metrics = vec![
            metric("web-1", "app", 1, 10, 100),
            metric("web-1", "sidecar", 1, 1, 10),
            metric("web-2", "app", 1, 20, 200),
            metric("other", "app", 1, 99, 999),
        ];

        let series = memory_series(&pods, &metrics);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].label, "web-1 - app");
        assert_eq!(series[0].data.len(), 1);
        assert_eq!(series[0].data[0].y, 100);
        assert_eq!(series[1].label, "web-1 - sidecar");
        assert_eq!(series[2].pod_name, "web-2");
        assert_eq!(series[2].data[0].y, 200);
        assert_eq!(series[2].request, 64 * 1024 * 1024);
    }

    #[test]
    fn test_zero_thresholds_are_omitted() {
        let pods = vec![pod("web-1", vec![container("app", 0, 500)])];

        let cpu = cpu_series(&pods, &[]);
        assert_eq!(
            cpu[0].thresholds,
            vec![Threshold { kind: ThresholdKind::Limit, value: 500 }]
        );

        let memory = memory_series(&pods, &[]);
        assert_eq!(
            memory[0].thresholds,
            vec![Threshold { kind: ThresholdKind::Request, value: 64 * 1024 * 1024 }]
        );
        assert!(memory[0].data.is_empty());
    }

    #[test]
    fn test_chart_options_annotations() {
        let pods = vec![pod("web-1", vec![container("app", 100, 200)])];
        let series = cpu_series(&pods, &[]);

        let options = chart_options(MetricDimension::Cpu, &series);

        assert_eq!(options.title, "CPU");
        assert_eq!(options.legend, LegendPosition::Left);
        assert_eq!(options.annotations.len(), 2);
        let request = &options.annotations["web-1_app_request"];
        assert_eq!(request.value, 100);
        assert_eq!(request.label, "web-1 - app - Request CPU: 100m");
        assert_eq!(options.annotations["web-1_app_limit"].value, 200);
    }

    #[test]
    fn test_chart_options_are_rebuilt_not_shared() {
        let first = chart_options(
            MetricDimension::Memory,
            &memory_series(&[pod("a", vec![container("x", 1, 1)])], &[]),
        );
        let second = chart_options(MetricDimension::Memory, &[]);

        assert_eq!(first.annotations.len(), 1);
        assert!(second.annotations.is_empty());
        assert_eq!(second.legend, LegendPosition::Right);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00Ki");
        assert_eq!(format_bytes(64 * 1024 * 1024), "64.00Mi");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00Gi");
    }
}
