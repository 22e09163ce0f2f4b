//! Workload list and detail commands

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use kdd_lib::charts::ChartSeries;
use kdd_lib::rows::GridRow;
use kdd_lib::views::WorkloadDetail;
use kdd_lib::{detail_link, PodWorkload};
use tabled::Tabled;

use crate::output::{
    color_status, format_age, format_duration, format_labels, format_time, print_heading,
    print_json, print_table, OutputFormat,
};

/// Row for the workload list
#[derive(Tabled)]
struct WorkloadTableRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Details")]
    details: String,
    #[tabled(rename = "Age")]
    age: String,
}

/// Row for the pods of a workload
#[derive(Tabled)]
struct PodTableRow {
    #[tabled(rename = "Pod")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Containers")]
    containers: usize,
    #[tabled(rename = "Restarts")]
    restarts: i32,
    #[tabled(rename = "Age")]
    age: String,
}

/// Row for the usage of one container
#[derive(Tabled)]
struct UsageTableRow {
    #[tabled(rename = "Pod")]
    pod: String,
    #[tabled(rename = "Container")]
    container: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Request")]
    request: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Samples")]
    samples: usize,
}

/// Kind-specific summary column
fn details(row: &GridRow) -> String {
    match row {
        GridRow::Deployment(r) | GridRow::DaemonSet(r) => format!(
            "ready {}, available {}, up-to-date {}",
            r.status_ready, r.status_available, r.status_up2date
        ),
        GridRow::StatefulSet(r) => format!("ready {}", r.status_ready),
        GridRow::Pod(r) => format!("{} containers, {} restarts", r.count_containers, r.restarts),
        GridRow::Job(r) => format!(
            "active {}, failed {}, succeeded {}, took {}",
            r.status_active,
            r.status_failed,
            r.status_succeeded,
            format_duration(r.duration)
        ),
        GridRow::CronJob(r) => format!(
            "schedule {}, {} active, last run {}{}",
            r.schedule,
            r.active_jobs,
            format_time(r.last_scheduled_time),
            if r.suspend == Some(true) { ", suspended" } else { "" }
        ),
    }
}

/// Render the workload grid
pub fn render_workloads(rows: &[GridRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(rows)?,
        OutputFormat::Table => {
            let now = Utc::now();
            let table: Vec<WorkloadTableRow> = rows
                .iter()
                .map(|row| {
                    let common = row.common();
                    WorkloadTableRow {
                        kind: row.kind().display_name().to_string(),
                        namespace: common.namespace.clone(),
                        name: common.workload_name.clone(),
                        status: row
                            .status_text()
                            .map(|s| color_status(&s))
                            .unwrap_or_else(|| "-".to_string()),
                        details: details(row),
                        age: format_age(common.creation_date, now),
                    }
                })
                .collect();
            print_table(&table);
        }
    }
    Ok(())
}

fn usage_rows(series: &[ChartSeries], format_value: fn(i64) -> String) -> Vec<UsageTableRow> {
    series
        .iter()
        .map(|s| UsageTableRow {
            pod: s.pod_name.clone(),
            container: s.container_name.clone(),
            latest: s
                .latest()
                .map(|point| format_value(point.y))
                .unwrap_or_else(|| "-".to_string()),
            request: if s.request == 0 { "-".to_string() } else { format_value(s.request) },
            limit: if s.limit == 0 { "-".to_string() } else { format_value(s.limit) },
            samples: s.data.len(),
        })
        .collect()
}

fn pod_rows(pods: &[PodWorkload]) -> Vec<PodTableRow> {
    let now = Utc::now();
    pods.iter()
        .map(|pod| PodTableRow {
            name: pod.workload_info.workload_name.clone(),
            status: color_status(&pod.status),
            containers: pod.workload_info.containers.len(),
            restarts: pod.restarts,
            age: format_age(pod.workload_info.creation_date, now),
        })
        .collect()
}

/// Render one workload with its pods and resource usage
pub fn render_detail(detail: &WorkloadDetail, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(detail);
    }

    let workload = &detail.info.workload;
    let Some(info) = workload.info() else {
        println!("{}", "Workload of unknown kind".yellow());
        return Ok(());
    };

    print_heading(&format!("{} {}", workload.kind_token(), info.workload_name));
    println!("Namespace:              {}", info.namespace.cyan());
    println!("Created:                {}", format_time(Some(info.creation_date)));
    println!("Labels:                 {}", format_labels(&info.labels));
    println!("Selector:               {}", format_labels(&info.selector));
    if let Some(kind) = workload.kind() {
        println!(
            "Link:                   {}",
            detail_link(kind, &info.namespace, &info.workload_name).dimmed()
        );
    }
    println!();

    println!("{}", "Pods".bold());
    print_table(&pod_rows(&detail.info.pods));
    println!();

    println!("{}", detail.cpu_options.title.bold());
    print_table(&usage_rows(&detail.cpu, crate::output::format_cpu));
    println!();

    println!("{}", detail.memory_options.title.bold());
    print_table(&usage_rows(&detail.memory, crate::output::format_bytes));

    Ok(())
}
