//! Namespace list and detail commands

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use kdd_lib::aggregate::NamespaceRow;
use kdd_lib::views::NamespacePage;
use kdd_lib::Event;
use tabled::Tabled;

use crate::commands::workloads::render_workloads;
use crate::output::{
    color_status, format_age, format_labels, print_heading, print_json, print_table, OutputFormat,
};

/// Row for the namespace list
#[derive(Tabled)]
struct NamespaceTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deployments")]
    deployments: usize,
    #[tabled(rename = "DaemonSets")]
    daemonsets: usize,
    #[tabled(rename = "StatefulSets")]
    statefulsets: usize,
    #[tabled(rename = "Age")]
    age: String,
}

#[derive(Tabled)]
struct EventTableRow {
    #[tabled(rename = "Last Seen")]
    last_seen: String,
    #[tabled(rename = "Type")]
    event_type: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Object")]
    object: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Message")]
    message: String,
}

/// Render the namespace list with workload counts
pub fn render_namespaces(rows: &[NamespaceRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(rows)?,
        OutputFormat::Table => {
            let now = Utc::now();
            let table: Vec<NamespaceTableRow> = rows
                .iter()
                .map(|row| NamespaceTableRow {
                    name: row.namespace.name.clone(),
                    status: color_status(&row.namespace.status),
                    deployments: row.workloads.deployments,
                    daemonsets: row.workloads.daemonsets,
                    statefulsets: row.workloads.statefulsets,
                    age: format_age(row.namespace.creation_date, now),
                })
                .collect();
            print_table(&table);
        }
    }
    Ok(())
}

fn event_rows(events: &[Event]) -> Vec<EventTableRow> {
    let now = Utc::now();
    events
        .iter()
        .map(|event| EventTableRow {
            last_seen: format_age(event.last_seen, now),
            event_type: if event.event_type == "Warning" {
                event.event_type.yellow().to_string()
            } else {
                event.event_type.clone()
            },
            reason: event.reason.clone(),
            object: event.object.clone(),
            count: event.count,
            message: event.message.clone(),
        })
        .collect()
}

/// Render one namespace with its workloads and events
pub fn render_namespace(page: &NamespacePage, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(page);
    }

    let ns = &page.namespace;
    print_heading(&format!("Namespace {}", ns.name));
    println!("Status:                 {}", color_status(&ns.status));
    println!("Labels:                 {}", format_labels(&ns.labels));
    println!(
        "Workloads:              {} deployments, {} daemon sets, {} stateful sets",
        page.workloads.deployments, page.workloads.daemonsets, page.workloads.statefulsets
    );
    println!();

    println!("{}", "Workloads".bold());
    render_workloads(&page.rows, format)?;
    println!();

    println!("{}", "Events".bold());
    print_table(&event_rows(&page.events));

    Ok(())
}
