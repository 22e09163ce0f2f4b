//! Node list command

use anyhow::Result;
use chrono::Utc;
use kdd_lib::rows::NodeRow;
use tabled::Tabled;

use crate::output::{
    color_status, format_age, format_bytes, format_cpu, print_json, print_table, OutputFormat,
};

#[derive(Tabled)]
struct NodeTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Roles")]
    roles: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
    #[tabled(rename = "Kubelet")]
    kubelet_version: String,
    #[tabled(rename = "OS Image")]
    os_image: String,
    #[tabled(rename = "Age")]
    age: String,
}

pub fn render_nodes(nodes: &[NodeRow], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(nodes)?,
        OutputFormat::Table => {
            let now = Utc::now();
            let table: Vec<NodeTableRow> = nodes
                .iter()
                .map(|node| NodeTableRow {
                    name: node.name.clone(),
                    status: color_status(&node.status),
                    roles: if node.roles.is_empty() { "-".to_string() } else { node.roles.clone() },
                    cpu: format_cpu(node.cpu),
                    memory: format_bytes(node.memory),
                    kubelet_version: node.kubelet_version.clone(),
                    os_image: node.os_image.clone(),
                    age: format_age(node.creation_date, now),
                })
                .collect();
            print_table(&table);
        }
    }
    Ok(())
}
