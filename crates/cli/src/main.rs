//! kdd CLI
//!
//! A terminal front-end for the cluster dashboard: lists namespaces,
//! nodes and workloads, and describes a single workload with its pods and
//! resource usage. `--watch` keeps the view open and refreshes it.

mod commands;
mod config;
mod live;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{namespaces, nodes, workloads};
use kdd_lib::views::{
    AllWorkloadRowsView, NamespaceDetailView, NamespacesView, NodesView, WorkloadDetailView,
    WorkloadRowsView,
};
use kdd_lib::{
    init_tracing, ApiClient, ClientConfig, DashboardMetrics, ResourceApi, View, WorkloadKind,
};
use std::sync::Arc;
use std::time::Duration;

use crate::config::DashboardConfig;
use crate::output::OutputFormat;

/// kdd cluster dashboard CLI
#[derive(Parser)]
#[command(name = "kdd")]
#[command(author, version, about = "Terminal front-end for the kdd cluster dashboard", long_about = None)]
pub struct Cli {
    /// Dashboard service URL (can also be set via KDD_API_URL env var)
    #[arg(long, env = "KDD_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    /// Keep the view open and refresh it until interrupted
    #[arg(long, short)]
    pub watch: bool,

    /// Refresh interval for --watch in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List namespaces with their workload counts
    Namespaces,

    /// Show one namespace with its workloads and events
    Namespace {
        /// Namespace name
        name: String,
    },

    /// List cluster nodes
    Nodes,

    /// List workloads
    Workloads {
        /// Only this kind (deployments, daemonsets, statefulsets, pods, jobs, cronjobs)
        kind: Option<String>,
    },

    /// Show a workload with its pods and resource usage
    Describe {
        /// Workload kind, e.g. deployments
        kind: String,
        /// Namespace of the workload
        namespace: String,
        /// Workload name
        name: String,
    },
}

/// How a view is presented
struct RunSettings {
    format: OutputFormat,
    watch: bool,
    interval: Duration,
}

/// Fetch once and render, or hand the view to the live poller
async fn run<V, F>(view: V, settings: &RunSettings, render: F) -> Result<()>
where
    V: View,
    F: Fn(&V::Output, OutputFormat) -> Result<()>,
{
    if settings.watch {
        return live::watch(view, settings.interval, settings.format, render).await;
    }

    let data = view
        .fetch()
        .await
        .context(kdd_lib::RETRIEVAL_FAILED)?;
    render(&data, settings.format)
}

fn parse_kind(slug: &str) -> Result<WorkloadKind> {
    WorkloadKind::from_slug(slug).with_context(|| {
        let known: Vec<&str> = WorkloadKind::ALL.iter().map(|k| k.slug()).collect();
        format!(
            "unknown workload kind {:?}, expected one of: {}",
            slug,
            known.join(", ")
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = DashboardConfig::load()?;
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(ms) = cli.interval {
        config.refresh_interval_ms = ms;
    }

    init_tracing(
        config.log_format(),
        if cli.verbose { "debug" } else { "warn" },
    );

    // Initialize client
    let client = ApiClient::with_config(ClientConfig {
        base_url: config.api_url.clone(),
        request_timeout: config.request_timeout(),
    })
    .context("Failed to create API client")?;
    let api: Arc<dyn ResourceApi> = Arc::new(client);

    let settings = RunSettings {
        format: cli.format,
        watch: cli.watch,
        interval: config.refresh_interval(),
    };

    let show_metrics = cli.metrics;

    // Execute command
    let result = execute(cli.command, api, &settings).await;

    if show_metrics {
        print_metrics();
    }
    result
}

/// Dump the metrics registry; stdout stays reserved for the view
fn print_metrics() {
    match DashboardMetrics::new().encode() {
        Ok(text) => eprint!("{}", text),
        Err(e) => output::print_error(&format!("Failed to encode metrics: {}", e)),
    }
}

async fn execute(command: Commands, api: Arc<dyn ResourceApi>, settings: &RunSettings) -> Result<()> {
    match command {
        Commands::Namespaces => {
            run(NamespacesView::new(api), settings, |rows, format| {
                namespaces::render_namespaces(rows, format)
            })
            .await
        }
        Commands::Namespace { name } => {
            run(
                NamespaceDetailView::new(api, &name),
                settings,
                namespaces::render_namespace,
            )
            .await
        }
        Commands::Nodes => {
            run(NodesView::new(api), settings, |rows, format| {
                nodes::render_nodes(rows, format)
            })
            .await
        }
        Commands::Workloads { kind: None } => {
            run(AllWorkloadRowsView::new(api), settings, |rows, format| {
                workloads::render_workloads(rows, format)
            })
            .await
        }
        Commands::Workloads { kind: Some(slug) } => {
            let kind = parse_kind(&slug)?;
            run(WorkloadRowsView::new(api, kind), settings, |rows, format| {
                workloads::render_workloads(rows, format)
            })
            .await
        }
        Commands::Describe {
            kind,
            namespace,
            name,
        } => {
            let kind = parse_kind(&kind)?;
            let view = WorkloadDetailView::for_kind(api, kind, &namespace, &name);
            run(view, settings, workloads::render_detail).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_kind_accepts_slugs_and_tokens() {
        assert_eq!(parse_kind("cronjobs").unwrap(), WorkloadKind::CronJob);
        assert_eq!(parse_kind("Deployment").unwrap(), WorkloadKind::Deployment);
    }

    #[test]
    fn test_parse_kind_lists_known_kinds() {
        let err = parse_kind("replicasets").unwrap_err().to_string();
        assert!(err.contains("replicasets"));
        assert!(err.contains("statefulsets"));
    }

    #[test]
    fn test_watch_flags() {
        let cli = Cli::parse_from(["kdd", "--watch", "--interval", "5000", "nodes"]);
        assert!(cli.watch);
        assert_eq!(cli.interval, Some(5000));
        assert!(matches!(cli.command, Commands::Nodes));
    }

    #[test]
    fn test_metrics_flag() {
        let cli = Cli::parse_from(["kdd", "--metrics", "namespaces"]);
        assert!(cli.metrics);

        let cli = Cli::parse_from(["kdd", "namespaces"]);
        assert!(!cli.metrics);
    }
}
