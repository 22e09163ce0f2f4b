//! Client-side data layer for the cluster dashboard
//!
//! This crate provides:
//! - A typed facade over the dashboard's read-only HTTP API
//! - Pure transforms from raw workloads to grid rows, namespace counts and
//!   chart series
//! - A poller that refreshes views on an interval and never lets a stale
//!   response overwrite a newer one
//! - Metrics and tracing setup shared by the binaries

pub mod aggregate;
pub mod charts;
pub mod client;
pub mod detail;
pub mod error;
pub mod kind;
pub mod models;
pub mod observability;
pub mod poller;
pub mod rows;
pub mod views;

pub use client::{ApiClient, ClientConfig, ResourceApi};
pub use error::{DashboardError, RETRIEVAL_FAILED};
pub use kind::{detail_link, is_kind, WorkloadKind};
pub use models::*;
pub use observability::{init_tracing, DashboardMetrics, LogFormat};
pub use poller::{Poller, PollerStats, View, ViewState};
