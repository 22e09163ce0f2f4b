//! Command implementations
//!
//! Each command renders the output of one dashboard view.

pub mod namespaces;
pub mod nodes;
pub mod workloads;
