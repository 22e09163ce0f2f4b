//! Live refresh for `--watch`

use anyhow::Result;
use colored::Colorize;
use kdd_lib::{Poller, View, ViewState};
use std::time::Duration;
use tracing::debug;

use crate::output::{print_error, print_info, OutputFormat};

/// Poll `view` and redraw after every commit until Ctrl-C
pub async fn watch<V, F>(view: V, interval: Duration, format: OutputFormat, render: F) -> Result<()>
where
    V: View,
    F: Fn(&V::Output, OutputFormat) -> Result<()>,
{
    let poller = Poller::mount(view, interval);
    let mut rx = poller.subscribe();
    let mut rendered = 0u64;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                // Loading toggles alone do not need a redraw
                if state.sequence == rendered {
                    continue;
                }
                rendered = state.sequence;
                redraw(&state, &render, format, interval)?;
            }
            _ = &mut ctrl_c => {
                break;
            }
        }
    }

    let stats = poller.stats();
    debug!(
        issued = stats.issued,
        committed = stats.committed,
        failures = stats.failures,
        discarded = stats.discarded,
        "Watch finished"
    );
    poller.unmount();
    Ok(())
}

fn redraw<T, F>(
    state: &ViewState<T>,
    render: &F,
    format: OutputFormat,
    interval: Duration,
) -> Result<()>
where
    F: Fn(&T, OutputFormat) -> Result<()>,
{
    if format == OutputFormat::Table {
        // Clear screen, cursor home
        print!("\x1B[2J\x1B[H");
    }

    if let Some(data) = &state.data {
        render(data.as_ref(), format)?;
    }

    if let Some(error) = &state.error {
        print_error(error);
    }

    if format == OutputFormat::Table {
        let updated = state
            .updated_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!();
        print_info(&format!(
            "Updated {}, refreshing every {}s {}",
            updated,
            interval.as_secs_f64(),
            "(Ctrl-C to quit)".dimmed()
        ));
    }
    Ok(())
}
