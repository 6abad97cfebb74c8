//! Terminal output helpers for apply results.

use std::io::IsTerminal;

use owo_colors::OwoColorize;

use netweave_core::{ApplyAction, ApplyOutcome};

use crate::cli::ColorMode;

/// Whether to emit color codes, honoring `--color` and `NO_COLOR`.
pub fn use_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
        }
    }
}

fn action_label(outcome: &ApplyOutcome) -> &'static str {
    match outcome.action {
        ApplyAction::Created => "created",
        ApplyAction::Deleted => "deleted",
        ApplyAction::Updated if outcome.dry_run || outcome.changed() => "updated",
        ApplyAction::Updated | ApplyAction::Unchanged => "unchanged",
    }
}

/// One status line per reconciled network document.
pub fn outcome_line(name: &str, outcome: &ApplyOutcome, color: bool) -> String {
    let label = action_label(outcome);
    let painted = if color {
        match label {
            "created" => label.green().to_string(),
            "deleted" => label.red().to_string(),
            "updated" => label.yellow().to_string(),
            _ => label.dimmed().to_string(),
        }
    } else {
        label.to_string()
    };

    let mut line = String::new();
    if outcome.dry_run {
        line.push_str("(dry-run) ");
    }
    line.push_str(&format!("{name}: {painted}"));
    if outcome.connections_created + outcome.connections_deleted + outcome.subnets_updated > 0 {
        line.push_str(&format!(
            " (+{} connections, -{} connections, {} subnet changes)",
            outcome.connections_created, outcome.connections_deleted, outcome.subnets_updated
        ));
    }
    line
}

/// One JSON object per reconciled network document (for `--json`).
pub fn outcome_json(name: &str, outcome: &ApplyOutcome) -> String {
    serde_json::json!({
        "name": name,
        "action": action_label(outcome),
        "changed": outcome.changed(),
        "dry_run": outcome.dry_run,
        "connections_created": outcome.connections_created,
        "connections_deleted": outcome.connections_deleted,
        "connections_updated": outcome.connections_updated,
        "subnets_updated": outcome.subnets_updated,
    })
    .to_string()
}

/// An error line for a document that failed to apply.
pub fn failure_line(name: &str, reason: &str, color: bool) -> String {
    let label = if color {
        "failed".red().to_string()
    } else {
        "failed".to_string()
    };
    format!("{name}: {label}: {reason}")
}
