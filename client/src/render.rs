//! Plain-text rendering of the view-state for the terminal.

use common::{Query, QueryDetails, Task};
use std::fmt::Write;

use crate::monitor::MonitoringState;

const BAR_WIDTH: usize = 20;

pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent) * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn details(details: &QueryDetails) -> String {
    let mut out = String::new();
    let missing = || "-".to_string();

    let _ = writeln!(out, "  place     : {}", details.place.clone().unwrap_or_else(missing));
    let _ = writeln!(out, "  event     : {}", details.event.clone().unwrap_or_else(missing));
    let _ = writeln!(
        out,
        "  period    : {} -> {}",
        details.from.as_ref().map(ToString::to_string).unwrap_or_else(missing),
        details.to.as_ref().map(ToString::to_string).unwrap_or_else(missing)
    );
    out
}

fn task(task: &Task) -> String {
    let mut line = format!("    - {:<24} {}", task.kind, progress_bar(task.percent()));
    let images = task.metadata.images();
    if !images.is_empty() {
        let _ = write!(line, "  images: {}", images.join(", "));
    }
    line
}

pub fn query(query: &Query) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query {} ({})", query.id, query.status);
    let _ = writeln!(out, "  text      : {}", query.name);
    let _ = writeln!(out, "  author    : {}", query.author);
    if let Some(d) = &query.details {
        out.push_str(&details(d));
    }
    if query.tasks.is_empty() {
        out.push_str("  (no tasks)\n");
    } else {
        out.push_str("  tasks:\n");
        for t in &query.tasks {
            out.push_str(&task(t));
            out.push('\n');
        }
    }
    out
}

/// Whole monitoring screen. `mine` keeps only the current author's queries.
pub fn monitoring(state: &MonitoringState, mine: bool) -> String {
    let mut out = String::new();
    let updated = state
        .updated_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(out, "== monitoring (author {}, updated {}) ==", state.author, updated);

    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "{}", notice);
    }

    let queries: Vec<&Query> = if mine {
        state.own_queries()
    } else {
        state.queries.iter().collect()
    };

    if queries.is_empty() {
        out.push_str("(no queries)\n");
    }
    for q in queries {
        out.push_str(&query(q));
    }
    out
}
