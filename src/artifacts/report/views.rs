use crate::artifacts::audit::entry::{CommitSummary, EntryAudit};
use crate::artifacts::report::table::{Cell, render};
use chrono::TimeDelta;
use colored::Color;

const CURRENT_HEADERS: [&str; 7] = [
    "repo",
    "total commits",
    "excluded commits",
    "current commit",
    "author",
    "commit date",
    "delta",
];

const RECOMMENDED_HEADERS: [&str; 7] = [
    "repo",
    "total commits",
    "excluded commits",
    "recommended commit",
    "author",
    "commit date",
    "delta",
];

pub const DEGRADED_TAG: &str = "(no compliant commit)";
pub const ALL_COMPLIANT: &str = "All repos comply with the cutoff.";

/// Format a delta as `+3d 04:05:06`
pub fn format_delta(delta: TimeDelta) -> String {
    let sign = if delta < TimeDelta::zero() { '-' } else { '+' };
    let seconds = delta.num_seconds().unsigned_abs();

    format!(
        "{}{}d {:02}:{:02}:{:02}",
        sign,
        seconds / 86_400,
        seconds % 86_400 / 3_600,
        seconds % 3_600 / 60,
        seconds % 60
    )
}

fn commit_cells(commit: &CommitSummary, degraded: bool) -> [Cell; 4] {
    let oid = if degraded {
        format!("{} {}", commit.oid.to_report_oid(), DEGRADED_TAG)
    } else {
        commit.oid.to_report_oid()
    };
    let delta_color = if commit.is_compliant() {
        Color::Green
    } else {
        Color::Red
    };

    [
        Cell::new(oid),
        Cell::new(commit.author.as_str()),
        Cell::new(commit.timestamp.format("%Y-%m-%d %H:%M:%S %z").to_string()),
        Cell::new(format_delta(commit.delta)).color(delta_color),
    ]
}

fn row(repo: &str, audit: &EntryAudit, commit: &CommitSummary, degraded: bool) -> Vec<Cell> {
    let mut row = vec![
        Cell::new(repo),
        Cell::number(audit.ancestry_count),
        Cell::number(audit.excluded_count),
    ];
    row.extend(commit_cells(commit, degraded));
    row
}

/// One row per valid repository, describing what is checked out now
pub fn current_state_table<'a>(audits: impl IntoIterator<Item = (&'a str, &'a EntryAudit)>) -> String {
    let rows = audits
        .into_iter()
        .map(|(repo, audit)| row(repo, audit, &audit.current, false))
        .collect::<Vec<_>>();

    format!(
        "Current state; {} valid repos:\n{}",
        rows.len(),
        render(&CURRENT_HEADERS, &rows)
    )
}

/// One row per repository whose recommended commit differs from the current one
///
/// # Returns
///
/// [`ALL_COMPLIANT`] when there is nothing to check out
pub fn recommended_table<'a>(audits: impl IntoIterator<Item = (&'a str, &'a EntryAudit)>) -> String {
    let rows = audits
        .into_iter()
        .filter(|(_, audit)| audit.recommends_change())
        .map(|(repo, audit)| row(repo, audit, &audit.recommended, audit.is_degraded()))
        .collect::<Vec<_>>();

    if rows.is_empty() {
        return format!("{}\n", ALL_COMPLIANT);
    }

    format!(
        "Recommended checkouts:\n{}",
        render(&RECOMMENDED_HEADERS, &rows)
    )
}

pub fn summary_line(candidates: usize, valid: usize) -> String {
    format!(
        "Checked {} candidates: {} valid, {} invalid.\n",
        candidates,
        valid,
        candidates - valid
    )
}
