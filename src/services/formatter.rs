//! Turns fetched assignments into the plain-text block that goes into the
//! prompt and is shown to the user under "What's coming up".

use chrono::{DateTime, FixedOffset, Utc};

use crate::models::AssignmentRecord;

pub const NO_UPCOMING_ASSIGNMENTS: &str = "No upcoming assignments.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedAssignments {
    pub text: String,
    pub included: usize,
    /// Records dropped because `due_at` was missing or unparsable.
    /// Past-due records are not counted here.
    pub skipped: usize,
}

/// Render one line per assignment due strictly after `now`.
pub fn format_assignments(records: &[AssignmentRecord], now: DateTime<Utc>) -> String {
    summarize(records, now).text
}

pub fn summarize(records: &[AssignmentRecord], now: DateTime<Utc>) -> FormattedAssignments {
    let mut lines = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(due) = record.due_at.as_deref().and_then(parse_due_at) else {
            skipped += 1;
            continue;
        };

        if due.with_timezone(&Utc) > now {
            lines.push(format!(
                "[{}] {} (Due: {}, Points: {})",
                record.subject,
                record.name,
                due.date_naive().format("%Y-%m-%d"),
                format_points(record.points_possible)
            ));
        }
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} assignments without a usable due date", skipped);
    }

    let included = lines.len();
    let text = if lines.is_empty() {
        NO_UPCOMING_ASSIGNMENTS.to_string()
    } else {
        lines.join("\n")
    };

    FormattedAssignments {
        text,
        included,
        skipped,
    }
}

/// Parse an ISO-8601 timestamp carrying a UTC offset (`Z` counts as `+00:00`).
/// Timestamps without an offset are rejected.
pub fn parse_due_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
}

fn format_points(points: Option<f64>) -> String {
    match points {
        None => "N/A".to_string(),
        Some(p) if p.is_finite() && p.fract() == 0.0 => format!("{}", p as i64),
        Some(p) => p.to_string(),
    }
}
