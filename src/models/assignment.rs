use serde::{Deserialize, Serialize};

// ============================================================================
// Assignment Models
// ============================================================================

/// Subset of a Canvas assignment object that the planner reads.
///
/// Every other field of the API object is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RawAssignment {
    pub name: Option<String>,
    pub due_at: Option<String>,
    pub points_possible: Option<f64>,
}

/// An assignment tagged with the subject it was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub name: String,
    /// Raw ISO-8601 timestamp as sent by the API; parsed when formatting.
    pub due_at: Option<String>,
    pub points_possible: Option<f64>,
    pub subject: String,
}

impl AssignmentRecord {
    /// Convert one element of an assignments page.
    ///
    /// Returns `None` for anything that is not an object with correctly typed
    /// fields; callers treat that as a skipped record, not an error.
    pub fn from_json(value: serde_json::Value, subject: &str) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let raw: RawAssignment = serde_json::from_value(value).ok()?;
        Some(Self::from_raw(raw, subject))
    }

    pub fn from_raw(raw: RawAssignment, subject: &str) -> Self {
        Self {
            name: raw.name.unwrap_or_else(|| "Unnamed".to_string()),
            due_at: raw.due_at,
            points_possible: raw.points_possible,
            subject: subject.to_string(),
        }
    }
}
