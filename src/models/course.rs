use serde::{Deserialize, Serialize};

// ============================================================================
// Course Catalog
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseEntry {
    pub subject: String,
    pub course_id: String,
}

/// Subject name to course id, kept in configuration order.
///
/// Iteration order is the fetch order, so assignments come back grouped by
/// the order the subjects were configured in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseCatalog {
    entries: Vec<CourseEntry>,
}

impl CourseCatalog {
    /// Append a subject. Returns `false` (and leaves the catalog unchanged)
    /// when the subject is already present.
    pub fn insert(&mut self, subject: impl Into<String>, course_id: impl Into<String>) -> bool {
        let subject = subject.into();
        if self.get(&subject).is_some() {
            return false;
        }
        self.entries.push(CourseEntry {
            subject,
            course_id: course_id.into(),
        });
        true
    }

    pub fn get(&self, subject: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.subject == subject)
            .map(|e| e.course_id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.subject.as_str(), e.course_id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>, C: Into<String>> FromIterator<(S, C)> for CourseCatalog {
    fn from_iter<I: IntoIterator<Item = (S, C)>>(iter: I) -> Self {
        let mut catalog = CourseCatalog::default();
        for (subject, course_id) in iter {
            catalog.insert(subject, course_id);
        }
        catalog
    }
}
