use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{header::LINK, Client};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CanvasConfig;
use crate::error::AppResult;
use crate::models::{AssignmentRecord, CourseCatalog};

lazy_static::lazy_static! {
    static ref NEXT_LINK: Regex = Regex::new(r#"<([^>]+)>;\s*rel="next""#)
        .expect("next-link pattern is valid");
}

// ============================================================================
// Fetch Results
// ============================================================================

/// Why one subject's assignments could not be (fully) fetched.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("course API rejected the request with status {status}")]
    Auth { status: u16, body: String },

    #[error("network error: {0}")]
    Transient(String),

    #[error("unexpected response body: {0}")]
    Malformed(String),

    #[error("invalid course URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone)]
pub struct SubjectFailure {
    pub subject: String,
    pub error: FetchError,
}

impl SubjectFailure {
    /// User-facing warning line for this subject.
    pub fn warning(&self) -> String {
        format!("Couldn't get assignments for {} ({})", self.subject, self.error)
    }
}

/// Everything gathered by one fetch: records from the subjects that worked
/// (plus any pages collected before a subject failed) and one failure entry
/// per subject that did not finish.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    pub assignments: Vec<AssignmentRecord>,
    pub failures: Vec<SubjectFailure>,
    pub skipped_items: usize,
}

impl FetchReport {
    pub fn warnings(&self) -> Vec<String> {
        self.failures.iter().map(SubjectFailure::warning).collect()
    }
}

/// Source of assignment records for the planner.
#[async_trait]
pub trait AssignmentSource: Send + Sync + 'static {
    /// Fetch every assignment for every course. Never fails as a whole;
    /// per-subject problems are reported in [`FetchReport::failures`].
    async fn fetch(&self, token: &str, courses: &CourseCatalog) -> FetchReport;
}

// ============================================================================
// Canvas Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct CanvasService {
    client: Client,
    base_url: String,
    per_page: u32,
}

impl CanvasService {
    pub fn new(config: &CanvasConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            per_page: config.per_page,
        })
    }

    /// First page URL for a course: `{base}/courses/{id}/assignments?per_page=N`.
    pub fn course_url(&self, course_id: &str) -> Result<Url, FetchError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .push("courses")
            .push(course_id)
            .push("assignments");
        url.query_pairs_mut()
            .append_pair("per_page", &self.per_page.to_string());
        Ok(url)
    }

    /// Accept a `rel="next"` target only if it stays on the API's origin and
    /// moves to a different page. The bearer token goes out with every request.
    fn checked_next(&self, current: &str, candidate: String) -> Option<String> {
        let base = Url::parse(&self.base_url).ok()?;
        let next = match Url::parse(&candidate) {
            Ok(next) => next,
            Err(e) => {
                warn!("Ignoring unparsable next link {}: {}", candidate, e);
                return None;
            }
        };

        if next.origin() != base.origin() {
            warn!("Ignoring next link to foreign origin: {}", next);
            return None;
        }
        if next.as_str() == current {
            warn!("Next link repeats the current page, stopping: {}", next);
            return None;
        }

        Some(candidate)
    }

    /// Walk every page for one course, appending records to `out` as pages
    /// arrive so that a later failure keeps the earlier pages.
    async fn fetch_course(
        &self,
        token: &str,
        subject: &str,
        course_id: &str,
        out: &mut Vec<AssignmentRecord>,
    ) -> Result<usize, FetchError> {
        let mut next = Some(self.course_url(course_id)?.to_string());
        let mut skipped = 0usize;
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| FetchError::Transient(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                debug!(subject, status = status.as_u16(), body = %body, "course API error body");
                return Err(FetchError::Auth {
                    status: status.as_u16(),
                    body,
                });
            }

            next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_next_link)
                .and_then(|candidate| self.checked_next(&url, candidate));

            let items: Vec<serde_json::Value> = response
                .json()
                .await
                .map_err(|e| FetchError::Malformed(e.to_string()))?;

            pages += 1;
            for item in items {
                match AssignmentRecord::from_json(item, subject) {
                    Some(record) => out.push(record),
                    None => skipped += 1,
                }
            }
        }

        debug!(subject, course_id, pages, "finished course pagination");
        Ok(skipped)
    }
}

#[async_trait]
impl AssignmentSource for CanvasService {
    async fn fetch(&self, token: &str, courses: &CourseCatalog) -> FetchReport {
        let mut report = FetchReport::default();

        for (subject, course_id) in courses.iter() {
            let before = report.assignments.len();
            match self
                .fetch_course(token, subject, course_id, &mut report.assignments)
                .await
            {
                Ok(skipped) => {
                    report.skipped_items += skipped;
                    info!(
                        "Fetched {} assignments for {}",
                        report.assignments.len() - before,
                        subject
                    );
                }
                Err(error) => {
                    warn!("Couldn't get assignments for {}: {}", subject, error);
                    report.failures.push(SubjectFailure {
                        subject: subject.to_string(),
                        error,
                    });
                }
            }
        }

        report
    }
}

/// Extract the `rel="next"` target from a `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    NEXT_LINK
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
