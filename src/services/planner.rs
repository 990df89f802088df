//! The plan pipeline: fetch → format → build prompt → generate.
//!
//! Two entry points share the same shape. `generate_plan` runs everything
//! from the form inputs; `revise_plan` re-enters at the prompt step with the
//! user's question as the goals and the context cached in the session.

use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{
    hhmm, CourseCatalog, ExtracurricularSchedule, PipelineStage, SchoolHours, SessionContext,
};
use crate::services::canvas::AssignmentSource;
use crate::services::formatter;
use crate::services::openai::ScheduleGenerator;
use crate::services::prompt::{
    self, PromptInputs, PLAN_SYSTEM_ROLE, REVISION_SUFFIX, REVISION_SYSTEM_ROLE,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub goals: String,
    #[serde(default = "default_school_start", with = "hhmm")]
    pub school_start: NaiveTime,
    #[serde(default = "default_school_end", with = "hhmm")]
    pub school_end: NaiveTime,
    #[serde(default)]
    pub extracurriculars: ExtracurricularSchedule,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default, with = "hhmm::option")]
    pub school_start: Option<NaiveTime>,
    #[serde(default, with = "hhmm::option")]
    pub school_end: Option<NaiveTime>,
    #[serde(default)]
    pub extracurriculars: Option<ExtracurricularSchedule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanOutcome {
    pub assignment_summary: String,
    pub schedule: String,
    /// One entry per subject whose assignments could not be fetched.
    pub warnings: Vec<String>,
}

fn default_school_start() -> NaiveTime {
    SchoolHours::default().start
}

fn default_school_end() -> NaiveTime {
    SchoolHours::default().end
}

// ============================================================================
// Planner
// ============================================================================

pub struct Planner {
    source: Arc<dyn AssignmentSource>,
    generator: Arc<dyn ScheduleGenerator>,
    token: String,
    courses: CourseCatalog,
}

impl Planner {
    pub fn new(
        source: Arc<dyn AssignmentSource>,
        generator: Arc<dyn ScheduleGenerator>,
        token: impl Into<String>,
        courses: CourseCatalog,
    ) -> Self {
        Self {
            source,
            generator,
            token: token.into(),
            courses,
        }
    }

    pub fn courses(&self) -> &CourseCatalog {
        &self.courses
    }

    /// Build a fresh plan from the form inputs.
    pub async fn generate_plan(
        &self,
        session: &mut SessionContext,
        request: PlanRequest,
    ) -> AppResult<PlanOutcome> {
        let school_hours = SchoolHours::new(request.school_start, request.school_end)
            .map_err(AppError::Validation)?;
        request
            .extracurriculars
            .validate()
            .map_err(AppError::Validation)?;

        session.last_error = None;
        let (summary, warnings) = self.fetch_summary(session).await;

        let user_prompt = prompt::build_schedule_prompt(
            &request.goals,
            school_hours,
            &request.extracurriculars,
            &summary,
        );

        session.goals = Some(request.goals);
        session.school_hours = Some(school_hours);
        session.extracurriculars = Some(request.extracurriculars);
        session.assignment_summary = Some(summary.clone());
        session.schedule_context = Some(user_prompt.clone());
        session.advance(PipelineStage::PromptBuilt);

        self.run_generation(session, PLAN_SYSTEM_ROLE, &user_prompt, summary, warnings)
            .await
    }

    /// Regenerate the schedule around a follow-up question, reusing the
    /// school hours, activities and assignment summary already in the session.
    pub async fn revise_plan(
        &self,
        session: &mut SessionContext,
        request: AskRequest,
    ) -> AppResult<PlanOutcome> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(AppError::BadRequest(
                "Please type something first!".to_string(),
            ));
        }

        let school_hours = match (request.school_start, request.school_end) {
            (None, None) => None,
            (start, end) => {
                let base = session.school_hours.unwrap_or_default();
                Some(
                    SchoolHours::new(start.unwrap_or(base.start), end.unwrap_or(base.end))
                        .map_err(AppError::Validation)?,
                )
            }
        };
        if let Some(schedule) = &request.extracurriculars {
            schedule.validate().map_err(AppError::Validation)?;
        }

        session.last_error = None;
        let warnings = if session.assignment_summary.is_none() {
            let (summary, warnings) = self.fetch_summary(session).await;
            session.assignment_summary = Some(summary);
            warnings
        } else {
            Vec::new()
        };

        let goals = format!("{}{}", question, REVISION_SUFFIX);
        let user_prompt = prompt::build_with_session(
            PromptInputs {
                goals: &goals,
                school_hours,
                extracurriculars: request.extracurriculars.as_ref(),
                assignment_summary: None,
            },
            session,
        );

        if let Some(hours) = school_hours {
            session.school_hours = Some(hours);
        }
        if let Some(schedule) = request.extracurriculars {
            session.extracurriculars = Some(schedule);
        }
        session.schedule_context = Some(user_prompt.clone());
        session.advance(PipelineStage::PromptBuilt);

        let summary = session.assignment_summary.clone().unwrap_or_default();
        self.run_generation(session, REVISION_SYSTEM_ROLE, &user_prompt, summary, warnings)
            .await
    }

    /// Fetching and formatting stages. Never fails: unreachable subjects
    /// come back as warnings.
    async fn fetch_summary(&self, session: &mut SessionContext) -> (String, Vec<String>) {
        session.advance(PipelineStage::Fetching);
        let report = self.source.fetch(&self.token, &self.courses).await;

        session.advance(PipelineStage::Formatting);
        let formatted = formatter::summarize(&report.assignments, Utc::now());
        info!(
            "Formatted {} upcoming of {} fetched assignments ({} malformed items, {} subjects failed)",
            formatted.included,
            report.assignments.len(),
            report.skipped_items,
            report.failures.len()
        );

        (formatted.text, report.warnings())
    }

    async fn run_generation(
        &self,
        session: &mut SessionContext,
        system_role: &str,
        user_prompt: &str,
        assignment_summary: String,
        warnings: Vec<String>,
    ) -> AppResult<PlanOutcome> {
        session.advance(PipelineStage::Generating);

        match self.generator.generate(system_role, user_prompt).await {
            Ok(schedule) => {
                session.schedule_output = Some(schedule.clone());
                session.advance(PipelineStage::Done);
                Ok(PlanOutcome {
                    assignment_summary,
                    schedule,
                    warnings,
                })
            }
            Err(e) => {
                session.fail(e.to_string());
                Err(AppError::Generation(e))
            }
        }
    }
}
