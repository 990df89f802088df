use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ExtracurricularSchedule, SchoolHours};

/// Where the most recent action got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Init,
    Fetching,
    Formatting,
    PromptBuilt,
    Generating,
    Done,
    Failed,
}

/// In-memory state for the single planning session.
///
/// Written only by the planner: inputs at `PromptBuilt`, the schedule at
/// `Done`. A failed generation never touches `schedule_output`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionContext {
    pub goals: Option<String>,
    pub school_hours: Option<SchoolHours>,
    pub extracurriculars: Option<ExtracurricularSchedule>,
    pub assignment_summary: Option<String>,
    pub schedule_context: Option<String>,
    pub schedule_output: Option<String>,
    pub stage: PipelineStage,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionContext {
    pub fn advance(&mut self, stage: PipelineStage) {
        tracing::debug!("pipeline stage {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
        self.updated_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
        self.advance(PipelineStage::Failed);
    }
}
