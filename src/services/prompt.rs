use crate::models::{
    format_time, ExtracurricularSchedule, SchoolHours, SessionContext,
};

use super::formatter::NO_UPCOMING_ASSIGNMENTS;

/// System message for a fresh plan.
pub const PLAN_SYSTEM_ROLE: &str = "You're a friendly student planner.";

/// System message for a revision requested from the ask panel.
pub const REVISION_SYSTEM_ROLE: &str =
    "Readjust the schedule to the new prompt and print the whole schedule";

/// Appended to the user's question so the model rewrites the full week.
pub const REVISION_SUFFIX: &str = " (regenerate the whole schedule to adjust workload)";

const PREAMBLE: &str =
    "You are a world class student assistant that makes practical, effective schedules for student";

const CLOSING_REQUEST: &str = "Make a nice plan for 1 week starting from the day I am asking you. I want study time, homework time, and chill time too!";

/// Parts of a prompt supplied by the current action. Anything left `None`
/// is taken from the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptInputs<'a> {
    pub goals: &'a str,
    pub school_hours: Option<SchoolHours>,
    pub extracurriculars: Option<&'a ExtracurricularSchedule>,
    pub assignment_summary: Option<&'a str>,
}

/// Render the schedule prompt from fully specified parts.
pub fn build_schedule_prompt(
    goals: &str,
    school_hours: SchoolHours,
    extracurriculars: &ExtracurricularSchedule,
    assignment_summary: &str,
) -> String {
    format!(
        "{preamble}\n\
         \n\
         Here's what you should know:\n\
         - My Goals: {goals}\n\
         - School Time: {start} to {end}\n\
         - After School Activities:\n\
         {activities}\
         - My Assignments:\n\
         {assignments}\n\
         \n\
         {closing}\n",
        preamble = PREAMBLE,
        goals = goals,
        start = format_time(school_hours.start),
        end = format_time(school_hours.end),
        activities = extracurricular_lines(extracurriculars),
        assignments = assignment_summary,
        closing = CLOSING_REQUEST,
    )
}

/// Render the prompt, filling any missing part from the session and then
/// from defaults, so every section is always present.
pub fn build_with_session(inputs: PromptInputs<'_>, session: &SessionContext) -> String {
    let school_hours = inputs
        .school_hours
        .or(session.school_hours)
        .unwrap_or_default();

    let default_schedule = ExtracurricularSchedule::default();
    let extracurriculars = inputs
        .extracurriculars
        .or(session.extracurriculars.as_ref())
        .unwrap_or(&default_schedule);

    let assignment_summary = inputs
        .assignment_summary
        .or(session.assignment_summary.as_deref())
        .unwrap_or(NO_UPCOMING_ASSIGNMENTS);

    build_schedule_prompt(
        inputs.goals,
        school_hours,
        extracurriculars,
        assignment_summary,
    )
}

/// One `- Day: HH:MM to HH:MM` or `- Day: None` line per school day.
pub fn extracurricular_lines(schedule: &ExtracurricularSchedule) -> String {
    let mut out = String::new();
    for (day, window) in schedule.days() {
        match window {
            Some(w) => out.push_str(&format!(
                "- {}: {} to {}\n",
                day,
                format_time(w.start),
                format_time(w.end)
            )),
            None => out.push_str(&format!("- {}: None\n", day)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusyWindow, SchoolDay};
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn weekday_lines(prompt: &str) -> Vec<&str> {
        prompt
            .lines()
            .filter(|l| {
                SchoolDay::ALL
                    .iter()
                    .any(|d| l.starts_with(&format!("- {}:", d)))
            })
            .collect()
    }

    fn monday_only() -> ExtracurricularSchedule {
        let mut schedule = ExtracurricularSchedule::default();
        schedule.set(
            SchoolDay::Monday,
            Some(BusyWindow::new(t(16, 0), t(18, 0)).unwrap()),
        );
        schedule
    }

    #[test]
    fn monday_window_and_free_days_are_listed() {
        let prompt = build_schedule_prompt(
            "Study for math test",
            SchoolHours::default(),
            &monday_only(),
            "[Math] Quiz (Due: 2026-10-21, Points: 10)",
        );

        assert!(prompt.contains("- Monday: 16:00 to 18:00\n"));
        for day in ["Tuesday", "Wednesday", "Thursday", "Friday"] {
            assert!(prompt.contains(&format!("- {}: None\n", day)), "{day}");
        }
        assert!(prompt.contains("- My Goals: Study for math test\n"));
        assert!(prompt.contains("- School Time: 08:00 to 15:00\n"));
        assert!(prompt.contains("- My Assignments:\n[Math] Quiz (Due: 2026-10-21, Points: 10)\n"));
        assert!(prompt.trim_end().ends_with("homework time, and chill time too!"));
    }

    #[test]
    fn always_five_weekday_lines() {
        let mut full = ExtracurricularSchedule::default();
        for day in SchoolDay::ALL {
            full.set(day, Some(BusyWindow::new(t(15, 30), t(17, 0)).unwrap()));
        }

        for schedule in [ExtracurricularSchedule::default(), monday_only(), full] {
            let prompt =
                build_schedule_prompt("goals", SchoolHours::default(), &schedule, "none");
            let lines = weekday_lines(&prompt);
            assert_eq!(lines.len(), 5);
            assert!(lines[0].starts_with("- Monday"));
            assert!(lines[4].starts_with("- Friday"));
        }
    }

    #[test]
    fn missing_parts_come_from_the_session() {
        let session = SessionContext {
            school_hours: Some(SchoolHours::new(t(7, 45), t(14, 30)).unwrap()),
            extracurriculars: Some(monday_only()),
            assignment_summary: Some("[Science] Lab (Due: 2026-10-22, Points: 5)".to_string()),
            ..Default::default()
        };

        let prompt = build_with_session(
            PromptInputs {
                goals: "Move soccer to Tuesday",
                ..Default::default()
            },
            &session,
        );

        assert!(prompt.contains("- My Goals: Move soccer to Tuesday\n"));
        assert!(prompt.contains("- School Time: 07:45 to 14:30\n"));
        assert!(prompt.contains("- Monday: 16:00 to 18:00\n"));
        assert!(prompt.contains("[Science] Lab"));
    }

    #[test]
    fn supplied_parts_win_over_the_session() {
        let session = SessionContext {
            school_hours: Some(SchoolHours::new(t(7, 45), t(14, 30)).unwrap()),
            assignment_summary: Some("old summary".to_string()),
            ..Default::default()
        };
        let schedule = ExtracurricularSchedule::default();

        let prompt = build_with_session(
            PromptInputs {
                goals: "g",
                school_hours: Some(SchoolHours::default()),
                extracurriculars: Some(&schedule),
                assignment_summary: Some("new summary"),
            },
            &session,
        );

        assert!(prompt.contains("- School Time: 08:00 to 15:00\n"));
        assert!(prompt.contains("new summary"));
        assert!(!prompt.contains("old summary"));
    }

    #[test]
    fn empty_session_falls_back_to_defaults() {
        let prompt = build_with_session(
            PromptInputs {
                goals: "anything",
                ..Default::default()
            },
            &SessionContext::default(),
        );

        assert!(prompt.contains("- School Time: 08:00 to 15:00\n"));
        assert_eq!(weekday_lines(&prompt).len(), 5);
        assert!(prompt.contains("- My Assignments:\nNo upcoming assignments.\n"));
    }
}
