use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::error::AppResult;
use crate::models::{CourseCatalog, SessionContext};
use crate::services::planner::{AskRequest, PlanOutcome, PlanRequest};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plan", get(get_plan).post(create_plan))
        .route("/plan/ask", post(ask_helper))
        .route("/courses", get(list_courses))
}

/// Current session: last inputs, assignment summary, schedule and stage.
async fn get_plan(State(state): State<Arc<AppState>>) -> Json<SessionContext> {
    let session = state.session.lock().await;
    Json(session.clone())
}

/// "Make My Plan": fetch assignments and generate a new weekly schedule.
async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PlanRequest>,
) -> AppResult<Json<PlanOutcome>> {
    // Held for the whole action so only one plan/ask runs at a time.
    let mut session = state.session.lock().await;
    let outcome = state.planner.generate_plan(&mut session, request).await?;
    Ok(Json(outcome))
}

/// "Ask AI": regenerate the schedule around a follow-up question.
async fn ask_helper(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AskRequest>,
) -> AppResult<Json<PlanOutcome>> {
    let mut session = state.session.lock().await;
    let outcome = state.planner.revise_plan(&mut session, request).await?;
    Ok(Json(outcome))
}

async fn list_courses(State(state): State<Arc<AppState>>) -> Json<CourseCatalog> {
    Json(state.planner.courses().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::services::planner::tests::{StubGenerator, StubSource};
    use crate::services::planner::Planner;
    use crate::{build_router, AppState};

    fn app(reply: Option<&str>) -> axum::Router {
        let config = Config::default();
        let planner = Planner::new(
            Arc::new(StubSource {
                calls: AtomicUsize::new(0),
            }),
            Arc::new(StubGenerator::replying(reply)),
            "token",
            config.canvas.courses.clone(),
        );
        build_router(Arc::new(AppState {
            config,
            planner,
            session: Mutex::new(Default::default()),
        }))
    }

    async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(b) => Body::from(b.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn plan_then_ask_round_trip() {
        let app = app(Some("## Your week"));

        let (status, body) = send(
            &app,
            "POST",
            "/api/plan",
            Some(json!({
                "goals": "Practice for math olympiad",
                "school_start": "08:00",
                "school_end": "15:00",
                "extracurriculars": {"Monday": {"start": "16:00", "end": "18:00"}}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schedule"], "## Your week");
        assert!(body["assignment_summary"]
            .as_str()
            .unwrap()
            .contains("[Language Arts] Essay"));

        let (status, body) = send(
            &app,
            "POST",
            "/api/plan/ask",
            Some(json!({"question": "Move homework earlier"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["schedule"], "## Your week");

        let (status, body) = send(&app, "GET", "/api/plan", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "done");
        assert_eq!(body["schedule_output"], "## Your week");
        assert_eq!(body["extracurriculars"]["monday"]["start"], "16:00");
    }

    #[tokio::test]
    async fn generation_failure_is_a_single_error_message() {
        let app = app(None);

        let (status, body) = send(&app, "POST", "/api/plan", Some(json!({"goals": "x"}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "GENERATION_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("connection reset"));

        let (_, session) = send(&app, "GET", "/api/plan", None).await;
        assert_eq!(session["stage"], "failed");
        assert!(session["schedule_output"].is_null());
    }

    #[tokio::test]
    async fn bad_inputs_are_rejected() {
        let app = app(Some("plan"));

        let (status, body) = send(&app, "POST", "/api/plan/ask", Some(json!({"question": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Please type something first!");

        let (status, body) = send(
            &app,
            "POST",
            "/api/plan",
            Some(json!({"extracurriculars": {"friday": {"start": "19:00", "end": "17:00"}}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"].as_str().unwrap().starts_with("Friday"));
    }

    #[tokio::test]
    async fn courses_and_health_are_exposed() {
        let app = app(Some("plan"));

        let (status, body) = send(&app, "GET", "/api/courses", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 5);
        assert_eq!(body[1], json!({"subject": "Math", "course_id": "972"}));

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["courses"], 5);
    }
}
