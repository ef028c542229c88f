//! REST endpoints for interview progress and the active plan.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::conversation::ConversationId;
use crate::onboarding::OnboardingManager;
use crate::store::ProfileStore;

/// Shared state for status routes.
#[derive(Clone)]
pub struct StatusState {
    pub onboarding: Arc<OnboardingManager>,
    pub profiles: Arc<dyn ProfileStore>,
}

async fn healthz() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// GET /api/conversations/{id}/onboarding
///
/// The running interview (current question and answers so far), or the
/// completed one from the profile. 404 if the user never started.
async fn get_onboarding(
    State(state): State<StatusState>,
    Path(id): Path<String>,
) -> Response {
    let conversation = ConversationId::new(id);

    let session = match state.onboarding.session(&conversation).await {
        Ok(session) => session,
        Err(e) => return internal(e),
    };
    if let Some(session) = session {
        let question = session.current(state.onboarding.graph());
        return Json(json!({
            "phase": session.phase,
            "started_at": session.started_at,
            "current_question": question.map(|q| json!({
                "key": q.key,
                "section": q.section,
                "prompt": q.prompt,
            })),
            "answers": session.answers,
        }))
        .into_response();
    }

    match state.profiles.get_profile(&conversation).await {
        Ok(Some(profile)) if profile.answers.is_some() => Json(json!({
            "phase": "completed",
            "completed_at": profile.onboarding_completed_at,
            "answers": profile.answers,
        }))
        .into_response(),
        Ok(_) => not_found("No onboarding for this conversation"),
        Err(e) => internal(e),
    }
}

/// GET /api/conversations/{id}/plan
async fn get_plan(State(state): State<StatusState>, Path(id): Path<String>) -> Response {
    match state.profiles.get_profile(&ConversationId::new(id)).await {
        Ok(Some(profile)) => match profile.plan {
            Some(plan) => Json(plan).into_response(),
            None => not_found("No plan yet"),
        },
        Ok(None) => not_found("No plan yet"),
        Err(e) => internal(e),
    }
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": message}))).into_response()
}

fn internal(e: impl std::fmt::Display) -> Response {
    tracing::error!(error = %e, "Status route failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": e.to_string()})),
    )
        .into_response()
}

/// Build the status REST routes.
pub fn status_routes(state: StatusState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/conversations/{id}/onboarding", get(get_onboarding))
        .route("/api/conversations/{id}/plan", get(get_plan))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    use crate::onboarding::{AnswerSet, AnswerValue, CoachProfile, QuestionGraph, catalog};
    use crate::plan::calculator;
    use crate::plan::ActivePlan;
    use crate::store::MemoryStore;

    fn app() -> (Router, Arc<OnboardingManager>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let graph = QuestionGraph::new(catalog::default_questions()).unwrap();
        let onboarding = Arc::new(OnboardingManager::new(Arc::new(graph), store.clone()));
        let router = status_routes(StatusState {
            onboarding: onboarding.clone(),
            profiles: store.clone(),
        });
        (router, onboarding, store)
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (router, _, _) = app();
        let (status, body) = get(router, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let (router, _, _) = app();
        let (status, _) = get(router.clone(), "/api/conversations/7/onboarding").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = get(router, "/api/conversations/7/plan").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn running_interview_shows_current_question() {
        let (router, onboarding, _) = app();
        onboarding.start(&ConversationId::from("7")).await.unwrap();

        let (status, body) = get(router, "/api/conversations/7/onboarding").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "in_progress");
        assert_eq!(body["current_question"]["key"], catalog::keys::NAME);
    }

    #[tokio::test]
    async fn stored_plan_is_returned() {
        let (router, _, store) = app();
        let mut answers = AnswerSet::new();
        answers.insert(catalog::keys::WEIGHT_KG, AnswerValue::Number(82.0));
        let (targets, period) = calculator::plan_at(&answers, Utc::now(), 30);

        let mut profile = CoachProfile::default();
        profile.complete_onboarding(answers, Utc::now());
        profile.plan = Some(ActivePlan::Calculated { targets, period });
        store.put_profile(&ConversationId::from("7"), profile).await.unwrap();

        let (status, body) = get(router.clone(), "/api/conversations/7/plan").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "calculated");

        let (status, body) = get(router, "/api/conversations/7/onboarding").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "completed");
    }
}
