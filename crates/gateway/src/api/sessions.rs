//! Session lifecycle and phase-control handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use viva_domain::error::Error;
use viva_runtime::bot::InterviewBot;

use crate::state::AppState;

use super::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub mock_interview_id: String,
    pub user_id: String,
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.mock_interview_id.is_empty() || req.user_id.is_empty() {
        return Err(Error::InvalidArgument("mockInterviewId and userId are required".into()).into());
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let bot = InterviewBot::start(
        state.deps.clone(),
        &req.mock_interview_id,
        &req.user_id,
        &session_id,
    )
    .await?;
    state.sessions.insert(&session_id, bot.clone());

    Ok(Json(serde_json::json!({
        "sessionId": session_id,
        "candidateInterviewId": bot.candidate_interview_id(),
        "status": bot.status(),
    })))
}

fn lookup(state: &AppState, session_id: &str) -> Result<std::sync::Arc<InterviewBot>, ApiError> {
    state
        .sessions
        .get(session_id)
        .ok_or_else(|| Error::NotFound(format!("session {session_id}")).into())
}

pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = lookup(&state, &session_id)?;
    Ok(Json(bot.status()))
}

/// Transport-level connect: prime the model with the greeting turn.
pub async fn client_connected(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = lookup(&state, &session_id)?;
    bot.handle_client_connected().await;
    Ok(Json(serde_json::json!({ "connected": true })))
}

/// Transport-level disconnect. Cleans up the session without marking the
/// interview completed.
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = state
        .sessions
        .remove(&session_id)
        .ok_or_else(|| ApiError(Error::NotFound(format!("session {session_id}"))))?;
    bot.handle_client_disconnected().await;
    Ok(Json(serde_json::json!({ "ended": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancePhaseRequest {
    pub candidate_interview_id: String,
    pub current_sequence: u32,
}

pub async fn advance_phase(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<AdvancePhaseRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = lookup(&state, &session_id)?;
    let new_sequence = bot
        .advance_phase(&req.candidate_interview_id, req.current_sequence)
        .await?;
    Ok(Json(serde_json::json!({ "newSequence": new_sequence })))
}

pub async fn pause_timer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = lookup(&state, &session_id)?;
    let changed = bot.pause_timer();
    Ok(Json(serde_json::json!({
        "changed": changed,
        "timer": bot.timer_status(),
    })))
}

pub async fn resume_timer(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = lookup(&state, &session_id)?;
    let changed = bot.resume_timer();
    Ok(Json(serde_json::json!({
        "changed": changed,
        "timer": bot.timer_status(),
    })))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "environment": state.config.environment,
        "activeSessions": state.sessions.len(),
    }))
}
