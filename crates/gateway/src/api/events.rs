//! Event streaming and inbound client events.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use futures_core::Stream;

use viva_domain::error::Error;
use viva_domain::frames::{ClientEvent, Frame};

use crate::state::AppState;

use super::ApiError;

/// Per-session SSE stream of phase and system events.
pub async fn event_stream(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError> {
    let bot = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError(Error::NotFound(format!("session {session_id}"))))?;
    let mut rx = bot.subscribe_events();

    let stream = async_stream::stream! {
        while let Some(envelope) = rx.recv().await {
            match Event::default().json_data(&envelope) {
                Ok(event) => yield Ok(event),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize SSE envelope");
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Structured events from the candidate UI (`CodeContent`, `DesignContent`).
///
/// Malformed events are logged and dropped without affecting the session.
pub async fn client_event(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(raw): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError(Error::NotFound(format!("session {session_id}"))))?;

    let event: ClientEvent = match serde_json::from_value(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "malformed client event, dropping");
            return Err(Error::Protocol(format!("malformed client event: {e}")).into());
        }
    };

    bot.handle_client_event(event).await;
    Ok(Json(serde_json::json!({ "accepted": true })))
}

/// A raw audio turn: transcribe it and feed the text into the pipeline.
pub async fn audio_turn(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let bot = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ApiError(Error::NotFound(format!("session {session_id}"))))?;

    let content_type = headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/wav");

    let transcript = state.stt.transcribe(&body, content_type).await?;
    if !transcript.is_empty() {
        bot.push_frame(Frame::UserText {
            text: transcript.clone(),
            timestamp: Utc::now(),
        })
        .await;
    }

    Ok(Json(serde_json::json!({ "transcript": transcript })))
}
