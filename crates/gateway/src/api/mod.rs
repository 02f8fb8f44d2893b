//! HTTP surface.
//!
//! Exceptions stay at this boundary: the core returns tagged results and the
//! handlers translate them to status codes here.

pub mod events;
pub mod sessions;

use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use viva_domain::error::Error;

use crate::state::AppState;

pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| config.is_origin_allowed(o))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let api = Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:id/status", get(sessions::session_status))
        .route("/sessions/:id", delete(sessions::end_session))
        .route("/sessions/:id/connected", post(sessions::client_connected))
        .route("/sessions/:id/advance", post(sessions::advance_phase))
        .route("/sessions/:id/timer/pause", post(sessions::pause_timer))
        .route("/sessions/:id/timer/resume", post(sessions::resume_timer))
        .route("/sessions/:id/events", get(events::event_stream))
        .route("/sessions/:id/client-events", post(events::client_event))
        .route("/sessions/:id/audio", post(events::audio_turn))
        .route("/healthz", get(sessions::health));

    Router::new()
        .nest(&state.config.api_prefix, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Error wrapper translating core errors into HTTP responses.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidArgument(_) | Error::Protocol(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
