use abby_core::events::TrackingEvent;
use abby_core::Error;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::bot;
use crate::state::AppState;

/// `POST /data` — validated event intake.
///
/// Everything that rejects happens synchronously, before the queue: bot
/// traffic, schema failures, and quota gating. An accepted event is
/// acknowledged immediately; persistence is the workers' problem.
pub async fn track_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());
    if bot::is_bot(user_agent) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "automated traffic is not tracked" })),
        )
            .into_response();
    }

    // Mapped by hand so a schema failure is a 400, not axum's default 422.
    let event: TrackingEvent = match serde_json::from_value(body) {
        Ok(event) => event,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("invalid event: {err}") })),
            )
                .into_response();
        }
    };

    let quota = state.quota.check_limit(&event.project_id);
    if quota.over_limit {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "plan limit reached" })),
        )
            .into_response();
    }

    match state.pipeline.track(event) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(Error::QueueFull) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "event queue is full" })),
        )
            .into_response(),
        Err(err) => {
            log::error!(target: "abby-server", "event intake failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
