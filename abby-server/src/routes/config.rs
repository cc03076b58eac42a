use std::sync::Arc;

use abby_core::cache::{CacheState, CACHE_HEADER};
use abby_core::config::ConfigPayload;
use abby_core::quota::period_key;
use abby_core::Error;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Global the script endpoint assigns the payload to.
pub const ABBY_WINDOW_KEY: &str = "__abby_data__";

/// `GET /{projectId}/{environment}` — the config payload as JSON.
pub async fn get_config(
    State(state): State<AppState>,
    Path((project_id, environment)): Path<(String, String)>,
) -> Response {
    let (payload, cache_state) = match serve_payload(&state, &project_id, &environment).await {
        Ok(served) => served,
        Err(response) => return response,
    };

    (
        [(HeaderName::from_static(CACHE_HEADER), cache_state.as_str())],
        Json((*payload).clone()),
    )
        .into_response()
}

/// `GET /{projectId}/{environment}/script.js` — the same payload, serialized
/// for a script tag.
pub async fn get_script(
    State(state): State<AppState>,
    Path((project_id, environment)): Path<(String, String)>,
) -> Response {
    let (payload, cache_state) = match serve_payload(&state, &project_id, &environment).await {
        Ok(served) => served,
        Err(response) => return response,
    };

    let json = match serde_json::to_string(&*payload) {
        Ok(json) => json,
        Err(err) => {
            log::error!(target: "abby-server", "failed to serialize config payload: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let body = format!("window.{ABBY_WINDOW_KEY} = {json};");

    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (HeaderName::from_static(CACHE_HEADER), cache_state.as_str()),
        ],
        body,
    )
        .into_response()
}

/// Quota gate plus cache read, shared by both config endpoints.
async fn serve_payload(
    state: &AppState,
    project_id: &str,
    environment: &str,
) -> Result<(Arc<ConfigPayload>, CacheState), Response> {
    let quota = state.quota.check_limit(project_id);
    if quota.over_limit {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "plan limit reached" })),
        )
            .into_response());
    }
    if quota.is_near_limit {
        let period = period_key(Utc::now());
        if state.quota.mark_near_limit_notified(project_id, &period) {
            log::warn!(target: "abby-server",
                "project {project_id} has used {} of {} events this period",
                quota.current,
                quota.limit.unwrap_or(0));
        }
    }

    state
        .cache
        .get(project_id, environment)
        .await
        .map_err(error_response)
}

fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::UnknownProject(_) | Error::UnknownEnvironment { .. } => StatusCode::NOT_FOUND,
        Error::Network(_) | Error::Io(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::warn!(target: "abby-server", "config read failed: {err}");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
