//! Session-authenticated CRUD over the user's flat JSON world files.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::warn;

use crate::auth::UserSession;
use crate::store::is_safe_filename;
use crate::AppState;

use super::error_json;

pub async fn api_list(session: UserSession, State(state): State<Arc<AppState>>) -> Response {
    match state.store.list(&session.user_id).await {
        Ok(names) => Json(names).into_response(),
        Err(e) => {
            warn!(error = %e, user = %session.user_id, "Failed to list worlds");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list worlds")
        }
    }
}

pub async fn api_load(
    session: UserSession,
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return error_json(StatusCode::BAD_REQUEST, "Invalid filename");
    }

    match state.store.load(&session.user_id, &filename).await {
        Ok(Some(world)) => Json(world).into_response(),
        Ok(None) => error_json(StatusCode::NOT_FOUND, "Not found"),
        Err(e) => {
            warn!(error = %e, user = %session.user_id, filename, "Failed to load world");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load world")
        }
    }
}

pub async fn api_save(
    session: UserSession,
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Json(world): Json<Value>,
) -> Response {
    if !is_safe_filename(&filename) {
        return error_json(StatusCode::BAD_REQUEST, "Invalid filename");
    }

    match state.store.save(&session.user_id, &filename, &world).await {
        Ok(()) => Json(json!({ "status": "saved" })).into_response(),
        Err(e) => {
            warn!(error = %e, user = %session.user_id, filename, "Failed to save world");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save world")
        }
    }
}

pub async fn api_delete(
    session: UserSession,
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        return error_json(StatusCode::BAD_REQUEST, "Invalid filename");
    }

    match state.store.delete(&session.user_id, &filename).await {
        Ok(true) => Json(json!({ "status": "deleted" })).into_response(),
        Ok(false) => error_json(StatusCode::NOT_FOUND, "Not found"),
        Err(e) => {
            warn!(error = %e, user = %session.user_id, filename, "Failed to delete world");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete world")
        }
    }
}
