//! Proxy routes between the browser and the Google Drive API. Each request
//! carries the user's bearer credential; the server holds no Drive state.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use drive_client::{DriveClient, DriveError};

use crate::AppState;

use super::error_json;

// --- Request bodies ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    file_name: Option<String>,
    file_content: Option<Value>,
    access_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    file_name: Option<String>,
    access_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    access_token: Option<String>,
}

// --- Handlers ---

pub async fn api_save(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveRequest>,
) -> Response {
    let (Some(file_name), Some(content), Some(token)) =
        (req.file_name, req.file_content, req.access_token)
    else {
        return error_json(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    let bytes = match serde_json::to_vec(&content) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "Unserializable save body");
            return error_json(StatusCode::BAD_REQUEST, "Invalid world document");
        }
    };
    if bytes.len() > state.config.max_document_bytes {
        return error_json(
            StatusCode::PAYLOAD_TOO_LARGE,
            "World file exceeds the size limit",
        );
    }

    match DriveClient::new(token).save_json(&file_name, bytes).await {
        Ok(file_id) => Json(json!({ "success": true, "fileId": file_id })).into_response(),
        Err(e) => {
            warn!(error = %e, file_name, "Drive save failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save to Drive")
        }
    }
}

pub async fn api_load(Json(req): Json<LoadRequest>) -> Response {
    let (Some(file_name), Some(token)) = (req.file_name, req.access_token) else {
        return error_json(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    match DriveClient::new(token).load_json(&file_name).await {
        Ok(world) => Json(world).into_response(),
        Err(DriveError::NotFound(_)) => error_json(StatusCode::NOT_FOUND, "File not found"),
        Err(e) => {
            warn!(error = %e, file_name, "Drive load failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load from Drive")
        }
    }
}

pub async fn api_list(Json(req): Json<ListRequest>) -> Response {
    let Some(token) = req.access_token else {
        return error_json(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    match DriveClient::new(token).list_worlds().await {
        Ok(files) => Json(json!({ "success": true, "files": files })).into_response(),
        Err(e) => {
            warn!(error = %e, "Drive list failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list Drive files")
        }
    }
}

/// Multipart create: `file` holds the world JSON, `filename` its name.
/// The credential rides in the Authorization header.
pub async fn api_upload(headers: HeaderMap, multipart: Multipart) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_json(StatusCode::UNAUTHORIZED, "Missing access token");
    };

    let parts = match collect_fields(multipart, "file", "filename").await {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };
    let (Some((bytes, _)), Some(file_name)) = parts else {
        return error_json(StatusCode::BAD_REQUEST, "Missing required data");
    };

    match DriveClient::new(token).save_json(&file_name, bytes).await {
        Ok(file_id) => Json(json!({ "success": true, "fileId": file_id })).into_response(),
        Err(e) => {
            warn!(error = %e, file_name, "Drive upload failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}

/// Multipart map raster upload: `map` holds the image, `fileName` its name.
pub async fn api_upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let Some(token) = bearer_token(&headers) else {
        return error_json(StatusCode::UNAUTHORIZED, "Missing access token");
    };

    let parts = match collect_fields(multipart, "map", "fileName").await {
        Ok(parts) => parts,
        Err(resp) => return resp,
    };
    let (Some((bytes, content_type)), Some(file_name)) = parts else {
        return error_json(StatusCode::BAD_REQUEST, "Missing required data");
    };

    if bytes.len() > state.config.max_raster_bytes {
        return error_json(
            StatusCode::PAYLOAD_TOO_LARGE,
            "Map image exceeds the size limit",
        );
    }

    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    match DriveClient::new(token)
        .upload_media(&file_name, bytes, &content_type)
        .await
    {
        Ok(file_id) => Json(json!({ "success": true, "fileId": file_id })).into_response(),
        Err(e) => {
            warn!(error = %e, file_name, "Map upload failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}

// --- Helpers ---

type FileField = (Vec<u8>, Option<String>);

/// Drain a multipart body looking for one file field and one name field.
async fn collect_fields(
    mut multipart: Multipart,
    file_field: &str,
    name_field: &str,
) -> Result<(Option<FileField>, Option<String>), Response> {
    let mut file: Option<FileField> = None;
    let mut name: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Malformed multipart body");
                return Err(error_json(StatusCode::BAD_REQUEST, "Malformed upload"));
            }
        };

        let Some(field_name) = field.name().map(str::to_string) else {
            continue;
        };
        if field_name == file_field {
            let content_type = field.content_type().map(str::to_string);
            match field.bytes().await {
                Ok(bytes) => file = Some((bytes.to_vec(), content_type)),
                Err(e) => {
                    warn!(error = %e, "Could not read upload body");
                    return Err(error_json(StatusCode::BAD_REQUEST, "Malformed upload"));
                }
            }
        } else if field_name == name_field {
            match field.text().await {
                Ok(text) => name = Some(text),
                Err(e) => {
                    warn!(error = %e, "Could not read upload name");
                    return Err(error_json(StatusCode::BAD_REQUEST, "Malformed upload"));
                }
            }
        }
    }

    Ok((file, name))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
