//! Message attachment endpoints
//!
//! Uploads are sent as the raw request body with the image content type.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::inbox::InboxView;
use crate::AppState;

/// Request bodies may exceed the upload cap so the handler can report the
/// size instead of the transport cutting the connection
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveAttachmentRequest {
    pub url: String,
}

/// POST /api/messages/:id/attachments?file_name=
pub async fn upload_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UploadQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Content-Type header".to_string()))?;
    let file_name = query.file_name.unwrap_or_default();

    let url = state
        .inbox
        .upload_attachment(&id, &file_name, content_type, body.to_vec())
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { url })))
}

/// DELETE /api/messages/:id/attachments
///
/// Removes the file, then the URL from the message.
pub async fn delete_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RemoveAttachmentRequest>,
) -> Result<Json<InboxView>, ApiError> {
    state.inbox.delete_attachment(&id, &request.url).await?;
    Ok(Json(state.inbox.view().await))
}

pub fn attachment_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/messages/:id/attachments",
            post(upload_attachment).delete(delete_attachment),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes.saturating_add(BODY_LIMIT_SLACK)))
}
