//! API error responses
//!
//! Every failure is returned as JSON `{"error": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use backstage_common::Error;
use serde_json::json;
use tracing::error;

use crate::inbox::InboxError;

#[derive(Debug)]
pub enum ApiError {
    Inbox(InboxError),
    BadRequest(String),
}

impl From<InboxError> for ApiError {
    fn from(e: InboxError) -> Self {
        ApiError::Inbox(e)
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        ApiError::Inbox(InboxError::Gateway(e))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Inbox(e) => match e {
                InboxError::Gateway(Error::NotFound(_)) => StatusCode::NOT_FOUND,
                InboxError::Gateway(Error::InvalidInput(_)) => StatusCode::BAD_REQUEST,
                InboxError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
                InboxError::NotLoaded(_) | InboxError::AttachmentNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                InboxError::ConfirmationRequired
                | InboxError::MalformedAttachmentUrl { .. }
                | InboxError::ImageDecode(_) => StatusCode::BAD_REQUEST,
                InboxError::UnsupportedImageType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                InboxError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Inbox(e) => e.to_string(),
        };

        if status.is_server_error() {
            error!("Request failed: {}", message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
