//! Admin message inbox endpoints
//!
//! Mutations return the refreshed [`InboxView`] so the UI can re-render
//! from a single response.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use backstage_common::SubmissionStatus;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::inbox::{InboxTab, InboxView, NotesOutcome};
use crate::AppState;

/// Query parameters for the message list
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Page number (1-indexed); triggers a fetch when present
    pub page: Option<u32>,
    pub tab: Option<String>,
    /// Free-text search
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: SubmissionStatus,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub outcome: NotesOutcome,
    pub view: InboxView,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// GET /api/messages?page&tab&q
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<InboxView>, ApiError> {
    if let Some(tab) = &query.tab {
        let tab: InboxTab = tab.parse().map_err(|e: backstage_common::Error| {
            ApiError::BadRequest(e.to_string())
        })?;
        state.inbox.set_tab(tab).await;
    }
    if let Some(q) = query.q {
        state.inbox.set_query(q).await;
    }
    if let Some(page) = query.page {
        state.inbox.set_page(page).await?;
    }

    Ok(Json(state.inbox.view().await))
}

/// POST /api/messages/refresh
pub async fn refresh_messages(State(state): State<AppState>) -> Result<Json<InboxView>, ApiError> {
    state.inbox.refresh().await?;
    Ok(Json(state.inbox.view().await))
}

/// POST /api/messages/:id/select
///
/// Opens the message; unread messages are marked read.
pub async fn select_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InboxView>, ApiError> {
    state.inbox.select(&id).await?;
    Ok(Json(state.inbox.view().await))
}

/// PUT /api/messages/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<InboxView>, ApiError> {
    state.inbox.set_status(&id, request.status).await?;
    Ok(Json(state.inbox.view().await))
}

/// PUT /api/messages/:id/notes
pub async fn update_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<NotesRequest>,
) -> Result<Json<NotesResponse>, ApiError> {
    let outcome = state.inbox.set_notes(&id, &request.notes).await?;
    Ok(Json(NotesResponse {
        outcome,
        view: state.inbox.view().await,
    }))
}

/// DELETE /api/messages/:id?confirm=true
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<InboxView>, ApiError> {
    state.inbox.delete(&id, query.confirm).await?;
    Ok(Json(state.inbox.view().await))
}

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", get(list_messages))
        .route("/api/messages/refresh", post(refresh_messages))
        .route("/api/messages/:id/select", post(select_message))
        .route("/api/messages/:id/status", put(update_status))
        .route("/api/messages/:id/notes", put(update_notes))
        .route("/api/messages/:id", axum::routing::delete(delete_message))
}
