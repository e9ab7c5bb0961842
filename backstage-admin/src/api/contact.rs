//! Public contact form endpoint

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use backstage_common::{ContactSubmission, NewSubmission};

use super::ApiError;
use crate::gateway::DataGateway;
use crate::AppState;

/// POST /api/contact
///
/// Creates a submission; the admin inbox picks it up through the change feed.
pub async fn submit_contact(
    State(state): State<AppState>,
    Json(new): Json<NewSubmission>,
) -> Result<(StatusCode, Json<ContactSubmission>), ApiError> {
    let submission = state.inbox.gateway().insert_submission(new).await?;
    Ok((StatusCode::CREATED, Json(submission)))
}

pub fn contact_routes() -> Router<AppState> {
    Router::new().route("/api/contact", post(submit_contact))
}
