//! Admin event stream
//!
//! Streams change-feed events (`SubmissionInserted`, `SubmissionUpdated`,
//! `SubmissionDeleted`) and inbox notices (`Notice`) with a heartbeat.

use crate::events::AdminEvent;
use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    backstage_common::sse::broadcast_sse_stream(
        "backstage-admin",
        state.events.subscribe(),
        AdminEvent::event_name,
    )
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/api/events", get(event_stream))
}
