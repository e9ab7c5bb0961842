//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE implementations for Backstage services.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// Heartbeat interval for all SSE streams
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Turn a broadcast receiver into an SSE stream
///
/// Sends an initial `ConnectionStatus: connected` event, then one SSE event
/// per broadcast item named by `event_name`. Lagged receivers skip the
/// missed items and continue; the stream ends when the sender is dropped.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     backstage_common::sse::broadcast_sse_stream(
///         "backstage-admin",
///         state.gateway.subscribe_changes(),
///         |event: &ChangeEvent| event.event_type(),
///     )
/// }
/// ```
pub fn broadcast_sse_stream<T, F>(
    service_name: &'static str,
    mut rx: broadcast::Receiver<T>,
    event_name: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Clone + Send + 'static,
    F: Fn(&T) -> &'static str + Send + 'static,
{
    info!("New SSE client connected to {} events", service_name);

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(item) => {
                    match Event::default().event(event_name(&item)).json_data(&item) {
                        Ok(event) => yield Ok(event),
                        Err(e) => warn!("SSE: failed to encode event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("SSE: client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: {} event source closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}
