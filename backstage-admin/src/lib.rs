//! backstage-admin library - performer site contact inbox
//!
//! Serves the public contact form endpoint, the attachment file store and
//! the admin message inbox API.

use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub mod api;
pub mod events;
pub mod gateway;
pub mod images;
pub mod inbox;
pub mod pagination;

use events::{AdminEvent, EVENT_BUS_CAPACITY};
use gateway::{storage::PUBLIC_OBJECT_ROUTE, DataGateway, SqliteGateway};
use inbox::{ChangeListener, Inbox};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub inbox: Arc<Inbox<SqliteGateway>>,
    /// Change events and notices for SSE clients
    pub events: broadcast::Sender<AdminEvent>,
    /// Directory served under the public object route
    pub storage_root: PathBuf,
    /// Keeps the inbox refetching on writes for as long as the app lives
    listener: Arc<ChangeListener>,
}

impl AppState {
    /// Wire the inbox to the change feed and the admin event bus
    ///
    /// Must be called inside a Tokio runtime.
    pub fn new(inbox: Arc<Inbox<SqliteGateway>>) -> Self {
        let storage_root = inbox.gateway().files().root().to_path_buf();
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);

        tokio::spawn(events::run_event_bridge(
            inbox.gateway().subscribe_changes(),
            inbox.subscribe_notices(),
            events.clone(),
        ));
        let listener = Arc::new(ChangeListener::spawn(Arc::clone(&inbox)));

        Self {
            inbox,
            events,
            storage_root,
            listener,
        }
    }

    pub fn listener(&self) -> &ChangeListener {
        &self.listener
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.inbox.settings().max_upload_bytes;

    // Admin routes; authentication is enforced by the reverse proxy
    let admin = Router::new()
        .merge(api::message_routes())
        .merge(api::attachment_routes(max_upload_bytes))
        .merge(api::event_routes());

    // Public routes
    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::buildinfo_routes())
        .merge(api::contact_routes())
        .nest_service(PUBLIC_OBJECT_ROUTE, ServeDir::new(&state.storage_root));

    Router::new()
        .merge(admin)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
