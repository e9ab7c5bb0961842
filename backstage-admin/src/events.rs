//! Admin event bus
//!
//! Merges the gateway change feed and inbox notices into one broadcast
//! channel for SSE clients.

use backstage_common::ChangeEvent;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::inbox::Notice;

/// Event bus buffer; lagging SSE clients skip ahead
pub const EVENT_BUS_CAPACITY: usize = 100;

/// Event delivered to admin SSE clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdminEvent {
    Change(ChangeEvent),
    Notice(Notice),
}

impl AdminEvent {
    /// SSE event name
    pub fn event_name(&self) -> &'static str {
        match self {
            AdminEvent::Change(event) => event.event_type(),
            AdminEvent::Notice(_) => "Notice",
        }
    }
}

/// Forward change events and notices to the admin event bus
///
/// Runs until both sources are closed. Send errors (no SSE clients) are
/// ignored.
pub async fn run_event_bridge(
    mut changes: broadcast::Receiver<ChangeEvent>,
    mut notices: broadcast::Receiver<Notice>,
    bus: broadcast::Sender<AdminEvent>,
) {
    debug!("Event bridge started");

    let mut changes_open = true;
    let mut notices_open = true;

    while changes_open || notices_open {
        let event = tokio::select! {
            result = changes.recv(), if changes_open => match result {
                Ok(event) => Some(AdminEvent::Change(event)),
                Err(e) => {
                    changes_open = handle_recv_error("change feed", e);
                    None
                }
            },
            result = notices.recv(), if notices_open => match result {
                Ok(notice) => Some(AdminEvent::Notice(notice)),
                Err(e) => {
                    notices_open = handle_recv_error("notices", e);
                    None
                }
            },
        };

        if let Some(event) = event {
            let _ = bus.send(event);
        }
    }

    debug!("Event bridge stopped");
}

/// Returns whether the source is still open
fn handle_recv_error(source: &str, error: RecvError) -> bool {
    match error {
        RecvError::Lagged(skipped) => {
            warn!("Event bridge: lagged {} {} events", skipped, source);
            true
        }
        RecvError::Closed => {
            debug!("Event bridge: {} closed", source);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bridge_forwards_both_sources() {
        let (change_tx, change_rx) = broadcast::channel(8);
        let (notice_tx, notice_rx) = broadcast::channel(8);
        let (bus, mut bus_rx) = broadcast::channel(8);

        let bridge = tokio::spawn(run_event_bridge(change_rx, notice_rx, bus));

        change_tx.send(ChangeEvent::inserted("m1")).unwrap();
        let first = bus_rx.recv().await.unwrap();
        assert_eq!(first.event_name(), "SubmissionInserted");

        notice_tx.send(Notice::success("Notes updated successfully")).unwrap();
        let second = bus_rx.recv().await.unwrap();
        assert_eq!(second, AdminEvent::Notice(Notice::success("Notes updated successfully")));

        drop(change_tx);
        drop(notice_tx);
        bridge.await.unwrap();
    }

    #[test]
    fn test_notice_serializes_flat() {
        let json = serde_json::to_value(AdminEvent::Notice(Notice::error("Failed to delete image"))).unwrap();
        assert_eq!(json["level"], "error");
        assert_eq!(json["message"], "Failed to delete image");
    }
}
