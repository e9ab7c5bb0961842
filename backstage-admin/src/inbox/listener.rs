//! Change feed listener
//!
//! Subscribes to the gateway's change feed and refetches the current page
//! for every insert, update or delete. Event payloads are ignored: the
//! fetch is the source of truth.
//!
//! **Behavior:**
//! - Events already queued when a refetch starts are drained first, so a
//!   burst of writes costs one fetch
//! - A lagged receiver triggers a refetch and keeps listening
//! - The task ends when the feed closes or the listener is dropped

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::Inbox;
use crate::gateway::DataGateway;
use backstage_common::ChangeEvent;

/// Handle to the background refetch task
///
/// Dropping the handle aborts the task and releases the subscription, even
/// while a fetch is in flight.
pub struct ChangeListener {
    handle: JoinHandle<()>,
}

impl ChangeListener {
    /// Subscribe now and start listening in the background
    ///
    /// The subscription is taken before this returns, so no write made after
    /// `spawn` is missed.
    pub fn spawn<G: DataGateway>(inbox: Arc<Inbox<G>>) -> Self {
        let rx = inbox.gateway().subscribe_changes();
        let handle = tokio::spawn(run_listener(inbox, rx));
        Self { handle }
    }

    /// Stop listening
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ChangeListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run_listener<G: DataGateway>(inbox: Arc<Inbox<G>>, mut rx: broadcast::Receiver<ChangeEvent>) {
    info!("Change listener started");

    loop {
        match rx.recv().await {
            Ok(event) => {
                debug!("Change feed: {} {}", event.event_type(), event.submission_id());
                let coalesced = drain_pending(&mut rx);
                if coalesced > 0 {
                    debug!("Change feed: coalesced {} queued event(s)", coalesced);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Change feed: lagged {} events, refetching", skipped);
            }
            Err(RecvError::Closed) => {
                debug!("Change feed closed, stopping listener");
                break;
            }
        }

        // Failures are reported through the inbox notices and error state
        if let Err(e) = inbox.refresh().await {
            debug!("Refetch after change failed: {}", e);
        }
    }

    info!("Change listener stopped");
}

/// Discard events already queued; returns how many were dropped
fn drain_pending(rx: &mut broadcast::Receiver<ChangeEvent>) -> usize {
    let mut drained = 0;
    loop {
        match rx.try_recv() {
            Ok(_) | Err(TryRecvError::Lagged(_)) => drained += 1,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return drained,
        }
    }
}
