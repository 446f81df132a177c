//! Server-Sent-Events adapter: a push-only observer.
//!
//! Route: `GET /sse/{id}`. Emits the current snapshot, then one
//! `game-update` event per snapshot the hub delivers.

use crate::app::AppState;
use crate::hub::{FanoutHub, ObserverId, Subscription};
use crate::session::{Session, SessionId};
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::{debug, info, instrument, warn};

/// SSE event name carrying a session snapshot.
pub const UPDATE_EVENT: &str = "game-update";

/// Unregisters a subscription when the response stream is dropped.
///
/// axum drops the stream when the client disconnects, which is what ends a
/// subscriber's consumer loop.
#[derive(Debug)]
struct SubscriptionGuard {
    hub: FanoutHub,
    session_id: SessionId,
    observer: ObserverId,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.hub.unregister(&self.session_id, self.observer);
        debug!(session_id = %self.session_id, observer = %self.observer, "SSE stream closed");
    }
}

fn snapshot_event(session: &Session) -> Event {
    Event::default()
        .event(UPDATE_EVENT)
        .json_data(session)
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode snapshot");
            Event::default().comment("snapshot encoding failed")
        })
}

/// Opens a push subscription and streams snapshots until disconnect.
#[instrument(skip(state))]
pub async fn sse_handler(
    Path(id): Path<SessionId>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before reading the initial state so no update slips between.
    let Subscription { id: observer, receiver } = state.hub.subscribe(&id);
    info!(%observer, "SSE subscriber connected");

    let guard = SubscriptionGuard {
        hub: state.hub.clone(),
        session_id: id.clone(),
        observer,
    };
    let initial = state.store.get(&id).map(|s| snapshot_event(&s));

    let updates = futures::stream::unfold((receiver, guard), |(mut rx, guard)| async move {
        let session = rx.recv().await?;
        Some((Ok::<_, Infallible>(snapshot_event(&session)), (rx, guard)))
    });

    let stream = futures::stream::iter(initial.map(Ok)).chain(updates);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
