//! Broadcast fan-out of session snapshots to live observers.
//!
//! Observers are grouped by session id. Two kinds exist:
//!
//! - **Connections** are duplex peers (WebSocket). Delivery is a direct call
//!   into the peer's [`ConnectionSink`]; a failing peer is skipped and left for
//!   its owning adapter to unregister when its read loop sees the disconnect.
//! - **Push subscriptions** are one-way streams (SSE). Each has a bounded
//!   queue; when it is full the update is dropped for that subscriber only.
//!
//! The hub never reads or writes the session store. Callers broadcast the
//! snapshot the store returned, after the store call has finished.

use crate::session::{Session, SessionId};
use derive_more::{Display, Error};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, instrument, trace};

/// Default per-subscriber queue depth for push subscriptions.
pub const DEFAULT_PUSH_BUFFER: usize = 10;

/// Handle identifying one registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("observer-{}", _0)]
pub struct ObserverId(u64);

/// Delivery to a connection failed; the peer is most likely gone.
#[derive(Debug, Clone, Display, Error)]
#[display("Delivery failed: {}", message)]
pub struct DeliveryError {
    /// What went wrong.
    pub message: String,
}

impl DeliveryError {
    /// Creates a new delivery error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outbound side of a duplex connection.
pub trait ConnectionSink: Send + Sync {
    /// Writes one snapshot to the peer without blocking.
    fn deliver(&self, session: &Session) -> Result<(), DeliveryError>;
}

/// A registered observer.
#[derive(Clone)]
pub enum Observer {
    /// Duplex connection.
    Connection(Arc<dyn ConnectionSink>),
    /// Push subscription fed through a bounded queue.
    Push(mpsc::Sender<Session>),
}

impl Observer {
    fn kind(&self) -> &'static str {
        match self {
            Observer::Connection(_) => "connection",
            Observer::Push(_) => "push",
        }
    }

    fn deliver(&self, session: &Session) -> Result<(), DeliveryError> {
        match self {
            Observer::Connection(sink) => sink.deliver(session),
            Observer::Push(tx) => match tx.try_send(session.clone()) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => Err(DeliveryError::new("push buffer full")),
                Err(TrySendError::Closed(_)) => Err(DeliveryError::new("push channel closed")),
            },
        }
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// A push subscription returned by [`FanoutHub::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    /// Handle to pass to [`FanoutHub::unregister`].
    pub id: ObserverId,
    /// Receives snapshots; yields `None` once unregistered.
    pub receiver: mpsc::Receiver<Session>,
}

type Registry = HashMap<SessionId, HashMap<ObserverId, Observer>>;

/// Registry of live observers keyed by session id.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone)]
pub struct FanoutHub {
    observers: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
    push_buffer: usize,
}

impl FanoutHub {
    /// Creates a hub whose push subscriptions buffer `push_buffer` snapshots.
    ///
    /// A zero buffer is raised to one.
    #[instrument]
    pub fn new(push_buffer: usize) -> Self {
        let push_buffer = push_buffer.max(1);
        info!(push_buffer, "Creating fan-out hub");
        Self {
            observers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            push_buffer,
        }
    }

    /// Queue depth used by [`subscribe`](Self::subscribe).
    pub fn push_buffer(&self) -> usize {
        self.push_buffer
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.observers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.observers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an observer to a session's set.
    #[instrument(skip(self))]
    pub fn register(&self, session_id: &str, observer: Observer) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write()
            .entry(session_id.to_string())
            .or_default()
            .insert(id, observer);
        debug!(observer = %id, "Observer registered");
        id
    }

    /// Opens a push subscription for a session.
    #[instrument(skip(self))]
    pub fn subscribe(&self, session_id: &str) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.push_buffer);
        let id = self.register(session_id, Observer::Push(tx));
        Subscription { id, receiver }
    }

    /// Removes an observer. Returns false if it was not registered.
    ///
    /// Dropping a push observer's sender closes its queue, which ends the
    /// subscriber's receive loop.
    #[instrument(skip(self))]
    pub fn unregister(&self, session_id: &str, observer: ObserverId) -> bool {
        let mut registry = self.write();
        let Some(set) = registry.get_mut(session_id) else {
            return false;
        };
        let removed = set.remove(&observer);
        if set.is_empty() {
            registry.remove(session_id);
        }
        if let Some(observer) = &removed {
            debug!(kind = observer.kind(), "Observer unregistered");
        }
        removed.is_some()
    }

    /// Delivers a snapshot to every observer of `session_id`.
    ///
    /// Per-observer failures are logged and skipped. Returns the number of
    /// observers that accepted the snapshot.
    #[instrument(skip(self, session))]
    pub fn broadcast(&self, session_id: &str, session: &Session) -> usize {
        let registry = self.read();
        let Some(set) = registry.get(session_id) else {
            trace!("No observers");
            return 0;
        };

        let mut delivered = 0;
        for (id, observer) in set {
            match observer.deliver(session) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    debug!(observer = %id, kind = observer.kind(), error = %e, "Skipped observer")
                }
            }
        }
        debug!(delivered, total = set.len(), "Broadcast complete");
        delivered
    }

    /// Number of observers registered for a session.
    pub fn observer_count(&self, session_id: &str) -> usize {
        self.read().get(session_id).map_or(0, HashMap::len)
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(DEFAULT_PUSH_BUFFER)
    }
}
