//! tiktaktoes server library - real-time two-player sessions
//!
//! # Architecture
//!
//! - **Session store**: in-memory sessions, move validation, seat claims
//! - **Fan-out hub**: per-session registry of live observers
//! - **Adapters**: REST, WebSocket and SSE over axum
//!
//! An adapter mutates through the [`SessionStore`], then hands the returned
//! snapshot to the [`FanoutHub`]. The two never call each other.
//!
//! # Example
//!
//! ```
//! use tiktaktoes_server::{FanoutHub, Mark, MoveRequest, SessionStore};
//!
//! let store = SessionStore::default();
//! let hub = FanoutHub::default();
//! let mut updates = hub.subscribe("unused");
//!
//! let session = store.create(Some(Mark::X));
//! let session = store.apply_move(session.id(), MoveRequest::new(4, Mark::X)).unwrap();
//! hub.broadcast(session.id(), &session);
//! assert!(updates.receiver.try_recv().is_err());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod hub;
pub mod session;
pub mod sse;
pub mod ws;

pub use app::{AppState, router};
pub use config::{ConfigError, ServerConfig};
pub use error::{ErrorKind, SessionError};
pub use hub::{ConnectionSink, DeliveryError, FanoutHub, Observer, ObserverId, Subscription};
pub use session::{MoveRequest, ResetPolicy, Session, SessionId, SessionStore};

pub use tiktaktoes_board::{Board, Mark, Position, Square};
