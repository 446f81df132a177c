//! Session error types.

use crate::session::SessionId;
use derive_more::Display;
use tiktaktoes_board::{InvalidMark, Mark, Position};

/// Reason a session operation was rejected.
///
/// Every variant is a caller error. Nothing here is transient, so nothing is
/// ever retried by the store.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SessionError {
    /// No session has this identifier.
    #[display("Session {} not found", _0)]
    NotFound(SessionId),

    /// The mark names neither X nor O.
    #[display("Invalid player {:?}, must be X or O", _0)]
    InvalidMark(String),

    /// The position is outside 0-8.
    #[display("Invalid move: position {} is outside 0-8", _0)]
    InvalidPosition(i64),

    /// That mark's seat is already claimed.
    #[display("Player slot {} is already taken", _0)]
    SeatTaken(Mark),

    /// Both seats are claimed.
    #[display("Game is full, already has two players")]
    SessionFull,

    /// The session reached a win or draw.
    #[display("Game is over")]
    GameOver,

    /// The target square is occupied.
    #[display("Position {} is already taken", _0)]
    PositionTaken(Position),

    /// The move's mark is not the one to play.
    #[display("Not your turn, waiting for {}", _0)]
    NotYourTurn(Mark),
}

impl std::error::Error for SessionError {}

/// Stable tag carried by every error frame and error body.
///
/// One tag per [`SessionError`] variant, plus [`ErrorKind::InvalidRequest`]
/// for payloads the transports cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
pub enum ErrorKind {
    /// Payload was not a well-formed request. Never produced by the store.
    InvalidRequest,
    /// See [`SessionError::NotFound`].
    NotFound,
    /// See [`SessionError::InvalidMark`].
    InvalidMark,
    /// See [`SessionError::InvalidPosition`].
    InvalidPosition,
    /// See [`SessionError::SeatTaken`].
    SeatTaken,
    /// See [`SessionError::SessionFull`].
    SessionFull,
    /// See [`SessionError::GameOver`].
    GameOver,
    /// See [`SessionError::PositionTaken`].
    PositionTaken,
    /// See [`SessionError::NotYourTurn`].
    NotYourTurn,
}

impl SessionError {
    /// Returns the variant tag.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound(_) => ErrorKind::NotFound,
            SessionError::InvalidMark(_) => ErrorKind::InvalidMark,
            SessionError::InvalidPosition(_) => ErrorKind::InvalidPosition,
            SessionError::SeatTaken(_) => ErrorKind::SeatTaken,
            SessionError::SessionFull => ErrorKind::SessionFull,
            SessionError::GameOver => ErrorKind::GameOver,
            SessionError::PositionTaken(_) => ErrorKind::PositionTaken,
            SessionError::NotYourTurn(_) => ErrorKind::NotYourTurn,
        }
    }
}

impl From<InvalidMark> for SessionError {
    fn from(err: InvalidMark) -> Self {
        SessionError::InvalidMark(err.value)
    }
}
