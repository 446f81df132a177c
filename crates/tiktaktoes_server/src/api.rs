//! REST JSON adapter over the session store.

use crate::app::AppState;
use crate::error::{ErrorKind, SessionError};
use crate::session::{MoveRequest, Session, SessionId};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tiktaktoes_board::Mark;
use tracing::{info, instrument, warn};

/// Body naming a seat, used to create or join a game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeatBody {
    /// `"X"` or `"O"`.
    #[serde(default)]
    pub player: Option<String>,
}

/// Body of a move, as sent over REST and WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveBody {
    /// Target index (0-8).
    pub position: i64,
    /// `"X"` or `"O"`.
    pub player: String,
}

impl MoveBody {
    /// Parses the mark and builds a store request.
    pub fn into_request(self) -> Result<MoveRequest, SessionError> {
        let mark = self.player.parse::<Mark>()?;
        Ok(MoveRequest::new(self.position, mark))
    }
}

/// Error payload shared by every transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable error tag, one of the [`ErrorKind`] names.
    pub kind: String,
}

impl ErrorBody {
    /// Error for a payload that could not be decoded.
    pub fn invalid_request(detail: impl std::fmt::Display) -> Self {
        Self {
            error: format!("Invalid request body: {}", detail),
            kind: ErrorKind::InvalidRequest.to_string(),
        }
    }
}

impl From<&SessionError> for ErrorBody {
    fn from(err: &SessionError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }
    }
}

/// A [`SessionError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::SeatTaken | ErrorKind::SessionFull => StatusCode::CONFLICT,
        ErrorKind::InvalidRequest
        | ErrorKind::InvalidMark
        | ErrorKind::InvalidPosition
        | ErrorKind::GameOver
        | ErrorKind::PositionTaken
        | ErrorKind::NotYourTurn => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}

fn parse_seat(player: Option<&str>) -> Result<Option<Mark>, SessionError> {
    match player {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => Ok(Some(raw.parse::<Mark>()?)),
    }
}

/// `POST /api/game`: creates a session, seating the creator if named.
#[instrument(skip(state))]
pub async fn create_game(
    State(state): State<AppState>,
    body: Option<Json<SeatBody>>,
) -> Result<Json<Session>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let creator = parse_seat(body.player.as_deref())?;
    let session = state.store.create(creator);
    info!(session_id = %session.id(), "Game created over REST");
    Ok(Json(session))
}

/// `GET /api/game`: lists session ids.
#[instrument(skip(state))]
pub async fn list_games(State(state): State<AppState>) -> Json<Vec<SessionId>> {
    Json(state.store.list())
}

/// `GET /api/game/{id}`: current snapshot.
#[instrument(skip(state))]
pub async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<Session>, ApiError> {
    state
        .store
        .get(&id)
        .map(Json)
        .ok_or_else(|| SessionError::NotFound(id).into())
}

/// `POST /api/game/{id}`: applies a move and broadcasts the result.
#[instrument(skip(state))]
pub async fn make_move(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(body): Json<MoveBody>,
) -> Result<Json<Session>, ApiError> {
    let mv = body.into_request()?;
    let session = state.store.apply_move(&id, mv)?;
    state.publish(&session);
    Ok(Json(session))
}

/// `PUT /api/game/{id}`: resets the game and broadcasts the result.
#[instrument(skip(state))]
pub async fn reset_game(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<Session>, ApiError> {
    let session = state.store.reset(&id)?;
    state.publish(&session);
    Ok(Json(session))
}

/// `POST /api/game/{id}/join`: claims a seat and broadcasts the result.
#[instrument(skip(state))]
pub async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(body): Json<SeatBody>,
) -> Result<Json<Session>, ApiError> {
    // Unknown sessions report NotFound before the mark is looked at.
    let mark = match body.player.as_deref().unwrap_or_default().parse::<Mark>() {
        Ok(mark) => mark,
        Err(_) if state.store.get(&id).is_none() => return Err(SessionError::NotFound(id).into()),
        Err(e) => {
            warn!(error = %e, "Join rejected");
            return Err(SessionError::from(e).into());
        }
    };
    let session = state.store.join(&id, mark)?;
    state.publish(&session);
    Ok(Json(session))
}
