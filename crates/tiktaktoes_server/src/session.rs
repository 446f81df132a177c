//! Session state and the in-memory session store.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tiktaktoes_board::{Board, Mark, Position, Square, is_full, winner};
use tracing::{debug, info, instrument, warn};

/// Unique identifier for a game session.
pub type SessionId = String;

/// Length of generated session identifiers, in hex characters.
const SESSION_ID_LEN: usize = 12;

/// Whether claimed seats survive a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Reset clears the game but both players stay seated.
    #[default]
    KeepSeats,
    /// Reset also frees both seats.
    ClearSeats,
}

/// A move request: a mark placed at a raw board index.
///
/// The index stays signed and unchecked until the store validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Target index (valid range 0-8).
    pub position: i64,
    /// Mark the caller claims to play.
    #[serde(rename = "player")]
    pub mark: Mark,
}

impl MoveRequest {
    /// Creates a new move request.
    pub fn new(position: i64, mark: Mark) -> Self {
        Self { position, mark }
    }
}

/// Snapshot of one game session.
///
/// This is both the store's internal record and the value handed to
/// observers, so its serialized form is the wire contract. Only the
/// [`SessionStore`] mutates it; a snapshot held by a caller is read-only:
///
/// ```compile_fail
/// use tiktaktoes_server::{ResetPolicy, SessionStore};
///
/// let mut snapshot = SessionStore::default().create(None);
/// snapshot.reset(ResetPolicy::ClearSeats);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: SessionId,
    board: Board,
    current_turn: Mark,
    winner: Option<Mark>,
    #[serde(rename = "isOver")]
    terminal: bool,
    #[serde(rename = "isDraw")]
    draw: bool,
    #[serde(rename = "playerXJoined")]
    x_seated: bool,
    #[serde(rename = "playerOJoined")]
    o_seated: bool,
}

impl Session {
    /// Creates a fresh session with an empty board and X to move.
    #[instrument]
    pub fn new(id: SessionId) -> Self {
        debug!(session_id = %id, "Initializing session state");
        Self {
            id,
            board: Board::new(),
            current_turn: Mark::X,
            winner: None,
            terminal: false,
            draw: false,
            x_seated: false,
            o_seated: false,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Mark to play next (frozen once terminal).
    pub fn current_turn(&self) -> Mark {
        self.current_turn
    }

    /// Winning mark, if the game was won.
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    /// True once the game is won or drawn.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// True if the game ended in a draw.
    pub fn is_draw(&self) -> bool {
        self.draw
    }

    /// Whether the given mark's seat is claimed.
    pub fn is_seated(&self, mark: Mark) -> bool {
        match mark {
            Mark::X => self.x_seated,
            Mark::O => self.o_seated,
        }
    }

    fn seat_mut(&mut self, mark: Mark) -> &mut bool {
        match mark {
            Mark::X => &mut self.x_seated,
            Mark::O => &mut self.o_seated,
        }
    }

    /// Claims a seat.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn claim_seat(&mut self, mark: Mark) -> Result<(), SessionError> {
        if self.is_seated(mark) {
            warn!(%mark, "Seat already taken");
            return Err(SessionError::SeatTaken(mark));
        }
        if self.x_seated && self.o_seated {
            warn!(%mark, "Session already has 2 players");
            return Err(SessionError::SessionFull);
        }
        *self.seat_mut(mark) = true;
        info!(%mark, "Seat claimed");
        Ok(())
    }

    /// Validates and applies a move.
    ///
    /// Nothing is written unless every check passes.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn apply_move(&mut self, mv: MoveRequest) -> Result<(), SessionError> {
        if self.terminal {
            return Err(SessionError::GameOver);
        }
        let pos =
            Position::from_raw(mv.position).ok_or(SessionError::InvalidPosition(mv.position))?;
        if !self.board.is_empty(pos) {
            return Err(SessionError::PositionTaken(pos));
        }
        if mv.mark != self.current_turn {
            return Err(SessionError::NotYourTurn(self.current_turn));
        }

        self.board.set(pos, Square::Occupied(mv.mark));

        if let Some(mark) = winner(&self.board) {
            self.winner = Some(mark);
            self.terminal = true;
            info!(winner = %mark, "Game won");
        } else if is_full(&self.board) {
            self.draw = true;
            self.terminal = true;
            info!("Game drawn");
        } else {
            self.current_turn = self.current_turn.opponent();
        }
        Ok(())
    }

    /// Restores creation defaults, keeping the id and, per policy, the seats.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn reset(&mut self, policy: ResetPolicy) {
        let (x_seated, o_seated) = match policy {
            ResetPolicy::KeepSeats => (self.x_seated, self.o_seated),
            ResetPolicy::ClearSeats => (false, false),
        };
        *self = Self {
            x_seated,
            o_seated,
            ..Self::new(std::mem::take(&mut self.id))
        };
    }
}

/// Manages all game sessions.
///
/// Cloning yields another handle to the same sessions. One store-wide lock
/// serializes every mutation; reads share it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    policy: ResetPolicy,
}

impl SessionStore {
    /// Creates an empty store.
    #[instrument]
    pub fn new(policy: ResetPolicy) -> Self {
        info!(?policy, "Creating session store");
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// Seat policy applied on reset.
    pub fn policy(&self) -> ResetPolicy {
        self.policy
    }

    // A panic under the lock cannot leave a half-applied move, since every
    // mutation validates before writing. Recover the guard instead of
    // propagating the poison.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a session, optionally seating its creator.
    #[instrument(skip(self))]
    pub fn create(&self, creator: Option<Mark>) -> Session {
        let mut sessions = self.write();

        let id = loop {
            let candidate = generate_id();
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
            debug!(session_id = %candidate, "Generated id collided, retrying");
        };

        let mut session = Session::new(id.clone());
        if let Some(mark) = creator {
            *session.seat_mut(mark) = true;
        }
        sessions.insert(id.clone(), session.clone());

        info!(session_id = %id, ?creator, "Created new session");
        session
    }

    /// Claims a seat in an existing session.
    #[instrument(skip(self))]
    pub fn join(&self, session_id: &str, mark: Mark) -> Result<Session, SessionError> {
        let mut sessions = self.write();
        let session = sessions.get_mut(session_id).ok_or_else(|| {
            debug!("Session not found");
            SessionError::NotFound(session_id.to_string())
        })?;

        session.claim_seat(mark)?;
        Ok(session.clone())
    }

    /// Gets a snapshot of a session.
    #[instrument(skip(self))]
    pub fn get(&self, session_id: &str) -> Option<Session> {
        let session = self.read().get(session_id).cloned();
        if session.is_none() {
            debug!("Session not found");
        }
        session
    }

    /// Validates and applies a move under the store lock.
    #[instrument(skip(self), fields(position = mv.position, mark = %mv.mark))]
    pub fn apply_move(&self, session_id: &str, mv: MoveRequest) -> Result<Session, SessionError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        session.apply_move(mv).map_err(|e| {
            warn!(error = %e, "Move rejected");
            e
        })?;

        info!(
            turn = %session.current_turn(),
            terminal = session.is_terminal(),
            "Move accepted"
        );
        debug!("Board after move:\n{}", session.board().display());
        Ok(session.clone())
    }

    /// Resets a session's game state.
    #[instrument(skip(self))]
    pub fn reset(&self, session_id: &str) -> Result<Session, SessionError> {
        let mut sessions = self.write();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        session.reset(self.policy);
        info!(policy = ?self.policy, "Session reset");
        Ok(session.clone())
    }

    /// Lists all session ids, sorted.
    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        debug!(count = ids.len(), "Listed sessions");
        ids
    }

    /// Number of sessions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no session exists.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(ResetPolicy::default())
    }
}

fn generate_id() -> SessionId {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(SESSION_ID_LEN);
    id
}
