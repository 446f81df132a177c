//! Draw detection logic for tic-tac-toe.

use crate::{Board, Square};
use tracing::instrument;

/// Checks if the board is full (all squares occupied).
///
/// A full board with no winner is a draw.
#[instrument]
pub fn is_full(board: &Board) -> bool {
    board.squares().iter().all(|s| *s != Square::Empty)
}

/// Full board and nobody owns a line.
#[instrument]
pub fn is_draw(board: &Board) -> bool {
    is_full(board) && super::win::winner(board).is_none()
}
