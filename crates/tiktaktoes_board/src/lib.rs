//! Tic-tac-toe board model.
//!
//! The fixed 3x3 grid, its marks and positions, and the terminal-state rules
//! (win-line scan and fullness check). Everything here is pure and total.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod position;
pub mod rules;
mod types;

pub use position::Position;
pub use rules::{is_draw, is_full, winner};
pub use types::{Board, InvalidMark, Mark, Square};
