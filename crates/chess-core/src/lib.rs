//! Self-contained chess rules engine and move adjudicator.

pub mod adjudicator;
pub mod movegen;
pub mod pgn;
pub mod position;
pub mod rules;
pub mod san;
pub mod types;

pub use adjudicator::{Adjudication, GameStatus, IllegalMove, MoveRequest, Outcome};
pub use movegen::{Move, MoveKind};
pub use position::{FenError, Position, STARTING_FEN};
pub use types::{Color, Piece, Role, Square};
