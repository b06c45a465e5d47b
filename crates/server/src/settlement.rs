//! Score settlement for finished games.

use chess_core::Outcome;

use crate::db::PlayerId;

pub const WIN_POINTS: i32 = 3;
pub const DRAW_POINTS: i32 = 1;
pub const LOSS_POINTS: i32 = 0;

/// Increment applied to one player's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreDelta {
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub points: i32,
}

impl ScoreDelta {
    pub const WIN: Self = Self {
        wins: 1,
        losses: 0,
        draws: 0,
        points: WIN_POINTS,
    };
    pub const LOSS: Self = Self {
        wins: 0,
        losses: 1,
        draws: 0,
        points: LOSS_POINTS,
    };
    pub const DRAW: Self = Self {
        wins: 0,
        losses: 0,
        draws: 1,
        points: DRAW_POINTS,
    };
}

/// `(white, black)` increments for an outcome.
pub fn deltas(outcome: Outcome) -> (ScoreDelta, ScoreDelta) {
    match outcome {
        Outcome::White => (ScoreDelta::WIN, ScoreDelta::LOSS),
        Outcome::Black => (ScoreDelta::LOSS, ScoreDelta::WIN),
        Outcome::Draw => (ScoreDelta::DRAW, ScoreDelta::DRAW),
    }
}

/// Score updates for both seats of one finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub white_id: PlayerId,
    pub black_id: PlayerId,
    pub white: ScoreDelta,
    pub black: ScoreDelta,
}

impl Settlement {
    /// `None` while the black seat is empty; such a game cannot be settled.
    pub fn new(white_id: PlayerId, black_id: Option<PlayerId>, outcome: Outcome) -> Option<Self> {
        let black_id = black_id?;
        let (white, black) = deltas(outcome);
        Some(Self {
            white_id,
            black_id,
            white,
            black,
        })
    }
}
