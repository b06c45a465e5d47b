//! Persistent records and the store abstraction the coordinator writes through.

pub mod memory;
pub mod pool;
pub mod postgres;

use async_trait::async_trait;
use chess_core::{GameStatus, Outcome, Role, Square};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::settlement::{ScoreDelta, Settlement};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type GameId = Uuid;
pub type PlayerId = Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Cumulative results. Only ever incremented by a settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub points: i32,
}

impl Score {
    pub fn games_played(&self) -> i32 {
        self.wins + self.losses + self.draws
    }

    pub fn add(&mut self, delta: ScoreDelta) {
        self.wins += delta.wins;
        self.losses += delta.losses;
        self.draws += delta.draws;
        self.points += delta.points;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProfile {
    #[serde(flatten)]
    pub player: Player,
    pub score: Score,
    pub games_played: i32,
}

impl PlayerProfile {
    pub fn new(player: Player, score: Score) -> Self {
        Self {
            games_played: score.games_played(),
            player,
            score,
        }
    }
}

/// One game session. The side to move lives only in `fen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub white: Player,
    pub black: Option<Player>,
    pub status: GameStatus,
    pub result: Option<Outcome>,
    pub fen: String,
    pub pgn: String,
    /// Number of committed moves; doubles as the row version.
    pub move_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Game {
    /// Color slot held by `player_id`, if any.
    pub fn color_of(&self, player_id: PlayerId) -> Option<chess_core::Color> {
        if self.white.id == player_id {
            Some(chess_core::Color::White)
        } else if self.black.as_ref().is_some_and(|b| b.id == player_id) {
            Some(chess_core::Color::Black)
        } else {
            None
        }
    }
}

/// Append-only history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    /// 1-based, contiguous per game.
    pub move_number: i32,
    pub from: Square,
    pub to: Square,
    pub piece: Role,
    pub promotion: Option<Role>,
    pub notation: String,
    /// Position after the move.
    pub fen: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub player_name: String,
    pub wins: i32,
    pub losses: i32,
    pub draws: i32,
    pub points: i32,
    pub games_played: i32,
}

impl LeaderboardEntry {
    pub fn new(rank: usize, player: &Player, score: Score) -> Self {
        Self {
            rank,
            player_id: player.id,
            player_name: player.name.clone(),
            wins: score.wins,
            losses: score.losses,
            draws: score.draws,
            points: score.points,
            games_played: score.games_played(),
        }
    }
}

/// Everything written when a move is accepted. Applied as one unit, and only
/// while the game's `move_count` still equals `expected_move_count`.
#[derive(Debug, Clone)]
pub struct MoveCommit {
    pub game_id: GameId,
    pub expected_move_count: i32,
    pub record: MoveRecord,
    pub status: GameStatus,
    pub result: Option<Outcome>,
    pub pgn: String,
    pub ended_at: Option<DateTime<Utc>>,
    pub settlement: Option<Settlement>,
}

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Insert the white player, their zeroed score and the game.
    async fn create_game(&self, game: &Game) -> Result<(), StoreError>;

    /// Seat `black` if the game is still waiting with an empty black slot,
    /// moving it to `active`. Returns `false` (and writes nothing) otherwise.
    async fn claim_black_slot(
        &self,
        game_id: GameId,
        black: &Player,
        pgn: &str,
    ) -> Result<bool, StoreError>;

    async fn load_game(&self, game_id: GameId) -> Result<Option<Game>, StoreError>;

    /// Move records in move-number order.
    async fn list_moves(&self, game_id: GameId) -> Result<Vec<MoveRecord>, StoreError>;

    /// Append the record, update the game and apply any settlement. Returns
    /// `false` without writing if another commit got there first.
    async fn commit_move(&self, commit: &MoveCommit) -> Result<bool, StoreError>;

    async fn load_player(&self, player_id: PlayerId) -> Result<Option<PlayerProfile>, StoreError>;

    /// Players ordered by points, then wins, then creation.
    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, StoreError>;
}
