//! Session coordinator: game lifecycle, turn ownership and settlement.

use std::sync::Arc;

use chess_core::adjudicator::{self, is_players_turn, Adjudication};
use chess_core::pgn::{self, Tags};
use chess_core::{GameStatus, IllegalMove, MoveRequest, Position, Square};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{
    Game, GameId, GameStore, LeaderboardEntry, MoveCommit, MoveRecord, Player, PlayerId,
    PlayerProfile, StoreError,
};
use crate::settlement::Settlement;

pub const MAX_NAME_CHARS: usize = 64;
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;
const PGN_SITE: &str = "chesslink";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Game already started or finished")]
    AlreadyStarted,

    #[error("Game already has two players")]
    SlotTaken,

    #[error("Game is not active")]
    NotActive,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Game is busy, try again")]
    Contended,

    #[error("Illegal move: {0}")]
    IllegalMove(#[from] IllegalMove),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// Machine-readable code telling a client whether to wait, retry or stop.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::AlreadyStarted => "already_started",
            Self::SlotTaken => "slot_taken",
            Self::NotActive => "not_active",
            Self::NotYourTurn => "not_your_turn",
            Self::Contended => "contended",
            Self::IllegalMove(_) => "illegal_move",
            Self::Store(_) => "internal",
        }
    }

    /// Rejections that leave the game untouched because of its current state.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted
                | Self::SlotTaken
                | Self::NotActive
                | Self::NotYourTurn
                | Self::Contended
        )
    }
}

/// A game together with its move history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(flatten)]
    pub game: Game,
    pub moves: Vec<MoveRecord>,
}

/// Result of creating or joining: the seat that was assigned.
#[derive(Debug, Clone)]
pub struct Seated {
    pub player: Player,
    pub game: GameSnapshot,
}

#[derive(Debug, Clone)]
pub struct PlayedMove {
    pub record: MoveRecord,
    pub is_check: bool,
    pub status: GameStatus,
    pub game: GameSnapshot,
}

#[derive(Clone)]
pub struct Coordinator {
    store: Arc<dyn GameStore>,
    commit_attempts: u32,
}

impl Coordinator {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self {
            store,
            commit_attempts: 3,
        }
    }

    pub fn with_commit_attempts(mut self, attempts: u32) -> Self {
        self.commit_attempts = attempts.max(1);
        self
    }

    /// Create a waiting game with `white_name` in the white seat.
    pub async fn create_game(&self, white_name: &str) -> Result<Seated, SessionError> {
        let name = validate_name(white_name)?;
        let white = Player::new(name);
        let now = Utc::now();
        let mut game = Game {
            id: Uuid::new_v4(),
            white: white.clone(),
            black: None,
            status: GameStatus::Waiting,
            result: None,
            fen: Position::default().to_fen(),
            pgn: String::new(),
            move_count: 0,
            created_at: now,
            updated_at: now,
            ended_at: None,
        };
        game.pgn = pgn::render(&tags(&game), &[], None);

        self.store.create_game(&game).await.inspect_err(log_store_error)?;
        tracing::info!(game_id = %game.id, player_id = %white.id, "game created");

        Ok(Seated {
            player: white,
            game: GameSnapshot {
                game,
                moves: Vec::new(),
            },
        })
    }

    /// Seat `black_name` and start the game.
    pub async fn join_game(
        &self,
        game_id: GameId,
        black_name: &str,
    ) -> Result<Seated, SessionError> {
        let name = validate_name(black_name)?;
        let mut game = self.load(game_id).await?;
        // A join that reads the game after another join committed sees it
        // active and gets AlreadyStarted. Joins that both read it waiting
        // race on the conditional claim, and the loser gets SlotTaken.
        if game.status != GameStatus::Waiting {
            return Err(SessionError::AlreadyStarted);
        }
        if game.black.is_some() {
            return Err(SessionError::SlotTaken);
        }

        let black = Player::new(name);
        game.black = Some(black.clone());
        let pgn = pgn::render(&tags(&game), &[], None);

        let claimed = self
            .store
            .claim_black_slot(game_id, &black, &pgn)
            .await
            .inspect_err(log_store_error)?;
        if !claimed {
            tracing::debug!(%game_id, "black seat claimed concurrently");
            return Err(SessionError::SlotTaken);
        }
        tracing::info!(%game_id, player_id = %black.id, "game joined");

        game.status = GameStatus::Active;
        game.pgn = pgn;
        game.updated_at = Utc::now();
        Ok(Seated {
            player: black,
            game: GameSnapshot {
                game,
                moves: Vec::new(),
            },
        })
    }

    /// Authorize and adjudicate a move, then commit it atomically.
    ///
    /// A commit that loses a race against another move on the same game is
    /// re-validated from fresh state, so a stale duplicate is rejected rather
    /// than applied twice.
    pub async fn request_move(
        &self,
        game_id: GameId,
        player_id: PlayerId,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<PlayedMove, SessionError> {
        for attempt in 1..=self.commit_attempts {
            let game = self.load(game_id).await?;
            if game.status != GameStatus::Active {
                return Err(SessionError::NotActive);
            }
            let color = game.color_of(player_id).ok_or(SessionError::NotYourTurn)?;
            if !is_players_turn(&game.fen, color).map_err(|e| corrupt(&game, e))? {
                return Err(SessionError::NotYourTurn);
            }

            let request = MoveRequest::parse(from, to, promotion)?;
            let moves = self.store.list_moves(game_id).await.inspect_err(log_store_error)?;
            let (position, earlier) = replay_positions(&game, &moves)?;

            let adjudication = adjudicator::apply_in_game(&position, &request, &earlier)
                .inspect_err(|e| tracing::debug!(%game_id, %player_id, "move rejected: {e}"))?;

            let commit = build_commit(&game, &moves, &adjudication);
            if self.store.commit_move(&commit).await.inspect_err(log_store_error)? {
                tracing::info!(
                    %game_id,
                    move_number = commit.record.move_number,
                    notation = %commit.record.notation,
                    status = %commit.status,
                    "move committed"
                );
                if let (Some(settlement), Some(result)) = (&commit.settlement, commit.result) {
                    tracing::info!(
                        %game_id,
                        %result,
                        white = %settlement.white_id,
                        black = %settlement.black_id,
                        "settlement applied"
                    );
                }
                let status = commit.status;
                let record = commit.record.clone();
                return Ok(PlayedMove {
                    record,
                    is_check: adjudication.is_check,
                    status,
                    game: committed_snapshot(game, moves, commit),
                });
            }
            tracing::warn!(%game_id, attempt, "move commit lost a race, re-validating");
        }
        Err(SessionError::Contended)
    }

    pub async fn get_game(&self, game_id: GameId) -> Result<GameSnapshot, SessionError> {
        let game = self.load(game_id).await?;
        let moves = self.store.list_moves(game_id).await.inspect_err(log_store_error)?;
        Ok(GameSnapshot { game, moves })
    }

    /// Squares the piece on `square` may move to. Empty unless the game is
    /// active and the piece belongs to the side to move.
    pub async fn legal_targets(
        &self,
        game_id: GameId,
        square: &str,
    ) -> Result<Vec<Square>, SessionError> {
        let square: Square = square
            .parse()
            .map_err(|_| SessionError::Validation(format!("Invalid square {square:?}")))?;
        let game = self.load(game_id).await?;
        if game.status != GameStatus::Active {
            return Ok(Vec::new());
        }
        let position = Position::from_fen(&game.fen).map_err(|e| corrupt(&game, e))?;
        Ok(adjudicator::legal_targets(&position, square))
    }

    pub async fn get_player(&self, player_id: PlayerId) -> Result<PlayerProfile, SessionError> {
        self.store
            .load_player(player_id)
            .await
            .inspect_err(log_store_error)?
            .ok_or(SessionError::NotFound("Player"))
    }

    pub async fn leaderboard(
        &self,
        limit: Option<i64>,
    ) -> Result<Vec<LeaderboardEntry>, SessionError> {
        let limit = limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT);
        self.store
            .leaderboard(limit)
            .await
            .inspect_err(log_store_error)
            .map_err(SessionError::from)
    }

    async fn load(&self, game_id: GameId) -> Result<Game, SessionError> {
        self.store
            .load_game(game_id)
            .await
            .inspect_err(log_store_error)?
            .ok_or(SessionError::NotFound("Game"))
    }
}

fn validate_name(name: &str) -> Result<String, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::Validation("Player name is required".into()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(SessionError::Validation(format!(
            "Player name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn tags(game: &Game) -> Tags {
    Tags {
        site: PGN_SITE.to_string(),
        date: game.created_at.format("%Y.%m.%d").to_string(),
        white: game.white.name.clone(),
        black: game
            .black
            .as_ref()
            .map_or_else(|| "?".to_string(), |b| b.name.clone()),
        ..Tags::default()
    }
}

/// Current position plus every earlier one, for repetition counting.
fn replay_positions(
    game: &Game,
    moves: &[MoveRecord],
) -> Result<(Position, Vec<Position>), SessionError> {
    let mut earlier = Vec::with_capacity(moves.len());
    earlier.push(Position::default());
    for record in moves {
        earlier.push(Position::from_fen(&record.fen).map_err(|e| corrupt(game, e))?);
    }
    let position = Position::from_fen(&game.fen).map_err(|e| corrupt(game, e))?;
    earlier.pop();
    Ok((position, earlier))
}

fn build_commit(game: &Game, moves: &[MoveRecord], adjudication: &Adjudication) -> MoveCommit {
    let now = Utc::now();
    let played = &adjudication.played;
    let record = MoveRecord {
        move_number: game.move_count + 1,
        from: played.from,
        to: played.to,
        piece: played.role,
        promotion: played.promotion,
        notation: adjudication.notation.clone(),
        fen: adjudication.position.to_fen(),
        created_at: now,
    };

    let mut sans: Vec<String> = moves.iter().map(|m| m.notation.clone()).collect();
    sans.push(record.notation.clone());
    let terminal = adjudication.status.is_terminal();

    MoveCommit {
        game_id: game.id,
        expected_move_count: game.move_count,
        status: adjudication.status,
        result: adjudication.outcome,
        pgn: pgn::render(&tags(game), &sans, adjudication.outcome),
        ended_at: terminal.then_some(now),
        settlement: adjudication
            .outcome
            .and_then(|o| Settlement::new(game.white.id, game.black.as_ref().map(|b| b.id), o)),
        record,
    }
}

/// The game as `commit` left it, without another store round trip.
fn committed_snapshot(
    mut game: Game,
    mut moves: Vec<MoveRecord>,
    commit: MoveCommit,
) -> GameSnapshot {
    game.fen = commit.record.fen.clone();
    game.pgn = commit.pgn;
    game.status = commit.status;
    game.result = commit.result;
    game.move_count += 1;
    game.updated_at = commit.record.created_at;
    game.ended_at = commit.ended_at;
    moves.push(commit.record);
    GameSnapshot { game, moves }
}

fn corrupt(game: &Game, err: impl std::fmt::Display) -> SessionError {
    tracing::error!(game_id = %game.id, "stored position unreadable: {err}");
    SessionError::Store(StoreError::Corrupt(format!("game {}: {err}", game.id)))
}

fn log_store_error(err: &StoreError) {
    tracing::error!("store error: {err}");
}
