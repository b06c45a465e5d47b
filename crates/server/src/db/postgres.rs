use async_trait::async_trait;
use chess_core::{GameStatus, Outcome, Role, Square};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{
    Game, GameId, GameStore, LeaderboardEntry, MoveCommit, MoveRecord, Player, PlayerId,
    PlayerProfile, Score, StoreError,
};
use crate::settlement::ScoreDelta;

const GAME_SELECT: &str = "SELECT g.id, g.status, g.result, g.fen, g.pgn, g.move_count, \
     g.created_at, g.updated_at, g.ended_at, \
     w.id AS white_id, w.name AS white_name, w.created_at AS white_created_at, \
     b.id AS black_id, b.name AS black_name, b.created_at AS black_created_at \
     FROM games g \
     JOIN players w ON w.id = g.white_id \
     LEFT JOIN players b ON b.id = g.black_id";

/// Postgres-backed store. Multi-row writes run in one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: GameId,
    status: String,
    result: Option<String>,
    fen: String,
    pgn: String,
    move_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    white_id: PlayerId,
    white_name: String,
    white_created_at: DateTime<Utc>,
    black_id: Option<PlayerId>,
    black_name: Option<String>,
    black_created_at: Option<DateTime<Utc>>,
}

impl TryFrom<GameRow> for Game {
    type Error = StoreError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let status: GameStatus = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("game {}: {e}", row.id)))?;
        let result = row
            .result
            .as_deref()
            .map(str::parse::<Outcome>)
            .transpose()
            .map_err(|e| StoreError::Corrupt(format!("game {}: {e}", row.id)))?;
        let black = match (row.black_id, row.black_name, row.black_created_at) {
            (Some(id), Some(name), Some(created_at)) => Some(Player {
                id,
                name,
                created_at,
            }),
            _ => None,
        };
        Ok(Self {
            id: row.id,
            white: Player {
                id: row.white_id,
                name: row.white_name,
                created_at: row.white_created_at,
            },
            black,
            status,
            result,
            fen: row.fen,
            pgn: row.pgn,
            move_count: row.move_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
            ended_at: row.ended_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MoveRow {
    move_number: i32,
    from_square: String,
    to_square: String,
    piece: String,
    promotion: Option<String>,
    notation: String,
    fen: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MoveRow> for MoveRecord {
    type Error = StoreError;

    fn try_from(row: MoveRow) -> Result<Self, Self::Error> {
        let corrupt = |e: chess_core::types::ParseError| {
            StoreError::Corrupt(format!("move {}: {e}", row.move_number))
        };
        Ok(Self {
            move_number: row.move_number,
            from: row.from_square.parse::<Square>().map_err(corrupt)?,
            to: row.to_square.parse::<Square>().map_err(corrupt)?,
            piece: row.piece.parse::<Role>().map_err(corrupt)?,
            promotion: row
                .promotion
                .as_deref()
                .map(str::parse::<Role>)
                .transpose()
                .map_err(corrupt)?,
            notation: row.notation,
            fen: row.fen,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PlayerScoreRow {
    id: PlayerId,
    name: String,
    created_at: DateTime<Utc>,
    #[sqlx(flatten)]
    score: Score,
}

impl PlayerScoreRow {
    fn player(&self) -> Player {
        Player {
            id: self.id,
            name: self.name.clone(),
            created_at: self.created_at,
        }
    }
}

async fn insert_player(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player: &Player,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO players (id, name, created_at) VALUES ($1, $2, $3)")
        .bind(player.id)
        .bind(&player.name)
        .bind(player.created_at)
        .execute(&mut **tx)
        .await?;

    sqlx::query("INSERT INTO scores (player_id) VALUES ($1)")
        .bind(player.id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn add_score(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    player_id: PlayerId,
    delta: ScoreDelta,
) -> Result<(), StoreError> {
    let updated = sqlx::query(
        "UPDATE scores SET wins = wins + $2, losses = losses + $3, draws = draws + $4, \
         points = points + $5, updated_at = NOW() WHERE player_id = $1",
    )
    .bind(player_id)
    .bind(delta.wins)
    .bind(delta.losses)
    .bind(delta.draws)
    .bind(delta.points)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(StoreError::Corrupt(format!("no score for {player_id}")));
    }
    Ok(())
}

#[async_trait]
impl GameStore for PgStore {
    async fn create_game(&self, game: &Game) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        insert_player(&mut tx, &game.white).await?;

        sqlx::query(
            "INSERT INTO games \
             (id, white_id, status, fen, pgn, move_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(game.id)
        .bind(game.white.id)
        .bind(game.status.as_str())
        .bind(&game.fen)
        .bind(&game.pgn)
        .bind(game.move_count)
        .bind(game.created_at)
        .bind(game.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn claim_black_slot(
        &self,
        game_id: GameId,
        black: &Player,
        pgn: &str,
    ) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        insert_player(&mut tx, black).await?;

        let claimed = sqlx::query(
            "UPDATE games SET black_id = $2, status = 'active', pgn = $3, updated_at = NOW() \
             WHERE id = $1 AND black_id IS NULL AND status = 'waiting'",
        )
        .bind(game_id)
        .bind(black.id)
        .bind(pgn)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn load_game(&self, game_id: GameId) -> Result<Option<Game>, StoreError> {
        let row: Option<GameRow> = sqlx::query_as(&format!("{GAME_SELECT} WHERE g.id = $1"))
            .bind(game_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Game::try_from).transpose()
    }

    async fn list_moves(&self, game_id: GameId) -> Result<Vec<MoveRecord>, StoreError> {
        let rows: Vec<MoveRow> = sqlx::query_as(
            "SELECT move_number, from_square, to_square, piece, promotion, notation, fen, \
             created_at FROM moves WHERE game_id = $1 ORDER BY move_number",
        )
        .bind(game_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(MoveRecord::try_from).collect()
    }

    async fn commit_move(&self, commit: &MoveCommit) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let record = &commit.record;

        let updated = sqlx::query(
            "UPDATE games SET fen = $2, pgn = $3, status = $4, result = $5, \
             move_count = move_count + 1, updated_at = $6, ended_at = $7 \
             WHERE id = $1 AND move_count = $8 AND status = 'active'",
        )
        .bind(commit.game_id)
        .bind(&record.fen)
        .bind(&commit.pgn)
        .bind(commit.status.as_str())
        .bind(commit.result.map(Outcome::as_str))
        .bind(record.created_at)
        .bind(commit.ended_at)
        .bind(commit.expected_move_count)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO moves (game_id, move_number, from_square, to_square, piece, \
             promotion, notation, fen, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(commit.game_id)
        .bind(record.move_number)
        .bind(record.from.to_string())
        .bind(record.to.to_string())
        .bind(record.piece.to_string())
        .bind(record.promotion.map(|r| r.to_string()))
        .bind(&record.notation)
        .bind(&record.fen)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(settlement) = &commit.settlement {
            add_score(&mut tx, settlement.white_id, settlement.white).await?;
            add_score(&mut tx, settlement.black_id, settlement.black).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn load_player(&self, player_id: PlayerId) -> Result<Option<PlayerProfile>, StoreError> {
        let row: Option<PlayerScoreRow> = sqlx::query_as(
            "SELECT p.id, p.name, p.created_at, s.wins, s.losses, s.draws, s.points \
             FROM players p JOIN scores s ON s.player_id = p.id WHERE p.id = $1",
        )
        .bind(player_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| PlayerProfile::new(r.player(), r.score)))
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let rows: Vec<PlayerScoreRow> = sqlx::query_as(
            "SELECT p.id, p.name, p.created_at, s.wins, s.losses, s.draws, s.points \
             FROM scores s JOIN players p ON p.id = s.player_id \
             ORDER BY s.points DESC, s.wins DESC, p.created_at ASC, p.id ASC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .enumerate()
            .map(|(i, r)| LeaderboardEntry::new(i + 1, &r.player(), r.score))
            .collect())
    }
}
