use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Players are created per game seat
CREATE TABLE IF NOT EXISTS players (
    id          UUID PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Cumulative scores, one row per player
CREATE TABLE IF NOT EXISTS scores (
    player_id   UUID PRIMARY KEY REFERENCES players(id) ON DELETE CASCADE,
    wins        INTEGER NOT NULL DEFAULT 0,
    losses      INTEGER NOT NULL DEFAULT 0,
    draws       INTEGER NOT NULL DEFAULT 0,
    points      INTEGER NOT NULL DEFAULT 0,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_scores_ranking
    ON scores (points DESC, wins DESC);

-- Game sessions
CREATE TABLE IF NOT EXISTS games (
    id          UUID PRIMARY KEY,
    white_id    UUID NOT NULL REFERENCES players(id),
    black_id    UUID REFERENCES players(id),
    status      TEXT NOT NULL DEFAULT 'waiting',
    result      TEXT,
    fen         TEXT NOT NULL,
    pgn         TEXT NOT NULL DEFAULT '',
    move_count  INTEGER NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ended_at    TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_games_status
    ON games (status);

-- Move history (append-only)
CREATE TABLE IF NOT EXISTS moves (
    game_id     UUID NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    move_number INTEGER NOT NULL,
    from_square TEXT NOT NULL,
    to_square   TEXT NOT NULL,
    piece       TEXT NOT NULL,
    promotion   TEXT,
    notation    TEXT NOT NULL,
    fen         TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (game_id, move_number)
);
"#;
