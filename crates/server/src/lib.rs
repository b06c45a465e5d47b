pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod session;
pub mod settlement;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db::{GameStore, MemoryStore, PgStore};
use crate::session::Coordinator;

/// Build the HTTP router around a coordinator.
pub fn router(coordinator: Coordinator) -> Router {
    // Games are shared by link, so any origin may play.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Games
        .route("/api/games", post(routes::games::create_game))
        .route("/api/games/{game_id}", get(routes::games::get_game))
        .route("/api/games/{game_id}/join", post(routes::games::join_game))
        .route("/api/games/{game_id}/move", post(routes::games::make_move))
        .route("/api/games/{game_id}/moves", get(routes::games::legal_moves))
        .route("/api/games/{game_id}/pgn", get(routes::games::get_pgn))
        // Players
        .route("/api/players/{player_id}", get(routes::players::get_player))
        .route("/api/leaderboard", get(routes::leaderboard::get_leaderboard))
        .layer(Extension(coordinator))
        .layer(cors)
}

/// Postgres when `DATABASE_URL` is set, otherwise an in-memory store.
pub async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn GameStore>> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set - games are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    };

    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(url, config.db_max_connections).await?;

    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool).await?;

    Ok(Arc::new(PgStore::new(pool)))
}
