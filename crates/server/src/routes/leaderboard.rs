use axum::{extract::Query, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use crate::error::AppError;
use crate::session::Coordinator;

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// GET /api/leaderboard
pub async fn get_leaderboard(
    Extension(coordinator): Extension<Coordinator>,
    Query(q): Query<LeaderboardQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let leaderboard = coordinator.leaderboard(q.limit).await?;
    Ok(Json(json!({ "leaderboard": leaderboard })))
}
