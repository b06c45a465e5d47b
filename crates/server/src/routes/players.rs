use axum::{extract::Path, Extension, Json};

use super::parse_id;
use crate::db::PlayerProfile;
use crate::error::AppError;
use crate::session::Coordinator;

/// GET /api/players/{player_id}
pub async fn get_player(
    Extension(coordinator): Extension<Coordinator>,
    Path(player_id): Path<String>,
) -> Result<Json<PlayerProfile>, AppError> {
    let player_id = parse_id(&player_id, "Player")?;
    Ok(Json(coordinator.get_player(player_id).await?))
}
