use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use chess_core::GameStatus;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use super::parse_id;
use crate::error::AppError;
use crate::session::{Coordinator, GameSnapshot, SessionError};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    pub player_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBody {
    pub player_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub promotion: Option<String>,
}

#[derive(Deserialize)]
pub struct TargetsQuery {
    pub square: Option<String>,
}

fn seat_response(player_id: uuid::Uuid, game: GameSnapshot) -> Json<JsonValue> {
    Json(json!({
        "gameId": game.game.id,
        "playerId": player_id,
        "game": game,
    }))
}

/// POST /api/games
pub async fn create_game(
    Extension(coordinator): Extension<Coordinator>,
    payload: Result<Json<SeatRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, AppError> {
    let Json(req) = payload?;
    let seated = coordinator
        .create_game(req.player_name.as_deref().unwrap_or_default())
        .await?;
    Ok(seat_response(seated.player.id, seated.game))
}

/// GET /api/games/{game_id}
pub async fn get_game(
    Extension(coordinator): Extension<Coordinator>,
    Path(game_id): Path<String>,
) -> Result<Json<GameSnapshot>, AppError> {
    let game_id = parse_id(&game_id, "Game")?;
    Ok(Json(coordinator.get_game(game_id).await?))
}

/// POST /api/games/{game_id}/join
pub async fn join_game(
    Extension(coordinator): Extension<Coordinator>,
    Path(game_id): Path<String>,
    payload: Result<Json<SeatRequest>, JsonRejection>,
) -> Result<Json<JsonValue>, AppError> {
    let Json(req) = payload?;
    let game_id = parse_id(&game_id, "Game")?;
    let seated = coordinator
        .join_game(game_id, req.player_name.as_deref().unwrap_or_default())
        .await?;
    Ok(seat_response(seated.player.id, seated.game))
}

/// POST /api/games/{game_id}/move
pub async fn make_move(
    Extension(coordinator): Extension<Coordinator>,
    Path(game_id): Path<String>,
    payload: Result<Json<MoveBody>, JsonRejection>,
) -> Result<Json<JsonValue>, AppError> {
    let game_id = parse_id(&game_id, "Game")?;
    let Json(req) = payload?;
    let (Some(player_id), Some(from), Some(to)) = (req.player_id, req.from, req.to) else {
        return Err(AppError::BadRequest(
            "playerId, from, and to are required".into(),
        ));
    };
    let player_id = player_id
        .parse()
        .map_err(|_| AppError::BadRequest("playerId is not a valid id".into()))?;

    let played = match coordinator
        .request_move(game_id, player_id, &from, &to, req.promotion.as_deref())
        .await
    {
        Ok(played) => played,
        Err(source @ (SessionError::Store(_) | SessionError::NotFound(_))) => {
            return Err(source.into())
        }
        Err(source) => {
            let game = coordinator.get_game(game_id).await.ok().map(Box::new);
            return Err(AppError::MoveRejected { source, game });
        }
    };

    Ok(Json(json!({
        "success": true,
        "move": played.record,
        "game": played.game,
        "status": played.status,
        "isCheck": played.is_check,
        "isCheckmate": played.status == GameStatus::Checkmate,
        "isStalemate": played.status == GameStatus::Stalemate,
        "isDraw": matches!(played.status, GameStatus::Stalemate | GameStatus::Draw),
    })))
}

/// GET /api/games/{game_id}/moves?square=e2
pub async fn legal_moves(
    Extension(coordinator): Extension<Coordinator>,
    Path(game_id): Path<String>,
    Query(q): Query<TargetsQuery>,
) -> Result<Json<JsonValue>, AppError> {
    let game_id = parse_id(&game_id, "Game")?;
    let square = q
        .square
        .ok_or_else(|| AppError::BadRequest("square is required".into()))?;
    let targets = coordinator.legal_targets(game_id, &square).await?;
    Ok(Json(json!({ "square": square, "targets": targets })))
}

/// GET /api/games/{game_id}/pgn
pub async fn get_pgn(
    Extension(coordinator): Extension<Coordinator>,
    Path(game_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let game_id = parse_id(&game_id, "Game")?;
    let snapshot = coordinator.get_game(game_id).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/x-chess-pgn")],
        snapshot.game.pgn,
    ))
}
