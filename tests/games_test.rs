//! Integration tests for the game endpoints.
//!
//! Each test starts its own in-process server on an ephemeral port.

mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn started_game(server: &common::TestServer) -> (String, String, String) {
    let (game_id, white) = server.create_game("Alice").await;
    let black = server.join_game(&game_id, "Bob").await;
    (game_id, white, black)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health() {
    let server = common::spawn().await;
    let resp = server.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_game() {
    let server = common::spawn().await;
    let resp = server
        .post("/api/games", json!({ "playerName": "  Alice " }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    let game = &body["game"];
    assert_eq!(game["id"], body["gameId"]);
    assert_eq!(game["white"]["id"], body["playerId"]);
    assert_eq!(game["white"]["name"], "Alice");
    assert_eq!(game["black"], Value::Null);
    assert_eq!(game["status"], "waiting");
    assert_eq!(game["result"], Value::Null);
    assert_eq!(
        game["fen"],
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
    );
    assert_eq!(game["moves"], json!([]));
}

#[tokio::test]
async fn test_create_game_requires_name() {
    let server = common::spawn().await;
    for body in [json!({}), json!({ "playerName": "   " })] {
        let resp = server.post("/api/games", body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["reason"], "validation");
    }
}

#[tokio::test]
async fn test_wrongly_typed_bodies_are_bad_requests() {
    let server = common::spawn().await;
    let resp = server.post("/api/games", json!({ "playerName": 5 })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "validation");

    let (game_id, white, _) = started_game(&server).await;
    let resp = server
        .post(
            &format!("/api/games/{game_id}/move"),
            json!({ "playerId": white, "from": 5, "to": "e4" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "validation");

    let resp = server
        .post(&format!("/api/games/{game_id}/join"), json!({ "playerName": ["Carol"] }))
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_game() {
    let server = common::spawn().await;
    let resp = server
        .get("/api/games/00000000-0000-0000-0000-000000000000")
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/api/games/not-a-uuid").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_join_game() {
    let server = common::spawn().await;
    let (game_id, _) = server.create_game("Alice").await;

    let resp = server
        .post(&format!("/api/games/{game_id}/join"), json!({ "playerName": "Bob" }))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["game"]["status"], "active");
    assert_eq!(body["game"]["black"]["id"], body["playerId"]);

    let resp = server
        .post(&format!("/api/games/{game_id}/join"), json!({ "playerName": "Carol" }))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "already_started");
}

#[tokio::test]
async fn test_move_before_join_is_not_active() {
    let server = common::spawn().await;
    let (game_id, white) = server.create_game("Alice").await;

    let resp = server.make_move(&game_id, &white, "e2", "e4").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "not_active");
    assert_eq!(body["game"]["status"], "waiting");
}

#[tokio::test]
async fn test_move_flow() {
    let server = common::spawn().await;
    let (game_id, white, black) = started_game(&server).await;

    let resp = server.make_move(&game_id, &white, "e2", "e4").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["move"]["moveNumber"], 1);
    assert_eq!(body["move"]["piece"], "pawn");
    assert_eq!(body["move"]["notation"], "e4");
    assert_eq!(body["status"], "active");
    assert_eq!(body["isCheck"], false);
    assert_eq!(body["isCheckmate"], false);

    // Out of turn
    let resp = server.make_move(&game_id, &white, "d2", "d4").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "not_your_turn");
    assert_eq!(body["game"]["moveCount"], 1);

    // Illegal
    let resp = server.make_move(&game_id, &black, "e7", "e4").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "illegal_move");
    assert_eq!(
        body["game"]["fen"],
        "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
    );
}

#[tokio::test]
async fn test_move_requires_fields() {
    let server = common::spawn().await;
    let (game_id, white, _) = started_game(&server).await;

    let resp = server
        .post(
            &format!("/api/games/{game_id}/move"),
            json!({ "playerId": white, "from": "e2" }),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fools_mate_and_pgn() {
    let server = common::spawn().await;
    let (game_id, white, black) = started_game(&server).await;

    for (player, from, to) in [
        (&white, "f2", "f3"),
        (&black, "e7", "e5"),
        (&white, "g2", "g4"),
    ] {
        let resp = server.make_move(&game_id, player, from, to).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = server.make_move(&game_id, &black, "d8", "h4").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["move"]["notation"], "Qh4#");
    assert_eq!(body["status"], "checkmate");
    assert_eq!(body["isCheck"], true);
    assert_eq!(body["isCheckmate"], true);
    assert_eq!(body["isDraw"], false);
    assert_eq!(body["game"]["result"], "black");
    assert!(body["game"]["endedAt"].is_string());

    let resp = server.make_move(&game_id, &white, "e2", "e4").await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["reason"], "not_active");

    let resp = server.get(&format!("/api/games/{game_id}/pgn")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pgn = resp.text().await.unwrap();
    assert!(pgn.contains("[White \"Alice\"]"));
    assert!(pgn.contains("[Black \"Bob\"]"));
    assert!(pgn.contains("[Result \"0-1\"]"));
    assert!(pgn.trim_end().ends_with("1. f3 e5 2. g4 Qh4# 0-1"));

    let profile: Value = server
        .get(&format!("/api/players/{black}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(profile["name"], "Bob");
    assert_eq!(profile["score"]["wins"], 1);
    assert_eq!(profile["score"]["points"], 3);
    assert_eq!(profile["gamesPlayed"], 1);
}

#[tokio::test]
async fn test_legal_targets() {
    let server = common::spawn().await;
    let (game_id, _, _) = started_game(&server).await;

    let body: Value = server
        .get(&format!("/api/games/{game_id}/moves?square=b1"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["targets"], json!(["a3", "c3"]));

    let resp = server.get(&format!("/api/games/{game_id}/moves")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
