use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use server::db::MemoryStore;
use server::session::Coordinator;

/// A server running in-process on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
}

impl TestServer {
    /// Build a URL for an API endpoint.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send request")
    }

    /// Create a game and return `(game_id, white_player_id)`.
    pub async fn create_game(&self, name: &str) -> (String, String) {
        let body: Value = self
            .post("/api/games", json!({ "playerName": name }))
            .await
            .json()
            .await
            .expect("Invalid create response");
        (
            body["gameId"].as_str().unwrap().to_string(),
            body["playerId"].as_str().unwrap().to_string(),
        )
    }

    /// Join a game and return the black player id.
    pub async fn join_game(&self, game_id: &str, name: &str) -> String {
        let body: Value = self
            .post(&format!("/api/games/{game_id}/join"), json!({ "playerName": name }))
            .await
            .json()
            .await
            .expect("Invalid join response");
        body["playerId"].as_str().unwrap().to_string()
    }

    pub async fn make_move(
        &self,
        game_id: &str,
        player_id: &str,
        from: &str,
        to: &str,
    ) -> reqwest::Response {
        self.post(
            &format!("/api/games/{game_id}/move"),
            json!({ "playerId": player_id, "from": from, "to": to }),
        )
        .await
    }
}

/// Start the router on `127.0.0.1:0` backed by an in-memory store.
pub async fn spawn() -> TestServer {
    let coordinator = Coordinator::new(Arc::new(MemoryStore::new()));
    let app = server::router(coordinator);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server error");
    });

    TestServer {
        base_url: format!("http://{addr}"),
        client: Client::new(),
    }
}
