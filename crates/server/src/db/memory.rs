use std::collections::HashMap;

use async_trait::async_trait;
use chess_core::GameStatus;
use parking_lot::Mutex;

use super::{
    Game, GameId, GameStore, LeaderboardEntry, MoveCommit, MoveRecord, Player, PlayerId,
    PlayerProfile, Score, StoreError,
};

/// In-memory game store for tests and database-less runs.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Players in creation order.
    players: Vec<(Player, Score)>,
    player_index: HashMap<PlayerId, usize>,
    games: HashMap<GameId, Game>,
    moves: HashMap<GameId, Vec<MoveRecord>>,
}

impl Inner {
    fn add_player(&mut self, player: &Player) {
        self.player_index.insert(player.id, self.players.len());
        self.players.push((player.clone(), Score::default()));
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn create_game(&self, game: &Game) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.add_player(&game.white);
        inner.games.insert(game.id, game.clone());
        inner.moves.insert(game.id, Vec::new());
        Ok(())
    }

    async fn claim_black_slot(
        &self,
        game_id: GameId,
        black: &Player,
        pgn: &str,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        let Some(game) = inner.games.get_mut(&game_id) else {
            return Ok(false);
        };
        if game.status != GameStatus::Waiting || game.black.is_some() {
            return Ok(false);
        }
        game.black = Some(black.clone());
        game.status = GameStatus::Active;
        game.pgn = pgn.to_string();
        game.updated_at = chrono::Utc::now();
        inner.add_player(black);
        Ok(true)
    }

    async fn load_game(&self, game_id: GameId) -> Result<Option<Game>, StoreError> {
        Ok(self.inner.lock().games.get(&game_id).cloned())
    }

    async fn list_moves(&self, game_id: GameId) -> Result<Vec<MoveRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .moves
            .get(&game_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn commit_move(&self, commit: &MoveCommit) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        match inner.games.get(&commit.game_id) {
            Some(game)
                if game.move_count == commit.expected_move_count
                    && game.status == GameStatus::Active => {}
            _ => return Ok(false),
        }

        // Resolve both score rows before touching anything.
        let settlement = match &commit.settlement {
            Some(s) => {
                let mut rows = Vec::with_capacity(2);
                for (player_id, delta) in [(s.white_id, s.white), (s.black_id, s.black)] {
                    let index = *inner
                        .player_index
                        .get(&player_id)
                        .ok_or_else(|| StoreError::Corrupt(format!("no score for {player_id}")))?;
                    rows.push((index, delta));
                }
                rows
            }
            None => Vec::new(),
        };

        if let Some(game) = inner.games.get_mut(&commit.game_id) {
            game.fen = commit.record.fen.clone();
            game.pgn = commit.pgn.clone();
            game.status = commit.status;
            game.result = commit.result;
            game.move_count += 1;
            game.updated_at = commit.record.created_at;
            game.ended_at = commit.ended_at;
        }

        inner
            .moves
            .entry(commit.game_id)
            .or_default()
            .push(commit.record.clone());

        for (index, delta) in settlement {
            if let Some((_, score)) = inner.players.get_mut(index) {
                score.add(delta);
            }
        }
        Ok(true)
    }

    async fn load_player(&self, player_id: PlayerId) -> Result<Option<PlayerProfile>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .player_index
            .get(&player_id)
            .and_then(|&i| inner.players.get(i))
            .map(|(player, score)| PlayerProfile::new(player.clone(), *score)))
    }

    async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let inner = self.inner.lock();
        let mut ranked: Vec<&(Player, Score)> = inner.players.iter().collect();
        // Stable sort keeps creation order among ties.
        ranked.sort_by(|a, b| {
            b.1.points
                .cmp(&a.1.points)
                .then_with(|| b.1.wins.cmp(&a.1.wins))
        });
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(ranked
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, (player, score))| LeaderboardEntry::new(i + 1, player, *score))
            .collect())
    }
}
