pub mod games;
pub mod health;
pub mod leaderboard;
pub mod players;

use uuid::Uuid;

use crate::error::AppError;

/// Path ids that are not UUIDs cannot name an existing record.
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{what} not found")))
}
