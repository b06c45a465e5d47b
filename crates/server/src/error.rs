use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::db::StoreError;
use crate::session::{GameSnapshot, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// A move the coordinator refused, reported with the unchanged game.
    #[error("{source}")]
    MoveRejected {
        source: SessionError,
        game: Option<Box<GameSnapshot>>,
    },
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        Self::Session(SessionError::Store(e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

fn session_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::Validation(_) => StatusCode::BAD_REQUEST,
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::IllegalMove(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        e if e.is_state_conflict() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Status, public message and reason code. Store details are logged only.
fn describe(err: &SessionError) -> (StatusCode, String, &'static str) {
    let status = session_status(err);
    let message = match err {
        SessionError::Store(e) => {
            tracing::error!("Database error: {e}");
            "Internal server error".to_string()
        }
        other => other.to_string(),
    };
    (status, message, err.reason())
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": msg, "reason": "validation" })),
            )
                .into_response(),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": msg, "reason": "not_found" })),
            )
                .into_response(),
            AppError::Session(err) => {
                let (status, message, reason) = describe(&err);
                (status, Json(json!({ "error": message, "reason": reason }))).into_response()
            }
            AppError::MoveRejected { source, game } => {
                let (status, message, reason) = describe(&source);
                (
                    status,
                    Json(json!({
                        "success": false,
                        "error": message,
                        "reason": reason,
                        "game": game,
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::IllegalMove;

    #[test]
    fn maps_session_errors_to_status_codes() {
        let cases = [
            (SessionError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (SessionError::NotFound("Game"), StatusCode::NOT_FOUND),
            (SessionError::AlreadyStarted, StatusCode::CONFLICT),
            (SessionError::SlotTaken, StatusCode::CONFLICT),
            (SessionError::NotActive, StatusCode::CONFLICT),
            (SessionError::NotYourTurn, StatusCode::CONFLICT),
            (SessionError::Contended, StatusCode::CONFLICT),
            (
                SessionError::IllegalMove(IllegalMove::BadSquare("z9".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                SessionError::Store(StoreError::Corrupt("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn store_details_are_not_leaked() {
        let err = SessionError::Store(StoreError::Corrupt("secret table".into()));
        let (_, message, reason) = describe(&err);
        assert_eq!(message, "Internal server error");
        assert_eq!(reason, "internal");
    }
}
