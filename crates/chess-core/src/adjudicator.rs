//! Move adjudication: legality, resulting position, notation and status.
//!
//! [`apply`] is a pure function. A rejected request never yields a partial
//! position; the caller's position is borrowed and left untouched either way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::movegen::Move;
use crate::position::{self, FenError, Position};
use crate::rules;
use crate::san;
use crate::types::{Color, Role, Square};

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Created, opponent not yet joined, no moves played.
    Waiting,
    Active,
    Checkmate,
    Stalemate,
    /// Fifty-move rule, insufficient material or threefold repetition.
    Draw,
}

impl GameStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Checkmate | Self::Stalemate | Self::Draw)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Checkmate => "checkmate",
            Self::Stalemate => "stalemate",
            Self::Draw => "draw",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "checkmate" => Ok(Self::Checkmate),
            "stalemate" => Ok(Self::Stalemate),
            "draw" => Ok(Self::Draw),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Final result of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    White,
    Black,
    Draw,
}

impl Outcome {
    /// Outcome implied by a status. After a mate the side to move has lost.
    pub fn from_status(status: GameStatus, side_to_move: Color) -> Option<Self> {
        match status {
            GameStatus::Checkmate => Some(Self::winner(side_to_move.opposite())),
            GameStatus::Stalemate | GameStatus::Draw => Some(Self::Draw),
            GameStatus::Waiting | GameStatus::Active => None,
        }
    }

    pub const fn winner(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Draw => "draw",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(Self::White),
            "black" => Ok(Self::Black),
            "draw" => Ok(Self::Draw),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value: {0:?}")]
pub struct UnknownValue(pub String);

/// A requested move as a client sends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
    /// Piece to promote to; a promoting pawn becomes a queen when absent.
    pub promotion: Option<Role>,
}

impl MoveRequest {
    pub const fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub const fn promoting(mut self, role: Role) -> Self {
        self.promotion = Some(role);
        self
    }

    /// Parse coordinates such as `"e2"`, `"e4"` and an optional `"q"`.
    /// A blank promotion counts as none.
    pub fn parse(from: &str, to: &str, promotion: Option<&str>) -> Result<Self, IllegalMove> {
        let from: Square = from
            .parse()
            .map_err(|_| IllegalMove::BadSquare(from.to_string()))?;
        let to: Square = to
            .parse()
            .map_err(|_| IllegalMove::BadSquare(to.to_string()))?;
        let promotion = match promotion.map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(
                text.parse::<Role>()
                    .map_err(|_| IllegalMove::BadPromotion(text.to_string()))?,
            ),
        };
        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

/// Why a move request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("invalid square {0:?}")]
    BadSquare(String),

    #[error("invalid promotion piece {0:?}")]
    BadPromotion(String),

    #[error("no piece on {0}")]
    EmptySquare(Square),

    #[error("the piece on {0} belongs to the opponent")]
    OpponentPiece(Square),

    #[error("{from} to {to} is not a legal move")]
    NotLegal { from: Square, to: Square },
}

/// Everything a caller needs after a successful move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjudication {
    pub position: Position,
    pub played: Move,
    /// SAN of the move, e.g. `Qh4#`.
    pub notation: String,
    /// Whether the side now to move is in check.
    pub is_check: bool,
    pub status: GameStatus,
    pub outcome: Option<Outcome>,
}

/// Adjudicate `request` in `position` with no game history.
pub fn apply(position: &Position, request: &MoveRequest) -> Result<Adjudication, IllegalMove> {
    apply_in_game(position, request, &[])
}

/// Adjudicate `request`, where `earlier` holds the game's positions before
/// `position` so that repetitions can be counted.
pub fn apply_in_game(
    position: &Position,
    request: &MoveRequest,
    earlier: &[Position],
) -> Result<Adjudication, IllegalMove> {
    let played = resolve(position, request)?;
    let notation = san::to_san(position, &played);
    let next = position.play_unchecked(&played);

    let mut seen = Vec::with_capacity(earlier.len() + 1);
    seen.extend_from_slice(earlier);
    seen.push(position.clone());

    let status = classify(&next, &seen);
    let outcome = Outcome::from_status(status, next.turn());
    Ok(Adjudication {
        is_check: next.is_check(),
        position: next,
        played,
        notation,
        status,
        outcome,
    })
}

/// Status of `position` given the positions that preceded it.
/// Checkmate takes precedence over stalemate, which beats the other draws.
pub fn classify(position: &Position, earlier: &[Position]) -> GameStatus {
    if rules::is_checkmate(position) {
        GameStatus::Checkmate
    } else if rules::is_stalemate(position) {
        GameStatus::Stalemate
    } else if rules::is_draw(position, earlier) {
        GameStatus::Draw
    } else {
        GameStatus::Active
    }
}

/// Whether it is `color`'s turn in the position serialized as `fen`.
pub fn is_players_turn(fen: &str, color: Color) -> Result<bool, FenError> {
    Ok(position::side_to_move(fen)? == color)
}

/// Destination squares the piece on `from` may legally move to.
pub fn legal_targets(position: &Position, from: Square) -> Vec<Square> {
    let mut targets: Vec<Square> = position
        .legal_moves_from(from)
        .into_iter()
        .map(|m| m.to)
        .collect();
    targets.sort();
    targets.dedup();
    targets
}

fn resolve(position: &Position, request: &MoveRequest) -> Result<Move, IllegalMove> {
    let piece = position
        .board()
        .piece_at(request.from)
        .ok_or(IllegalMove::EmptySquare(request.from))?;
    if piece.color != position.turn() {
        return Err(IllegalMove::OpponentPiece(request.from));
    }

    let promotion = request.promotion.unwrap_or(Role::Queen);
    position
        .legal_moves_from(request.from)
        .into_iter()
        .find(|m| m.to == request.to && m.promotion.map_or(true, |role| role == promotion))
        .ok_or(IllegalMove::NotLegal {
            from: request.from,
            to: request.to,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::STARTING_FEN;
    use crate::types::Piece;

    fn request(from: &str, to: &str) -> MoveRequest {
        MoveRequest::parse(from, to, None).unwrap()
    }

    fn play(position: &Position, moves: &[(&str, &str)]) -> (Position, Adjudication) {
        let mut current = position.clone();
        let mut last = None;
        for (from, to) in moves {
            let result = apply(&current, &request(from, to)).unwrap();
            current = result.position.clone();
            last = Some(result);
        }
        (current, last.unwrap())
    }

    #[test]
    fn fools_mate_is_checkmate_for_black() {
        let (position, last) = play(
            &Position::default(),
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")],
        );
        assert_eq!(last.notation, "Qh4#");
        assert!(last.is_check);
        assert_eq!(last.status, GameStatus::Checkmate);
        assert_eq!(last.outcome, Some(Outcome::Black));
        assert_eq!(position.turn(), Color::White);
    }

    #[test]
    fn ordinary_move_stays_active() {
        let result = apply(&Position::default(), &request("e2", "e4")).unwrap();
        assert_eq!(result.notation, "e4");
        assert!(!result.is_check);
        assert_eq!(result.status, GameStatus::Active);
        assert_eq!(result.outcome, None);
        assert_eq!(
            result.position.to_fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn rejects_illegal_requests_without_touching_the_position() {
        let start = Position::default();
        assert_eq!(
            apply(&start, &request("e2", "e5")),
            Err(IllegalMove::NotLegal {
                from: "e2".parse().unwrap(),
                to: "e5".parse().unwrap()
            })
        );
        assert_eq!(
            apply(&start, &request("e4", "e5")),
            Err(IllegalMove::EmptySquare("e4".parse().unwrap()))
        );
        assert_eq!(
            apply(&start, &request("e7", "e5")),
            Err(IllegalMove::OpponentPiece("e7".parse().unwrap()))
        );
        assert_eq!(start.to_fen(), STARTING_FEN);
    }

    #[test]
    fn malformed_coordinates_are_illegal() {
        assert_eq!(
            MoveRequest::parse("e9", "e4", None),
            Err(IllegalMove::BadSquare("e9".into()))
        );
        assert_eq!(
            MoveRequest::parse("e2", "z4", None),
            Err(IllegalMove::BadSquare("z4".into()))
        );
        assert_eq!(
            MoveRequest::parse("e7", "e8", Some("x")),
            Err(IllegalMove::BadPromotion("x".into()))
        );
    }

    #[test]
    fn promotion_defaults_to_queen() {
        let position = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let result = apply(&position, &request("a7", "a8")).unwrap();
        assert_eq!(
            result.position.board().piece_at("a8".parse().unwrap()),
            Some(Piece::new(Color::White, Role::Queen))
        );
        assert_eq!(result.notation, "a8=Q");
    }

    #[test]
    fn explicit_underpromotion() {
        let position = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let knight = request("a7", "a8").promoting(Role::Knight);
        let result = apply(&position, &knight).unwrap();
        assert_eq!(
            result.position.board().piece_at("a8".parse().unwrap()),
            Some(Piece::new(Color::White, Role::Knight))
        );
        let king = request("a7", "a8").promoting(Role::King);
        assert!(apply(&position, &king).is_err());
    }

    #[test]
    fn promotion_piece_ignored_for_ordinary_moves() {
        let with_piece = MoveRequest::parse("e2", "e4", Some("q")).unwrap();
        assert!(apply(&Position::default(), &with_piece).is_ok());

        for blank in ["", "  "] {
            let req = MoveRequest::parse("e2", "e4", Some(blank)).unwrap();
            assert_eq!(req.promotion, None);
            assert!(apply(&Position::default(), &req).is_ok());
        }
        let promoting = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let req = MoveRequest::parse("a7", "a8", Some("")).unwrap();
        assert_eq!(apply(&promoting, &req).unwrap().notation, "a8=Q");
    }

    #[test]
    fn move_into_check_is_rejected() {
        // Moving the pinned knight would expose the king.
        let position = Position::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        assert!(matches!(
            apply(&position, &request("e2", "c3")),
            Err(IllegalMove::NotLegal { .. })
        ));
    }

    #[test]
    fn accepted_moves_never_leave_own_king_in_check() {
        let position = Position::from_fen(
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        )
        .unwrap();
        for m in position.legal_moves() {
            let req = MoveRequest {
                from: m.from,
                to: m.to,
                promotion: m.promotion,
            };
            let result = apply(&position, &req).unwrap();
            assert!(!result.position.king_attacked(Color::White), "{}", m.uci());
        }
    }

    #[test]
    fn stalemate_is_a_draw() {
        let position = Position::from_fen("7k/8/6K1/8/8/8/8/5Q2 w - - 0 1").unwrap();
        let result = apply(&position, &request("f1", "f7")).unwrap();
        assert_eq!(result.status, GameStatus::Stalemate);
        assert_eq!(result.outcome, Some(Outcome::Draw));
    }

    #[test]
    fn capturing_the_last_piece_draws_on_material() {
        let position = Position::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        let result = apply(&position, &request("e1", "e2")).unwrap();
        assert_eq!(result.status, GameStatus::Draw);
        assert_eq!(result.outcome, Some(Outcome::Draw));
    }

    #[test]
    fn fifty_move_draw() {
        let position = Position::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 99 80").unwrap();
        let result = apply(&position, &request("a1", "a2")).unwrap();
        assert_eq!(result.status, GameStatus::Draw);
    }

    #[test]
    fn checkmate_outranks_fifty_move_rule() {
        let position = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 99 80").unwrap();
        let result = apply(&position, &request("a1", "a8")).unwrap();
        assert_eq!(result.status, GameStatus::Checkmate);
        assert_eq!(result.outcome, Some(Outcome::White));
    }

    #[test]
    fn repetition_needs_history() {
        let start = Position::default();
        let shuffle = [("g1", "f3"), ("g8", "f6"), ("f3", "g1"), ("f6", "g8")];
        let mut history = Vec::new();
        let mut position = start.clone();
        let mut last_status = GameStatus::Active;
        for (from, to) in shuffle.iter().chain(shuffle.iter()) {
            let result = apply_in_game(&position, &request(from, to), &history).unwrap();
            history.push(position);
            position = result.position;
            last_status = result.status;
        }
        assert_eq!(last_status, GameStatus::Draw);

        // Without history the same final move looks ordinary.
        let (before_last, _) = play(
            &start,
            &[("g1", "f3"), ("g8", "f6"), ("f3", "g1")],
        );
        let alone = apply(&before_last, &request("f6", "g8")).unwrap();
        assert_eq!(alone.status, GameStatus::Active);
    }

    #[test]
    fn legal_targets_for_hinting() {
        let start = Position::default();
        let targets: Vec<String> = legal_targets(&start, "g1".parse().unwrap())
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(targets, vec!["f3", "h3"]);
        assert!(legal_targets(&start, "e4".parse().unwrap()).is_empty());

        let promoting = Position::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(legal_targets(&promoting, "a7".parse().unwrap()).len(), 1);
    }

    #[test]
    fn turn_follows_the_serialized_position() {
        assert!(is_players_turn(STARTING_FEN, Color::White).unwrap());
        let after = apply(&Position::default(), &request("e2", "e4")).unwrap();
        let fen = after.position.to_fen();
        assert!(is_players_turn(&fen, Color::Black).unwrap());
        assert!(!is_players_turn(&fen, Color::White).unwrap());
        assert!(is_players_turn("not a fen", Color::White).is_err());
    }

    #[test]
    fn status_and_outcome_text() {
        for status in [
            GameStatus::Waiting,
            GameStatus::Active,
            GameStatus::Checkmate,
            GameStatus::Stalemate,
            GameStatus::Draw,
        ] {
            assert_eq!(status.as_str().parse::<GameStatus>().unwrap(), status);
        }
        assert_eq!("black".parse::<Outcome>().unwrap(), Outcome::Black);
        assert!("resigned".parse::<Outcome>().is_err());
        assert!(!GameStatus::Active.is_terminal());
        assert!(GameStatus::Draw.is_terminal());
    }
}
