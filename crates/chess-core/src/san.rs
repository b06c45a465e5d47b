//! Standard algebraic notation.

use thiserror::Error;

use crate::movegen::{Move, MoveKind};
use crate::position::{CastleSide, Position};
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanError {
    #[error("no legal move matches {0:?}")]
    NoMatch(String),
}

/// SAN for `m`, which must be legal in `position`, including the `+`/`#` suffix.
pub fn to_san(position: &Position, m: &Move) -> String {
    let mut san = san_without_suffix(position, m);
    let after = position.play_unchecked(m);
    if after.is_check() {
        san.push(if after.has_legal_move() { '+' } else { '#' });
    }
    san
}

fn san_without_suffix(position: &Position, m: &Move) -> String {
    match m.kind {
        MoveKind::Castle(CastleSide::King) => return "O-O".to_string(),
        MoveKind::Castle(CastleSide::Queen) => return "O-O-O".to_string(),
        _ => {}
    }

    let mut san = String::with_capacity(8);
    match m.role.san_char() {
        None => {
            if m.is_capture() {
                san.push(m.from.file_char());
            }
        }
        Some(letter) => {
            san.push(letter);
            san.push_str(&disambiguation(position, m));
        }
    }
    if m.is_capture() {
        san.push('x');
    }
    san.push_str(&m.to.to_string());
    if let Some(role) = m.promotion {
        san.push('=');
        san.push(role.san_char().unwrap_or('Q'));
    }
    san
}

/// File, rank, or both of the origin square when another piece of the same
/// kind could also reach the destination.
fn disambiguation(position: &Position, m: &Move) -> String {
    if m.role == Role::King {
        return String::new();
    }
    let rivals: Vec<Move> = position
        .legal_moves()
        .into_iter()
        .filter(|other| other.role == m.role && other.to == m.to && other.from != m.from)
        .collect();
    if rivals.is_empty() {
        return String::new();
    }

    let shares_file = rivals.iter().any(|r| r.from.file() == m.from.file());
    let shares_rank = rivals.iter().any(|r| r.from.rank() == m.from.rank());
    match (shares_file, shares_rank) {
        (false, _) => m.from.file_char().to_string(),
        (true, false) => m.from.rank_char().to_string(),
        (true, true) => m.from.to_string(),
    }
}

/// Resolve SAN text against the legal moves of `position`.
///
/// Check and annotation suffixes (`+`, `#`, `!`, `?`) are ignored, and `0-0`
/// style castling is accepted.
pub fn parse_san(position: &Position, text: &str) -> Result<Move, SanError> {
    let wanted = normalize(text);
    position
        .legal_moves()
        .into_iter()
        .find(|m| san_without_suffix(position, m) == wanted)
        .ok_or_else(|| SanError::NoMatch(text.to_string()))
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .replace('0', "O")
}
