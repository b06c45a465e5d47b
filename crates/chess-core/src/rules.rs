//! End-of-game conditions.

use crate::position::Position;
use crate::types::Role;

/// Half-move clock value at which the fifty-move rule draws the game.
pub const FIFTY_MOVE_PLIES: u32 = 100;

pub fn is_checkmate(position: &Position) -> bool {
    position.is_check() && !position.has_legal_move()
}

pub fn is_stalemate(position: &Position) -> bool {
    !position.is_check() && !position.has_legal_move()
}

pub fn is_fifty_move_draw(position: &Position) -> bool {
    position.halfmoves() >= FIFTY_MOVE_PLIES
}

/// Neither side can possibly mate: bare kings, a single minor piece, or
/// only bishops that all stand on the same square color.
pub fn is_insufficient_material(position: &Position) -> bool {
    let others: Vec<_> = position
        .board()
        .pieces()
        .filter(|(_, p)| p.role != Role::King)
        .collect();

    match others.as_slice() {
        [] => true,
        [(_, only)] => matches!(only.role, Role::Knight | Role::Bishop),
        pieces => {
            pieces.iter().all(|(_, p)| p.role == Role::Bishop) && {
                let light = pieces.iter().filter(|(sq, _)| sq.is_light()).count();
                light == 0 || light == pieces.len()
            }
        }
    }
}

/// True when `position` has now occurred at least three times, counting the
/// `earlier` positions of the same game.
pub fn is_threefold_repetition(position: &Position, earlier: &[Position]) -> bool {
    let key = position.repetition_key();
    let seen = earlier
        .iter()
        .filter(|p| p.repetition_key() == key)
        .count();
    seen + 1 >= 3
}

/// Any draw other than stalemate.
pub fn is_draw(position: &Position, earlier: &[Position]) -> bool {
    is_fifty_move_draw(position)
        || is_insufficient_material(position)
        || is_threefold_repetition(position, earlier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::san::parse_san;

    fn pos(fen: &str) -> Position {
        Position::from_fen(fen).unwrap()
    }

    #[test]
    fn checkmate_and_stalemate() {
        let mated = pos("R5k1/5ppp/8/8/8/8/8/6K1 b - - 1 1");
        assert!(is_checkmate(&mated));
        assert!(!is_stalemate(&mated));

        let stalemated = pos("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1");
        assert!(is_stalemate(&stalemated));
        assert!(!is_checkmate(&stalemated));

        assert!(!is_checkmate(&Position::default()));
        assert!(!is_stalemate(&Position::default()));
    }

    #[test]
    fn insufficient_material_cases() {
        assert!(is_insufficient_material(&pos("4k3/8/8/8/8/8/8/4K3 w - - 0 1")));
        assert!(is_insufficient_material(&pos("4k3/8/8/8/8/8/8/4KN2 w - - 0 1")));
        assert!(is_insufficient_material(&pos("4kb2/8/8/8/8/8/8/4K3 w - - 0 1")));
        // Bishops on c1 and f8 are both dark squares.
        assert!(is_insufficient_material(&pos("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1")));
        // Bishops on opposite colors can still mate.
        assert!(!is_insufficient_material(&pos("4k1b1/8/8/8/8/8/8/2B1K3 w - - 0 1")));
        assert!(!is_insufficient_material(&pos("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1")));
        assert!(!is_insufficient_material(&pos("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1")));
        assert!(!is_insufficient_material(&Position::default()));
    }

    #[test]
    fn fifty_move_rule() {
        assert!(!is_fifty_move_draw(&pos("4k3/8/8/8/8/8/8/R3K3 w - - 99 80")));
        assert!(is_fifty_move_draw(&pos("4k3/8/8/8/8/8/8/R3K3 w - - 100 80")));
    }

    #[test]
    fn knight_shuffle_repeats_three_times() {
        let mut position = Position::default();
        let mut history = Vec::new();
        for san in ["Nf3", "Nf6", "Ng1", "Ng8", "Nf3", "Nf6", "Ng1"] {
            let m = parse_san(&position, san).unwrap();
            history.push(position.clone());
            position = position.play_unchecked(&m);
            assert!(!is_threefold_repetition(&position, &history), "after {san}");
        }
        let m = parse_san(&position, "Ng8").unwrap();
        history.push(position.clone());
        position = position.play_unchecked(&m);
        assert!(is_threefold_repetition(&position, &history));
        assert!(is_draw(&position, &history));
    }
}
