//! Legal move generation and move application.

use crate::position::{
    king_offsets, knight_offsets, CastleSide, Position, BISHOP_DIRECTIONS, ROOK_DIRECTIONS,
};
use crate::types::{Color, Piece, Role, Square};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    Normal,
    /// Pawn advancing two squares from its starting rank.
    DoublePush,
    EnPassant,
    Castle(CastleSide),
}

/// A fully described move. Castling is encoded as the king's two-square step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub role: Role,
    pub capture: Option<Role>,
    pub promotion: Option<Role>,
    pub kind: MoveKind,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// Long algebraic form, e.g. `e2e4` or `e7e8q`.
    pub fn uci(&self) -> String {
        match self.promotion {
            Some(role) => format!("{}{}{}", self.from, self.to, role.char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl Position {
    /// Every move the side to move may legally play.
    pub fn legal_moves(&self) -> Vec<Move> {
        self.pseudo_legal_moves()
            .into_iter()
            .filter(|m| self.is_safe(m))
            .collect()
    }

    /// Legal moves of the piece standing on `from`.
    pub fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        self.pseudo_legal_moves()
            .into_iter()
            .filter(|m| m.from == from && self.is_safe(m))
            .collect()
    }

    pub fn has_legal_move(&self) -> bool {
        self.pseudo_legal_moves().iter().any(|m| self.is_safe(m))
    }

    /// Apply `m` without checking it. Only pass moves taken from
    /// [`Position::legal_moves`] of this same position.
    pub fn play_unchecked(&self, m: &Move) -> Position {
        let color = self.turn;
        let mut next = self.clone();

        let moving = next.board.take(m.from);
        if m.kind == MoveKind::EnPassant {
            if let Some(victim) = Square::new(m.to.file(), m.from.rank()) {
                next.board.set(victim, None);
            }
        }
        let placed = moving.map(|p| Piece::new(p.color, m.promotion.unwrap_or(p.role)));
        next.board.set(m.to, placed);

        if let MoveKind::Castle(side) = m.kind {
            let (rook_from, rook_to) = side.rook_files();
            let rank = color.back_rank();
            if let (Some(rook_from), Some(rook_to)) =
                (Square::new(rook_from, rank), Square::new(rook_to, rank))
            {
                let rook = next.board.take(rook_from);
                next.board.set(rook_to, rook);
            }
        }

        if m.role == Role::King {
            next.castling.revoke_color(color);
        }
        next.castling.revoke_corner(m.from);
        next.castling.revoke_corner(m.to);

        next.ep_square = match m.kind {
            MoveKind::DoublePush => m.from.offset(0, color.forward()),
            _ => None,
        };
        next.halfmoves = if m.role == Role::Pawn || m.is_capture() {
            0
        } else {
            self.halfmoves + 1
        };
        if color == Color::Black {
            next.fullmoves += 1;
        }
        next.turn = color.opposite();
        next
    }

    /// The en passant square, but only if a legal capture onto it exists.
    pub(crate) fn legal_ep_square(&self) -> Option<Square> {
        let ep = self.ep_square?;
        let capture = self
            .pseudo_legal_moves()
            .into_iter()
            .any(|m| m.kind == MoveKind::EnPassant && self.is_safe(&m));
        capture.then_some(ep)
    }

    /// Whether playing `m` leaves the mover's king out of check.
    fn is_safe(&self, m: &Move) -> bool {
        !self.play_unchecked(m).king_attacked(self.turn)
    }

    fn pseudo_legal_moves(&self) -> Vec<Move> {
        let mut moves = Vec::with_capacity(48);
        for (from, piece) in self.board.pieces() {
            if piece.color != self.turn {
                continue;
            }
            match piece.role {
                Role::Pawn => self.pawn_moves(from, &mut moves),
                Role::Knight => self.step_moves(from, Role::Knight, knight_offsets(), &mut moves),
                Role::Bishop => {
                    self.slide_moves(from, Role::Bishop, &BISHOP_DIRECTIONS, &mut moves)
                }
                Role::Rook => self.slide_moves(from, Role::Rook, &ROOK_DIRECTIONS, &mut moves),
                Role::Queen => {
                    self.slide_moves(from, Role::Queen, &ROOK_DIRECTIONS, &mut moves);
                    self.slide_moves(from, Role::Queen, &BISHOP_DIRECTIONS, &mut moves);
                }
                Role::King => {
                    self.step_moves(from, Role::King, king_offsets(), &mut moves);
                    self.castling_moves(from, &mut moves);
                }
            }
        }
        moves
    }

    fn step_moves(&self, from: Square, role: Role, offsets: &[(i8, i8)], moves: &mut Vec<Move>) {
        for &(df, dr) in offsets {
            let Some(to) = from.offset(df, dr) else {
                continue;
            };
            match self.board.piece_at(to) {
                None => moves.push(simple(from, to, role, None)),
                Some(target) if target.color != self.turn => {
                    moves.push(simple(from, to, role, Some(target.role)));
                }
                Some(_) => {}
            }
        }
    }

    fn slide_moves(
        &self,
        from: Square,
        role: Role,
        directions: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        for &(df, dr) in directions {
            let mut cursor = from;
            while let Some(to) = cursor.offset(df, dr) {
                match self.board.piece_at(to) {
                    None => moves.push(simple(from, to, role, None)),
                    Some(target) => {
                        if target.color != self.turn {
                            moves.push(simple(from, to, role, Some(target.role)));
                        }
                        break;
                    }
                }
                cursor = to;
            }
        }
    }

    fn pawn_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let color = self.turn;
        let forward = color.forward();
        let start_rank = match color {
            Color::White => 1,
            Color::Black => 6,
        };

        if let Some(one) = from.offset(0, forward) {
            if self.board.piece_at(one).is_none() {
                push_pawn(color, from, one, None, moves);
                if from.rank() == start_rank {
                    if let Some(two) = one.offset(0, forward) {
                        if self.board.piece_at(two).is_none() {
                            moves.push(Move {
                                from,
                                to: two,
                                role: Role::Pawn,
                                capture: None,
                                promotion: None,
                                kind: MoveKind::DoublePush,
                            });
                        }
                    }
                }
            }
        }

        for df in [-1, 1] {
            let Some(to) = from.offset(df, forward) else {
                continue;
            };
            match self.board.piece_at(to) {
                Some(target) if target.color != color => {
                    push_pawn(color, from, to, Some(target.role), moves);
                }
                None if self.ep_square == Some(to) => {
                    let victim = Square::new(to.file(), from.rank())
                        .and_then(|sq| self.board.piece_at(sq));
                    if victim == Some(Piece::new(color.opposite(), Role::Pawn)) {
                        moves.push(Move {
                            from,
                            to,
                            role: Role::Pawn,
                            capture: Some(Role::Pawn),
                            promotion: None,
                            kind: MoveKind::EnPassant,
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn castling_moves(&self, from: Square, moves: &mut Vec<Move>) {
        let color = self.turn;
        let rank = color.back_rank();
        if Square::new(4, rank) != Some(from) || self.king_attacked(color) {
            return;
        }

        for side in [CastleSide::King, CastleSide::Queen] {
            if !self.castling.has(color, side) {
                continue;
            }
            let (rook_file, _) = side.rook_files();
            if Square::new(rook_file, rank).and_then(|sq| self.board.piece_at(sq))
                != Some(Piece::new(color, Role::Rook))
            {
                continue;
            }

            let (lo, hi) = if rook_file > 4 { (5, rook_file) } else { (rook_file + 1, 4) };
            let blocked = (lo..hi).any(|file| {
                Square::new(file, rank).is_some_and(|sq| self.board.piece_at(sq).is_some())
            });
            if blocked {
                continue;
            }

            // The king may not cross or land on an attacked square.
            let king_to = side.king_to_file();
            let path: [u8; 2] = match side {
                CastleSide::King => [5, king_to],
                CastleSide::Queen => [3, king_to],
            };
            let attacked = path.iter().any(|&file| {
                Square::new(file, rank)
                    .is_some_and(|sq| self.board.is_attacked(sq, color.opposite()))
            });
            if attacked {
                continue;
            }

            if let Some(to) = Square::new(king_to, rank) {
                moves.push(Move {
                    from,
                    to,
                    role: Role::King,
                    capture: None,
                    promotion: None,
                    kind: MoveKind::Castle(side),
                });
            }
        }
    }
}

fn simple(from: Square, to: Square, role: Role, capture: Option<Role>) -> Move {
    Move {
        from,
        to,
        role,
        capture,
        promotion: None,
        kind: MoveKind::Normal,
    }
}

fn push_pawn(color: Color, from: Square, to: Square, capture: Option<Role>, moves: &mut Vec<Move>) {
    if to.rank() == color.promotion_rank() {
        for role in Role::PROMOTIONS {
            moves.push(Move {
                promotion: Some(role),
                ..simple(from, to, Role::Pawn, capture)
            });
        }
    } else {
        moves.push(simple(from, to, Role::Pawn, capture));
    }
}
