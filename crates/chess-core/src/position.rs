//! Board occupancy, castling rights and the full game position.
//!
//! A [`Position`] is an immutable value: moves produce a new position via
//! [`Position::play_unchecked`] (see `movegen`). FEN is the canonical text
//! form, and every position accepted by [`Position::from_fen`] is one a legal
//! game can reach as far as the side not to move is concerned (exactly one
//! king per side, no pawns on the back ranks, the side that just moved is not
//! in check).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::types::{Color, Piece, Role, Square};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

pub(crate) const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];
pub(crate) const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, -1), (-1, 1)];

pub(crate) fn knight_offsets() -> &'static [(i8, i8)] {
    &KNIGHT_OFFSETS
}

pub(crate) fn king_offsets() -> &'static [(i8, i8)] {
    &KING_OFFSETS
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected 6 fields, got {0}")]
    FieldCount(usize),

    #[error("invalid piece placement: {0}")]
    Placement(String),

    #[error("{0} must have exactly one king")]
    KingCount(Color),

    #[error("pawn on back rank at {0}")]
    PawnOnBackRank(Square),

    #[error("invalid side to move: {0:?}")]
    SideToMove(String),

    #[error("invalid castling field: {0:?}")]
    Castling(String),

    #[error("invalid en passant square: {0:?}")]
    EnPassant(String),

    #[error("invalid move counter: {0:?}")]
    Counter(String),

    #[error("side not to move is in check")]
    OpponentInCheck,
}

/// Which wing a castling move goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    /// File the king lands on.
    pub(crate) const fn king_to_file(self) -> u8 {
        match self {
            Self::King => 6,
            Self::Queen => 2,
        }
    }

    /// Rook's (from, to) files.
    pub(crate) const fn rook_files(self) -> (u8, u8) {
        match self {
            Self::King => (7, 5),
            Self::Queen => (0, 3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CastlingRights {
    pub white_king: bool,
    pub white_queen: bool,
    pub black_king: bool,
    pub black_queen: bool,
}

impl CastlingRights {
    pub const ALL: Self = Self {
        white_king: true,
        white_queen: true,
        black_king: true,
        black_queen: true,
    };

    pub const NONE: Self = Self {
        white_king: false,
        white_queen: false,
        black_king: false,
        black_queen: false,
    };

    pub const fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king,
            (Color::White, CastleSide::Queen) => self.white_queen,
            (Color::Black, CastleSide::King) => self.black_king,
            (Color::Black, CastleSide::Queen) => self.black_queen,
        }
    }

    fn set(&mut self, color: Color, side: CastleSide, value: bool) {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king = value,
            (Color::White, CastleSide::Queen) => self.white_queen = value,
            (Color::Black, CastleSide::King) => self.black_king = value,
            (Color::Black, CastleSide::Queen) => self.black_queen = value,
        }
    }

    pub(crate) fn revoke_color(&mut self, color: Color) {
        self.set(color, CastleSide::King, false);
        self.set(color, CastleSide::Queen, false);
    }

    /// Drop the right tied to a rook corner when anything moves from or to it.
    pub(crate) fn revoke_corner(&mut self, sq: Square) {
        for color in [Color::White, Color::Black] {
            if sq.rank() != color.back_rank() {
                continue;
            }
            match sq.file() {
                0 => self.set(color, CastleSide::Queen, false),
                7 => self.set(color, CastleSide::King, false),
                _ => {}
            }
        }
    }

    fn from_fen(field: &str) -> Option<Self> {
        if field == "-" {
            return Some(Self::NONE);
        }
        let mut rights = Self::NONE;
        for c in field.chars() {
            let (color, side) = match c {
                'K' => (Color::White, CastleSide::King),
                'Q' => (Color::White, CastleSide::Queen),
                'k' => (Color::Black, CastleSide::King),
                'q' => (Color::Black, CastleSide::Queen),
                _ => return None,
            };
            if rights.has(color, side) {
                return None;
            }
            rights.set(color, side, true);
        }
        Some(rights)
    }

    fn to_fen(self) -> String {
        let mut out = String::new();
        if self.white_king {
            out.push('K');
        }
        if self.white_queen {
            out.push('Q');
        }
        if self.black_king {
            out.push('k');
        }
        if self.black_queen {
            out.push('q');
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }
}

/// Piece placement, indexed by [`Square::index`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [Option<Piece>; 64],
}

impl Board {
    pub fn empty() -> Self {
        Self {
            squares: [None; 64],
        }
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()]
    }

    pub(crate) fn set(&mut self, sq: Square, piece: Option<Piece>) {
        self.squares[sq.index()] = piece;
    }

    pub(crate) fn take(&mut self, sq: Square) -> Option<Piece> {
        self.squares[sq.index()].take()
    }

    /// Occupied squares with their pieces, a1 first.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(move |sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces()
            .find(|(_, p)| *p == Piece::new(color, Role::King))
            .map(|(sq, _)| sq)
    }

    /// Whether any piece of color `by` attacks `target`.
    pub fn is_attacked(&self, target: Square, by: Color) -> bool {
        // A pawn of `by` attacks diagonally forward, so look one rank back.
        for df in [-1, 1] {
            if let Some(from) = target.offset(df, -by.forward()) {
                if self.piece_at(from) == Some(Piece::new(by, Role::Pawn)) {
                    return true;
                }
            }
        }

        for &(df, dr) in knight_offsets() {
            if let Some(from) = target.offset(df, dr) {
                if self.piece_at(from) == Some(Piece::new(by, Role::Knight)) {
                    return true;
                }
            }
        }

        for &(df, dr) in king_offsets() {
            if let Some(from) = target.offset(df, dr) {
                if self.piece_at(from) == Some(Piece::new(by, Role::King)) {
                    return true;
                }
            }
        }

        self.ray_hits(target, &ROOK_DIRECTIONS, by, Role::Rook)
            || self.ray_hits(target, &BISHOP_DIRECTIONS, by, Role::Bishop)
    }

    /// First piece along each ray; true when it is a `by` slider of `role` or a queen.
    fn ray_hits(&self, target: Square, directions: &[(i8, i8)], by: Color, role: Role) -> bool {
        directions.iter().any(|&(df, dr)| {
            let mut cursor = target;
            while let Some(next) = cursor.offset(df, dr) {
                if let Some(piece) = self.piece_at(next) {
                    return piece.color == by && (piece.role == role || piece.role == Role::Queen);
                }
                cursor = next;
            }
            false
        })
    }

    fn placement_fen(&self) -> String {
        let mut out = String::with_capacity(64);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match Square::new(file, rank).and_then(|sq| self.piece_at(sq)) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push_str(&empty.to_string());
                            empty = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push_str(&empty.to_string());
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    fn from_placement(field: &str) -> Result<Self, FenError> {
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::Placement(format!("expected 8 ranks, got {}", ranks.len())));
        }

        let mut board = Self::empty();
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(FenError::Placement(format!("bad empty count {c:?}")));
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_fen_char(c)
                        .ok_or_else(|| FenError::Placement(format!("bad piece {c:?}")))?;
                    let sq = Square::new(file, rank).ok_or_else(|| {
                        FenError::Placement(format!("rank {} overflows", rank + 1))
                    })?;
                    board.set(sq, Some(piece));
                    file += 1;
                }
                if file > 8 {
                    return Err(FenError::Placement(format!("rank {} overflows", rank + 1)));
                }
            }
            if file != 8 {
                return Err(FenError::Placement(format!(
                    "rank {} has {file} squares",
                    rank + 1
                )));
            }
        }
        Ok(board)
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.placement_fen())
    }
}

/// Complete game state: placement, side to move, castling rights,
/// en passant target and move counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub(crate) board: Board,
    pub(crate) turn: Color,
    pub(crate) castling: CastlingRights,
    pub(crate) ep_square: Option<Square>,
    pub(crate) halfmoves: u32,
    pub(crate) fullmoves: u32,
}

impl Position {
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// Square a pawn skipped over on the previous double push, if any.
    pub fn ep_square(&self) -> Option<Square> {
        self.ep_square
    }

    /// Plies since the last capture or pawn move.
    pub fn halfmoves(&self) -> u32 {
        self.halfmoves
    }

    pub fn fullmoves(&self) -> u32 {
        self.fullmoves
    }

    /// Whether the side to move is in check.
    pub fn is_check(&self) -> bool {
        self.king_attacked(self.turn)
    }

    pub(crate) fn king_attacked(&self, color: Color) -> bool {
        self.board
            .king_square(color)
            .is_some_and(|king| self.board.is_attacked(king, color.opposite()))
    }

    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::FieldCount(fields.len()));
        }

        let board = Board::from_placement(fields[0])?;
        for color in [Color::White, Color::Black] {
            let kings = board
                .pieces()
                .filter(|(_, p)| *p == Piece::new(color, Role::King))
                .count();
            if kings != 1 {
                return Err(FenError::KingCount(color));
            }
        }
        if let Some((sq, _)) = board
            .pieces()
            .find(|(sq, p)| p.role == Role::Pawn && (sq.rank() == 0 || sq.rank() == 7))
        {
            return Err(FenError::PawnOnBackRank(sq));
        }

        let turn = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::SideToMove(other.to_string())),
        };

        let castling = CastlingRights::from_fen(fields[2])
            .ok_or_else(|| FenError::Castling(fields[2].to_string()))?;

        let ep_square = match fields[3] {
            "-" => None,
            field => {
                let sq: Square = field
                    .parse()
                    .map_err(|_| FenError::EnPassant(field.to_string()))?;
                // White to move means black just pushed, leaving the target on rank 6.
                let expected_rank = match turn {
                    Color::White => 5,
                    Color::Black => 2,
                };
                if sq.rank() != expected_rank || board.piece_at(sq).is_some() {
                    return Err(FenError::EnPassant(field.to_string()));
                }
                Some(sq)
            }
        };

        let halfmoves: u32 = fields[4]
            .parse()
            .map_err(|_| FenError::Counter(fields[4].to_string()))?;
        let fullmoves: u32 = fields[5]
            .parse()
            .map_err(|_| FenError::Counter(fields[5].to_string()))?;
        if fullmoves == 0 {
            return Err(FenError::Counter(fields[5].to_string()));
        }

        let mut position = Self {
            board,
            turn,
            castling,
            ep_square,
            halfmoves,
            fullmoves,
        };
        position.sanitize_castling();

        if position.king_attacked(turn.opposite()) {
            return Err(FenError::OpponentInCheck);
        }
        Ok(position)
    }

    /// Drop castling rights whose king or rook is not on its home square.
    fn sanitize_castling(&mut self) {
        for color in [Color::White, Color::Black] {
            let rank = color.back_rank();
            let king_home = Square::new(4, rank)
                .and_then(|sq| self.board.piece_at(sq))
                == Some(Piece::new(color, Role::King));
            for side in [CastleSide::King, CastleSide::Queen] {
                let (rook_file, _) = side.rook_files();
                let rook_home = Square::new(rook_file, rank)
                    .and_then(|sq| self.board.piece_at(sq))
                    == Some(Piece::new(color, Role::Rook));
                if !(king_home && rook_home) {
                    self.castling.set(color, side, false);
                }
            }
        }
    }

    /// FEN text. The en passant field is written only when the capture is
    /// actually available, so equal positions always serialize identically.
    pub fn to_fen(&self) -> String {
        let ep = self
            .legal_ep_square()
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());
        format!(
            "{} {} {} {} {} {}",
            self.board.placement_fen(),
            self.turn.fen_char(),
            self.castling.to_fen(),
            ep,
            self.halfmoves,
            self.fullmoves
        )
    }

    /// Placement, side to move, castling rights and live en passant square:
    /// the parts of the FEN that decide whether two positions repeat.
    pub fn repetition_key(&self) -> String {
        let fen = self.to_fen();
        fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
    }
}

impl Default for Position {
    /// The standard starting position.
    fn default() -> Self {
        let mut board = Board::empty();
        let back = [
            Role::Rook,
            Role::Knight,
            Role::Bishop,
            Role::Queen,
            Role::King,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
        ];
        for sq in Square::all() {
            let role = back[sq.file() as usize];
            let piece = match sq.rank() {
                0 => Some(Piece::new(Color::White, role)),
                1 => Some(Piece::new(Color::White, Role::Pawn)),
                6 => Some(Piece::new(Color::Black, Role::Pawn)),
                7 => Some(Piece::new(Color::Black, role)),
                _ => None,
            };
            board.set(sq, piece);
        }
        Self {
            board,
            turn: Color::White,
            castling: CastlingRights::ALL,
            ep_square: None,
            halfmoves: 0,
            fullmoves: 1,
        }
    }
}

impl FromStr for Position {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fen())
    }
}

/// Whose turn it is according to a serialized position.
///
/// The stored FEN is the only record of the side to move; callers derive
/// turn ownership from it rather than tracking it separately.
pub fn side_to_move(fen: &str) -> Result<Color, FenError> {
    Position::from_fen(fen).map(|p| p.turn())
}
