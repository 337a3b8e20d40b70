use crate::{
    board::{Board, offset_square},
    types::{Color, Piece, PieceType, Square},
};

/// Values from https://www.chessprogramming.org/10x12_Board under TSCP
/// 10x12 repr offsets for moving in each piece's valid directions, +10 is one rank towards black
pub(crate) const KNIGHT_OFFSETS: [i8; 8] = [-21, -19, -12, -8, 8, 12, 19, 21];
pub(crate) const BISHOP_OFFSETS: [i8; 4] = [-11, -9, 9, 11];
pub(crate) const ROOK_OFFSETS: [i8; 4] = [-10, -1, 1, 10];
pub(crate) const ROYAL_OFFSETS: [i8; 8] = [-11, -10, -9, -1, 1, 9, 10, 11];

/// Directions a pawn of `color` captures in.
#[inline]
pub(crate) const fn pawn_capture_offsets(color: Color) -> [i8; 2] {
    match color {
        Color::White => [9, 11],
        Color::Black => [-9, -11],
    }
}

impl Board {
    /// Whether any piece of `by` could capture on `square`, using raw movement rules only.
    ///
    /// This never consults legal move generation: pinned pieces still attack, and a pawn
    /// attacks diagonally whether or not something stands there.
    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        for offset in ROOK_OFFSETS {
            if self.ray_hits(square, offset, PieceType::Rook, by) {
                return true;
            }
        }

        for offset in BISHOP_OFFSETS {
            if self.ray_hits(square, offset, PieceType::Bishop, by) {
                return true;
            }
        }

        let knight = Piece::new(PieceType::Knight, by);
        for offset in KNIGHT_OFFSETS {
            if offset_square(square, offset).is_some_and(|from| self.piece_at(from) == Some(knight)) {
                return true;
            }
        }

        // Walk backwards along the attacker's capture direction to find where its pawn would stand
        let pawn = Piece::new(PieceType::Pawn, by);
        for offset in pawn_capture_offsets(by) {
            if offset_square(square, -offset).is_some_and(|from| self.piece_at(from) == Some(pawn)) {
                return true;
            }
        }

        false
    }

    /// Whether `color`'s king is attacked.
    #[inline]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.is_square_attacked(self.king_square(color), !color)
    }

    /// Walks from `square` until the first piece. Queens match either slider, kings only match adjacent.
    fn ray_hits(&self, square: Square, offset: i8, slider: PieceType, by: Color) -> bool {
        let mut current = square;
        let mut first = true;
        while let Some(next) = offset_square(current, offset) {
            if let Some(piece) = self.piece_at(next) {
                return piece.color == by
                    && (piece.piece_type == slider
                        || piece.piece_type == PieceType::Queen
                        || (first && piece.piece_type == PieceType::King));
            }

            current = next;
            first = false;
        }

        false
    }
}
