use std::fmt;

use crate::{
    board::Board,
    types::{Color, PieceType},
};

/// Halfmove clock value at which either side may claim a draw.
pub const FIFTY_MOVE_RULE_HALFMOVES: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Ongoing,
    /// The side to move is checkmated, so `winner` is the other side
    Checkmate { winner: Color },
    Stalemate,
    FiftyMoveRule,
    InsufficientMaterial,
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        self != GameStatus::Ongoing
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Ongoing => write!(f, "ongoing"),
            GameStatus::Checkmate { winner } => write!(f, "checkmate, {winner:?} wins"),
            GameStatus::Stalemate => write!(f, "stalemate"),
            GameStatus::FiftyMoveRule => write!(f, "draw by the fifty move rule"),
            GameStatus::InsufficientMaterial => write!(f, "draw by insufficient material"),
        }
    }
}

impl Board {
    /// Mate and stalemate take precedence over the clock and material draws.
    pub fn status(&mut self) -> GameStatus {
        if self.legal_moves().is_empty() {
            return if self.is_in_check(self.side_to_move) {
                GameStatus::Checkmate {
                    winner: !self.side_to_move,
                }
            } else {
                GameStatus::Stalemate
            };
        }

        if self.halfmove_clock >= FIFTY_MOVE_RULE_HALFMOVES {
            GameStatus::FiftyMoveRule
        } else if self.has_insufficient_material() {
            GameStatus::InsufficientMaterial
        } else {
            GameStatus::Ongoing
        }
    }

    /// Neither side can mate: bare kings, a single minor piece, or only bishops all on one square color.
    pub fn has_insufficient_material(&self) -> bool {
        let mut minors = 0;
        let mut knights = 0;
        let mut bishop_square_colors = [false; 2];

        for (square, piece) in self.pieces() {
            match piece.piece_type {
                PieceType::King => {}
                PieceType::Knight => {
                    minors += 1;
                    knights += 1;
                }
                PieceType::Bishop => {
                    minors += 1;
                    bishop_square_colors[square.is_light() as usize] = true;
                }
                PieceType::Pawn | PieceType::Rook | PieceType::Queen => return false,
            }
        }

        match minors {
            0 | 1 => true,
            _ => knights == 0 && !(bishop_square_colors[0] && bishop_square_colors[1]),
        }
    }
}
