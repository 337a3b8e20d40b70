use std::fmt;

use log::trace;

use crate::{
    board::Board,
    error::{Error, Result},
    types::{CastlingRights, Color, Piece, PieceType, Square},
};

/// Tags follow the flag layout of https://www.chessprogramming.org/Encoding_Moves, minus the promotion piece
/// which lives in [Move::promotion].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveKind {
    #[default]
    Quiet,
    DoublePawnPush,
    KingCastle,
    QueenCastle,
    Capture,
    EnPassant,
    Promotion,
    PromotionCapture,
}

impl MoveKind {
    pub const fn is_capture(self) -> bool {
        matches!(self, MoveKind::Capture | MoveKind::EnPassant | MoveKind::PromotionCapture)
    }

    pub const fn is_promotion(self) -> bool {
        matches!(self, MoveKind::Promotion | MoveKind::PromotionCapture)
    }

    pub const fn is_castle(self) -> bool {
        matches!(self, MoveKind::KingCastle | MoveKind::QueenCastle)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
    pub kind: MoveKind,
}

impl Move {
    pub const fn new(from: Square, to: Square, kind: MoveKind) -> Move {
        Move {
            from,
            to,
            promotion: None,
            kind,
        }
    }

    pub const fn new_promotion(from: Square, to: Square, promotion: PieceType, capture: bool) -> Move {
        Move {
            from,
            to,
            promotion: Some(promotion),
            kind: if capture {
                MoveKind::PromotionCapture
            } else {
                MoveKind::Promotion
            },
        }
    }

    #[inline]
    pub const fn is_capture(&self) -> bool {
        self.kind.is_capture()
    }

    #[inline]
    pub const fn is_promotion(&self) -> bool {
        self.kind.is_promotion()
    }

    #[inline]
    pub const fn is_castle(&self) -> bool {
        self.kind.is_castle()
    }

    /// Coordinate notation, e.g. `e2e4` or `e7e8q`. Castling is written as the king's move.
    pub fn simple_long_algebraic_notation(&self) -> String {
        match self.promotion {
            Some(piece_type) => format!("{}{}{}", self.from, self.to, piece_type.to_char()),
            None => format!("{}{}", self.from, self.to),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_long_algebraic_notation())
    }
}

/// Everything needed to take back one move. Only [Board::unmake_move] reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoRecord {
    r#move: Move,
    moved_piece: Piece,
    // Only set when a piece is actually captured
    captured_piece: Option<Piece>,
    castling_rights: CastlingRights,
    en_passant_target: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u16,
}

impl UndoRecord {
    pub fn played_move(&self) -> Move {
        self.r#move
    }

    pub fn moved_piece(&self) -> Piece {
        self.moved_piece
    }

    pub fn captured_piece(&self) -> Option<Piece> {
        self.captured_piece
    }
}

/// A stack of undo records for callers that make several moves before unmaking them.
#[derive(Debug, Default)]
pub struct MoveRollback {
    records: Vec<UndoRecord>,
}

impl MoveRollback {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn push(&mut self, record: UndoRecord) {
        self.records.push(record);
    }

    pub fn pop(&mut self) -> Option<UndoRecord> {
        self.records.pop()
    }

    pub fn moves(&self) -> impl Iterator<Item = Move> + '_ {
        self.records.iter().map(|r| r.r#move)
    }
}

/// Square of the pawn removed by an en passant capture: the target's file on the capturer's rank.
#[inline]
fn en_passant_victim_square(r#move: &Move) -> Square {
    Square::from_index_unchecked((r#move.from.rank() * 8 + r#move.to.file()) as u8)
}

/// Rook origin and destination for a castle. `to` is the king's destination.
#[inline]
fn castle_rook_squares(kind: MoveKind, king_to: Square) -> (Square, Square) {
    let rank_base = king_to.rank() * 8;
    if kind == MoveKind::KingCastle {
        (
            Square::from_index_unchecked(rank_base + 7),
            Square::from_index_unchecked(rank_base + 5),
        )
    } else {
        (
            Square::from_index_unchecked(rank_base),
            Square::from_index_unchecked(rank_base + 3),
        )
    }
}

impl Board {
    /// Rejects promotion pieces that are missing, not N/B/R/Q, or given to a move that does not promote.
    pub fn check_promotion(&self, r#move: &Move) -> Result<()> {
        let Some(moved) = self.piece_at(r#move.from) else {
            return Ok(());
        };
        let reaches_last_rank =
            moved.piece_type == PieceType::Pawn && r#move.to.rank() == moved.color.promotion_rank();

        match (reaches_last_rank, r#move.promotion) {
            (true, None) => Err(Error::InvalidPromotion(format!(
                "Pawn move {} reaches the last rank without a promotion piece",
                r#move
            ))),
            (true, Some(piece_type)) if !piece_type.is_promotion_target() => Err(Error::InvalidPromotion(format!(
                "Pawn move {} cannot promote to a {piece_type:?}",
                r#move
            ))),
            (false, Some(piece_type)) => Err(Error::InvalidPromotion(format!(
                "Move {} does not reach the last rank but asks to promote to a {piece_type:?}",
                r#move
            ))),
            (true, Some(_)) if !r#move.is_promotion() => Err(Error::InvalidPromotion(format!(
                "Move {} promotes but is not tagged as a promotion",
                r#move
            ))),
            (false, None) if r#move.is_promotion() => Err(Error::InvalidPromotion(format!(
                "Move {} is tagged as a promotion but does not promote",
                r#move
            ))),
            _ => Ok(()),
        }
    }

    /// Rejects moves whose tag does not fit the pieces on the board. King safety is not checked here.
    fn check_move_shape(&self, r#move: &Move, moved: Piece) -> Result<()> {
        let target = self.piece_at(r#move.to);
        let shape_ok = match r#move.kind {
            MoveKind::Quiet | MoveKind::Promotion => target.is_none(),
            MoveKind::DoublePawnPush => {
                target.is_none()
                    && moved.piece_type == PieceType::Pawn
                    && r#move.from.rank() == moved.color.pawn_start_rank()
                    && r#move.from.file() == r#move.to.file()
                    && r#move.from.rank().abs_diff(r#move.to.rank()) == 2
            }
            MoveKind::KingCastle | MoveKind::QueenCastle => {
                let (rook_from, _) = castle_rook_squares(r#move.kind, r#move.to);
                target.is_none()
                    && moved.piece_type == PieceType::King
                    && self.piece_at(rook_from) == Some(Piece::new(PieceType::Rook, moved.color))
            }
            MoveKind::Capture | MoveKind::PromotionCapture => {
                target.is_some_and(|p| p.color != moved.color && p.piece_type != PieceType::King)
            }
            MoveKind::EnPassant => {
                moved.piece_type == PieceType::Pawn
                    && Some(r#move.to) == self.en_passant_target
                    && target.is_none()
                    && self.piece_at(en_passant_victim_square(r#move))
                        == Some(Piece::new(PieceType::Pawn, !moved.color))
            }
        };

        if shape_ok {
            Ok(())
        } else {
            Err(Error::IllegalMove(format!(
                "Move {} tagged {:?} does not fit the position",
                r#move, r#move.kind
            )))
        }
    }

    /// Applies a move without checking whether it leaves the mover's king attacked.
    ///
    /// On error the board is untouched. The returned record is the only way to take the move back.
    pub fn make_move(&mut self, r#move: &Move) -> Result<UndoRecord> {
        let Some(moved) = self.piece_at(r#move.from) else {
            return Err(Error::IllegalMove(format!("Move {} starts on an empty square", r#move)));
        };
        if moved.color != self.side_to_move {
            return Err(Error::IllegalMove(format!(
                "Move {} moves a {:?} piece but it is {:?} to move",
                r#move, moved.color, self.side_to_move
            )));
        }
        self.check_promotion(r#move)?;
        self.check_move_shape(r#move, moved)?;

        let from = r#move.from;
        let to = r#move.to;
        let color = moved.color;

        let captured_piece = match r#move.kind {
            MoveKind::EnPassant => self.squares[en_passant_victim_square(r#move).index()].take(),
            MoveKind::Capture | MoveKind::PromotionCapture => self.squares[to.index()].take(),
            _ => None,
        };

        let record = UndoRecord {
            r#move: *r#move,
            moved_piece: moved,
            captured_piece,
            castling_rights: self.castling_rights,
            en_passant_target: self.en_passant_target,
            halfmove_clock: self.halfmove_clock,
            fullmove_number: self.fullmove_number,
        };

        let placed = match r#move.promotion {
            Some(piece_type) => Piece::new(piece_type, color),
            None => moved,
        };
        self.squares[from.index()] = None;
        self.squares[to.index()] = Some(placed);

        if r#move.is_castle() {
            let (rook_from, rook_to) = castle_rook_squares(r#move.kind, to);
            self.squares[rook_to.index()] = self.squares[rook_from.index()].take();
        }

        if moved.piece_type == PieceType::King {
            self.king_squares[color.index()] = to;
            self.castling_rights.remove(CastlingRights::both(color));
        }
        if !self.castling_rights.is_empty() {
            self.castling_rights.remove(CastlingRights::for_rook_corner(from));
            self.castling_rights.remove(CastlingRights::for_rook_corner(to));
        }

        self.en_passant_target = if r#move.kind == MoveKind::DoublePawnPush {
            Some(Square::from_index_unchecked(((from.index() + to.index()) / 2) as u8))
        } else {
            None
        };

        if captured_piece.is_some() || moved.piece_type == PieceType::Pawn {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        if color == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }
        self.side_to_move = !color;

        trace!("made move {}", r#move);
        Ok(record)
    }

    /// Restores the position from before the move that produced `record`.
    ///
    /// Records must be unmade in the reverse order they were made.
    pub fn unmake_move(&mut self, record: &UndoRecord) {
        let r#move = &record.r#move;
        let color = record.moved_piece.color;
        debug_assert_eq!(self.side_to_move, !color);

        self.squares[r#move.to.index()] = None;
        self.squares[r#move.from.index()] = Some(record.moved_piece);

        match r#move.kind {
            MoveKind::EnPassant => {
                self.squares[en_passant_victim_square(r#move).index()] = record.captured_piece;
            }
            MoveKind::Capture | MoveKind::PromotionCapture => {
                self.squares[r#move.to.index()] = record.captured_piece;
            }
            MoveKind::KingCastle | MoveKind::QueenCastle => {
                let (rook_from, rook_to) = castle_rook_squares(r#move.kind, r#move.to);
                self.squares[rook_from.index()] = self.squares[rook_to.index()].take();
            }
            _ => {}
        }

        if record.moved_piece.piece_type == PieceType::King {
            self.king_squares[color.index()] = r#move.from;
        }

        self.castling_rights = record.castling_rights;
        self.en_passant_target = record.en_passant_target;
        self.halfmove_clock = record.halfmove_clock;
        self.fullmove_number = record.fullmove_number;
        self.side_to_move = color;
    }

    pub fn make_move_with_rollback(&mut self, r#move: &Move, rollback: &mut MoveRollback) -> Result<()> {
        let record = self.make_move(r#move)?;
        rollback.push(record);
        Ok(())
    }

    /// Unmakes the most recent move on `rollback`, returning it. `None` when there is nothing to unmake.
    pub fn unmake_move_with_rollback(&mut self, rollback: &mut MoveRollback) -> Option<Move> {
        let record = rollback.pop()?;
        self.unmake_move(&record);
        Some(record.r#move)
    }
}

#[cfg(test)]
mod moves_tests {
    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn make_and_check_unmake(fen: &str, r#move: Move, expected_fen: &str) {
        let mut board = Board::from_fen(fen).unwrap();
        let original = board.clone();

        let record = board.make_move(&r#move).unwrap();
        assert_eq!(board.to_fen(), expected_fen);
        assert_eq!(Board::from_fen(expected_fen).unwrap(), board);

        board.unmake_move(&record);
        assert_eq!(board, original);
    }

    #[test]
    pub fn double_push_sets_en_passant_target() {
        let mut board = Board::starting_position();
        board
            .make_move(&Move::new(sq("e2"), sq("e4"), MoveKind::DoublePawnPush))
            .unwrap();
        assert_eq!(board.en_passant_target(), Some(sq("e3")));
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.fullmove_number(), 1);

        board.make_move(&Move::new(sq("g8"), sq("f6"), MoveKind::Quiet)).unwrap();
        assert_eq!(board.en_passant_target(), None);
        assert_eq!(board.fullmove_number(), 2);
        assert_eq!(board.halfmove_clock(), 1);
    }

    #[test]
    pub fn quiet_and_double_push() {
        make_and_check_unmake(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Move::new(sq("e2"), sq("e4"), MoveKind::DoublePawnPush),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1",
        );
        make_and_check_unmake(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Move::new(sq("g1"), sq("f3"), MoveKind::Quiet),
            "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1",
        );
    }

    #[test]
    pub fn captures_reset_halfmove_clock() {
        make_and_check_unmake(
            "rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 3 2",
            Move::new(sq("e4"), sq("d5"), MoveKind::Capture),
            "rnbqkbnr/ppp1pppp/8/3P4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 2",
        );
    }

    #[test]
    pub fn en_passant_capture_removes_passed_pawn() {
        make_and_check_unmake(
            "r1bqkbnr/pppppp1p/2n5/6pP/8/8/PPPPPPP1/RNBQKBNR w KQkq g6 0 3",
            Move::new(sq("h5"), sq("g6"), MoveKind::EnPassant),
            "r1bqkbnr/pppppp1p/2n3P1/8/8/8/PPPPPPP1/RNBQKBNR b KQkq - 0 3",
        );
        make_and_check_unmake(
            "4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1",
            Move::new(sq("d4"), sq("e3"), MoveKind::EnPassant),
            "4k3/8/8/8/8/4p3/8/4K3 w - - 0 2",
        );
    }

    #[test]
    pub fn castling_moves_rook() {
        make_and_check_unmake(
            "rnbqkbnr/ppp2ppp/3p4/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4",
            Move::new(Square::E1, Square::G1, MoveKind::KingCastle),
            "rnbqkbnr/ppp2ppp/3p4/4p3/2B1P3/5N2/PPPP1PPP/RNBQ1RK1 b kq - 1 4",
        );
        make_and_check_unmake(
            "r3kbnr/ppp1pppp/2nq4/3p4/3P1Bb1/2N2N1P/PPP1PPP1/R2QKB1R b KQkq - 0 5",
            Move::new(Square::E8, Square::C8, MoveKind::QueenCastle),
            "2kr1bnr/ppp1pppp/2nq4/3p4/3P1Bb1/2N2N1P/PPP1PPP1/R2QKB1R w KQ - 1 6",
        );
    }

    #[test]
    pub fn rook_moves_and_captures_clear_rights() {
        make_and_check_unmake(
            "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1",
            Move::new(Square::H1, Square::H8, MoveKind::Capture),
            "r3k2R/8/8/8/8/8/8/R3K3 b Qq - 0 1",
        );
        make_and_check_unmake(
            "r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1",
            Move::new(Square::A8, Square::B8, MoveKind::Quiet),
            "1r2k2r/8/8/8/8/8/8/R3K2R w KQk - 1 2",
        );
    }

    #[test]
    pub fn promotion_with_and_without_capture() {
        make_and_check_unmake(
            "8/7P/1k6/8/8/3K4/8/8 w - - 0 1",
            Move::new_promotion(sq("h7"), Square::H8, PieceType::Queen, false),
            "7Q/8/1k6/8/8/3K4/8/8 b - - 0 1",
        );
        make_and_check_unmake(
            "6n1/7P/1k6/8/8/3K4/8/8 w - - 0 1",
            Move::new_promotion(sq("h7"), Square::G8, PieceType::Knight, true),
            "6N1/8/1k6/8/8/3K4/8/8 b - - 0 1",
        );
    }

    #[test]
    pub fn missing_promotion_piece_is_rejected() {
        let mut board = Board::from_fen("8/7P/1k6/8/8/3K4/8/8 w - - 0 1").unwrap();
        let original = board.clone();

        let result = board.make_move(&Move::new(sq("h7"), Square::H8, MoveKind::Quiet));
        assert!(matches!(result, Err(Error::InvalidPromotion(_))), "{result:?}");

        let result = board.make_move(&Move {
            from: sq("h7"),
            to: Square::H8,
            promotion: None,
            kind: MoveKind::Promotion,
        });
        assert!(matches!(result, Err(Error::InvalidPromotion(_))), "{result:?}");

        let result = board.make_move(&Move::new_promotion(sq("h7"), Square::H8, PieceType::King, false));
        assert!(matches!(result, Err(Error::InvalidPromotion(_))), "{result:?}");

        let result = board.make_move(&Move::new_promotion(sq("h7"), Square::H8, PieceType::Pawn, false));
        assert!(matches!(result, Err(Error::InvalidPromotion(_))), "{result:?}");

        assert_eq!(board, original);
    }

    #[test]
    pub fn black_pawn_promotes_on_first_rank() {
        let mut board = Board::from_fen("8/8/1k6/8/8/3K4/p7/8 b - - 0 1").unwrap();
        let result = board.make_move(&Move::new(sq("a2"), Square::A1, MoveKind::Quiet));
        assert!(matches!(result, Err(Error::InvalidPromotion(_))));

        board
            .make_move(&Move::new_promotion(sq("a2"), Square::A1, PieceType::Rook, false))
            .unwrap();
        assert_eq!(board.to_fen(), "8/8/1k6/8/8/3K4/8/r7 w - - 0 2");
    }

    #[test]
    pub fn promotion_piece_on_normal_move_is_rejected() {
        let mut board = Board::starting_position();
        let result = board.make_move(&Move {
            from: sq("e2"),
            to: sq("e3"),
            promotion: Some(PieceType::Queen),
            kind: MoveKind::Quiet,
        });
        assert!(matches!(result, Err(Error::InvalidPromotion(_))));
    }

    #[test]
    pub fn malformed_moves_are_rejected() {
        let mut board = Board::starting_position();
        let original = board.clone();

        for (r#move, description) in [
            (Move::new(sq("e4"), sq("e5"), MoveKind::Quiet), "empty origin"),
            (Move::new(sq("e7"), sq("e5"), MoveKind::DoublePawnPush), "wrong side"),
            (Move::new(sq("d1"), sq("d2"), MoveKind::Capture), "capturing own piece"),
            (Move::new(sq("e2"), sq("d3"), MoveKind::EnPassant), "no en passant target"),
            (Move::new(Square::E1, Square::G1, MoveKind::KingCastle), "castling through pieces"),
        ] {
            let result = board.make_move(&r#move);
            assert!(matches!(result, Err(Error::IllegalMove(_))), "{description}: {result:?}");
            assert_eq!(board, original, "{description}");
        }
    }

    #[test]
    pub fn rollback_stack() {
        let mut board = Board::starting_position();
        let mut rollback = MoveRollback::default();

        for (from, to, kind) in [
            ("e2", "e4", MoveKind::DoublePawnPush),
            ("d7", "d5", MoveKind::DoublePawnPush),
            ("e4", "d5", MoveKind::Capture),
            ("d8", "d5", MoveKind::Capture),
        ] {
            board
                .make_move_with_rollback(&Move::new(sq(from), sq(to), kind), &mut rollback)
                .unwrap();
        }

        assert_eq!(rollback.len(), 4);
        assert_eq!(board.to_fen(), "rnb1kbnr/ppp1pppp/8/3q4/8/8/PPPP1PPP/RNBQKBNR w KQkq - 0 3");
        assert_eq!(
            rollback.moves().map(|m| m.to_string()).collect::<Vec<_>>(),
            vec!["e2e4", "d7d5", "e4d5", "d8d5"]
        );

        while board.unmake_move_with_rollback(&mut rollback).is_some() {}

        assert!(rollback.is_empty());
        assert_eq!(board, Board::starting_position());
    }

    #[test]
    pub fn undo_record_describes_the_move() {
        let mut board = Board::from_fen("4k3/8/8/8/3pP3/8/8/4K3 b - e3 0 1").unwrap();
        let en_passant = Move::new(sq("d4"), sq("e3"), MoveKind::EnPassant);

        let record = board.make_move(&en_passant).unwrap();
        assert_eq!(record.played_move(), en_passant);
        assert_eq!(record.moved_piece(), Piece::new(PieceType::Pawn, Color::Black));
        assert_eq!(record.captured_piece(), Some(Piece::new(PieceType::Pawn, Color::White)));
        board.unmake_move(&record);

        let record = board.make_move(&Move::new(Square::E8, sq("d7"), MoveKind::Quiet)).unwrap();
        assert_eq!(record.moved_piece(), Piece::new(PieceType::King, Color::Black));
        assert_eq!(record.captured_piece(), None);
    }

    #[test]
    pub fn move_notation() {
        assert_eq!(Move::new(sq("e2"), sq("e4"), MoveKind::DoublePawnPush).to_string(), "e2e4");
        assert_eq!(
            Move::new_promotion(sq("b7"), Square::A8, PieceType::Queen, true).to_string(),
            "b7a8q"
        );
    }
}
