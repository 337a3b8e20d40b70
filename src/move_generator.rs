use log::{debug, error};
use tinyvec::TinyVec;

use crate::{
    attacks::{BISHOP_OFFSETS, KNIGHT_OFFSETS, ROOK_OFFSETS, ROYAL_OFFSETS, pawn_capture_offsets},
    board::{Board, offset_square},
    error::{Error, Result},
    moves::{Move, MoveKind, UndoRecord},
    types::{CastlingRights, Color, Piece, PieceType, Square},
};

/// Spills to the heap past 64 moves, which few positions reach.
pub type MoveList = TinyVec<[Move; 64]>;

type MovementRule = fn(&Board, Square, Color, &mut MoveList);

/// Pseudo-legal generators indexed by [PieceType::index].
static MOVEMENT_RULES: [MovementRule; 6] = [
    pawn_moves,
    knight_moves,
    bishop_moves,
    rook_moves,
    queen_moves,
    king_moves,
];

impl Board {
    /// Moves that obey piece movement rules but may leave the mover's king attacked.
    pub fn pseudo_legal_moves(&self) -> MoveList {
        let mut moves = MoveList::new();
        for (from, piece) in self.pieces_of(self.side_to_move) {
            MOVEMENT_RULES[piece.piece_type.index()](self, from, piece.color, &mut moves);
        }

        moves
    }

    /// Legal moves for the side to move, ordered by origin, then destination, then promotion piece.
    ///
    /// Each pseudo-legal move is made, the mover's king is tested, and the move is unmade, so the board
    /// is back to its original state when this returns.
    pub fn legal_moves(&mut self) -> MoveList {
        let mut moves = self.pseudo_legal_moves();
        let mover = self.side_to_move;

        moves.retain(|r#move| match self.make_move(r#move) {
            Ok(record) => {
                let legal = !self.is_in_check(mover);
                self.unmake_move(&record);
                legal
            }
            Err(e) => {
                error!("Generated move {} could not be made: {e}", r#move);
                false
            }
        });

        moves.sort_unstable_by_key(|m| (m.from, m.to, m.promotion));
        moves
    }

    pub fn is_legal(&mut self, r#move: &Move) -> bool {
        self.legal_moves().contains(r#move)
    }

    /// Makes `move` only if it is legal. Promotion problems are only reported once some legal move
    /// joins the same two squares, anything else is an illegal move.
    pub fn play(&mut self, r#move: &Move) -> Result<UndoRecord> {
        let legal_moves = self.legal_moves();
        if legal_moves.iter().any(|m| m.from == r#move.from && m.to == r#move.to) {
            self.check_promotion(r#move)?;
        }

        if !legal_moves.contains(r#move) {
            debug!("Rejected {} in {}", r#move, self.to_fen());
            return Err(Error::IllegalMove(format!(
                "{} is not legal in {}",
                r#move,
                self.to_fen()
            )));
        }

        self.make_move(r#move)
    }
}

fn push_pawn_move(from: Square, to: Square, color: Color, capture: bool, moves: &mut MoveList) {
    if to.rank() == color.promotion_rank() {
        for piece_type in PieceType::PROMOTIONS {
            moves.push(Move::new_promotion(from, to, piece_type, capture));
        }
    } else {
        let kind = if capture { MoveKind::Capture } else { MoveKind::Quiet };
        moves.push(Move::new(from, to, kind));
    }
}

fn pawn_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    let forward: i8 = match color {
        Color::White => 10,
        Color::Black => -10,
    };

    // Pawns never stand on the back ranks so the square ahead always exists
    if let Some(one_step) = offset_square(from, forward) {
        if board.piece_at(one_step).is_none() {
            push_pawn_move(from, one_step, color, false, moves);

            if from.rank() == color.pawn_start_rank() {
                if let Some(two_step) = offset_square(one_step, forward) {
                    if board.piece_at(two_step).is_none() {
                        moves.push(Move::new(from, two_step, MoveKind::DoublePawnPush));
                    }
                }
            }
        }
    }

    for offset in pawn_capture_offsets(color) {
        let Some(target) = offset_square(from, offset) else {
            continue;
        };

        match board.piece_at(target) {
            Some(piece) if piece.color != color => push_pawn_move(from, target, color, true, moves),
            None if board.en_passant_target == Some(target) => {
                moves.push(Move::new(from, target, MoveKind::EnPassant));
            }
            _ => {}
        }
    }
}

fn step_moves(board: &Board, from: Square, color: Color, offsets: &[i8], moves: &mut MoveList) {
    for &offset in offsets {
        let Some(target) = offset_square(from, offset) else {
            continue;
        };

        match board.piece_at(target) {
            None => moves.push(Move::new(from, target, MoveKind::Quiet)),
            Some(piece) if piece.color != color => moves.push(Move::new(from, target, MoveKind::Capture)),
            _ => {}
        }
    }
}

fn slide_moves(board: &Board, from: Square, color: Color, offsets: &[i8], moves: &mut MoveList) {
    for &offset in offsets {
        let mut current = from;
        while let Some(target) = offset_square(current, offset) {
            match board.piece_at(target) {
                None => moves.push(Move::new(from, target, MoveKind::Quiet)),
                Some(piece) => {
                    if piece.color != color {
                        moves.push(Move::new(from, target, MoveKind::Capture));
                    }
                    break;
                }
            }

            current = target;
        }
    }
}

fn knight_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    step_moves(board, from, color, &KNIGHT_OFFSETS, moves);
}

fn bishop_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    slide_moves(board, from, color, &BISHOP_OFFSETS, moves);
}

fn rook_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    slide_moves(board, from, color, &ROOK_OFFSETS, moves);
}

fn queen_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    slide_moves(board, from, color, &ROYAL_OFFSETS, moves);
}

fn king_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    step_moves(board, from, color, &ROYAL_OFFSETS, moves);
    castling_moves(board, from, color, moves);
}

/// Castling needs the right, empty squares up to the rook, and a king that does not start in,
/// pass through, or land on an attacked square.
fn castling_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    let rank_base = color.back_rank() * 8;
    let at = |file: u8| Square::from_index_unchecked(rank_base + file);

    if from != at(4) || board.castling_rights.is_empty() {
        return;
    }

    let enemy = !color;
    let rook = Some(Piece::new(PieceType::Rook, color));
    let empty = |files: &[u8]| files.iter().all(|&file| board.piece_at(at(file)).is_none());
    let safe = |files: &[u8]| files.iter().all(|&file| !board.is_square_attacked(at(file), enemy));

    if board.castling_rights.contains(CastlingRights::king_side(color))
        && board.piece_at(at(7)) == rook
        && empty(&[5, 6])
        && safe(&[4, 5, 6])
    {
        moves.push(Move::new(from, at(6), MoveKind::KingCastle));
    }

    if board.castling_rights.contains(CastlingRights::queen_side(color))
        && board.piece_at(at(0)) == rook
        && empty(&[1, 2, 3])
        && safe(&[4, 3, 2])
    {
        moves.push(Move::new(from, at(2), MoveKind::QueenCastle));
    }
}

#[cfg(test)]
mod move_generator_tests {
    use rand::{Rng, SeedableRng, rngs::StdRng};

    use crate::STARTING_FEN;

    use super::*;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn uci_strings(moves: &MoveList) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    pub fn starting_position_has_twenty_moves() {
        let mut board = Board::from_fen(STARTING_FEN).unwrap();
        let moves = board.legal_moves();

        assert_eq!(moves.len(), 20);
        assert_eq!(board, Board::starting_position());
        assert_eq!(moves.iter().filter(|m| m.kind == MoveKind::DoublePawnPush).count(), 8);
        assert_eq!(moves[0].to_string(), "b1a3");
        assert_eq!(moves[1].to_string(), "b1c3");
    }

    #[test]
    pub fn order_is_origin_then_destination() {
        let mut board = Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1").unwrap();
        let moves = board.legal_moves();

        assert_eq!(moves.len(), 48);
        for pair in moves.windows(2) {
            assert!((pair[0].from, pair[0].to, pair[0].promotion) < (pair[1].from, pair[1].to, pair[1].promotion));
        }
    }

    #[test]
    pub fn pinned_piece_cannot_expose_king() {
        // The e2 knight is pinned by the e8 rook
        let mut board = Board::from_fen("4r2k/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        let moves = board.legal_moves();

        assert!(moves.iter().all(|m| m.from != sq("e2")));
        assert_eq!(moves.len(), 4);
    }

    #[test]
    pub fn must_answer_check() {
        let mut board =
            Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/5PPq/8/PPPPP2P/RNBQKBNR w KQkq - 1 3").unwrap();
        let moves = board.legal_moves();

        // Fool's mate
        assert!(moves.is_empty());
        assert!(board.is_in_check(Color::White));
    }

    #[test]
    pub fn king_cannot_walk_into_attack() {
        let mut board = Board::from_fen("4k3/8/8/8/8/8/r7/4K3 w - - 0 1").unwrap();
        let moves = uci_strings(&board.legal_moves());

        assert_eq!(moves, vec!["e1d1", "e1f1"]);
    }

    #[test]
    pub fn en_passant_generated_and_cleared() {
        let mut board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2").unwrap();
        let moves = board.legal_moves();
        let en_passant = Move::new(sq("e5"), sq("d6"), MoveKind::EnPassant);
        assert!(moves.contains(&en_passant));

        board.play(&Move::new(Square::E1, Square::D1, MoveKind::Quiet)).unwrap();
        board.play(&Move::new(Square::E8, Square::D8, MoveKind::Quiet)).unwrap();
        assert!(board.legal_moves().iter().all(|m| m.kind != MoveKind::EnPassant));
    }

    #[test]
    pub fn en_passant_cannot_expose_king_along_rank() {
        let mut board = Board::from_fen("8/8/8/KPp4r/8/8/8/7k w - c6 0 1").unwrap();
        let moves = board.legal_moves();

        assert!(moves.iter().all(|m| m.kind != MoveKind::EnPassant));
        assert!(moves.contains(&Move::new(sq("b5"), sq("b6"), MoveKind::Quiet)));
    }

    #[test]
    pub fn castling_requires_safe_path() {
        let castles = |fen: &str| {
            let mut board = Board::from_fen(fen).unwrap();
            board
                .legal_moves()
                .iter()
                .filter(|m| m.is_castle())
                .map(|m| m.kind)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            castles("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"),
            vec![MoveKind::QueenCastle, MoveKind::KingCastle]
        );
        // f1 is attacked
        assert_eq!(castles("r3k2r/8/8/8/8/8/5r2/R3K2R w KQkq - 0 1"), vec![MoveKind::QueenCastle]);
        // In check
        assert_eq!(castles("r3k2r/8/8/8/8/8/4r3/R3K2R w KQkq - 0 1"), vec![]);
        // Only the rook passes the attacked b1
        assert_eq!(
            castles("1r2k2r/8/8/8/8/8/8/R3K2R w KQk - 0 1"),
            vec![MoveKind::QueenCastle, MoveKind::KingCastle]
        );
        // b1 is occupied
        assert_eq!(castles("r3k2r/8/8/8/8/8/8/RN2K2R w KQkq - 0 1"), vec![MoveKind::KingCastle]);
        // No rights
        assert_eq!(castles("r3k2r/8/8/8/8/8/8/R3K2R w kq - 0 1"), vec![]);
        // Black
        assert_eq!(
            castles("r3k2r/8/8/8/8/8/8/R3K2R b KQkq - 0 1"),
            vec![MoveKind::QueenCastle, MoveKind::KingCastle]
        );
    }

    #[test]
    pub fn castling_rejected_after_king_returns() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        for (from, to) in [("e1", "e2"), ("a8", "b8"), ("e2", "e1"), ("b8", "a8")] {
            board.play(&Move::new(sq(from), sq(to), MoveKind::Quiet)).unwrap();
        }

        assert_eq!(board.to_fen(), "r3k2r/8/8/8/8/8/8/R3K2R w k - 4 3");
        let result = board.play(&Move::new(Square::E1, Square::G1, MoveKind::KingCastle));
        assert!(matches!(result, Err(Error::IllegalMove(_))), "{result:?}");
        let result = board.play(&Move::new(Square::E1, Square::C1, MoveKind::QueenCastle));
        assert!(matches!(result, Err(Error::IllegalMove(_))), "{result:?}");
    }

    #[test]
    pub fn promotions_generate_all_four_pieces() {
        let mut board = Board::from_fen("1n5k/P7/8/8/8/8/8/7K w - - 0 1").unwrap();
        let moves = uci_strings(&board.legal_moves());

        assert_eq!(
            moves,
            vec![
                "h1g1", "h1g2", "h1h2", "a7a8n", "a7a8b", "a7a8r", "a7a8q", "a7b8n", "a7b8b", "a7b8r", "a7b8q",
            ]
        );
    }

    #[test]
    pub fn play_rejects_unlisted_moves() {
        let mut board = Board::starting_position();

        let result = board.play(&Move::new(sq("e2"), sq("e5"), MoveKind::Quiet));
        assert!(matches!(result, Err(Error::IllegalMove(_))));

        // Correct squares but the wrong tag is not the generated move
        let result = board.play(&Move::new(sq("e2"), sq("e4"), MoveKind::Quiet));
        assert!(matches!(result, Err(Error::IllegalMove(_))));

        assert_eq!(board, Board::starting_position());
        board.play(&Move::new(sq("e2"), sq("e4"), MoveKind::DoublePawnPush)).unwrap();
        assert_eq!(board.en_passant_target(), Some(sq("e3")));
    }

    #[test]
    pub fn unreachable_last_rank_is_illegal_not_bad_promotion() {
        let mut board = Board::starting_position();

        for r#move in [
            Move::new(sq("e2"), Square::E8, MoveKind::Quiet),
            Move::new_promotion(sq("e2"), Square::E8, PieceType::Queen, false),
            Move::new_promotion(sq("a2"), Square::A8, PieceType::King, true),
        ] {
            let result = board.play(&r#move);
            assert!(matches!(result, Err(Error::IllegalMove(_))), "{}: {result:?}", r#move);
        }
        assert_eq!(board, Board::starting_position());

        // Reachable squares still report the promotion problem
        let mut board = Board::from_fen("1n5k/P7/8/8/8/8/8/7K w - - 0 1").unwrap();
        let result = board.play(&Move::new(sq("a7"), Square::A8, MoveKind::Quiet));
        assert!(matches!(result, Err(Error::InvalidPromotion(_))), "{result:?}");
        let result = board.play(&Move::new_promotion(sq("a7"), Square::B8, PieceType::King, true));
        assert!(matches!(result, Err(Error::InvalidPromotion(_))), "{result:?}");
        let result = board.play(&Move::new(sq("h1"), sq("g1"), MoveKind::Quiet));
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    pub fn random_games_make_unmake_and_stay_legal() {
        let mut rng = StdRng::seed_from_u64(0x5EED);

        for _ in 0..20 {
            let mut board = Board::starting_position();

            for _ in 0..80 {
                let before = board.clone();
                let mover = board.side_to_move();
                let moves = board.legal_moves();
                assert_eq!(board, before, "legal_moves must leave the board unchanged");

                for m in moves.iter() {
                    let record = board.make_move(m).unwrap();
                    assert!(!board.is_in_check(mover), "{m} leaves the king attacked in {}", before.to_fen());
                    board.unmake_move(&record);
                    assert_eq!(board, before, "unmake of {m} did not restore {}", before.to_fen());
                }

                assert_eq!(Board::from_fen(&board.to_fen()).unwrap(), board);

                if moves.is_empty() {
                    break;
                }
                let chosen = moves[rng.gen_range(0..moves.len())];
                board.play(&chosen).unwrap();
            }
        }
    }
}
