use std::{fmt::Debug, str::FromStr};

use array_macro::array;
use log::debug;

use crate::{
    error::{Error, Result},
    types::{CastlingRights, Color, Piece, PieceType, Square},
};

pub const MAX_PIECES_PER_SIDE: usize = 16;

const BACK_RANK: [PieceType; 8] = [
    PieceType::Rook,
    PieceType::Knight,
    PieceType::Bishop,
    PieceType::Queen,
    PieceType::King,
    PieceType::Bishop,
    PieceType::Knight,
    PieceType::Rook,
];

// little endian file-rank mapping https://www.chessprogramming.org/Square_Mapping_Considerations
// The 10x12 mailbox is only used to detect moves that leave the board, squares themselves are stored 8x8.
pub(crate) static BOARD_SQUARE_INDEX_TRANSLATION_64: [u8; 64] = array![i => mailbox_index_for(i); 64];
pub(crate) static MAILBOX_SQUARE_INDEX_TRANSLATION_120: [i8; 120] = array![i => board_index_for(i); 120];

const fn mailbox_index_for(index_64: usize) -> u8 {
    (21 + (index_64 / 8) * 10 + index_64 % 8) as u8
}

const fn board_index_for(index_120: usize) -> i8 {
    let file = index_120 % 10;
    let rank = index_120 / 10;
    if file >= 1 && file <= 8 && rank >= 2 && rank <= 9 {
        ((rank - 2) * 8 + file - 1) as i8
    } else {
        -1
    }
}

/// Steps `offset` through the 10x12 mailbox, `None` when that walks off the board.
#[inline]
pub(crate) fn offset_square(square: Square, offset: i8) -> Option<Square> {
    // Mailbox indices are 21..=98 and offsets at most 21 so this never leaves 0..120
    let target = BOARD_SQUARE_INDEX_TRANSLATION_64[square.index()] as i16 + offset as i16;
    let index = MAILBOX_SQUARE_INDEX_TRANSLATION_120[target as usize];
    if index < 0 {
        None
    } else {
        Some(Square::from_index_unchecked(index as u8))
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Board {
    pub(crate) squares: [Option<Piece>; 64],
    pub(crate) side_to_move: Color,
    pub(crate) castling_rights: CastlingRights,
    pub(crate) en_passant_target: Option<Square>,
    pub(crate) halfmove_clock: u16,
    pub(crate) fullmove_number: u16,
    /// Indexed by [Color::index]. Derived from `squares`, kept in sync by make and unmake.
    pub(crate) king_squares: [Square; 2],
}

impl Board {
    pub fn starting_position() -> Board {
        let mut squares = [None; 64];
        for (file, piece_type) in BACK_RANK.iter().enumerate() {
            squares[file] = Some(Piece::new(*piece_type, Color::White));
            squares[8 + file] = Some(Piece::new(PieceType::Pawn, Color::White));
            squares[48 + file] = Some(Piece::new(PieceType::Pawn, Color::Black));
            squares[56 + file] = Some(Piece::new(*piece_type, Color::Black));
        }

        Board {
            squares,
            side_to_move: Color::White,
            castling_rights: CastlingRights::ALL,
            en_passant_target: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            king_squares: [Square::E1, Square::E8],
        }
    }

    /// Parses a FEN string. The move counters may be omitted, they then default to `0 1`.
    pub fn from_fen(fen: &str) -> Result<Board> {
        let board = Board::parse_fen(fen).map_err(|e| {
            debug!("Rejected FEN '{fen}': {e}");
            e
        })?;

        Ok(board)
    }

    fn parse_fen(fen: &str) -> Result<Board> {
        if !fen.is_ascii() {
            return Err(Error::Parse(String::from(
                "Expected FEN to only contain ASCII characters",
            )));
        }

        let fen_pieces: Vec<&str> = fen.split_ascii_whitespace().collect();
        if fen_pieces.len() != 6 && fen_pieces.len() != 4 {
            return Err(Error::Parse(format!(
                "Expected FEN to have 4 or 6 space-delimited parts but it had {}",
                fen_pieces.len()
            )));
        }

        let mut board = Board {
            squares: [None; 64],
            side_to_move: Color::White,
            castling_rights: CastlingRights::NONE,
            en_passant_target: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            king_squares: [Square::E1, Square::E8],
        };

        let ranks: Vec<&str> = fen_pieces[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(Error::Parse(format!(
                "Expected piece placement to have 8 ranks but it had {}",
                ranks.len()
            )));
        }

        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file: u8 = 0;
            for c in rank_str.chars() {
                match c {
                    '1'..='8' => {
                        file += c as u8 - b'0';
                    }
                    _ => {
                        let Some(piece) = Piece::from_fen_char(c) else {
                            return Err(Error::Parse(format!(
                                "Encountered unexpected character {c} while processing piece placement"
                            )));
                        };
                        let Some(square) = Square::new(file, rank) else {
                            return Err(Error::Parse(format!("Rank {} has more than 8 files", rank + 1)));
                        };
                        board.squares[square.index()] = Some(piece);
                        file += 1;
                    }
                }

                if file > 8 {
                    return Err(Error::Parse(format!("Rank {} has more than 8 files", rank + 1)));
                }
            }

            if file != 8 {
                return Err(Error::Parse(format!(
                    "Rank {} describes {file} files instead of 8",
                    rank + 1
                )));
            }
        }

        board.side_to_move = match fen_pieces[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(Error::Parse(format!(
                    "Encountered unexpected Side to move value '{other}'"
                )));
            }
        };

        if fen_pieces[2] != "-" {
            for c in fen_pieces[2].chars() {
                let flag = match c {
                    'K' => CastlingRights::WHITE_KING,
                    'Q' => CastlingRights::WHITE_QUEEN,
                    'k' => CastlingRights::BLACK_KING,
                    'q' => CastlingRights::BLACK_QUEEN,
                    _ => {
                        return Err(Error::Parse(format!(
                            "Encountered unexpected character {c} while processing castling rights"
                        )));
                    }
                };
                if board.castling_rights.contains(flag) {
                    return Err(Error::Parse(format!("Castling right {c} is listed twice")));
                }
                board.castling_rights.insert(flag);
            }
        }

        if fen_pieces[3] != "-" {
            let square: Square = fen_pieces[3].parse()?;
            if square.rank() != 2 && square.rank() != 5 {
                return Err(Error::Parse(format!(
                    "En passant target square must be on rank 3 or 6 but was '{square}'"
                )));
            }
            board.en_passant_target = Some(square);
        }

        if fen_pieces.len() == 6 {
            board.halfmove_clock = fen_pieces[4].parse::<u16>().map_err(|e| {
                Error::Parse(format!(
                    "Encountered error while parsing halfmove counter value '{}': {e}",
                    fen_pieces[4]
                ))
            })?;
            board.fullmove_number = fen_pieces[5].parse::<u16>().map_err(|e| {
                Error::Parse(format!(
                    "Encountered error while parsing fullmove counter value '{}': {e}",
                    fen_pieces[5]
                ))
            })?;
        }

        board.validate()?;

        Ok(board)
    }

    /// Checks the position could occur in a game and caches the king squares.
    fn validate(&mut self) -> Result<()> {
        let mut piece_counts = [0usize; 2];
        let mut kings: [Option<Square>; 2] = [None, None];

        for (square, piece) in self.pieces() {
            piece_counts[piece.color.index()] += 1;

            match piece.piece_type {
                PieceType::King => {
                    if kings[piece.color.index()].is_some() {
                        return Err(Error::InvalidPosition(format!("{:?} has more than one king", piece.color)));
                    }
                    kings[piece.color.index()] = Some(square);
                }
                PieceType::Pawn if square.rank() == 0 || square.rank() == 7 => {
                    return Err(Error::InvalidPosition(format!("Pawn on back rank square {square}")));
                }
                _ => {}
            }
        }

        for color in [Color::White, Color::Black] {
            if piece_counts[color.index()] > MAX_PIECES_PER_SIDE {
                return Err(Error::InvalidPosition(format!(
                    "{color:?} has {} pieces, at most {MAX_PIECES_PER_SIDE} are allowed",
                    piece_counts[color.index()]
                )));
            }

            match kings[color.index()] {
                Some(square) => self.king_squares[color.index()] = square,
                None => return Err(Error::InvalidPosition(format!("{color:?} has no king"))),
            }
        }

        for (flag, king_home, rook_home, color) in [
            (CastlingRights::WHITE_KING, Square::E1, Square::H1, Color::White),
            (CastlingRights::WHITE_QUEEN, Square::E1, Square::A1, Color::White),
            (CastlingRights::BLACK_KING, Square::E8, Square::H8, Color::Black),
            (CastlingRights::BLACK_QUEEN, Square::E8, Square::A8, Color::Black),
        ] {
            if !self.castling_rights.contains(flag) {
                continue;
            }

            if self.piece_at(king_home) != Some(Piece::new(PieceType::King, color))
                || self.piece_at(rook_home) != Some(Piece::new(PieceType::Rook, color))
            {
                return Err(Error::InvalidPosition(format!(
                    "Castling right {flag} requires a king on {king_home} and a rook on {rook_home}"
                )));
            }
        }

        if let Some(target) = self.en_passant_target {
            // The pawn that just double pushed belongs to the side that is not moving
            let (expected_rank, pushed_rank, origin_rank) = match self.side_to_move {
                Color::White => (5, 4, 6),
                Color::Black => (2, 3, 1),
            };
            let pushed = Square::new(target.file(), pushed_rank);
            let origin = Square::new(target.file(), origin_rank);

            if target.rank() != expected_rank
                || self.piece_at(target).is_some()
                || origin.and_then(|s| self.piece_at(s)).is_some()
                || pushed.and_then(|s| self.piece_at(s)) != Some(Piece::new(PieceType::Pawn, !self.side_to_move))
            {
                return Err(Error::InvalidPosition(format!(
                    "En passant target {target} does not follow a double pawn push"
                )));
            }
        }

        let waiting = !self.side_to_move;
        if self.is_square_attacked(self.king_square(waiting), self.side_to_move) {
            return Err(Error::InvalidPosition(format!(
                "{waiting:?} is in check but it is {:?} to move",
                self.side_to_move
            )));
        }

        Ok(())
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::with_capacity(90);

        for rank in (0..8).rev() {
            let mut empty: u8 = 0;
            for file in 0..8 {
                match self.squares[rank * 8 + file] {
                    None => empty += 1,
                    Some(piece) => {
                        if empty > 0 {
                            fen.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        fen.push(piece.to_fen_char());
                    }
                }
            }

            if empty > 0 {
                fen.push((b'0' + empty) as char);
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        let side = match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        };
        let en_passant = match self.en_passant_target {
            Some(square) => square.to_string(),
            None => String::from("-"),
        };

        format!(
            "{fen} {side} {} {en_passant} {} {}",
            self.castling_rights, self.halfmove_clock, self.fullmove_number
        )
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    pub fn castling_rights(&self) -> CastlingRights {
        self.castling_rights
    }

    #[inline]
    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    #[inline]
    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    #[inline]
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.king_squares[color.index()]
    }

    /// Every occupied square from a1 to h8.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|square| self.piece_at(square).map(|piece| (square, piece)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Square, Piece)> + '_ {
        self.pieces().filter(move |(_, piece)| piece.color == color)
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::starting_position()
    }
}

impl FromStr for Board {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Board::from_fen(s)
    }
}

impl Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("squares", &"See end value")
            .field("side_to_move", &self.side_to_move)
            .field("castling_rights", &self.castling_rights)
            .field("en_passant_target", &self.en_passant_target)
            .field("halfmove_clock", &self.halfmove_clock)
            .field("fullmove_number", &self.fullmove_number)
            .field("king_squares", &self.king_squares)
            .finish()?;

        // Reverse so it prints with a1 in the bottom left like viewing the board as white
        let pretty_squares = self
            .squares
            .chunks_exact(8)
            .rev()
            .map(|rank| {
                rank.iter()
                    .map(|square| square.map_or('.', |p| p.to_fen_char()))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");

        writeln!(f, "\nsquares: \n{}", pretty_squares)
    }
}
