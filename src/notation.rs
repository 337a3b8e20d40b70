use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::{
    board::Board,
    error::{Error, Result},
    moves::{Move, MoveKind},
    types::{PieceType, Square},
};

static UCI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-h][1-8])([a-h][1-8])([nbrqkpNBRQKP])?$").unwrap());

static SAN_CASTLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([O0]-[O0])(-[O0])?[+#]?$").unwrap());

// Promotion letters outside N/B/R/Q still match so they can be reported as bad promotions
static SAN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([NBRQK])?([a-h])?([1-8])?(x)?([a-h][1-8])(?:=?([NBRQKP]))?[+#]?$").unwrap());

fn parse_square(text: &str) -> Result<Square> {
    text.parse()
}

impl Board {
    /// Coordinate notation such as `e2e4` or `e7e8q`, resolved against the legal moves.
    pub fn parse_uci_move(&mut self, text: &str) -> Result<Move> {
        let Some(captures) = UCI_PATTERN.captures(text) else {
            return Err(Error::Parse(format!("'{text}' is not a coordinate move")));
        };

        let from = parse_square(&captures[1])?;
        let to = parse_square(&captures[2])?;
        let promotion = captures
            .get(3)
            .and_then(|m| m.as_str().chars().next())
            .and_then(PieceType::from_char);

        let between: Vec<Move> = self
            .legal_moves()
            .into_iter()
            .filter(|m| m.from == from && m.to == to)
            .collect();
        if between.is_empty() {
            return Err(Error::IllegalMove(format!("'{text}' is not legal in {}", self.to_fen())));
        }

        let requested = Move {
            from,
            to,
            promotion,
            kind: if promotion.is_some() { MoveKind::Promotion } else { MoveKind::Quiet },
        };
        self.check_promotion(&requested)?;

        between
            .into_iter()
            .find(|m| m.promotion == promotion)
            .ok_or_else(|| Error::IllegalMove(format!("'{text}' is not legal in {}", self.to_fen())))
    }

    /// Standard algebraic notation such as `Nbd7`, `exd6`, `e8=Q+` or `O-O-O`.
    ///
    /// Check and mate suffixes are accepted but not verified, and a missing `x` on a capture is tolerated.
    pub fn parse_san(&mut self, text: &str) -> Result<Move> {
        if let Some(captures) = SAN_CASTLE_PATTERN.captures(text) {
            let kind = if captures.get(2).is_some() {
                MoveKind::QueenCastle
            } else {
                MoveKind::KingCastle
            };

            return self
                .legal_moves()
                .into_iter()
                .find(|m| m.kind == kind)
                .ok_or_else(|| Error::IllegalMove(format!("'{text}' is not legal in {}", self.to_fen())));
        }

        let Some(captures) = SAN_PATTERN.captures(text) else {
            return Err(Error::Parse(format!("'{text}' is not a SAN move")));
        };

        let piece_type = captures
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(PieceType::from_char)
            .unwrap_or(PieceType::Pawn);
        let from_file = captures.get(2).map(|m| m.as_str().as_bytes()[0] - b'a');
        let from_rank = captures.get(3).map(|m| m.as_str().as_bytes()[0] - b'1');
        let to = parse_square(&captures[5])?;
        let promotion = captures
            .get(6)
            .and_then(|m| m.as_str().chars().next())
            .and_then(PieceType::from_char);

        let candidates: Vec<Move> = self
            .legal_moves()
            .into_iter()
            .filter(|m| {
                m.to == to
                    && from_file.is_none_or(|file| m.from.file() == file)
                    && from_rank.is_none_or(|rank| m.from.rank() == rank)
                    && self.piece_at(m.from).is_some_and(|p| p.piece_type == piece_type)
            })
            .collect();
        if candidates.is_empty() {
            return Err(Error::IllegalMove(format!("'{text}' is not legal in {}", self.to_fen())));
        }

        // Only a move that can be made gets its promotion piece checked
        let promotes = piece_type == PieceType::Pawn && to.rank() == self.side_to_move.promotion_rank();
        match (promotes, promotion) {
            (true, None) => {
                return Err(Error::InvalidPromotion(format!("'{text}' reaches the last rank without a promotion piece")));
            }
            (true, Some(p)) if !p.is_promotion_target() => {
                return Err(Error::InvalidPromotion(format!("'{text}' cannot promote to a {p:?}")));
            }
            (false, Some(_)) => {
                return Err(Error::InvalidPromotion(format!("'{text}' does not reach the last rank")));
            }
            _ => {}
        }

        let candidates: Vec<Move> = candidates.into_iter().filter(|m| m.promotion == promotion).collect();

        match candidates.as_slice() {
            [] => Err(Error::IllegalMove(format!("'{text}' is not legal in {}", self.to_fen()))),
            [r#move] => Ok(*r#move),
            several => {
                debug!("'{text}' matches {} moves", several.len());
                Err(Error::AmbiguousMove(format!(
                    "'{text}' matches {}",
                    several.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ")
                )))
            }
        }
    }

    /// Accepts either coordinate notation or SAN.
    pub fn parse_move(&mut self, text: &str) -> Result<Move> {
        if UCI_PATTERN.is_match(text) {
            self.parse_uci_move(text)
        } else {
            self.parse_san(text)
        }
    }

    /// Writes a legal move in SAN with the minimal disambiguation and a check or mate suffix.
    pub fn to_san(&mut self, r#move: &Move) -> Result<String> {
        let legal_moves = self.legal_moves();
        if !legal_moves.contains(r#move) {
            return Err(Error::IllegalMove(format!("{} is not legal in {}", r#move, self.to_fen())));
        }

        let mut san = match r#move.kind {
            MoveKind::KingCastle => String::from("O-O"),
            MoveKind::QueenCastle => String::from("O-O-O"),
            _ => {
                let Some(moved) = self.piece_at(r#move.from) else {
                    return Err(Error::IllegalMove(format!("{} starts on an empty square", r#move)));
                };

                let mut san = String::new();
                if moved.piece_type == PieceType::Pawn {
                    if r#move.is_capture() {
                        san.push(r#move.from.file_char());
                    }
                } else {
                    san.push(moved.piece_type.to_char().to_ascii_uppercase());

                    let rivals: Vec<Square> = legal_moves
                        .iter()
                        .filter(|m| {
                            m.to == r#move.to
                                && m.from != r#move.from
                                && self.piece_at(m.from).is_some_and(|p| p.piece_type == moved.piece_type)
                        })
                        .map(|m| m.from)
                        .collect();

                    if !rivals.is_empty() {
                        if rivals.iter().all(|s| s.file() != r#move.from.file()) {
                            san.push(r#move.from.file_char());
                        } else if rivals.iter().all(|s| s.rank() != r#move.from.rank()) {
                            san.push(r#move.from.rank_char());
                        } else {
                            san.push_str(&r#move.from.to_string());
                        }
                    }
                }

                if r#move.is_capture() {
                    san.push('x');
                }
                san.push_str(&r#move.to.to_string());

                if let Some(piece_type) = r#move.promotion {
                    san.push('=');
                    san.push(piece_type.to_char().to_ascii_uppercase());
                }

                san
            }
        };

        let record = self.make_move(r#move)?;
        if self.is_in_check(self.side_to_move) {
            san.push(if self.legal_moves().is_empty() { '#' } else { '+' });
        }
        self.unmake_move(&record);

        Ok(san)
    }
}
