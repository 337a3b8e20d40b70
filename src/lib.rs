pub mod attacks;
pub mod board;
pub mod error;
pub mod move_generator;
pub mod moves;
pub mod notation;
pub mod perft;
pub mod status;
pub mod types;

pub use board::Board;
pub use error::{Error, Result};
pub use move_generator::MoveList;
pub use moves::{Move, MoveKind, MoveRollback, UndoRecord};
pub use perft::PerftStats;
pub use status::GameStatus;
pub use types::{CastlingRights, Color, Piece, PieceType, Square};

pub static STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
