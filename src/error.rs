use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything the core can reject. Each variant carries a message for whoever reports it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// The position is well formed but cannot occur in a legal game
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    /// FEN, square or move text could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The move is not in the legal move set of the position
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    /// The notation matches more than one legal move
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),

    /// A promotion piece is missing, is not N/B/R/Q, or was given for a non-promoting move
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}
