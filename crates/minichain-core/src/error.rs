use thiserror::Error;

#[derive(Debug, Error)]
pub enum HashParseError {
    #[error("expected 64 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex digest: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// Why a bounded nonce search stopped without a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MineError {
    #[error("mining cancelled")]
    Cancelled,
    #[error("mining deadline exceeded")]
    DeadlineExceeded,
    #[error("nonce space exhausted")]
    NonceSpaceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("block extends {found}, but the chain tip is {expected}")]
    StaleTip { expected: String, found: String },
    #[error("block hash does not meet difficulty {difficulty}")]
    Unsolved { difficulty: u32 },
    #[error("stored hash does not match block content")]
    HashMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("block {index}: stored hash does not match its content")]
    HashMismatch { index: usize },
    #[error("block {index}: previous hash does not link to its predecessor")]
    BrokenLink { index: usize },
    #[error("genesis block has been altered")]
    GenesisMismatch,
    #[error("block {index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: usize, difficulty: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("difficulty {0} exceeds the {} hex characters of a digest", crate::constants::MAX_DIFFICULTY)]
    DifficultyTooHigh(u32),
}
