use crate::Hash;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChainError>;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The mining search ran past its nonce bound without a valid hash.
    #[error("nonce space exhausted after {max_nonce} attempts")]
    ExhaustedNonceSpace { max_nonce: u64 },

    #[error("store at {path} unavailable: {reason}")]
    StoreUnavailable { path: String, reason: String },

    #[error("block {} not found", hex::encode(.0))]
    NotFound(Hash),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A write transaction failed and was rolled back, or a flush failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("difficulty of {0} bits exceeds the hash width")]
    InvalidDifficulty(u32),

    #[error("chain has no tip; initialize the store first")]
    Uninitialized,

    #[error("config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Config(err.to_string())
    }
}
