//! Core of a single-node proof-of-work ledger: canonical block hashing, the
//! nonce search and its verification, and the chain orchestrator that
//! commits mined blocks to a [`ChainStore`].

pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod memory;
pub mod pow;
pub mod store;

pub type Hash = [u8; 32];

pub use block::Block;
pub use chain::{BlockIter, Blockchain, ChainIssue, ChainReport};
pub use config::ChainConfig;
pub use error::{ChainError, Result};
pub use memory::MemStore;
pub use pow::ProofOfWork;
pub use store::ChainStore;
