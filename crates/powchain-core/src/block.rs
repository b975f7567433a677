use crate::{constants::GENESIS_PAYLOAD, Hash, ProofOfWork, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

/// One immutable record of the chain. Only obtainable by mining
/// ([`Block::new`]) or by decoding stored bytes ([`Block::from_parts`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    timestamp: i64,
    payload: Vec<u8>,
    prev_hash: Vec<u8>,
    nonce: u64,
    hash: Hash,
}

impl Block {
    /// Stamp the current time and mine a nonce linking `payload` to `prev_hash`.
    pub fn new(payload: impl Into<Vec<u8>>, prev_hash: &[u8], pow: &ProofOfWork) -> Result<Self> {
        Self::mine(payload.into(), prev_hash.to_vec(), now(), pow, false)
    }

    /// As [`Block::new`], with the search split across the rayon pool.
    pub fn new_parallel(
        payload: impl Into<Vec<u8>>,
        prev_hash: &[u8],
        pow: &ProofOfWork,
    ) -> Result<Self> {
        Self::mine(payload.into(), prev_hash.to_vec(), now(), pow, true)
    }

    pub fn genesis(pow: &ProofOfWork) -> Result<Self> {
        Self::new(GENESIS_PAYLOAD, &[], pow)
    }

    /// Reassemble a block from stored fields. Nothing is checked; run
    /// [`ProofOfWork::verify`] on the result when that matters.
    pub fn from_parts(
        timestamp: i64,
        payload: Vec<u8>,
        prev_hash: Vec<u8>,
        nonce: u64,
        hash: Hash,
    ) -> Self {
        Self {
            timestamp,
            payload,
            prev_hash,
            nonce,
            hash,
        }
    }

    fn mine(
        payload: Vec<u8>,
        prev_hash: Vec<u8>,
        timestamp: i64,
        pow: &ProofOfWork,
        parallel: bool,
    ) -> Result<Self> {
        let (nonce, hash) = if parallel {
            pow.search_parallel(&prev_hash, &payload, timestamp)?
        } else {
            pow.search(&prev_hash, &payload, timestamp)?
        };
        info!(
            "Mined block {} with nonce {} at difficulty {}",
            hex::encode(hash),
            nonce,
            pow.difficulty_bits()
        );
        Ok(Self {
            timestamp,
            payload,
            prev_hash,
            nonce,
            hash,
        })
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn prev_hash(&self) -> &[u8] {
        &self.prev_hash
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
