use crate::{
    constants::{HASH_BITS, MAX_NONCE},
    hash::{encode_for_hash, header_prefix, meets_difficulty, sha256, target_bytes},
    Block, ChainError, Hash, Result,
};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Nonces each pool thread takes per window of the parallel search.
const NONCES_PER_THREAD: u64 = 1 << 12;

/// Static-difficulty proof-of-work: a hash is valid iff, read as a big-endian
/// integer, it is below `2^(256 - difficulty_bits)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty_bits: u32,
    max_nonce: u64,
}

impl ProofOfWork {
    pub fn new(difficulty_bits: u32) -> Result<Self> {
        if difficulty_bits > HASH_BITS {
            return Err(ChainError::InvalidDifficulty(difficulty_bits));
        }
        Ok(Self {
            difficulty_bits,
            max_nonce: MAX_NONCE,
        })
    }

    /// Lower the nonce bound; mostly useful to exercise exhaustion in tests.
    pub fn with_max_nonce(mut self, max_nonce: u64) -> Self {
        self.max_nonce = max_nonce.min(MAX_NONCE);
        self
    }

    pub fn difficulty_bits(&self) -> u32 {
        self.difficulty_bits
    }

    pub fn max_nonce(&self) -> u64 {
        self.max_nonce
    }

    pub fn target(&self) -> Hash {
        target_bytes(self.difficulty_bits)
    }

    pub fn is_valid_hash(&self, hash: &Hash) -> bool {
        meets_difficulty(hash, self.difficulty_bits)
    }

    /// Try nonces `0, 1, 2, ..` until the digest of the canonical encoding
    /// meets the target. Pure CPU work: no I/O, no shared state.
    pub fn search(&self, prev_hash: &[u8], payload: &[u8], timestamp: i64) -> Result<(u64, Hash)> {
        let base = self.base_hasher(prev_hash, payload, timestamp);
        let mut nonce = 0u64;
        loop {
            let hash = finish(&base, nonce);
            if self.is_valid_hash(&hash) {
                debug!(nonce, hash = %hex::encode(hash), "found nonce");
                return Ok((nonce, hash));
            }
            if nonce >= self.max_nonce {
                return Err(ChainError::ExhaustedNonceSpace {
                    max_nonce: self.max_nonce,
                });
            }
            nonce += 1;
        }
    }

    /// Same search spread over the rayon pool. Nonces are scanned in
    /// consecutive windows, each split across the pool, and `find_first`
    /// keeps the result identical to [`ProofOfWork::search`].
    pub fn search_parallel(
        &self,
        prev_hash: &[u8],
        payload: &[u8],
        timestamp: i64,
    ) -> Result<(u64, Hash)> {
        let base = self.base_hasher(prev_hash, payload, timestamp);
        let nonce = self
            .first_nonce_where(|nonce| self.is_valid_hash(&finish(&base, nonce)))
            .ok_or(ChainError::ExhaustedNonceSpace {
                max_nonce: self.max_nonce,
            })?;
        let hash = finish(&base, nonce);
        debug!(nonce, hash = %hex::encode(hash), "found nonce (parallel)");
        Ok((nonce, hash))
    }

    /// Smallest nonce in `0..=max_nonce` accepted by `accept`.
    fn first_nonce_where(&self, accept: impl Fn(u64) -> bool + Sync) -> Option<u64> {
        let window = NONCES_PER_THREAD * rayon::current_num_threads() as u64;
        let bound = self.max_nonce + 1;
        let mut start = 0u64;
        while start < bound {
            let end = start.saturating_add(window).min(bound);
            let found = (0..(end - start) as usize)
                .into_par_iter()
                .find_first(|offset| accept(start + *offset as u64));
            if let Some(offset) = found {
                return Some(start + offset as u64);
            }
            start = end;
        }
        None
    }

    /// Recompute the block's digest; valid iff it matches the stored hash and
    /// meets the target. One hash evaluation.
    pub fn verify(&self, block: &Block) -> bool {
        let hash = sha256(&encode_for_hash(
            block.prev_hash(),
            block.payload(),
            block.timestamp(),
            self.difficulty_bits,
            block.nonce(),
        ));
        hash == *block.hash() && self.is_valid_hash(&hash)
    }

    fn base_hasher(&self, prev_hash: &[u8], payload: &[u8], timestamp: i64) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(header_prefix(prev_hash, payload, timestamp, self.difficulty_bits));
        hasher
    }
}

fn finish(base: &Sha256, nonce: u64) -> Hash {
    let mut hasher = base.clone();
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}
