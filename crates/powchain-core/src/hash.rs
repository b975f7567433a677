//! Canonical block encoding and SHA-256 helpers.

use crate::{constants::HASH_BITS, Hash};
use sha2::{Digest, Sha256};

/// Bytes hashed for a block, minus the trailing nonce.
///
/// Layout: `prev_hash ‖ payload ‖ timestamp(be64) ‖ difficulty_bits(be64)`.
/// The variable-width fields come first so the fixed-width tail is unambiguous.
pub fn header_prefix(
    prev_hash: &[u8],
    payload: &[u8],
    timestamp: i64,
    difficulty_bits: u32,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(prev_hash.len() + payload.len() + 8 + 8 + 8);
    bytes.extend_from_slice(prev_hash);
    bytes.extend_from_slice(payload);
    bytes.extend_from_slice(&timestamp.to_be_bytes());
    bytes.extend_from_slice(&u64::from(difficulty_bits).to_be_bytes());
    bytes
}

/// Full canonical encoding: [`header_prefix`] followed by `nonce(be64)`.
pub fn encode_for_hash(
    prev_hash: &[u8],
    payload: &[u8],
    timestamp: i64,
    difficulty_bits: u32,
    nonce: u64,
) -> Vec<u8> {
    let mut bytes = header_prefix(prev_hash, payload, timestamp, difficulty_bits);
    bytes.extend_from_slice(&nonce.to_be_bytes());
    bytes
}

pub fn sha256(bytes: &[u8]) -> Hash {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

pub fn count_leading_zero_bits(hash: &Hash) -> u32 {
    let mut total = 0u32;
    for b in hash {
        if *b == 0 {
            total += 8;
        } else {
            total += b.leading_zeros();
            break;
        }
    }
    total
}

/// `2^(256 - difficulty_bits)` as a big-endian 32-byte value.
///
/// Difficulty 0 would need a 257th bit, so it saturates to all ones; every
/// hash satisfies it either way.
pub fn target_bytes(difficulty_bits: u32) -> Hash {
    if difficulty_bits == 0 {
        return [0xff; 32];
    }
    let mut target = [0u8; 32];
    if difficulty_bits > HASH_BITS {
        return target;
    }
    let exponent = HASH_BITS - difficulty_bits;
    let byte_from_end = (exponent / 8) as usize;
    target[31 - byte_from_end] = 1u8 << (exponent % 8);
    target
}

/// `hash < 2^(256 - difficulty_bits)` for a big-endian hash, which is exactly
/// "at least `difficulty_bits` leading zero bits".
pub fn meets_difficulty(hash: &Hash, difficulty_bits: u32) -> bool {
    count_leading_zero_bits(hash) >= difficulty_bits
}
