pub const BYTE: usize = 8;
pub const HASH_SIZE: usize = 32;
pub const HASH_BITS: u32 = (HASH_SIZE * BYTE) as u32;
pub const POW_TARGET_DIFFICULTY: u32 = 16;
/// Upper bound of the nonce search; nonces stay within the signed 64-bit range.
pub const MAX_NONCE: u64 = i64::MAX as u64;
pub const GENESIS_PAYLOAD: &[u8] = b"Genesis Block";
