//! On-disk block encoding (bincode). `decode_block(&encode_block(b)?)? == b`.

use powchain_core::{Block, ChainError, Result};

pub fn encode_block(block: &Block) -> Result<Vec<u8>> {
    bincode::serialize(block).map_err(|e| ChainError::Serialization(e.to_string()))
}

pub fn decode_block(bytes: &[u8]) -> Result<Block> {
    bincode::deserialize(bytes).map_err(|e| ChainError::Serialization(e.to_string()))
}
