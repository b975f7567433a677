use crate::codec::{decode_block, encode_block};
use powchain_core::{Block, ChainError, ChainStore, Hash, Result};
use sled::transaction::{ConflictableTransactionResult, TransactionError, TransactionalTree};
use sled::{Db, IVec, Tree};
use std::path::Path;
use tracing::{debug, info, warn};

const TREE_BLOCKS: &str = "blocks";
/// Tip pointer, stored beside the blocks; one byte long so it never collides with a 32-byte hash.
pub const KEY_TIP: &[u8] = b"l";

/// sled-backed chain store: one tree maps `hash -> bincode(Block)` and holds
/// the tip under [`KEY_TIP`]. Every write is a single sled transaction
/// followed by a flush.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |e: sled::Error| ChainError::StoreUnavailable {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let db = sled::open(path).map_err(unavailable)?;
        let blocks = db.open_tree(TREE_BLOCKS).map_err(unavailable)?;
        info!("sled store opened at {}", path.display());
        Ok(Self { db, blocks })
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush().map_err(storage_err)?;
        Ok(())
    }

    /// Run `f` as one transaction on the blocks tree, then flush. Once the
    /// transaction commits its writes are visible, so a failed flush only
    /// costs durability and is logged rather than reported.
    fn commit<A>(
        &self,
        f: impl Fn(&TransactionalTree) -> ConflictableTransactionResult<A, ChainError>,
    ) -> Result<A> {
        let out = self.blocks.transaction(f).map_err(|e| match e {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => storage_err(e),
        })?;
        Ok(committed(out, self.flush()))
    }
}

impl ChainStore for SledStore {
    fn tip(&self) -> Result<Option<Hash>> {
        self.blocks
            .get(KEY_TIP)
            .map_err(storage_err)?
            .map(|v| to_hash(&v))
            .transpose()
    }

    fn get_block(&self, hash: &Hash) -> Result<Block> {
        debug!("get block {}", hex::encode(hash));
        match self.blocks.get(hash).map_err(storage_err)? {
            Some(bytes) => decode_block(&bytes),
            None => Err(ChainError::NotFound(*hash)),
        }
    }

    fn contains(&self, hash: &Hash) -> Result<bool> {
        self.blocks.contains_key(hash).map_err(storage_err)
    }

    fn append(&self, block: &Block) -> Result<()> {
        let bytes = encode_block(block)?;
        let hash = *block.hash();
        self.commit(|tx| {
            tx.insert(&hash[..], bytes.as_slice())?;
            tx.insert(KEY_TIP, &hash[..])?;
            Ok(())
        })
    }

    fn install_genesis(&self, genesis: &Block) -> Result<Hash> {
        let bytes = encode_block(genesis)?;
        let hash = *genesis.hash();
        let tip: IVec = self.commit(|tx| {
            if let Some(existing) = tx.get(KEY_TIP)? {
                return Ok(existing);
            }
            tx.insert(&hash[..], bytes.as_slice())?;
            tx.insert(KEY_TIP, &hash[..])?;
            Ok(IVec::from(&hash[..]))
        })?;
        to_hash(&tip)
    }

    fn block_count(&self) -> Result<usize> {
        let with_tip = self.blocks.contains_key(KEY_TIP).map_err(storage_err)?;
        Ok(self.blocks.len() - usize::from(with_tip))
    }
}

fn committed<A>(out: A, flushed: Result<()>) -> A {
    if let Err(e) = flushed {
        warn!("transaction committed but flush failed: {e}");
    }
    out
}

fn storage_err(e: sled::Error) -> ChainError {
    ChainError::Storage(e.to_string())
}

fn to_hash(bytes: &[u8]) -> Result<Hash> {
    Hash::try_from(bytes).map_err(|_| {
        ChainError::Serialization(format!("tip pointer is {} bytes, expected 32", bytes.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_failure_keeps_committed_result() {
        let hash = [7u8; 32];
        let out = committed(hash, Err(ChainError::Storage("disk full".into())));
        assert_eq!(out, hash);
    }

    #[test]
    fn tip_pointer_must_be_a_full_hash() {
        assert_eq!(to_hash(&[1u8; 32]).unwrap(), [1u8; 32]);
        assert!(matches!(to_hash(b"l"), Err(ChainError::Serialization(_))));
    }
}
