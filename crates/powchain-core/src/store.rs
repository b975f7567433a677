use crate::{Block, Hash, ProofOfWork, Result};
use tracing::info;

/// Persistence seam for the chain: an append-only `hash -> Block` map plus a
/// single tip pointer. This lives in `powchain-core` so backends can depend on
/// it without a cycle.
pub trait ChainStore: Send + Sync {
    /// Hash of the most recently appended block, `None` on an empty store.
    fn tip(&self) -> Result<Option<Hash>>;

    /// Fails with [`crate::ChainError::NotFound`] when the hash is unknown.
    fn get_block(&self, hash: &Hash) -> Result<Block>;

    fn contains(&self, hash: &Hash) -> Result<bool>;

    /// Store `block` and point the tip at it, atomically.
    fn append(&self, block: &Block) -> Result<()>;

    /// Store `genesis` as block and tip in one step unless a tip already
    /// exists. Returns whichever tip is in place afterwards.
    fn install_genesis(&self, genesis: &Block) -> Result<Hash>;

    /// Number of stored blocks.
    fn block_count(&self) -> Result<usize>;

    /// Mine and install a genesis block if the store is empty; otherwise
    /// return the existing tip. Concurrent callers all observe the same tip.
    fn initialize(&self, pow: &ProofOfWork) -> Result<Hash> {
        if let Some(tip) = self.tip()? {
            return Ok(tip);
        }
        let genesis = Block::genesis(pow)?;
        let tip = self.install_genesis(&genesis)?;
        if tip == *genesis.hash() {
            info!("created genesis block {}", hex::encode(tip));
        }
        Ok(tip)
    }
}
