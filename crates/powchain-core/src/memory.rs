//! In-memory [`ChainStore`], handy for tests and throwaway chains.

use crate::{Block, ChainError, ChainStore, Hash, Result};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    blocks: HashMap<Hash, Block>,
    tip: Option<Hash>,
}

#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| ChainError::Storage("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| ChainError::Storage("memory store lock poisoned".into()))
    }
}

impl ChainStore for MemStore {
    fn tip(&self) -> Result<Option<Hash>> {
        Ok(self.read()?.tip)
    }

    fn get_block(&self, hash: &Hash) -> Result<Block> {
        self.read()?
            .blocks
            .get(hash)
            .cloned()
            .ok_or(ChainError::NotFound(*hash))
    }

    fn contains(&self, hash: &Hash) -> Result<bool> {
        Ok(self.read()?.blocks.contains_key(hash))
    }

    fn append(&self, block: &Block) -> Result<()> {
        let mut inner = self.write()?;
        inner.blocks.insert(*block.hash(), block.clone());
        inner.tip = Some(*block.hash());
        Ok(())
    }

    fn install_genesis(&self, genesis: &Block) -> Result<Hash> {
        let mut inner = self.write()?;
        if let Some(tip) = inner.tip {
            return Ok(tip);
        }
        inner.blocks.insert(*genesis.hash(), genesis.clone());
        inner.tip = Some(*genesis.hash());
        Ok(*genesis.hash())
    }

    fn block_count(&self) -> Result<usize> {
        Ok(self.read()?.blocks.len())
    }
}
