use crate::{Block, ChainConfig, ChainError, ChainStore, Hash, ProofOfWork, Result};
use std::collections::HashSet;
use std::iter::FusedIterator;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Chain façade: mines blocks against the current tip and commits them to a
/// [`ChainStore`]. Clones share the store and the append lock, so appends
/// through any clone are serialized. Keep one `Blockchain` (and its clones)
/// per store.
pub struct Blockchain<S: ChainStore> {
    store: Arc<S>,
    pow: ProofOfWork,
    parallel: bool,
    append_lock: Arc<Mutex<()>>,
}

impl<S: ChainStore> Clone for Blockchain<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            pow: self.pow,
            parallel: self.parallel,
            append_lock: Arc::clone(&self.append_lock),
        }
    }
}

impl<S: ChainStore> Blockchain<S> {
    /// Wrap `store`, creating the genesis block if it is empty.
    pub fn open(store: Arc<S>, config: &ChainConfig) -> Result<Self> {
        let pow = config.proof_of_work()?;
        let chain = Self {
            store,
            pow,
            parallel: config.parallel_mining,
            append_lock: Arc::new(Mutex::new(())),
        };
        let tip = {
            let _guard = chain.lock()?;
            chain.store.initialize(&chain.pow)?
        };
        info!("chain ready at tip {}", hex::encode(tip));
        Ok(chain)
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn tip(&self) -> Result<Hash> {
        self.store.tip()?.ok_or(ChainError::Uninitialized)
    }

    pub fn get_block(&self, hash: &Hash) -> Result<Block> {
        self.store.get_block(hash)
    }

    /// Mine `payload` on top of the current tip and commit it. Reading the
    /// tip, mining and committing happen under one lock.
    pub fn append(&self, payload: impl Into<Vec<u8>>) -> Result<Block> {
        let _guard = self.lock()?;
        let tip = self.tip()?;
        let block = if self.parallel {
            Block::new_parallel(payload, &tip, &self.pow)?
        } else {
            Block::new(payload, &tip, &self.pow)?
        };
        self.store.append(&block)?;
        info!(
            "appended block {} on top of {}",
            hex::encode(block.hash()),
            hex::encode(tip)
        );
        Ok(block)
    }

    /// Cursor from the tip, as of now, back to genesis (inclusive).
    pub fn iter(&self) -> Result<BlockIter<'_, S>> {
        Ok(BlockIter {
            store: self.store.as_ref(),
            cursor: Cursor::At(self.tip()?),
        })
    }

    /// Walk tip to genesis and report the first broken link or proof.
    /// Storage errors other than a missing block are returned as errors.
    pub fn validate(&self) -> Result<ChainReport> {
        let mut expected = self.tip()?;
        let mut seen = HashSet::new();
        let mut blocks = 0usize;
        let issue = loop {
            if !seen.insert(expected) {
                break Some(ChainIssue::Cycle(expected));
            }
            let block = match self.store.get_block(&expected) {
                Ok(block) => block,
                Err(ChainError::NotFound(hash)) => break Some(ChainIssue::MissingBlock(hash)),
                Err(e) => return Err(e),
            };
            blocks += 1;
            if *block.hash() != expected {
                break Some(ChainIssue::HashMismatch {
                    key: expected,
                    stored: *block.hash(),
                });
            }
            if !self.pow.verify(&block) {
                break Some(ChainIssue::InvalidProofOfWork(expected));
            }
            if block.is_genesis() {
                break None;
            }
            match Hash::try_from(block.prev_hash()) {
                Ok(prev) => expected = prev,
                Err(_) => break Some(ChainIssue::MalformedLink(expected)),
            }
        };
        if let Some(issue) = &issue {
            warn!("chain validation failed after {blocks} blocks: {issue}");
        }
        Ok(ChainReport { blocks, issue })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.append_lock
            .lock()
            .map_err(|_| ChainError::Storage("append lock poisoned".into()))
    }
}

enum Cursor {
    At(Hash),
    Broken(ChainError),
    Done,
}

/// One-shot walk from a tip snapshot back to the genesis block.
pub struct BlockIter<'a, S: ChainStore> {
    store: &'a S,
    cursor: Cursor,
}

impl<S: ChainStore> Iterator for BlockIter<'_, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => None,
            Cursor::Broken(err) => Some(Err(err)),
            Cursor::At(hash) => match self.store.get_block(&hash) {
                Ok(block) => {
                    if !block.is_genesis() {
                        self.cursor = match Hash::try_from(block.prev_hash()) {
                            Ok(prev) => Cursor::At(prev),
                            Err(_) => Cursor::Broken(ChainError::Serialization(format!(
                                "block {} links to a {}-byte hash",
                                hex::encode(block.hash()),
                                block.prev_hash().len()
                            ))),
                        };
                    }
                    Some(Ok(block))
                }
                Err(e) => Some(Err(e)),
            },
        }
    }
}

impl<S: ChainStore> FusedIterator for BlockIter<'_, S> {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainIssue {
    MissingBlock(Hash),
    HashMismatch { key: Hash, stored: Hash },
    InvalidProofOfWork(Hash),
    MalformedLink(Hash),
    Cycle(Hash),
}

impl std::fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainIssue::MissingBlock(h) => write!(f, "missing block {}", hex::encode(h)),
            ChainIssue::HashMismatch { key, stored } => write!(
                f,
                "block stored under {} carries hash {}",
                hex::encode(key),
                hex::encode(stored)
            ),
            ChainIssue::InvalidProofOfWork(h) => {
                write!(f, "block {} fails proof-of-work", hex::encode(h))
            }
            ChainIssue::MalformedLink(h) => {
                write!(f, "block {} has a malformed prev hash", hex::encode(h))
            }
            ChainIssue::Cycle(h) => write!(f, "chain revisits block {}", hex::encode(h)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainReport {
    /// Blocks read before stopping.
    pub blocks: usize,
    pub issue: Option<ChainIssue>,
}

impl ChainReport {
    pub fn is_valid(&self) -> bool {
        self.issue.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemStore;

    fn chain(difficulty_bits: u32) -> Blockchain<MemStore> {
        let config = ChainConfig {
            difficulty_bits,
            parallel_mining: false,
        };
        Blockchain::open(Arc::new(MemStore::new()), &config).unwrap()
    }

    #[test]
    fn open_creates_genesis() {
        let chain = chain(4);
        let blocks: Vec<Block> = chain.iter().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].prev_hash().is_empty());
        assert_eq!(chain.tip().unwrap(), *blocks[0].hash());
    }

    #[test]
    fn append_two_blocks_scenario() -> anyhow::Result<()> {
        let chain = chain(8);
        let genesis = chain.tip()?;
        let a = chain.append("a")?;
        let b = chain.append("b")?;

        let blocks: Vec<Block> = chain.iter()?.collect::<Result<_>>()?;
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], b);
        assert_eq!(blocks[1], a);
        assert_eq!(*blocks[2].hash(), genesis);
        assert!(blocks.iter().all(|blk| chain.proof_of_work().verify(blk)));
        assert_eq!(a.hash().as_slice(), b.prev_hash());
        assert_eq!(genesis.as_slice(), a.prev_hash());
        Ok(())
    }

    #[test]
    fn append_advances_tip() -> anyhow::Result<()> {
        let chain = chain(4);
        for i in 0..5 {
            let before = chain.tip()?;
            let block = chain.append(format!("payload-{i}"))?;
            assert_eq!(chain.tip()?, *block.hash());
            assert_eq!(chain.get_block(&chain.tip()?)?.prev_hash(), before.as_slice());
        }
        assert_eq!(chain.store().block_count()?, 6);
        Ok(())
    }

    #[test]
    fn iterators_are_independent_snapshots() -> anyhow::Result<()> {
        let chain = chain(4);
        chain.append("one")?;
        let mut first = chain.iter()?;
        let mut second = chain.iter()?;
        assert_eq!(first.next().unwrap()?.payload(), b"one");
        chain.append("two")?;
        // `second` snapshotted the tip before "two".
        assert_eq!(second.next().unwrap()?.payload(), b"one");
        assert!(first.next().unwrap()?.is_genesis());
        assert!(first.next().is_none());
        assert!(first.next().is_none());
        assert_eq!(chain.iter()?.next().unwrap()?.payload(), b"two");
        Ok(())
    }

    #[test]
    fn iterator_ends_at_exactly_one_genesis() -> anyhow::Result<()> {
        let chain = chain(4);
        for i in 0..10 {
            chain.append(vec![i as u8])?;
        }
        let blocks: Vec<Block> = chain.iter()?.collect::<Result<_>>()?;
        assert_eq!(blocks.len(), 11);
        assert_eq!(blocks.iter().filter(|b| b.is_genesis()).count(), 1);
        assert!(blocks.last().unwrap().is_genesis());
        Ok(())
    }

    #[test]
    fn reopen_keeps_genesis() -> anyhow::Result<()> {
        let store = Arc::new(MemStore::new());
        let config = ChainConfig {
            difficulty_bits: 4,
            ..Default::default()
        };
        let first = Blockchain::open(Arc::clone(&store), &config)?;
        let tip = first.tip()?;
        let second = Blockchain::open(store, &config)?;
        assert_eq!(second.tip()?, tip);
        assert_eq!(second.store().block_count()?, 1);
        Ok(())
    }

    #[test]
    fn parallel_mining_chain_validates() -> anyhow::Result<()> {
        let config = ChainConfig {
            difficulty_bits: 8,
            parallel_mining: true,
        };
        let chain = Blockchain::open(Arc::new(MemStore::new()), &config)?;
        chain.append("p1")?;
        chain.append("p2")?;
        let report = chain.validate()?;
        assert!(report.is_valid());
        assert_eq!(report.blocks, 3);
        Ok(())
    }

    #[test]
    fn concurrent_appends_stay_linear() -> anyhow::Result<()> {
        let chain = chain(4);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let chain = chain.clone();
                std::thread::spawn(move || chain.append(format!("t{i}")).map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().expect("append thread panicked")?;
        }
        let blocks: Vec<Block> = chain.iter()?.collect::<Result<_>>()?;
        assert_eq!(blocks.len(), 9);
        assert_eq!(chain.store().block_count()?, 9);
        assert!(chain.validate()?.is_valid());
        Ok(())
    }

    #[test]
    fn get_unknown_block_is_not_found() {
        let chain = chain(4);
        assert!(matches!(
            chain.get_block(&[0xab; 32]),
            Err(ChainError::NotFound(h)) if h == [0xab; 32]
        ));
    }

    #[test]
    fn uninitialized_store_has_no_tip() {
        let store = MemStore::new();
        assert_eq!(store.tip().unwrap(), None);
    }

    #[test]
    fn validate_reports_missing_predecessor() -> anyhow::Result<()> {
        let chain = chain(4);
        let orphan = Block::new("orphan", &[0x11; 32], chain.proof_of_work())?;
        chain.store().append(&orphan)?;

        let report = chain.validate()?;
        assert_eq!(report.issue, Some(ChainIssue::MissingBlock([0x11; 32])));
        assert_eq!(report.blocks, 1);

        let mut iter = chain.iter()?;
        assert_eq!(iter.next().unwrap()?, orphan);
        assert!(matches!(iter.next(), Some(Err(ChainError::NotFound(_)))));
        Ok(())
    }

    #[test]
    fn validate_reports_bad_proof() -> anyhow::Result<()> {
        let chain = chain(12);
        let tip = chain.tip()?;
        let forged = Block::from_parts(0, b"forged".to_vec(), tip.to_vec(), 0, [0u8; 32]);
        chain.store().append(&forged)?;
        let report = chain.validate()?;
        assert_eq!(report.issue, Some(ChainIssue::InvalidProofOfWork([0u8; 32])));
        Ok(())
    }

    #[test]
    fn malformed_link_is_reported() -> anyhow::Result<()> {
        let chain = chain(0);
        let short_link = Block::new("short", &[1, 2, 3], chain.proof_of_work())?;
        chain.store().append(&short_link)?;

        let report = chain.validate()?;
        assert_eq!(report.issue, Some(ChainIssue::MalformedLink(*short_link.hash())));

        let mut iter = chain.iter()?;
        assert!(iter.next().unwrap().is_ok());
        assert!(matches!(iter.next(), Some(Err(ChainError::Serialization(_)))));
        assert!(iter.next().is_none());
        Ok(())
    }
}
