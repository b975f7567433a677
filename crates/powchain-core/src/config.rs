use crate::{constants::POW_TARGET_DIFFICULTY, ChainError, ProofOfWork, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Chain parameters. Difficulty is static for the life of a store: blocks
/// mined under one setting do not verify under another.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub difficulty_bits: u32,
    pub parallel_mining: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty_bits: POW_TARGET_DIFFICULTY,
            parallel_mining: false,
        }
    }
}

impl ChainConfig {
    /// Read a JSON config file; missing fields fall back to the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChainError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.proof_of_work().map(|_| ())
    }

    pub fn proof_of_work(&self) -> Result<ProofOfWork> {
        ProofOfWork::new(self.difficulty_bits)
    }
}
