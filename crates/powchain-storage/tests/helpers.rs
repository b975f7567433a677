#![allow(dead_code)]

use powchain_core::{Blockchain, ChainConfig};
use powchain_storage::SledStore;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

pub fn config(difficulty_bits: u32) -> ChainConfig {
    ChainConfig {
        difficulty_bits,
        parallel_mining: false,
    }
}

pub fn create_temp_store() -> (TempDir, SledStore) {
    // Create a temporary directory for the sled database
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let store = SledStore::open(temp_dir.path()).expect("Failed to open SledStore");
    (temp_dir, store)
}

pub fn create_temp_chain(difficulty_bits: u32) -> (TempDir, Blockchain<SledStore>) {
    let (temp_dir, store) = create_temp_store();
    let chain = Blockchain::open(Arc::new(store), &config(difficulty_bits))
        .expect("Failed to open chain");
    (temp_dir, chain)
}

pub fn teardown(temp_dir: TempDir) {
    let db_path = temp_dir.path().to_path_buf();
    temp_dir.close().expect("Failed to delete temp dir");
    // Verify the directory is removed
    assert!(!db_path.exists(), "Database directory should be removed");
}
