use anyhow::{bail, Result};
use powchain_core::{Block, Blockchain, ChainStore};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct BlockRow {
    hash: String,
    prev_hash: String,
    data: String,
    timestamp: i64,
    nonce: u64,
    pow: bool,
}

impl BlockRow {
    fn new(block: &Block, pow: bool) -> Self {
        Self {
            hash: hex::encode(block.hash()),
            prev_hash: hex::encode(block.prev_hash()),
            data: String::from_utf8_lossy(block.payload()).into_owned(),
            timestamp: block.timestamp(),
            nonce: block.nonce(),
            pow,
        }
    }
}

pub fn add_block<S: ChainStore>(
    chain: &Blockchain<S>,
    data: &str,
    out: &mut impl Write,
) -> Result<()> {
    let block = chain.append(data)?;
    writeln!(out, "Success! Added block {}", hex::encode(block.hash()))?;
    Ok(())
}

pub fn print_chain<S: ChainStore>(
    chain: &Blockchain<S>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let pow = chain.proof_of_work();
    for block in chain.iter()? {
        let block = block?;
        let row = BlockRow::new(&block, pow.verify(&block));
        if json {
            writeln!(out, "{}", serde_json::to_string(&row)?)?;
        } else {
            writeln!(out, "Prev. hash: {}", row.prev_hash)?;
            writeln!(out, "Data: {}", row.data)?;
            writeln!(out, "Hash: {}", row.hash)?;
            writeln!(out, "PoW: {}", row.pow)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn verify_chain<S: ChainStore>(chain: &Blockchain<S>, out: &mut impl Write) -> Result<()> {
    let report = chain.validate()?;
    match report.issue {
        None => {
            writeln!(out, "Chain valid: {} blocks", report.blocks)?;
            Ok(())
        }
        Some(issue) => bail!("chain invalid after {} blocks: {issue}", report.blocks),
    }
}
