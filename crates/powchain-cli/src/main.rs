mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use powchain_core::{Blockchain, ChainConfig};
use powchain_storage::SledStore;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powchain")]
#[command(about = "Append-only proof-of-work ledger backed by a local sled store")]
struct Cli {
    /// Path of the block store
    #[arg(long, env = "POWCHAIN_DB", default_value = "./data/blocks")]
    db: PathBuf,

    /// JSON file with chain settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leading zero bits required of every block hash (overrides the config file)
    #[arg(long)]
    difficulty: Option<u32>,

    /// Spread the nonce search over all cores
    #[arg(long)]
    parallel: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mine a block carrying DATA and append it to the chain
    Addblock {
        /// Block payload
        #[arg(long)]
        data: String,
    },
    /// Print every block from the tip back to genesis
    Printchain {
        /// One JSON object per line instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check every link and proof-of-work from tip to genesis
    Verifychain,
}

impl Cli {
    fn chain_config(&self) -> Result<ChainConfig> {
        let mut config = match &self.config {
            Some(path) => ChainConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ChainConfig::default(),
        };
        if let Some(bits) = self.difficulty {
            config.difficulty_bits = bits;
        }
        config.parallel_mining |= self.parallel;
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.chain_config()?;
    let store = SledStore::open(&cli.db)
        .with_context(|| format!("opening store {}", cli.db.display()))?;
    let chain = Blockchain::open(Arc::new(store), &config)?;
    info!(
        "using store {} at difficulty {}",
        cli.db.display(),
        config.difficulty_bits
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.cmd {
        Command::Addblock { data } => commands::add_block(&chain, &data, &mut out),
        Command::Printchain { json } => commands::print_chain(&chain, json, &mut out),
        Command::Verifychain => commands::verify_chain(&chain, &mut out),
    }
}
