//! scrollkv CLI
//!
//! Command-line interface for working with an on-disk scrollkv store.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scrollkv::log::{LogRecovery, DATA_FILENAME};
use scrollkv::{Config, Engine, SyncStrategy};
use tracing_subscriber::{fmt, EnvFilter};

/// scrollkv CLI
#[derive(Parser, Debug)]
#[command(name = "scrollkv-cli")]
#[command(about = "CLI for the scrollkv embedded key-value store")]
#[command(version)]
struct Args {
    /// Store directory
    #[arg(short, long, default_value = "./scrollkv_data")]
    data_dir: PathBuf,

    /// Build the prefix-search index on open
    #[arg(short, long)]
    search: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Store(StoreCommands),

    /// Check the data file for corruption without modifying it
    Verify,
}

/// Commands that run against an opened store
#[derive(Subcommand, Debug)]
enum StoreCommands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Seconds until the key expires
        #[arg(short, long)]
        ttl: Option<u64>,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Remove every key
    Clear,

    /// Reclaim space held by deleted and expired entries
    Compact,

    /// List key-values whose keys start with a term
    Search {
        /// Key prefix to match
        term: String,

        /// Matches to skip
        #[arg(long, default_value = "0")]
        skip: usize,

        /// Maximum matches to return (0 = all)
        #[arg(long, default_value = "0")]
        limit: usize,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,scrollkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> scrollkv::Result<()> {
    let command = match args.command {
        Commands::Verify => {
            let result = LogRecovery::verify(&args.data_dir.join(DATA_FILENAME))?;
            println!(
                "records: {}, valid bytes: {}, corrupt tail bytes: {}",
                result.records_recovered, result.last_valid_offset, result.bytes_truncated
            );
            return Ok(());
        }
        Commands::Store(command) => command,
    };

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .search_enabled(args.search)
        .sync_strategy(SyncStrategy::EveryWrite)
        .build();
    let engine = Engine::open(config)?;

    match command {
        StoreCommands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        StoreCommands::Set { key, value, ttl } => {
            engine.set(key.as_bytes(), value.as_bytes(), ttl)?;
            println!("OK");
        }
        StoreCommands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        StoreCommands::Clear => {
            engine.clear()?;
            println!("OK");
        }
        StoreCommands::Compact => {
            let before = engine.file_size();
            engine.compact()?;
            println!("OK ({} -> {} bytes)", before, engine.file_size());
        }
        StoreCommands::Search { term, skip, limit } => {
            for (key, value) in engine.search(term.as_bytes(), skip, limit)? {
                println!(
                    "{}\t{}",
                    String::from_utf8_lossy(&key),
                    String::from_utf8_lossy(&value)
                );
            }
        }
    }

    engine.close()
}
