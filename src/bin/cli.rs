//! GroupKV CLI
//!
//! Command-line interface for inspecting and editing a GroupKV store.

use std::process;

use clap::{Parser, Subcommand};
use groupkv::{Config, Cursor, GroupStore};
use tracing_subscriber::{fmt, EnvFilter};

/// GroupKV CLI
#[derive(Parser, Debug)]
#[command(name = "groupkv")]
#[command(about = "CLI for the GroupKV sharded key-value store")]
#[command(version)]
struct Args {
    /// Root data directory
    #[arg(short, long, default_value = "./groupkv_data")]
    root: String,

    /// Store path below the root
    #[arg(short, long, default_value = "store")]
    path: String,

    /// Number of shards (must match the existing layout)
    #[arg(short, long, default_value = "16")]
    shards: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
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
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Check whether a key exists
    Has {
        /// The key to check
        key: String,
    },

    /// List keys with a prefix, shard by shard
    Scan {
        /// Key prefix
        #[arg(default_value = "")]
        prefix: String,

        /// Start position relative to the prefix
        #[arg(long, default_value = "")]
        start: String,
    },

    /// Print per-shard statistics
    Stats,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,groupkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .root(&args.root)
        .path(&args.path)
        .shard_count(args.shards)
        .build();

    let store = match GroupStore::open(config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            process::exit(1);
        }
    };

    let outcome = run(&store, args.command);

    if let Err(e) = store.close() {
        tracing::error!("Failed to close store: {}", e);
        process::exit(1);
    }

    if let Err(e) = outcome {
        eprintln!("(error) {}", e);
        process::exit(1);
    }
}

fn run(store: &GroupStore, command: Commands) -> groupkv::Result<()> {
    match command {
        Commands::Get { key } => match store.get(key.as_bytes()) {
            Ok(value) => println!("{}", String::from_utf8_lossy(&value)),
            Err(e) if e.is_not_found() => println!("(nil)"),
            Err(e) => return Err(e),
        },
        Commands::Set { key, value } => {
            store.set(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            store.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Has { key } => {
            println!("{}", store.has(key.as_bytes())?);
        }
        Commands::Scan { prefix, start } => {
            let mut cursor = store.new_iterator(prefix.as_bytes(), start.as_bytes());
            let mut count = 0usize;
            while cursor.next() {
                if let (Some(key), Some(value)) = (cursor.key(), cursor.value()) {
                    println!(
                        "{}\t{}",
                        String::from_utf8_lossy(key),
                        String::from_utf8_lossy(value)
                    );
                    count += 1;
                }
            }
            let failed = cursor.error().map(|e| e.to_string());
            cursor.release();

            if let Some(e) = failed {
                return Err(groupkv::GroupKvError::Storage(e));
            }
            eprintln!("({} entries)", count);
        }
        Commands::Stats => {
            println!("shard\tentries\tbytes\tsstables");
            for stats in store.stats() {
                println!(
                    "{}\t{}\t{}\t{}",
                    stats.index, stats.memtable_entries, stats.memtable_bytes, stats.sstables
                );
            }
        }
    }

    Ok(())
}
