//! almanacctl - inspect the Almanac contact cache

use almanac::{load_config, ContactBook, ContactCache};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// Almanac contact cache tool
#[derive(Parser, Debug)]
#[command(name = "almanacctl", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "ALMANAC_CONFIG")]
    config: Option<PathBuf>,

    /// Cache file (overrides the configuration)
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print merged contacts as JSON, keyed by id
    List,
    /// Print the cache file location
    Path,
    /// Look up the contact owning a number
    Query {
        /// Phone number in any format
        #[arg(short, long)]
        number: String,
        /// Prefer the contact with this display name
        #[arg(long)]
        name: Option<String>,
    },
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_default()
        .join("almanac")
        .join("almanac.yaml")
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.unwrap_or_else(default_config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let cache_path = args.cache.unwrap_or_else(|| config.cache.cache_path());
    debug!("Using cache {:?}", cache_path);

    match args.command {
        Command::Path => {
            println!("{}", cache_path.display());
        }
        Command::List => {
            let cache = ContactCache::load(&cache_path);
            let book = ContactBook::from_entries(cache.entries());
            let by_id: BTreeMap<&str, _> =
                book.contacts().iter().map(|c| (c.id.as_str(), c)).collect();
            println!("{}", serde_json::to_string_pretty(&by_id)?);
        }
        Command::Query { number, name } => {
            let cache = ContactCache::load(&cache_path);
            let book = ContactBook::from_entries(cache.entries());
            match book.query(name.as_deref(), &number) {
                Some(contact) => println!("{}", serde_json::to_string_pretty(contact)?),
                None => anyhow::bail!("No contact for {}", number),
            }
        }
    }

    Ok(())
}
