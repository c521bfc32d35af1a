use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "malmeta", version, about = "Fetch and cache MyAnimeList entry metadata", long_about = None)]
pub struct Cli {
    /// Enable debug logs
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (defaults to malmeta.toml in the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request metadata, but never write it to the cache
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the metadata of a single entry and print it as JSON
    Fetch(FetchArgs),
    /// Request missing entry metadata for every entry in the history and unapproved files
    UpdateMetadata(UpdateArgs),
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Entry type: "anime" or "manga"
    #[arg(value_name = "TYPE")]
    pub entry_type: String,

    /// MyAnimeList ID of the entry
    pub id: u64,

    /// Re-request the entry if the cached request failed
    #[arg(long)]
    pub request_failed: bool,

    /// Always re-request the entry, whatever is cached
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// JSON-lines history file; every line needs an `entry_id` and an `e_type`
    #[arg(long, value_name = "FILE")]
    pub history: PathBuf,

    /// JSON file listing unapproved IDs: {"anime": [..], "manga": [..]}
    #[arg(long, value_name = "FILE")]
    pub unapproved: Option<PathBuf>,

    /// Re-request entries whose cached request failed
    #[arg(long)]
    pub request_failed: bool,
}
