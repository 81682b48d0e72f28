use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "relic",
    about = "relic — content-addressed artifact archive with searchable metadata",
    version,
)]
pub struct Cli {
    /// Store root directory
    #[arg(short, long)]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new empty store
    Create,
    /// Add a file with key=value metadata; prints its digest
    Add(AddArgs),
    /// Read stdin into the store with key=value metadata; prints the digest
    Write(WriteArgs),
    /// List digests matching key=value conditions (all digests if none)
    Query(QueryArgs),
    /// Show metadata (or content) for digests or matching conditions
    Print(PrintArgs),
    /// Remove a digest, or everything matching key=value conditions
    Remove(RemoveArgs),
    /// Check store integrity: corrupt, missing, and orphaned objects
    Verify,
}

#[derive(Args)]
pub struct AddArgs {
    /// File to store
    pub file: PathBuf,
    /// Metadata entries, each `key=value`
    pub metadata: Vec<String>,
}

#[derive(Args)]
pub struct WriteArgs {
    /// Metadata entries, each `key=value`
    pub metadata: Vec<String>,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Conditions, each `key=value`; all must match
    pub conditions: Vec<String>,
}

#[derive(Args)]
pub struct PrintArgs {
    /// One or more 40-hex digests, or `key=value` conditions (not mixed)
    pub targets: Vec<String>,
    /// Dump the raw content of a single digest to stdout instead
    #[arg(short, long)]
    pub content: bool,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// A single 40-hex digest, or `key=value` conditions
    pub targets: Vec<String>,
    /// Allow removal with an empty condition set (removes everything)
    #[arg(short, long)]
    pub force: bool,
}
