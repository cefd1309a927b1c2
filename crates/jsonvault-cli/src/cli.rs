use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "jsonvault",
    about = "jsonvault: JSON document store with an append-only change history",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Create tables, indexes and the history view
    InitDb(DbArgs),
    /// Verify that the database is reachable
    Check(DbArgs),
    /// Show the structural changes between two JSON files
    Diff(DiffArgs),
}

#[derive(Args)]
pub struct DbArgs {
    /// SQLite database file (overrides configuration)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    #[command(flatten)]
    pub db: DbArgs,
    /// Create the schema before listening
    #[arg(long)]
    pub init_db: bool,
    /// Echo internal error detail in responses
    #[arg(long)]
    pub development: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
}
