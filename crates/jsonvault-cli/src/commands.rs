use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use jsonvault_diff::{compute_changes, ChangeSet};
use jsonvault_server::{Environment, ServerConfig, VaultServer};
use jsonvault_store::SqliteStorage;
use jsonvault_store::Storage;
use serde_json::Value;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::InitDb(args) => cmd_init_db(args),
        Command::Check(args) => cmd_check(args),
        Command::Diff(args) => cmd_diff(args, cli.format),
    }
}

fn load_config(db: &DbArgs) -> anyhow::Result<ServerConfig> {
    let config = ServerConfig::load_with_dotenv().context("loading configuration")?;
    Ok(match &db.db {
        Some(path) => config.with_db_path(path),
        None => config,
    })
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.db)?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.init_db {
        config.init_db = true;
    }
    if args.development {
        config.environment = Environment::Development;
    }

    let server = VaultServer::open(config).map_err(|err| {
        eprintln!(
            "{} Failed to connect to database. Please check your configuration.",
            "✗".red().bold()
        );
        err
    })?;
    tracing::info!(
        environment = ?server.config().environment,
        database = %server.config().store.path.display(),
        "starting jsonvault"
    );

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_init_db(args: DbArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let storage = SqliteStorage::open(&config.store)?;
    storage.init_schema()?;
    println!(
        "{} Schema ready in {}",
        "✓".green().bold(),
        config.store.path.display().to_string().bold()
    );
    Ok(())
}

fn cmd_check(args: DbArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let storage = SqliteStorage::open(&config.store)?;
    storage
        .ping()
        .with_context(|| format!("connecting to {}", config.store.path.display()))?;

    let status = storage.pool_status();
    println!(
        "{} Database {} reachable",
        "✓".green().bold(),
        config.store.path.display().to_string().bold()
    );
    println!(
        "  Pool: {} open / {} idle / {} max",
        status.open, status.idle, status.max_size
    );
    if storage.schema_present()? {
        println!("  Schema: {}", "present".green());
    } else {
        println!(
            "  Schema: {} (run `jsonvault init-db`)",
            "missing".yellow()
        );
    }
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let old = read_json(&args.old)?;
    let new = read_json(&args.new)?;
    let changes = compute_changes(&old, &new);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
        OutputFormat::Text => {
            for line in render_changes(&changes) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub fn render_changes(changes: &ChangeSet) -> Vec<String> {
    if changes.is_empty() {
        return vec!["No changes.".to_string()];
    }
    let mut lines = Vec::with_capacity(changes.len());
    lines.extend(changes.added.iter().map(|p| format!("{} {}", "+".green().bold(), p.green())));
    lines.extend(changes.removed.iter().map(|p| format!("{} {}", "-".red().bold(), p.red())));
    lines.extend(
        changes
            .modified
            .iter()
            .map(|p| format!("{} {}", "~".yellow().bold(), p.yellow())),
    );
    lines
}
