//! Shelfcheck report viewer - Main Entry Point
//!
//! Read-only console over the result store: recent outcomes and
//! aggregate statistics, plus schema initialization for fresh
//! databases.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use shelfcheck_common::{profile, ResultStore};

mod output;

use output::{print_item, print_list, print_success, OutputFormat};

/// Shelfcheck - checkout QA result viewer
#[derive(Parser)]
#[command(name = "shelfcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Explicit results database file (defaults to the resolved profile)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the most recent test outcomes, newest first
    Recent {
        /// Maximum number of rows
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show aggregate outcome counts
    Stats,

    /// Create the results schema if it does not exist
    Init,

    /// Show which connection profile this process resolves
    Profile,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Profile resolution has no store side effects; report and exit
    if matches!(&cli.command, Commands::Profile) {
        let resolved = profile();
        println!("endpoint:  {}:{}", resolved.host, resolved.port);
        println!("database:  {}", resolved.database);
        println!("db file:   {}", resolved.db_path().display());
        println!("user:      {}", resolved.user);
        return Ok(());
    }

    let store = open_store(&cli)?;

    match cli.command {
        Commands::Recent { limit } => {
            let outcomes = store
                .query_recent(limit)
                .context("failed to read recent outcomes")?;
            print_list(&outcomes, cli.format);
        }
        Commands::Stats => {
            let stats = store
                .query_statistics()
                .context("failed to read statistics")?;
            print_item(&stats, cli.format);
        }
        Commands::Init => {
            store.ensure_schema().context("failed to create schema")?;
            print_success("Results schema is in place");
        }
        Commands::Profile => unreachable!("handled above"),
    }

    Ok(())
}

fn open_store(cli: &Cli) -> anyhow::Result<ResultStore> {
    let store = match &cli.db {
        Some(path) => {
            tracing::debug!("Opening explicit results database {}", path.display());
            ResultStore::open_path(path)
                .with_context(|| format!("failed to open {}", path.display()))?
        }
        None => ResultStore::open(profile()).context("failed to open results database")?,
    };
    Ok(store)
}
