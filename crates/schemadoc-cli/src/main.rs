//! SchemaDoc CLI - Schema catalog graphs for documentation renderers
//!
//! A command-line interface that reads a database catalog, assembles the
//! cross-referenced object graph and hands it to a renderer as a JSON document.
//!
//! # Usage
//!
//! ```bash
//! # Build the graph document for a SQLite database
//! schemadoc --database app.db build
//!
//! # Inspect one object
//! schemadoc --database app.db show table employees
//!
//! # Record a snapshot and build from it later
//! schemadoc --database app.db snapshot -o catalog.json
//! schemadoc --snapshot catalog.json stats
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use schemadoc_config::{DialectName, DuplicateKeyPolicy, LogFormat};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod progress;

/// SchemaDoc - Schema catalog introspection and object graph assembly
#[derive(Parser, Debug)]
#[command(name = "schemadoc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Project directory that relative paths resolve against
    #[arg(long, short = 'p', global = true, env = "SCHEMADOC_PROJECT")]
    project: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "SCHEMADOC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// SQLite database to introspect
    #[arg(long, short = 'd', global = true, env = "SCHEMADOC_DATABASE", conflicts_with = "snapshot")]
    database: Option<PathBuf>,

    /// Recorded catalog snapshot to replay
    #[arg(long, global = true, env = "SCHEMADOC_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Built-in catalog (sqlite, oracle)
    #[arg(long, global = true, value_parser = parse_dialect)]
    dialect: Option<DialectName>,

    /// Custom ingestion catalog (TOML)
    #[arg(long = "catalog-file", global = true)]
    catalog_file: Option<PathBuf>,

    /// Duplicate key policy (overwrite, merge, reject)
    #[arg(long, global = true, value_parser = parse_duplicate_policy)]
    duplicate_policy: Option<DuplicateKeyPolicy>,

    /// Maximum width of wrapped attribute values
    #[arg(long, global = true)]
    wrap_width: Option<usize>,
}

/// Parse dialect from string
fn parse_dialect(s: &str) -> Result<DialectName, String> {
    s.parse()
        .map_err(|e: schemadoc_config::ConfigError| e.to_string())
}

/// Parse duplicate policy from string
fn parse_duplicate_policy(s: &str) -> Result<DuplicateKeyPolicy, String> {
    s.parse()
        .map_err(|e: schemadoc_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> schemadoc_config::ConfigOverrides {
        schemadoc_config::ConfigOverrides {
            database: self.database.clone(),
            snapshot: self.snapshot.clone(),
            dialect: self.dialect,
            catalog_file: self.catalog_file.clone(),
            duplicate_policy: self.duplicate_policy,
            wrap_width: self.wrap_width,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the object graph and write it as a JSON document
    Build(commands::build::BuildArgs),

    /// Show graph statistics and the build report
    Stats(commands::stats::StatsArgs),

    /// Show one object with its attributes and relations
    Show(commands::show::ShowArgs),

    /// Print the key and link of an object without building
    Link(commands::link::LinkArgs),

    /// Record a catalog snapshot from a database
    Snapshot(commands::snapshot::SnapshotArgs),

    /// Inspect ingestion catalogs
    #[command(subcommand)]
    Catalog(commands::catalog::CatalogCommand),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Flags win over the configured level
    let logging = commands::peek_logging(&cli.global);
    let log_level = if cli.global.quiet {
        LevelFilter::ERROR
    } else if cli.global.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::from_str(&logging.level).unwrap_or(LevelFilter::INFO)
    };

    match logging.format {
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .json()
                .with_max_level(log_level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    // Execute the command
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, cli.global),
        Commands::Stats(args) => commands::stats::execute(args, cli.global),
        Commands::Show(args) => commands::show::execute(args, cli.global),
        Commands::Link(args) => commands::link::execute(args, cli.global),
        Commands::Snapshot(args) => commands::snapshot::execute(args, cli.global),
        Commands::Catalog(cmd) => commands::catalog::execute(cmd, cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global),
    }
}
