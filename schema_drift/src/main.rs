//! schema_drift CLI
//!
//! Compares live table snapshots against recorded migration history.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use schema_drift::config::{self, Config, LoggingConfig};
use schema_drift::utils::init_logging;
use schema_drift::{Blueprint, ColumnRenderer, DriftClient, MemoryHistory, MemoryIntrospector};

/// Detect drift between live tables and their migration history.
#[derive(Parser)]
#[command(name = "schema_drift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML or YAML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare live tables against the structure their history declares.
    Compare {
        /// Live snapshot (JSON).
        #[arg(long)]
        live: PathBuf,

        /// Recorded structure changes (JSON).
        #[arg(long)]
        history: PathBuf,

        /// Tables to compare (all live tables if not specified).
        #[arg(short, long)]
        table: Vec<String>,

        /// Compare dialect-specific definitions instead of portable ones.
        #[arg(long)]
        specific: bool,

        /// Print blueprints as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the creation order of live tables.
    Arrange {
        /// Live snapshot (JSON).
        #[arg(long)]
        live: PathBuf,

        /// Tables to arrange (all live tables if not specified).
        #[arg(short, long)]
        table: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_from_file(&path.to_string_lossy())
            .with_context(|| format!("Loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    if config.logging.is_none() && cli.verbose {
        config.logging = Some(LoggingConfig {
            level: "debug".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        });
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Compare {
            live,
            history,
            table,
            specific,
            json,
        } => {
            if specific {
                config.comparison.portable = false;
            }
            let client = client(config, &live, Some(history.as_path()))?;
            let tables = selected_tables(&client, table)?;
            let blueprints = client.compare_tables(&tables)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&blueprints)?);
            } else {
                let renderer = client.renderer();
                for blueprint in &blueprints {
                    print_blueprint(blueprint, &renderer);
                }
            }

            let pending = blueprints.iter().filter(|b| b.is_pending()).count();
            tracing::info!(tables = blueprints.len(), pending, "Comparison finished");
        }
        Commands::Arrange { live, table } => {
            let client = client(config, &live, None)?;
            let tables = selected_tables(&client, table)?;
            let arrangement = client.arrange(&tables)?;

            for (position, table) in arrangement.tables.iter().enumerate() {
                println!("{:>3}. {}", position + 1, table);
                for foreign_key in arrangement.suppressed_for(table) {
                    println!("       suppressed: {} -> {}", foreign_key.name, foreign_key.referred_table);
                }
            }
        }
    }

    Ok(())
}

fn client(config: Config, live: &Path, history: Option<&Path>) -> anyhow::Result<DriftClient> {
    let introspector = MemoryIntrospector::load_from_file(&live.to_string_lossy())
        .with_context(|| format!("Loading live snapshot from {}", live.display()))?;
    let history = match history {
        Some(path) => MemoryHistory::load_from_file(&path.to_string_lossy())
            .with_context(|| format!("Loading history from {}", path.display()))?,
        None => MemoryHistory::new(),
    };

    Ok(DriftClient::builder()
        .config(config)
        .introspector(introspector)
        .history(history)
        .build()?)
}

fn selected_tables(client: &DriftClient, tables: Vec<String>) -> anyhow::Result<Vec<String>> {
    if tables.is_empty() {
        Ok(client.table_names()?)
    } else {
        Ok(tables)
    }
}

fn print_blueprint(blueprint: &Blueprint, renderer: &ColumnRenderer) {
    if !blueprint.is_pending() {
        println!("{}: up to date", blueprint.table_name);
        return;
    }

    println!("{}:", blueprint.table_name);
    if blueprint.needs_start_from_scratch() {
        println!("  (no structure declared by history)");
    }
    for description in blueprint.descriptions() {
        println!("  - {}", description);
    }

    let primary_key = blueprint.added_primary_key();
    for (name, column) in blueprint.added_columns() {
        println!("  + {}: {}", name, renderer.render(column, primary_key));
    }
    for (name, column) in blueprint.altered_columns() {
        println!("  ~ {}: {}", name, renderer.render(column, primary_key));
    }
}
