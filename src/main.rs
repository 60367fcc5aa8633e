use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod library;
mod query;
mod schema;
mod session;
mod store;
#[cfg(test)]
mod testing;

use config::Config;
use store::QueryId;

#[derive(Parser)]
#[command(name = "bmlq")]
#[command(author, version, about = "bmlq - BML query generator")]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default config file
    Init,

    /// Import a model schema file into the entity catalog
    LoadSchema {
        /// Schema file (defaults to `schema` from the config)
        file: Option<PathBuf>,
    },

    /// List entities and their attributes
    Models,

    /// Build a query and print its YAML
    Generate {
        /// Operation: find, create, update or deleteAll
        #[arg(long, default_value = "find")]
        op: String,

        /// Target entity
        #[arg(long)]
        entity: String,

        /// Filter as attribute:condition:value (repeatable, order is kept)
        #[arg(long = "filter", short = 'f')]
        filters: Vec<String>,

        /// Save the generated query under this name
        #[arg(long)]
        save: Option<String>,
    },

    /// Parse YAML query text back into its structured form
    Parse {
        /// File to read ("-" or nothing for stdin)
        file: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved queries
    List,

    /// Print the text of a saved query
    Show {
        id: QueryId,
    },

    /// Load a saved query and print its structured form
    Load {
        id: QueryId,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved query
    Delete {
        id: QueryId,
    },

    /// Interactive query form
    Shell,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    init_logging(cli.verbose, config.log.as_deref());

    let db_path = cli.database.clone().unwrap_or_else(|| config.database_path());

    // One logical thread: actions suspend on I/O but never run in parallel
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run(cli.command, &config, &db_path))
}

async fn run(command: Commands, config: &Config, db_path: &Path) -> Result<()> {
    match command {
        Commands::Init => cli::commands::init(),
        Commands::LoadSchema { file } => cli::commands::load_schema_file(db_path, file, config),
        Commands::Models => cli::commands::models(db_path),
        Commands::Generate { op, entity, filters, save } => {
            cli::commands::generate(db_path, &op, &entity, &filters, save.as_deref()).await
        }
        Commands::Parse { file, json } => cli::commands::parse(file.as_deref(), json),
        Commands::List => cli::commands::list(db_path).await,
        Commands::Show { id } => cli::commands::show(db_path, id),
        Commands::Load { id, json } => cli::commands::load(db_path, id, json).await,
        Commands::Delete { id } => cli::commands::delete(db_path, id).await,
        Commands::Shell => cli::commands::shell(db_path).await,
    }
}

/// RUST_LOG wins, then -v, then the configured filter
fn init_logging(verbose: bool, configured: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if verbose {
            "bmlq=debug"
        } else {
            configured.unwrap_or("bmlq=warn")
        };
        EnvFilter::new(directive)
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
