//! codelens CLI - command-line front end over the indexing pipeline.
//!
//! Thin entry point: parses arguments, sets up logging, and dispatches into
//! `commands`. All the real work happens in `codelens-core`,
//! `codelens-store`, `codelens-indexer`, and `codelens-watcher`.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "codelens")]
#[command(version)]
#[command(about = "A living index over Elixir, Python, and JS/TS/TSX source", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a .codelens/ directory with a default config
    Init {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Recursively index a directory
    Index {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Re-index a single file
    IndexFile { file: PathBuf },

    /// Case-insensitive substring search over symbol names
    Search {
        query: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Find the definition of a name or qualified name
    Find {
        name: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Find every usage site of a name or qualified name
    References {
        name: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Show callers and callees of a function/method/macro
    Calls {
        name: String,
        #[arg(default_value = ".")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// List every symbol in one file, in position order
    Symbols {
        file: PathBuf,
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Find the innermost symbol covering a (line, col) position
    At {
        file: PathBuf,
        line: u32,
        col: u32,
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show index status and aggregate statistics
    Status {
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Watch a directory, keeping the index in sync as files change
    Watch {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Index { path } => commands::index(&path).await,
        Commands::IndexFile { file } => commands::index_file(&file),
        Commands::Search {
            query,
            path,
            limit,
            kind,
            json,
        } => commands::search(&path, &query, limit, kind.as_deref(), json),
        Commands::Find { name, path, json } => commands::find(&path, &name, json),
        Commands::References { name, path, json } => commands::references(&path, &name, json),
        Commands::Calls { name, path, json } => commands::calls(&path, &name, json),
        Commands::Symbols { file, path } => commands::symbols(&path, &file),
        Commands::At {
            file,
            line,
            col,
            path,
        } => commands::at(&path, &file, line, col),
        Commands::Status { path } => commands::status(&path),
        Commands::Watch { path } => commands::watch(&path).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
