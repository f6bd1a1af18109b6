//! docroute CLI - documentation route enumeration over a declaration store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{OutputMode, StoreArgs};

#[derive(Parser)]
#[command(name = "docroute")]
#[command(version)]
#[command(about = "Resolve declarations and enumerate documentation routes")]
#[command(long_about = r#"
docroute walks a pre-built declaration store and produces one documentation
page route per distinct declaration, with aliases resolved and the result
cached on disk.

Example usage:
  docroute init
  docroute import --input docs.json --output docs.db
  docroute routes --store docs.db
  docroute show std.mem.Allocator --store docs.db
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the route set from cache, or enumerate and cache it
    Routes {
        #[command(flatten)]
        store: StoreArgs,

        /// Ignore the cache and enumerate again
        #[arg(short, long)]
        force: bool,

        /// Maximum number of routes to print
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// List the modules in the store
    Modules {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Show the page record of one declaration
    Show {
        /// Fully qualified name, e.g. std.mem.Allocator
        fqn: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Convert a JSON snapshot into a SQLite store
    Import {
        /// JSON snapshot to read
        #[arg(short, long)]
        input: PathBuf,

        /// SQLite database to write
        #[arg(short, long, default_value = "docs.db")]
        output: PathBuf,
    },

    /// Serve the route set over HTTP
    Serve {
        #[command(flatten)]
        store: StoreArgs,

        /// Port to listen on
        #[arg(short, long, default_value = "7878")]
        port: u16,

        /// Ignore the cache and enumerate again
        #[arg(short, long)]
        force: bool,
    },

    /// Write a starter docroute.toml
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output = if cli.json { OutputMode::Json } else { OutputMode::Human };
    let config = docroute::config::load_config(cli.config.as_deref())?.unwrap_or_default();

    match cli.command {
        Commands::Routes { store, force, limit } => commands::run_routes(&config, &store, force, limit, output),
        Commands::Modules { store } => commands::run_modules(&config, &store, output),
        Commands::Show { fqn, store } => commands::run_show(&config, &store, &fqn, output),
        Commands::Import { input, output: db } => commands::run_import(&input, &db, output),
        Commands::Serve { store, port, force } => commands::run_serve(&config, &store, port, force),
        Commands::Init { force } => commands::run_init(cli.config.as_deref(), force, output),
    }
}
