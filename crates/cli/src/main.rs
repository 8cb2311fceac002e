//! SevaSaathi CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a starter config file
//! - `chat`     — Ask about schemes, interactively or with one message
//! - `schemes`  — List the catalog
//! - `show`     — Print one scheme in full
//! - `search`   — Rank schemes against a query without calling the model
//! - `recommend` — Suggest schemes from profile keywords and categories
//! - `stats`    — Catalog counts per category
//! - `doctor`   — Diagnose configuration, data and backend

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "sevasaathi",
    about = "SevaSaathi — find the government schemes that fit you",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of ~/.sevasaathi/config.toml
    #[arg(long, global = true, env = "SEVASAATHI_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a default config.toml
    Init,

    /// Ask about schemes
    Chat {
        /// Ask a single question instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Only consider schemes in this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List schemes in the catalog
    Schemes {
        /// Only list this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show every field of one scheme
    Show {
        /// Scheme name (case-insensitive)
        name: String,
    },

    /// Rank schemes against a query
    Search {
        query: String,

        #[arg(short, long)]
        category: Option<String>,

        /// Maximum number of results (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Suggest schemes for a profile
    Recommend {
        /// Something that describes you, e.g. "farmer" or "student" (repeatable)
        #[arg(short = 'k', long = "keyword")]
        keywords: Vec<String>,

        /// A category you are interested in (repeatable)
        #[arg(short, long = "category")]
        categories: Vec<String>,

        /// Maximum number of suggestions
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show catalog statistics
    Stats,

    /// Diagnose system health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::init::run(config_path).await?,
        Commands::Chat { message, category } => {
            commands::chat::run(config_path, message, category).await?
        }
        Commands::Schemes { category } => commands::schemes::list(config_path, category).await?,
        Commands::Show { name } => commands::schemes::show(config_path, &name).await?,
        Commands::Search {
            query,
            category,
            top_k,
        } => commands::search::run(config_path, &query, category, top_k).await?,
        Commands::Recommend {
            keywords,
            categories,
            limit,
        } => commands::recommend::run(config_path, keywords, categories, limit).await?,
        Commands::Stats => commands::stats::run(config_path).await?,
        Commands::Doctor => commands::doctor::run(config_path).await?,
    }

    Ok(())
}
