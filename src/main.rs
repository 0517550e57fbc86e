use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memoria::cli;
use memoria::config::MemoriaConfig;

#[derive(Parser)]
#[command(name = "memoria", version, about = "Semantic memory engine — record and recall personal memories")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new memory
    Add {
        /// The memory text (may be empty if photos are given)
        #[arg(default_value = "")]
        text: String,
        /// Owner to store the memory under
        #[arg(long)]
        owner: Option<String>,
        /// Photo URL(s) to attach (repeatable)
        #[arg(long = "photo")]
        photos: Vec<String>,
    },
    /// Search memories by semantic relevance
    Search {
        query: String,
        #[arg(long)]
        owner: Option<String>,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Minimum relevance score (default 0.25)
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// List the newest memories
    Recent {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show memories grouped by category
    Clusters {
        #[arg(long)]
        owner: Option<String>,
    },
    /// Manage pillars (people, interests, life events)
    Pillar {
        #[command(subcommand)]
        action: PillarAction,
    },
    /// Show store statistics
    Stats,
    /// Check record store / vector index consistency
    Doctor,
}

#[derive(Subcommand)]
enum PillarAction {
    /// Create a pillar: `pillar add people "Mom"`
    Add {
        /// One of: people, interests, life_events
        category: String,
        name: String,
        #[arg(long)]
        avatar: Option<String>,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List pillars grouped by category
    List {
        #[arg(long)]
        owner: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Load config (for log level)
    let config = MemoriaConfig::load()?;

    // Initialize tracing with the configured log level, to stderr.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Add { text, owner, photos } => {
            cli::add::add(&config, &text, owner.as_deref(), &photos).await?;
        }
        Command::Search {
            query,
            owner,
            limit,
            threshold,
        } => {
            cli::search::search(&config, &query, owner.as_deref(), limit, threshold).await?;
        }
        Command::Recent { owner, limit } => {
            cli::recent::recent(&config, owner.as_deref(), limit).await?;
        }
        Command::Clusters { owner } => {
            cli::recent::clusters(&config, owner.as_deref()).await?;
        }
        Command::Pillar { action } => match action {
            PillarAction::Add {
                category,
                name,
                avatar,
                owner,
            } => {
                cli::pillar::add(&config, &category, &name, avatar.as_deref(), owner.as_deref())
                    .await?;
            }
            PillarAction::List { owner } => {
                cli::pillar::list(&config, owner.as_deref()).await?;
            }
        },
        Command::Stats => {
            cli::stats::stats(&config).await?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
    }

    Ok(())
}
