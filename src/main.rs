//! # Recruit Chat CLI (`rchat`)
//!
//! ## Usage
//!
//! ```bash
//! rchat --config ./config/rchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rchat init` | Create the SQLite database and seed the status catalog |
//! | `rchat import <file>` | Upsert jobs, clients, contacts, and candidates from JSON |
//! | `rchat stats` | Print totals, top jobs, and embedding coverage |
//! | `rchat ask "<question>"` | Answer one question and show the route taken |
//! | `rchat embed pending` | Embed new or changed candidates and jobs |
//! | `rchat embed rebuild` | Re-embed every candidate and job |
//! | `rchat serve` | Start the HTTP chat server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use recruit_chat::config;
use recruit_chat::embed_cmd::{self, EmbedMode};
use recruit_chat::{ask, import, logging, migrate, server, stats};

/// Recruit Chat: ask questions about jobs, candidates, and clients in
/// plain language.
#[derive(Parser)]
#[command(
    name = "rchat",
    about = "Recruit Chat: a chat assistant over a recruitment database",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rchat.toml`. See `config/rchat.example.toml`.
    #[arg(long, global = true, default_value = "./config/rchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Import recruitment data from a JSON file.
    ///
    /// The file may contain `jobs`, `clients`, `contacts`, and `candidates`
    /// arrays. Records are upserted by id.
    Import {
        /// Path to the JSON document.
        file: PathBuf,
    },

    /// Show database statistics.
    Stats,

    /// Ask one question and print the reply.
    Ask {
        /// The question, e.g. "candidates in Bangalore with java".
        question: String,
    },

    /// Manage embedding vectors.
    ///
    /// Requires an embedding provider to be configured.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Start the HTTP chat server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum EmbedAction {
    /// Embed records that are missing or whose text changed.
    Pending {
        /// Show counts without calling the provider.
        #[arg(long)]
        dry_run: bool,
    },
    /// Re-embed every record, ignoring stored hashes.
    Rebuild {
        /// Show counts without calling the provider.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Ask { question } => {
            ask::run_ask(&cfg, &question).await?;
        }
        Commands::Embed { action } => match action {
            EmbedAction::Pending { dry_run } => {
                embed_cmd::run_embed(&cfg, EmbedMode::Pending, dry_run).await?;
            }
            EmbedAction::Rebuild { dry_run } => {
                embed_cmd::run_embed(&cfg, EmbedMode::Rebuild, dry_run).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
