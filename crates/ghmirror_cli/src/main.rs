//! ghmirror CLI - produce, work and migrate from the command line.

mod commands;
mod config;
mod progress;
mod shutdown;

use clap::{Args, Parser, Subcommand};
use ghmirror::{EntityKind, Shutdown};
use tracing_subscriber::EnvFilter;

use crate::commands::shared::{self, SyncOverrides};

#[derive(Parser)]
#[command(name = "ghmirror")]
#[command(version)]
#[command(about = "Mirror a GitHub organization's metadata into a relational store")]
#[command(
    long_about = "ghmirror crawls a GitHub organization through a pool of tokens and keeps a \
relational mirror of its members, repositories, issues, pull requests, comments and reviews. \
A producer publishes one job per entity to a broker; workers consume the jobs and upsert each \
entity by its natural identity, so any part can be re-run safely."
)]
#[command(after_long_help = r#"EXAMPLES
    Prepare the database:
        $ ghmirror migrate up

    Queue everything in an organization, then drain the queue with workers:
        $ ghmirror produce --org acme
        $ ghmirror work --follow

    Crawl and sync in one process, without a broker:
        $ ghmirror deep --org acme --exclude private-infra

    Re-sync comments for issues already mirrored:
        $ ghmirror comments --org acme

    Sync one pull request:
        $ ghmirror sync pull_request acme/widgets 42

CONFIGURATION
    ghmirror reads configuration from:
      1. ~/.config/ghmirror/config.toml (or $XDG_CONFIG_HOME/ghmirror/config.toml)
      2. ./ghmirror.toml
      3. Environment variables (GHMIRROR_* prefix)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    GHMIRROR_DATABASE_URL     Database connection string (default: ~/.local/state/ghmirror/ghmirror.db)
    GHMIRROR_GITHUB_TOKENS    Comma-separated GitHub tokens
    GHMIRROR_QUEUE_BROKER     Broker URL, e.g. redis://127.0.0.1/
    GHMIRROR_QUEUE_NAME       Stream name (default: ghmirror:jobs)
    GHMIRROR_QUEUE_CONSUMER   Consumer name within the worker group
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Publish jobs for every entity in one or more organizations
    Produce {
        /// Organization login(s)
        #[arg(long = "org", required = true)]
        orgs: Vec<String>,

        #[command(flatten)]
        sync_opts: SyncArgs,
    },
    /// Consume jobs from the broker and sync each entity
    Work {
        /// Keep waiting for jobs when the broker goes idle
        #[arg(short, long)]
        follow: bool,

        #[command(flatten)]
        sync_opts: SyncArgs,
    },
    /// Produce and consume an organization in one process, without a broker
    Deep {
        /// Organization login
        #[arg(long)]
        org: String,

        #[command(flatten)]
        sync_opts: SyncArgs,
    },
    /// Re-sync issue comments for every issue and pull request already stored
    Comments {
        /// Organization login
        #[arg(long)]
        org: String,

        #[command(flatten)]
        sync_opts: SyncArgs,
    },
    /// Fetch and store a single entity
    Sync {
        /// Entity kind (organization, user, repository, issue, pull_request,
        /// issue_comment, pull_request_comment, pull_request_review)
        kind: EntityKind,

        /// Identity arguments, e.g. `acme/widgets 42`
        #[arg(required = true)]
        identity: Vec<String>,

        #[command(flatten)]
        sync_opts: SyncArgs,
    },
    /// Show per-entity progress counters for an organization
    Status {
        /// Organization login
        #[arg(long)]
        org: String,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Fresh install - drop all tables and reapply migrations
    Fresh,
}

/// Options shared by every command that talks to GitHub.
#[derive(Debug, Clone, Args)]
struct SyncArgs {
    /// GitHub tokens, comma-separated (overrides config)
    #[arg(short, long, value_delimiter = ',', env = "GHMIRROR_GITHUB_TOKENS")]
    tokens: Vec<String>,

    /// Repository names to skip (added to the configured list)
    #[arg(short = 'x', long = "exclude", value_delimiter = ',')]
    exclude: Vec<String>,

    /// Don't sync comments and reviews along with issues and pull requests
    #[arg(long)]
    no_nested: bool,

    /// Disable the HTTP response cache
    #[arg(long)]
    no_cache: bool,
}

impl From<SyncArgs> for SyncOverrides {
    fn from(args: SyncArgs) -> Self {
        SyncOverrides {
            tokens: args.tokens,
            excluded_repos: args.exclude,
            no_nested: args.no_nested,
            no_cache: args.no_cache,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("ghmirror=info,ghmirror_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    // Set up graceful shutdown handler (Ctrl+C)
    let shutdown = Shutdown::new();
    shutdown::setup_shutdown_handler(shutdown.clone());

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    let database_url = config
        .database_url()
        .ok_or("Could not determine a database URL; set GHMIRROR_DATABASE_URL")?;
    ensure_sqlite_dir(&database_url)?;

    match cli.command {
        Commands::Migrate { action } => {
            commands::migrate::handle_migrate(action, &database_url).await?;
        }
        Commands::Produce { orgs, sync_opts } => {
            let ctx =
                shared::build_context(&config, &database_url, &sync_opts.into(), &shutdown).await?;
            let queue = shared::open_queue(&config).await?;
            commands::produce::handle_produce(&ctx, queue.as_ref(), &orgs).await?;
        }
        Commands::Work { follow, sync_opts } => {
            let ctx =
                shared::build_context(&config, &database_url, &sync_opts.into(), &shutdown).await?;
            let queue = shared::open_queue(&config).await?;
            commands::work::handle_work(&ctx, queue.as_ref(), follow).await?;
        }
        Commands::Deep { org, sync_opts } => {
            let ctx =
                shared::build_context(&config, &database_url, &sync_opts.into(), &shutdown).await?;
            commands::deep::handle_deep(&ctx, &org).await?;
        }
        Commands::Comments { org, sync_opts } => {
            let ctx =
                shared::build_context(&config, &database_url, &sync_opts.into(), &shutdown).await?;
            commands::comments::handle_comments(&ctx, &org).await?;
        }
        Commands::Sync {
            kind,
            identity,
            sync_opts,
        } => {
            let ctx =
                shared::build_context(&config, &database_url, &sync_opts.into(), &shutdown).await?;
            commands::sync::handle_sync(&ctx, kind, &identity).await?;
        }
        Commands::Status { org } => {
            let db = shared::open_database(&database_url).await?;
            commands::status::handle_status(&db, &org).await?;
        }
    }

    Ok(())
}

/// Ensure the database directory exists for SQLite.
fn ensure_sqlite_dir(database_url: &str) -> std::io::Result<()> {
    if !database_url.starts_with("sqlite://") {
        return Ok(());
    }
    let db_path = database_url.trim_start_matches("sqlite://");
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    // Warn if using a relative path (can cause issues depending on cwd)
    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
