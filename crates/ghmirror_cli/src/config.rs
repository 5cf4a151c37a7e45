//! Configuration file support for ghmirror.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `GHMIRROR_`, e.g., `GHMIRROR_DATABASE_URL`)
//! 3. Config file (./ghmirror.toml, then ~/.config/ghmirror/config.toml)
//! 4. Built-in defaults
//!
//! The environment separator is `_`, so only single-word keys can be set
//! from the environment (`GHMIRROR_GITHUB_TOKENS=a,b`, `GHMIRROR_QUEUE_BROKER`).
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres:///ghmirror"  # default: sqlite in the XDG state directory
//!
//! [github]
//! tokens = ["ghp_a", "ghp_b"]
//! api_url = "https://api.github.com"
//! requests_per_second = 10
//!
//! [queue]
//! broker = "redis://127.0.0.1/"
//! name = "ghmirror:jobs"
//! claim_idle_secs = 300
//!
//! [sync]
//! excluded_repos = ["private-infra"]
//! nested = true
//! exhausted_sleep_secs = 600
//! transport_retries = 4
//!
//! [cache]
//! enabled = true
//! dir = "/var/cache/ghmirror"  # default: $TMPDIR/ghmirror
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;

use ghmirror::github::{DEFAULT_EXHAUSTED_SLEEP, GITHUB_DEFAULT_RPS};
use ghmirror::retry::DEFAULT_MAX_RETRIES;

const APP_NAME: &str = "ghmirror";

/// Default stream / queue name.
pub const DEFAULT_QUEUE_NAME: &str = "ghmirror:jobs";

/// Seconds a job may stay unacknowledged before another worker takes it.
pub const DEFAULT_CLAIM_IDLE_SECS: u64 = 300;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubConfig,
    pub queue: QueueConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// One client is created per token.
    pub tokens: Vec<String>,
    /// API root, for GitHub Enterprise.
    pub api_url: Option<String>,
    /// Per-token pacing; `0` disables it.
    pub requests_per_second: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            api_url: None,
            requests_per_second: GITHUB_DEFAULT_RPS,
        }
    }
}

/// Job queue configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Broker URL, e.g. `redis://127.0.0.1/`. Required by `produce` and `work`.
    pub broker: Option<String>,
    /// Stream name.
    pub name: String,
    /// Consumer name within the worker group. Defaults to one per process.
    pub consumer: Option<String>,
    pub claim_idle_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            broker: None,
            name: DEFAULT_QUEUE_NAME.to_string(),
            consumer: None,
            claim_idle_secs: DEFAULT_CLAIM_IDLE_SECS,
        }
    }
}

impl QueueConfig {
    pub fn claim_idle(&self) -> Duration {
        Duration::from_secs(self.claim_idle_secs)
    }
}

/// Sync behavior.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Repository names never queued.
    pub excluded_repos: Vec<String>,
    /// Sync comments and reviews along with issue and pull request jobs.
    pub nested: bool,
    /// Upper bound on the sleep when every token is rate limited.
    pub exhausted_sleep_secs: u64,
    /// Retries for transport-level failures of one request.
    pub transport_retries: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            excluded_repos: Vec::new(),
            nested: true,
            exhausted_sleep_secs: DEFAULT_EXHAUSTED_SLEEP.as_secs(),
            transport_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl SyncConfig {
    pub fn exhausted_sleep(&self) -> Duration {
        Duration::from_secs(self.exhausted_sleep_secs)
    }
}

/// HTTP response cache.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Defaults to `$TMPDIR/ghmirror`.
    pub dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/ghmirror/config.toml)
    /// 3. Local config file (./ghmirror.toml)
    /// 4. Environment variables with GHMIRROR_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("ghmirror.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./ghmirror.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // e.g., GHMIRROR_DATABASE_URL -> database.url
        builder = builder.add_source(Self::environment());

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    fn environment() -> Environment {
        Environment::with_prefix("GHMIRROR")
            .separator("_")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("github.tokens")
    }

    /// Get the database URL, falling back to the default state directory path.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("ghmirror.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Tokens from the command line if given, else from configuration.
    /// Blank entries are dropped.
    pub fn tokens(&self, cli_tokens: &[String]) -> Vec<String> {
        let source = if cli_tokens.is_empty() {
            &self.github.tokens
        } else {
            cli_tokens
        };
        source
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// On Linux, this is `$XDG_STATE_HOME/ghmirror` or `~/.local/state/ghmirror`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
