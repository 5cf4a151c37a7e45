use std::error::Error;
use std::sync::Arc;

use ghmirror::github::{self, ClientOptions};
use ghmirror::queue::JobQueue;
use ghmirror::retry::RetryConfig;
use ghmirror::sync::{ProgressCallback, SyncContext, SyncOptions, SyncProgress};
use ghmirror::transport::{self, CacheLocation, TransportOptions};
use ghmirror::{Shutdown, db, schema};
use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::progress::LoggingReporter;

/// Options every sync command accepts on top of the config file.
#[derive(Debug, Clone, Default)]
pub(crate) struct SyncOverrides {
    pub(crate) tokens: Vec<String>,
    pub(crate) excluded_repos: Vec<String>,
    pub(crate) no_nested: bool,
    pub(crate) no_cache: bool,
}

/// Connect and refuse to run against a schema other than the compiled one.
pub(crate) async fn open_database(
    database_url: &str,
) -> Result<Arc<DatabaseConnection>, Box<dyn Error>> {
    let db = db::connect(database_url).await?;
    schema::ensure_current(&db).await?;
    Ok(Arc::new(db))
}

pub(crate) fn sync_options(config: &Config, overrides: &SyncOverrides) -> SyncOptions {
    let mut excluded_repos = config.sync.excluded_repos.clone();
    for name in &overrides.excluded_repos {
        if !excluded_repos.contains(name) {
            excluded_repos.push(name.clone());
        }
    }
    SyncOptions {
        excluded_repos,
        nested: config.sync.nested && !overrides.no_nested,
    }
}

fn transport_options(config: &Config, overrides: &SyncOverrides) -> TransportOptions {
    let cache = if overrides.no_cache || !config.cache.enabled {
        None
    } else {
        Some(match &config.cache.dir {
            Some(dir) => CacheLocation::Dir(dir.clone()),
            None => CacheLocation::TempDir,
        })
    };
    TransportOptions {
        retry: RetryConfig::default().with_max_retries(config.sync.transport_retries),
        cache,
        ..TransportOptions::default()
    }
}

/// Build the sync context: HTTP stack, credential pool, options and the
/// logging progress reporter.
pub(crate) async fn build_context(
    config: &Config,
    database_url: &str,
    overrides: &SyncOverrides,
    shutdown: &Shutdown,
) -> Result<SyncContext, Box<dyn Error>> {
    let tokens = config.tokens(&overrides.tokens);
    if tokens.is_empty() {
        return Err(
            "No GitHub tokens configured. Pass --tokens, set GHMIRROR_GITHUB_TOKENS, \
             or add [github] tokens to the config file."
                .into(),
        );
    }

    let db = open_database(database_url).await?;

    let http = transport::build_transport(&transport_options(config, overrides))?;
    let client_options = ClientOptions {
        api_url: config.github.api_url.clone(),
        requests_per_second: config.github.requests_per_second,
    };
    let pool = github::pool_from_tokens(&tokens, http, &client_options)?
        .with_exhausted_sleep(config.sync.exhausted_sleep())
        .with_shutdown(shutdown.clone());
    tracing::info!(credentials = pool.len(), "GitHub credential pool ready");

    let reporter = LoggingReporter::new();
    let progress: ProgressCallback = Box::new(move |event: SyncProgress| reporter.handle(event));

    let ctx = SyncContext::builder()
        .database(db)
        .pool(Arc::new(pool))
        .options(sync_options(config, overrides))
        .progress(Arc::new(progress))
        .build()?;
    Ok(ctx)
}

/// Connect to the configured broker.
#[cfg(feature = "redis")]
pub(crate) async fn open_queue(config: &Config) -> Result<Box<dyn JobQueue>, Box<dyn Error>> {
    use ghmirror::queue::RedisQueue;

    let Some(url) = config.queue.broker.as_deref() else {
        return Err(
            "No queue broker configured. Set GHMIRROR_QUEUE_BROKER or [queue] broker, \
             or use `ghmirror deep` to run without a broker."
                .into(),
        );
    };
    let consumer = config
        .queue
        .consumer
        .clone()
        .unwrap_or_else(|| format!("worker-{}", std::process::id()));
    let queue = RedisQueue::connect(url, &config.queue.name, &consumer)
        .await?
        .with_claim_idle(config.queue.claim_idle());
    Ok(Box::new(queue))
}

#[cfg(not(feature = "redis"))]
pub(crate) async fn open_queue(_config: &Config) -> Result<Box<dyn JobQueue>, Box<dyn Error>> {
    Err("This build has no queue broker support (enable the `redis` feature), \
         use `ghmirror deep` instead."
        .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_exclusions_extend_config() {
        let mut config = Config::default();
        config.sync.excluded_repos = vec!["infra".to_string()];
        let overrides = SyncOverrides {
            excluded_repos: vec!["infra".to_string(), "scratch".to_string()],
            ..SyncOverrides::default()
        };

        let options = sync_options(&config, &overrides);
        assert_eq!(options.excluded_repos, vec!["infra", "scratch"]);
        assert!(options.nested);
    }

    #[test]
    fn no_nested_flag_wins() {
        let config = Config::default();
        let overrides = SyncOverrides {
            no_nested: true,
            ..SyncOverrides::default()
        };
        assert!(!sync_options(&config, &overrides).nested);
    }

    #[test]
    fn cache_can_be_disabled_from_either_side() {
        let mut config = Config::default();
        assert_eq!(
            transport_options(&config, &SyncOverrides::default()).cache,
            Some(CacheLocation::TempDir)
        );

        let no_cache = SyncOverrides {
            no_cache: true,
            ..SyncOverrides::default()
        };
        assert_eq!(transport_options(&config, &no_cache).cache, None);

        config.cache.enabled = false;
        assert_eq!(transport_options(&config, &SyncOverrides::default()).cache, None);
    }

    #[test]
    fn transport_retries_follow_config() {
        let mut config = Config::default();
        config.sync.transport_retries = 1;
        let options = transport_options(&config, &SyncOverrides::default());
        assert_eq!(options.retry.max_retries, 1);
    }

    #[tokio::test]
    async fn missing_tokens_is_an_error() {
        let config = Config::default();
        let err = build_context(
            &config,
            "sqlite::memory:",
            &SyncOverrides::default(),
            &Shutdown::new(),
        )
        .await
        .expect_err("no tokens");
        assert!(err.to_string().contains("No GitHub tokens"));
    }
}
