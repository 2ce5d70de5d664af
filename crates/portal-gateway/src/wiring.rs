use std::sync::Arc;

use anyhow::{bail, Context};
use portal_cache::{
    ExistenceFilter, ExistenceFilterConfig, MokaUrlCache, RedisHAUrlCache, RedisUrlCache,
};
use portal_core::{Repository, UrlCache};
use portal_redirector::{CachedRepository, RedirectorService};
use portal_sequence::{InMemorySequence, RedisHASequence, RedisSequence, SequenceAllocator};
use portal_shortener::ShortenerService;
use portal_storage::{InMemoryRepository, MySqlRepository};
use tracing::info;

use crate::cli::{Cli, RedisBackendArg, StorageBackendArg};
use crate::reachability::{HttpProbe, UrlProbe};
use crate::state::AppState;

/// Builds every backend selected on the command line and assembles the
/// shared handler state.
pub async fn build_state(cli: &Cli) -> anyhow::Result<AppState> {
    let repository = build_repository(cli).await?;
    let sequence = build_sequence(cli, repository.as_ref()).await?;
    let cache = build_cache(cli).await?;

    let mut shortener = ShortenerService::new(Arc::clone(&repository), sequence, &cli.domain);
    if let Some(timeout) = cli.request_timeout() {
        shortener = shortener.with_timeout(timeout);
    }

    let cached = CachedRepository::new(Arc::clone(&repository), cache).with_ttl(cli.cache_ttl());
    let mut redirector = RedirectorService::new(cached);
    if cli.existence_filter {
        let config = ExistenceFilterConfig::builder()
            .false_positive_rate(cli.filter_fp_rate)
            .in_flight_margin(cli.filter_in_flight_margin)
            .build();
        let filter = ExistenceFilter::load(repository.as_ref(), config)
            .await
            .context("failed to build existence filter")?;
        redirector = redirector.with_filter(Arc::new(filter));
    }
    if let Some(timeout) = cli.request_timeout() {
        redirector = redirector.with_timeout(timeout);
    }

    let probe: Option<Arc<dyn UrlProbe>> = if cli.skip_reachability_check {
        info!("Reachability check disabled");
        None
    } else {
        Some(Arc::new(HttpProbe::new(cli.probe_timeout())?))
    };

    Ok(AppState::new(
        Arc::new(shortener),
        Arc::new(redirector),
        probe,
    ))
}

async fn build_repository(cli: &Cli) -> anyhow::Result<Arc<dyn Repository>> {
    info!(backend = %cli.storage, "Configuring mapping store");
    match cli.storage {
        StorageBackendArg::InMemory => Ok(Arc::new(InMemoryRepository::new())),
        StorageBackendArg::Mysql => {
            let dsn = cli
                .mysql_dsn
                .as_deref()
                .context("mysql storage requires --mysql-dsn")?;
            let repository = MySqlRepository::connect(dsn)
                .await
                .context("failed to connect to MySQL")?;
            if cli.mysql_migrate {
                repository
                    .migrate()
                    .await
                    .context("failed to apply MySQL schema")?;
            }
            Ok(Arc::new(repository))
        }
    }
}

async fn build_sequence(
    cli: &Cli,
    repository: &dyn Repository,
) -> anyhow::Result<Arc<dyn SequenceAllocator>> {
    info!(backend = %cli.sequence, key = %cli.sequence_key, "Configuring sequence allocator");
    match cli.sequence {
        RedisBackendArg::InMemory => {
            // A process-local counter must resume past every code already
            // stored, or the first new codes would collide.
            let last = repository
                .list_short_codes()
                .await
                .context("failed to list stored short codes")?
                .iter()
                .filter_map(|code| code.sequence().ok())
                .max()
                .unwrap_or(0);
            Ok(Arc::new(InMemorySequence::starting_after(last)))
        }
        RedisBackendArg::Redis => {
            let conn = redis_connection(cli).await?;
            Ok(Arc::new(RedisSequence::with_key(
                conn,
                cli.sequence_key.clone(),
            )))
        }
        RedisBackendArg::RedisSentinel => {
            let sentinels = sentinels(cli)?;
            Ok(Arc::new(RedisHASequence::with_key(
                sentinels,
                &cli.redis_service_name,
                cli.sequence_key.clone(),
            )?))
        }
    }
}

async fn build_cache(cli: &Cli) -> anyhow::Result<Arc<dyn UrlCache>> {
    info!(backend = %cli.cache, ttl_secs = cli.cache_ttl_secs, "Configuring redirect cache");
    match cli.cache {
        RedisBackendArg::InMemory => Ok(Arc::new(MokaUrlCache::new())),
        RedisBackendArg::Redis => {
            let conn = redis_connection(cli).await?;
            Ok(Arc::new(RedisUrlCache::new(conn)))
        }
        RedisBackendArg::RedisSentinel => {
            let sentinels = sentinels(cli)?;
            Ok(Arc::new(RedisHAUrlCache::new(
                sentinels,
                &cli.redis_service_name,
            )?))
        }
    }
}

async fn redis_connection(cli: &Cli) -> anyhow::Result<redis::aio::MultiplexedConnection> {
    let Some(url) = cli.redis_url.as_deref() else {
        bail!("redis backend requires --redis-url");
    };
    let client = redis::Client::open(url).context("invalid redis url")?;
    client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to redis")
}

fn sentinels(cli: &Cli) -> anyhow::Result<Vec<&str>> {
    if cli.redis_sentinels.is_empty() {
        bail!("redis-sentinel backend requires --redis-sentinels");
    }
    Ok(cli.redis_sentinels.iter().map(String::as_str).collect())
}
