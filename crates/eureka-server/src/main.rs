mod activity;
mod cache;
mod clock;
mod config;
mod controller;
mod error;
mod model;
mod preferences;
mod prompt;
mod rate_limit;
mod recommend;
mod render;
mod server;
mod session;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eureka_core::gemini::GeminiClient;
use eureka_core::redis::RedisCache;
use eureka_core::store::{KeyValueStore, MemoryStore, Repository};

use activity::ActivityTracker;
use cache::ResultCache;
use clock::{Clock, SystemClock};
use config::Config;
use controller::Shared;
use error::AppError;
use preferences::Preferences;
use rate_limit::RateLimiter;
use recommend::RecommendationClient;
use server::EurekaServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting eureka MCP server");

    let config = Config::from_env()?;
    info!(
        redis = config.redis_url.is_some(),
        rate_limit_rps = config.rate_limit_rps,
        "configuration loaded"
    );

    let server = build_server(&config).await?;

    if let Some(addr) = &config.tcp_listen_addr {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.new_session();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}

async fn build_server(config: &Config) -> Result<EurekaServer, AppError> {
    let gemini_config = config.gemini();
    info!(
        endpoint = %gemini_config.endpoint,
        auth = ?gemini_config.auth,
        timeout_ms = gemini_config.timeout.as_millis(),
        "gemini client configured"
    );
    let gemini = Arc::new(GeminiClient::new(gemini_config)?);

    let store: Arc<dyn KeyValueStore> = match config.redis_url.as_deref() {
        Some(url) => {
            let redis = RedisCache::new(Some(url));
            match redis.probe().await.map_err(AppError::from) {
                Ok(()) => info!("redis connected"),
                Err(e) => warn!(error = %e, "redis unavailable, cache and preferences degrade to misses"),
            }
            Arc::new(redis)
        }
        None => {
            info!("REDIS_URL not set, keeping state in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let repo = Repository::new(store);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let shared = Shared {
        client: RecommendationClient::new(gemini),
        cache: Arc::new(ResultCache::new(repo.clone(), Arc::clone(&clock))),
        activity: ActivityTracker::new(repo.clone(), Arc::clone(&clock)),
    };
    let limiter = RateLimiter::from_rps(config.rate_limit_rps);

    Ok(EurekaServer::new(
        shared,
        Preferences::new(repo),
        clock,
        limiter,
    ))
}
