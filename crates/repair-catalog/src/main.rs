mod address_bar;
mod cache;
mod catalog;
mod config;
mod error;
mod filter;
mod http;
mod metadata;
mod model;
mod query;
mod repository;
mod server;
mod service;

use std::sync::Arc;

use rmcp::{transport::stdio, ServiceExt};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use repair_common::cms::CmsClient;
use repair_common::redis::RedisCache;

use cache::CaseCache;
use config::Config;
use repository::CmsRepository;
use server::RepairCatalogServer;
use service::CatalogService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting repair-catalog");

    let config = Config::from_env()?;
    info!(
        cms = %config.cms.base_url,
        redis = config.redis_url.is_some(),
        cache_ttl_secs = config.cache_ttl_secs,
        "configuration loaded"
    );

    let cache = CaseCache::new(RedisCache::new(config.redis_url.as_deref()), config.cache_ttl_secs);
    if cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }

    let client = CmsClient::new(config.cms.clone())?;
    info!(
        timeout_ms = client.config().default_timeout.as_millis(),
        max_retries = client.config().max_retries,
        "cms client configured"
    );

    let repository = Arc::new(CmsRepository::new(client, Arc::new(cache)));
    let service = Arc::new(CatalogService::new(repository));

    // Surfaces answer "loading" until this finishes.
    let loader = Arc::clone(&service);
    tokio::spawn(async move {
        if let Ok(counts) = loader.load().await {
            info!(
                cases = counts.case_count,
                categories = counts.category_count,
                symptoms = counts.symptom_count,
                "initial catalog ready"
            );
        }
    });

    if let Some(addr) = config.http_listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "serving catalog API over HTTP");
        axum::serve(listener, http::router(service)).await?;
        return Ok(());
    }

    let server = RepairCatalogServer::new(service);

    if let Some(addr) = config.mcp_tcp_listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    }

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;
    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
