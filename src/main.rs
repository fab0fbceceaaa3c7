// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::backing_store::BackingStore;
use crate::application::fantasy_service::FantasyService;
use crate::application::ttl_cache::{CacheStorage, TtlCache};
use crate::infrastructure::broadcast_hub::BroadcastHub;
use crate::infrastructure::cache_storage::{FileCacheStorage, MemoryCacheStorage};
use crate::infrastructure::config::{load_settings, StoreKind};
use crate::infrastructure::memory_store::MemoryStore;
use crate::infrastructure::rest_store::RestStore;
use crate::infrastructure::sleeper_client::SleeperClient;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("widget_dashboard=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create backing store (infrastructure layer)
    let store: Arc<dyn BackingStore> = match settings.store.kind {
        StoreKind::Rest => {
            let url = settings.store.url.clone().context("store.url is required for the rest store")?;
            let api_key = settings
                .store
                .api_key
                .clone()
                .context("store.api_key is required for the rest store")?;
            tracing::info!("Using REST backing store at {}", url);
            Arc::new(RestStore::new(url, api_key))
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory backing store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    if settings.realtime.credentials.is_empty() {
        tracing::warn!("No live credentials configured; any non-empty bearer token may subscribe");
    }
    if settings.realtime.publish_key.is_none() {
        tracing::warn!("No realtime.publish_key configured; broadcast publishing is disabled");
    }
    let hub = Arc::new(BroadcastHub::new(settings.realtime.credentials.clone()));

    let cache_storage: Arc<dyn CacheStorage> = match &settings.cache.dir {
        Some(dir) => Arc::new(FileCacheStorage::new(dir.clone())),
        None => Arc::new(MemoryCacheStorage::new()),
    };
    let cache = TtlCache::new(cache_storage, settings.cache.ttl());

    // Create services (application layer)
    let league_source = Arc::new(SleeperClient::new(settings.feeds.sleeper_base_url.clone()));
    let fantasy_service = FantasyService::new(league_source, cache);

    // Create application state
    let state = Arc::new(AppState::new(
        store,
        hub,
        fantasy_service,
        settings.realtime.publish_key.clone(),
    ));

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", settings.server.bind))?;
    tracing::info!("Starting widget-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
