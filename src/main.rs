use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nexus_api::{
    api::{AppState, Repositories},
    auth::TokenService,
    config::Config,
    db::{
        create_pool, create_redis_client, run_migrations, Cache, CacheStore, CacheWriterHandle,
        MemoryStore, RedisStore,
    },
    routes::create_router,
    services::providers::TmdbProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nexus_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    run_migrations(&pool).await?;

    let (store, cache_writer): (Arc<dyn CacheStore>, Option<CacheWriterHandle>) =
        match &config.redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                let (store, writer) = RedisStore::new(client);
                (Arc::new(store), Some(writer))
            }
            None => {
                tracing::warn!("REDIS_URL not set, using in-process cache");
                (Arc::new(MemoryStore::new()), None)
            }
        };
    let cache = Cache::new(store);

    let provider = TmdbProvider::new(
        cache.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        Duration::from_secs(config.tmdb_timeout_secs),
    )?;
    let tokens = TokenService::new(
        &config.jwt_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
        cache.clone(),
    );

    let state = AppState::new(cache, Repositories::postgres(pool), Arc::new(provider), tokens);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        tracing::info!("Flushing pending cache writes");
        writer.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
