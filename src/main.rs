use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tastetrail_api::api::{create_router, AppState};
use tastetrail_api::config::Config;
use tastetrail_api::db::{create_redis_client, Cache};
use tastetrail_api::services::qloo::{HttpTransport, QlooClient, RetryingClient};
use tastetrail_api::services::TagsService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = Cache::new(redis_client).await;

    // One client, one gateway, one reference cache per process; the token
    // doubles as the shutdown signal for in-flight provider calls.
    let cancel = CancellationToken::new();
    let retrying_client = RetryingClient::new(
        Arc::new(HttpTransport::new()),
        config.qloo_api_url.clone(),
        config.qloo_api_key.clone(),
        cancel.clone(),
    );
    let qloo = Arc::new(QlooClient::new(retrying_client));
    let tags = Arc::new(TagsService::new(Arc::clone(&qloo)));

    let state = AppState::new(cache, qloo, tags);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "TasteTrail API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    cache_writer.shutdown().await;
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
    cancel.cancel();
}
