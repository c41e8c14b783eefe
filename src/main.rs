//! Feed Service binary entrypoint.
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use locallens_feed::api::{create_router, AppState};
use locallens_feed::config::FeedConfig;
use locallens_feed::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("locallens_feed=info,feed=info,feed_cache=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments. This enables
    // FEED_CONFIG_PATH / FEED_UPSTREAM_BASE_URL from .env.
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = FeedConfig::load()?;
    let metrics = Metrics::init(config.cache.bucket_precision_km);

    let upstream = config
        .upstream
        .base_url
        .clone()
        .unwrap_or_else(|| "embedded fixtures".to_string());
    let state = AppState::from_config(config)?;
    let router = create_router(state).merge(metrics.router());

    let addr = std::env::var("FEED_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, %upstream, "feed service listening");

    axum::serve(listener, router).await?;
    Ok(())
}
