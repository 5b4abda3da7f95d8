use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use suggest_edge::cache::{sweeper, SuggestionCache};
use suggest_edge::config::Config;
use suggest_edge::gateway::{handle_cache_stats, handle_health, handle_suggest, AppState};
use suggest_edge::provider::Provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let provider = Provider::new(config.provider.clone())?;
    let cache = Arc::new(SuggestionCache::new(chrono::Duration::seconds(
        config.cache_ttl_secs as i64,
    )));

    sweeper::spawn(
        cache.clone(),
        Duration::from_secs(config.sweep_interval_secs),
        Duration::from_secs(config.sweep_retry_secs),
    );

    let app_state = Arc::new(AppState {
        provider: Arc::new(provider),
        cache,
    });

    let app = Router::new()
        .route("/v1/suggestions", post(handle_suggest))
        .route("/v1/cache/stats", get(handle_cache_stats))
        .route("/health", get(handle_health))
        .with_state(app_state);

    println!("Suggestion gateway listening on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
