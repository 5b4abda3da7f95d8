use crate::cache::fingerprint::fingerprint;
use crate::cache::{CacheStats, SuggestionCache};
use crate::model::{SuggestionRequest, SuggestionResponse};
use crate::provider::Provider;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

// Ballpark cost of one upstream Gemini call, used for the savings estimate.
const COST_PER_CALL_USD: f64 = 0.0004;

pub struct AppState {
    pub provider: Arc<Provider>,
    pub cache: Arc<SuggestionCache>,
}

pub async fn handle_suggest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SuggestionRequest>,
) -> Response {
    let start = Instant::now();

    // Cache failures must never block the request path: a key we cannot
    // derive just means this request bypasses the cache.
    let key = match fingerprint(&req.deviation_id, req.suggestion_type, req.context.as_ref()) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!(
                deviation_id = %req.deviation_id,
                "fingerprint derivation failed, bypassing cache: {}", e
            );
            None
        }
    };

    if let Some(key) = key.as_deref() {
        if let Some(payload) = state.cache.get(key) {
            info!(
                suggestion_type = %req.suggestion_type,
                deviation_id = %req.deviation_id,
                "cache hit"
            );
            let resp = SuggestionResponse {
                suggestions: payload,
                provider: state.provider.config.name.clone(),
                cached: true,
                latency_ms: start.elapsed().as_millis() as u64,
            };
            return (StatusCode::OK, Json(resp)).into_response();
        }
        info!(
            suggestion_type = %req.suggestion_type,
            deviation_id = %req.deviation_id,
            "cache miss"
        );
    }

    if !state.provider.is_healthy() {
        error!("provider {} marked unhealthy", state.provider.config.name);
        return (StatusCode::SERVICE_UNAVAILABLE, "Provider unavailable").into_response();
    }

    let call_start = Instant::now();
    match state.provider.suggest(&req).await {
        Ok(payload) => {
            let latency = call_start.elapsed();
            state.provider.stats.record_success(latency);

            if let Some(key) = key.as_deref() {
                state.cache.put(
                    key,
                    req.suggestion_type,
                    payload.clone(),
                    state.cache.default_ttl(),
                );
            }

            let total = start.elapsed();
            info!(
                "request processed in {:?} (upstream: {:?}, overhead: {:?})",
                total,
                latency,
                total.saturating_sub(latency)
            );

            let resp = SuggestionResponse {
                suggestions: payload,
                provider: state.provider.config.name.clone(),
                cached: false,
                latency_ms: latency.as_millis() as u64,
            };
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(e) => {
            state.provider.stats.record_failure();
            error!("provider call failed: {}", e);
            (StatusCode::BAD_GATEWAY, format!("Provider error: {}", e)).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CacheStatsReport {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub estimated_cost_savings_usd: f64,
    pub cache_hit_rate_percent: f64,
}

impl CacheStatsReport {
    fn from_stats(stats: CacheStats) -> Self {
        let lookups = stats.total_hits + stats.total_misses;
        let hit_rate = if lookups > 0 {
            stats.total_hits as f64 / lookups as f64 * 100.0
        } else {
            0.0
        };
        // Every hit is one upstream call not made.
        let savings = stats.total_hits as f64 * COST_PER_CALL_USD;

        Self {
            stats,
            estimated_cost_savings_usd: (savings * 100.0).round() / 100.0,
            cache_hit_rate_percent: (hit_rate * 100.0).round() / 100.0,
        }
    }
}

pub async fn handle_cache_stats(State(state): State<Arc<AppState>>) -> Response {
    let report = CacheStatsReport::from_stats(state.cache.stats());
    (StatusCode::OK, Json(report)).into_response()
}

pub async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({"status": "healthy"})),
    )
        .into_response()
}
