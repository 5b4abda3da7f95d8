use axum::{extract::State, routing::post, Json, Router};
use rand::Rng;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
struct ServerConfig {
    latency_ms: u64,
    error_rate: f64,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let port = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("3001")
        .parse::<u16>()
        .expect("port");
    let latency_ms = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("500")
        .parse::<u64>()
        .expect("latency");
    let error_rate = args
        .get(3)
        .map(|s| s.as_str())
        .unwrap_or("0.0")
        .parse::<f64>()
        .expect("error rate");

    let config = ServerConfig {
        latency_ms,
        error_rate,
    };

    let app = Router::new()
        .route("/suggest", post(handler))
        .with_state(config);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!(
        "Mock suggestion provider on localhost:{}. Latency: {}ms, Error Rate: {}",
        port, latency_ms, error_rate
    );

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn handler(
    State(config): State<ServerConfig>,
    Json(req): Json<Value>,
) -> (axum::http::StatusCode, Json<Value>) {
    // Simulate latency
    let jitter = rand::thread_rng().gen_range(0..=20);
    sleep(Duration::from_millis(config.latency_ms + jitter)).await;

    // Simulate error
    if config.error_rate > 0.0 && rand::thread_rng().gen_bool(config.error_rate) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "simulated failure"})),
        );
    }

    let suggestion_type = req
        .get("suggestion_type")
        .and_then(|v| v.as_str())
        .unwrap_or("causes");

    let suggestions = match suggestion_type {
        "consequences" => json!([
            {"description": "Vessel overpressure and potential rupture", "severity": 4},
            {"description": "Release of process fluid to atmosphere", "severity": 3}
        ]),
        "safeguards" => json!([
            {"description": "Pressure relief valve PSV-101", "effectiveness": "high"},
            {"description": "High pressure alarm with operator response", "effectiveness": "medium"}
        ]),
        "complete_analysis" => json!({
            "causes": [{"description": "Control valve fails closed", "confidence": 0.8}],
            "consequences": [{"description": "Upstream overpressure", "severity": 4}],
            "safeguards": [{"description": "Relief valve", "effectiveness": "high"}]
        }),
        _ => json!([
            {"description": "Control valve FCV-101 fails closed", "confidence": 0.8},
            {"description": "Blocked outlet due to valve misalignment", "confidence": 0.6}
        ]),
    };

    (
        axum::http::StatusCode::OK,
        Json(json!({
            "suggestions": suggestions,
            "model": "mock-gemini",
        })),
    )
}
