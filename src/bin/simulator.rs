use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task;

// Helper to kill children on exit
struct ProcessGuard(Child);
impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

#[tokio::main]
async fn main() {
    println!("Starting simulation...");

    // 1. Start the mock upstream provider
    // Assumes binaries are already built by a previous `cargo build`
    let _provider = ProcessGuard(
        Command::new("./target/debug/mock_provider")
            .args(["3001", "300", "0.0"])
            .spawn()
            .expect("Failed to start mock provider"),
    );

    println!("Provider started on 3001. Waiting 2s for startup...");
    thread::sleep(Duration::from_secs(2));

    // 2. Start the gateway
    let _gw = ProcessGuard(
        Command::new("./target/debug/suggest-edge")
            .env("PROVIDER_ENDPOINT", "http://localhost:3001/suggest")
            .spawn()
            .expect("Failed to start gateway"),
    );

    println!("Gateway started on 8080. Waiting 2s...");
    thread::sleep(Duration::from_secs(2));

    // 3. Fire a mixed hot/cold load: half the requests share one deviation
    // and should collapse onto a single upstream call after the first miss.
    println!("Starting load test (100 concurrent requests)...");

    let client = reqwest::Client::new();
    let successes = Arc::new(AtomicUsize::new(0));
    let cached_hits = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let start_time = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..100 {
        let client = client.clone();
        let successes = successes.clone();
        let cached_hits = cached_hits.clone();
        let errors = errors.clone();

        let deviation_id = if i < 50 {
            "dev-hot".to_string()
        } else {
            format!("dev-cold-{}", i)
        };

        tasks.push(task::spawn(async move {
            let body = serde_json::json!({
                "deviation_id": deviation_id,
                "suggestion_type": "causes",
                "context": {
                    "fluid_type": "crude oil",
                    "operating_conditions": "12 bar, 80C"
                }
            });

            match client
                .post("http://localhost:8080/v1/suggestions")
                .json(&body)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    successes.fetch_add(1, Ordering::Relaxed);
                    if let Ok(v) = resp.json::<serde_json::Value>().await {
                        if v.get("cached").and_then(|c| c.as_bool()) == Some(true) {
                            cached_hits.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
                _ => {
                    errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }));
    }

    for t in tasks {
        let _ = t.await;
    }

    let duration = start_time.elapsed();

    println!("--- Results ---");
    println!("Total Requests: 100");
    println!("Success: {}", successes.load(Ordering::Relaxed));
    println!("Served from cache: {}", cached_hits.load(Ordering::Relaxed));
    println!("Errors: {}", errors.load(Ordering::Relaxed));
    println!("Total Time: {:?}", duration);
    println!("RPS: {:.2}", 100.0 / duration.as_secs_f64());

    // 4. Pull the gateway's own accounting
    if let Ok(resp) = client
        .get("http://localhost:8080/v1/cache/stats")
        .send()
        .await
    {
        if let Ok(stats) = resp.json::<serde_json::Value>().await {
            println!("--- Gateway cache stats ---");
            println!("{}", serde_json::to_string_pretty(&stats).unwrap_or_default());
        }
    }

    println!("Simulation finished. Stopping servers in 2s.");
    thread::sleep(Duration::from_secs(2));
}
