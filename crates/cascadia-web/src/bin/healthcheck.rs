//! Smoke check against a running gateway.
//!
//! Usage: healthcheck [BASE_URL]   (default http://localhost:8000)
//!
//! Sends a real `/query` only when `SERVICE_API_KEY` is set. Exits non-zero
//! on the first failing check.

use std::time::Duration;

use anyhow::{bail, Context};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let base = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let base = base.trim_end_matches('/');

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    println!("Cascadia health check against {base}");

    let health = get_json(&client, &format!("{base}/health")).await?;
    println!(
        "  /health      status={} provider={}",
        health["status"].as_str().unwrap_or("?"),
        health["provider"].as_str().unwrap_or("none"),
    );

    let providers = get_json(&client, &format!("{base}/providers")).await?;
    println!("  /providers   active={}", providers["active_providers"]);

    let metrics = get_json(&client, &format!("{base}/metrics")).await?;
    println!("  /metrics     total_requests={}", metrics["total_requests"]);

    match std::env::var("SERVICE_API_KEY").ok().filter(|k| !k.trim().is_empty()) {
        Some(key) => {
            let response = client
                .post(format!("{base}/query"))
                .header("x-api-key", key)
                .json(&serde_json::json!({ "prompt": "Reply with the single word: pong", "max_tokens": 16 }))
                .send()
                .await
                .context("POST /query failed")?;
            let status = response.status();
            let body: Value = response.json().await.context("/query returned non-JSON")?;
            if !status.is_success() {
                bail!("/query answered {status}: {}", body["detail"]);
            }
            println!(
                "  /query       provider={} latency_ms={} steps={}",
                body["provider"].as_str().unwrap_or("?"),
                body["latency_ms"],
                body["cascade_path"].as_array().map_or(0, Vec::len),
            );
        }
        None => println!("  /query       skipped (SERVICE_API_KEY not set)"),
    }

    println!("All checks passed");
    Ok(())
}

async fn get_json(client: &reqwest::Client, url: &str) -> anyhow::Result<Value> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("could not reach {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} answered {status}");
    }
    response.json().await.with_context(|| format!("{url} returned non-JSON"))
}
