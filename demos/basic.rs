//! Minimal onion example: a timing layer, a counter layer and a terminal.
//!
//! Run with:
//!   cargo run --example basic

use std::time::{Duration, Instant};

use onion::{Context, Error, Next, Onion};
use serde_json::{Value, json};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let app = Onion::<Value>::new()
        .layer(|| timing)
        .layer(|| count)
        .layer(|| count)
        .terminal(finish);

    let input = json!({ "counter": 0 });
    let output = app.execute(&input).await?;

    info!(%input, %output, "done");
    Ok(())
}

// Measures everything below it, then forwards what the inner layers resolved.
async fn timing(cx: Context<Value>, next: Next<Value>) -> Result<Option<Value>, Error> {
    let started = Instant::now();
    let inner = next.run().await?;
    let elapsed = started.elapsed();
    cx.update(|c| c["elapsed_ms"] = json!(elapsed.as_millis() as u64));
    info!(?elapsed, "pipeline finished");
    Ok(inner)
}

// Bumps the counter on the way in, pauses, then hands over.
async fn count(cx: Context<Value>, next: Next<Value>) -> Result<(), Error> {
    let n = cx.update(|c| {
        let n = c["counter"].as_i64().unwrap_or(0) + 1;
        c["counter"] = json!(n);
        n
    });
    info!(counter = n, "counted");
    tokio::time::sleep(Duration::from_millis(50)).await;
    next.run().await?;
    Ok(())
}

// Runs after the last layer; mutating in place and resolving with nothing
// lets the context itself become the result.
async fn finish(cx: Context<Value>, _next: Next<Value>) {
    cx.update(|c| c["finished"] = json!(true));
}
