//! Pool Dashboard Example
//!
//! Connects a StreamSystem to a poolcast server, loads a feed and prints
//! session status and pool occupancy as they change. Uses the mock engine
//! and sink so it runs without a real streaming stack.
//!
//! Run with: `cargo run -p poolcast-sdk --example pool_dashboard -- http://localhost:8000 my-channel`

use std::sync::Arc;
use std::time::Duration;

use poolcast_sdk::{SessionConfig, StreamSystem};
use poolcast_session::logging::{init_logging, LoggingMode};
use poolcast_session::mock::{MockEngine, MockSink};
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingMode::Development)?;

    let mut args = std::env::args().skip(1);
    let base_url = args
        .next()
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let content_id = args.next().unwrap_or_else(|| "demo-channel".to_string());

    println!("Connecting to {base_url}...");

    let config = SessionConfig::new(base_url.parse()?)
        // Probing is advisory anyway; skip it so the demo starts fast
        .with_probe_retries(0);

    let engine = Arc::new(MockEngine::new());
    let sink = Arc::new(MockSink::advancing_immediately());
    let system = StreamSystem::connect(config, engine, Some(sink), None)?;

    // Every status transition, as any widget would see it
    let _sub = system.subscribe(|change| {
        let marker = if change.entered_error { " [!]" } else { "" };
        println!(
            "status: player={} transport={} url={}{}",
            change.status.player,
            change.status.transport,
            change.status.display_url(),
            marker,
        );
    });

    println!("Loading {content_id}...");
    system.load_and_play(&content_id).await?;

    // Let the pool watcher complete its first polls, then show the table
    for _ in 0..3 {
        sleep(Duration::from_secs(2)).await;
        let rows = system.pool().rows();
        if rows.is_empty() {
            println!("pool: no snapshot yet");
            continue;
        }
        for row in &rows {
            println!(
                "  #{} {} {} {}",
                row.ordinal,
                row.instance_id,
                row.label(),
                if row.healthy { "healthy" } else { "unhealthy" },
            );
        }
    }

    if let Ok(descriptor) = system.catalog().get(&content_id).await {
        println!(
            "descriptor: {} (quality: {})",
            descriptor.title,
            descriptor.quality_tier().label(),
        );
    }

    Ok(())
}
