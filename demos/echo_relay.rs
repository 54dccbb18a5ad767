//! Relay demo with a logging host platform.
//!
//! Connects to a control endpoint, feeds a few synthetic host events through
//! the bridge, and logs every payload the endpoint dispatches into a tab.
//!
//! Usage:
//!     cargo run --example echo_relay -- [ws://host:port] [--debug]

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use extension_relay::{
    Platform, PlatformEvent, RawActiveInfo, ReconnectPolicy, Relay, RelayConfig, Result, TabId,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Platform
// ============================================================================

/// Host platform that only logs dispatched payloads.
struct LoggingPlatform;

#[async_trait]
impl Platform for LoggingPlatform {
    async fn send_to_tab(&self, tab_id: TabId, payload: Value) -> Result<()> {
        info!(%tab_id, %payload, "Tab dispatch");
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "extension_relay=debug,echo_relay=debug"
    } else {
        "extension_relay=info,echo_relay=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_logging(args.iter().any(|a| a == "--debug"));

    let mut builder = RelayConfig::builder()
        .reconnect(ReconnectPolicy::exponential(
            Duration::from_millis(500),
            Duration::from_secs(10),
        ));
    if let Some(endpoint) = args.iter().find(|a| !a.starts_with("--")) {
        builder = builder.endpoint(endpoint.as_str());
    }
    let config = builder.build()?;

    let relay = Relay::new(config, Arc::new(LoggingPlatform));
    if let Err(e) = relay.start().await {
        info!(error = %e, "Initial connection failed, retrying in background");
    }

    // Synthetic host events, in the shape the extension host delivers them
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let bridge = relay.bridge().clone();
    let pump = tokio::spawn(async move { bridge.run(events_rx).await });

    events_tx.send(PlatformEvent::TabActivated(RawActiveInfo {
        tab_id: 1,
        window_id: 1,
    }))?;
    events_tx.send(PlatformEvent::RuntimeMessage {
        request: json!({"op": "hello"}),
        sender: json!({"id": "demo-extension", "url": "moz-extension://demo/popup.html"}),
    })?;

    println!("Press Ctrl+C to exit...");
    tokio::signal::ctrl_c().await.ok();

    drop(events_tx);
    pump.await.ok();
    relay.shutdown();

    Ok(())
}
