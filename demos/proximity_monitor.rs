//! Proximity monitor example
//!
//! Restores the link to the last connected device (or the configured
//! default) and prints a live proximity bar until Ctrl+C.
//!
//! Run with: cargo run --example proximity_monitor
//!
//! Configuration is read from the platform config directory, e.g.
//! `~/.config/proximity-link/config.toml` on Linux.

use proximity_link_ble::ble::BtleplugTransport;
use proximity_link_ble::notice::LogNotifier;
use proximity_link_ble::storage::JsonFileStore;
use proximity_link_ble::{ConnectionManager, LinkConfig, LinkEvent, Result};
use std::io::Write;
use std::sync::Arc;

const BAR_WIDTH: usize = 30;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,proximity_link_ble=info")
        .init();

    println!("Proximity Monitor");
    println!("=================\n");

    let config = LinkConfig::load(LinkConfig::default_path()?)?;
    let store = JsonFileStore::default_location()?;
    println!("Persisted device file: {}", store.path().display());

    let manager = ConnectionManager::new(
        Arc::new(BtleplugTransport::new().await?),
        Arc::new(store),
        Arc::new(LogNotifier),
        config,
    )?;

    let mut events = manager.subscribe();

    if let Err(e) = manager.restore().await {
        println!("Could not restore link: {}", e);
        return Ok(());
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(LinkEvent::Signal(Some(sample))) => {
                    let filled = (sample.proximity.score * BAR_WIDTH as f64).round() as usize;
                    print!(
                        "\r[{}{}] {:>4} dBm  {:<12}",
                        "#".repeat(filled),
                        " ".repeat(BAR_WIDTH - filled),
                        sample.rssi,
                        sample.proximity.category.label(),
                    );
                    let _ = std::io::stdout().flush();
                }
                Ok(LinkEvent::Message(message)) => {
                    println!("\nMessage: {}", message.text);
                }
                Ok(LinkEvent::Disconnected { device, reason }) => {
                    println!("\nDisconnected from {} ({:?})", device, reason);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    println!("\nEvent stream ended: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping...");
                break;
            }
        }
    }

    manager.shutdown().await;
    Ok(())
}
