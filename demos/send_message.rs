//! Message channel example
//!
//! Connects to a device, sends one text message and prints everything the
//! device sends back for a few seconds.
//!
//! Run with: cargo run --example send_message -- --device AA:BB:CC:DD:EE:FF "hello"

use proximity_link_ble::ble::BtleplugTransport;
use proximity_link_ble::notice::LogNotifier;
use proximity_link_ble::storage::MemoryStore;
use proximity_link_ble::{ConnectionManager, LinkConfig, Result};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,proximity_link_ble=debug")
        .init();

    let mut device = None;
    let mut text = "Test message".to_string();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--device" {
            device = args.next();
        } else {
            text = arg;
        }
    }

    let manager = ConnectionManager::new(
        Arc::new(BtleplugTransport::new().await?),
        Arc::new(MemoryStore::new()),
        Arc::new(LogNotifier),
        LinkConfig::default().with_monitoring(false),
    )?;

    if !manager.verify_adapter_ready().await {
        println!("Bluetooth is off.");
        return Ok(());
    }

    let handle = match device {
        Some(device) => manager.connect(device).await?,
        None => manager.reconnect_last().await?,
    };
    println!("Connected to {}", handle.device());

    let _messages = manager.on_message(|message| {
        println!("<- {}", message.text);
    });

    let channel = manager.channel();
    channel.send(&text).await?;
    println!("-> {}", text);

    tokio::time::sleep(Duration::from_secs(5)).await;

    println!("\nReceived {} message(s)", channel.received().len());
    manager.disconnect().await;
    Ok(())
}
