//! Device discovery example
//!
//! Scans for nearby peripherals that advertise a name and prints them in
//! the order they were seen.
//!
//! Run with: cargo run --example discover_devices
//!
//! To scan for longer:
//!   cargo run --example discover_devices -- --seconds 10

use proximity_link_ble::ble::{BtleplugTransport, DeviceScanner};
use proximity_link_ble::{DistanceCategory, Result};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,proximity_link_ble=info")
        .init();

    let args: Vec<String> = std::env::args().collect();
    let seconds = args
        .iter()
        .position(|arg| arg == "--seconds")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(5);

    println!("Device Discovery");
    println!("================\n");
    println!("Scanning for {} seconds...\n", seconds);

    let scanner = DeviceScanner::new(Arc::new(BtleplugTransport::new().await?));
    let devices = scanner.scan(Duration::from_secs(seconds)).await?;

    if devices.is_empty() {
        println!("No named devices found.");
        return Ok(());
    }

    println!("{:<20} {:<24} {:>6}  Distance", "Address", "Name", "RSSI");
    for device in &devices {
        let (rssi, distance) = match device.rssi {
            Some(rssi) => (rssi.to_string(), DistanceCategory::from_rssi(rssi).label()),
            None => ("-".to_string(), "unknown"),
        };
        println!(
            "{:<20} {:<24} {:>6}  {}",
            device.id,
            device.name.as_deref().unwrap_or(""),
            rssi,
            distance
        );
    }

    println!("\nFound {} device(s)", devices.len());
    Ok(())
}
