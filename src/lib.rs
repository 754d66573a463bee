// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # proximity-link-ble
//!
//! Keeps a Bluetooth Low Energy link to one designated peripheral, estimates
//! how close it is from signal strength, and exchanges short text messages
//! over a single characteristic.
//!
//! ## Features
//!
//! - **Connection lifecycle**: connect, disconnect, reconnect to the last
//!   device after a restart, with drop detection
//! - **Proximity**: RSSI polled once a second and mapped to a distance
//!   category and a 0..1 score
//! - **Messaging**: base64 text frames in both directions, with an ordered
//!   log of everything received
//! - **Observers**: broadcast events or callbacks for state, signal and
//!   messages
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proximity_link_ble::{ConnectionManager, LinkConfig, Result};
//! use proximity_link_ble::ble::BtleplugTransport;
//! use proximity_link_ble::notice::LogNotifier;
//! use proximity_link_ble::storage::JsonFileStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = ConnectionManager::new(
//!         Arc::new(BtleplugTransport::new().await?),
//!         Arc::new(JsonFileStore::default_location()?),
//!         Arc::new(LogNotifier),
//!         LinkConfig::default(),
//!     )?;
//!
//!     // Reconnect to whatever was linked last time.
//!     manager.restore().await?;
//!
//!     let _signal = manager.on_signal(|sample| {
//!         if let Some(sample) = sample {
//!             println!("{} dBm: {}", sample.rssi, sample.proximity.category);
//!         }
//!     });
//!
//!     manager.send("hello").await?;
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps. Peripherals are identified by a
//! platform UUID rather than their address.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.

// Public modules
pub mod ble;
pub mod config;
pub mod error;
pub mod events;
pub mod notice;
pub mod protocol;
pub mod proximity;
pub mod storage;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use ble::{
    ConnectionHandle, ConnectionManager, ConnectionState, DeviceId, LinkSnapshot, MessageChannel,
    MonitoringMode, ReceivedMessage, SignalSample, Transport,
};
pub use config::LinkConfig;
pub use error::{Error, Result};
pub use events::{CallbackHandle, DisconnectReason, LinkEvent};
pub use notice::{Haptic, Notice, UserNotifier};
pub use proximity::{distance_category, normalized_proximity, DistanceCategory, ProximityReading};
