//! The radio stack seam.
//!
//! [`Transport`] is everything the link core consumes from the BLE stack.
//! [`BtleplugTransport`](crate::ble::platform::BtleplugTransport) drives a real
//! adapter; tests substitute an in-memory implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;

/// Opaque address identifying a peripheral, e.g. `"AA:BB:CC:DD:EE:FF"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Wrap an address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Power state of the local radio adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdapterState {
    /// State not yet reported.
    #[default]
    Unknown,
    /// The adapter is resetting.
    Resetting,
    /// The platform has no BLE support.
    Unsupported,
    /// The process is not allowed to use the radio.
    Unauthorized,
    /// The radio is switched off.
    PoweredOff,
    /// The radio is on and ready.
    PoweredOn,
}

impl AdapterState {
    /// Only a powered-on adapter accepts connections.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::PoweredOn)
    }
}

impl std::fmt::Display for AdapterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Resetting => "Resetting",
            Self::Unsupported => "Unsupported",
            Self::Unauthorized => "Unauthorized",
            Self::PoweredOff => "PoweredOff",
            Self::PoweredOn => "PoweredOn",
        };
        f.write_str(name)
    }
}

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// Peripheral address.
    pub id: DeviceId,
    /// Advertised local name, if any.
    pub name: Option<String>,
    /// Signal strength at discovery time in dBm.
    pub rssi: Option<i16>,
}

/// Raw inbound frames from one subscribed characteristic.
///
/// The stream ends when the link goes away.
pub type FrameStream = BoxStream<'static, Vec<u8>>;

/// Operations consumed from the BLE radio stack.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Current adapter power state.
    async fn adapter_state(&self) -> Result<AdapterState>;

    /// Establish a link to the device.
    async fn connect(&self, id: &DeviceId) -> Result<()>;

    /// Discover services and characteristics on a linked device.
    async fn discover_services(&self, id: &DeviceId) -> Result<()>;

    /// Whether the stack still reports the device as linked.
    async fn is_connected(&self, id: &DeviceId) -> Result<bool>;

    /// Read the current signal strength in dBm.
    async fn read_signal_strength(&self, id: &DeviceId) -> Result<i16>;

    /// Subscribe to notifications on a characteristic.
    async fn subscribe(
        &self,
        id: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<FrameStream>;

    /// Write without response to a characteristic.
    async fn write(
        &self,
        id: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()>;

    /// Close the link.
    async fn cancel_connection(&self, id: &DeviceId) -> Result<()>;

    /// Scan for advertising peripherals for `duration`.
    async fn scan(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>>;
}
