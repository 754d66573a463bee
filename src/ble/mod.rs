//! BLE communication module.
//!
//! The link core ([`ConnectionManager`], [`RssiMonitor`],
//! [`NotificationListener`]) talks to the radio only through the
//! [`Transport`] trait. [`BtleplugTransport`] drives a real adapter.

pub mod channel;
pub mod connection;
pub mod monitor;
pub mod notifications;
pub mod platform;
pub mod scanner;
pub mod task;
pub mod transport;
pub mod uuids;

pub use channel::MessageChannel;
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState, LinkSnapshot};
pub use monitor::{MonitoringMode, RssiMonitor, SignalSample};
pub use notifications::{MessageLog, NotificationListener, ReceivedMessage};
pub use platform::BtleplugTransport;
pub use scanner::DeviceScanner;
pub use task::ScopedTask;
pub use transport::{AdapterState, DeviceId, DiscoveredDevice, FrameStream, Transport};
pub use uuids::*;
