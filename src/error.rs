//! Error types for the proximity-link-ble crate.

use thiserror::Error;

use crate::ble::transport::AdapterState;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// The radio adapter is off or not ready for connections.
    #[error("Bluetooth adapter unavailable (state: {state})")]
    AdapterUnavailable {
        /// The state reported by the adapter.
        state: AdapterState,
    },

    /// Failed to establish a link to the device.
    #[error("Connection to {identifier} failed: {reason}")]
    ConnectionFailed {
        /// The device that was being connected.
        identifier: String,
        /// Description of why the connection failed.
        reason: String,
    },

    /// A connection attempt is already pending.
    #[error("Connection already in progress")]
    ConnectionInProgress,

    /// The liveness check found the link gone mid-session.
    #[error("Device {identifier} disconnected unexpectedly")]
    UnexpectedDisconnect {
        /// The device that dropped.
        identifier: String,
    },

    /// Reading the signal strength failed.
    #[error("Signal strength read failed: {reason}")]
    SignalReadFailed {
        /// Description of the failure.
        reason: String,
    },

    /// An inbound frame could not be decoded.
    #[error("Notification decode error: {context}")]
    NotificationDecode {
        /// Description of what was invalid about the frame.
        context: String,
    },

    /// An outbound write failed.
    #[error("Write failed: {reason}")]
    WriteFailed {
        /// Description of the failure.
        reason: String,
    },

    /// Operation requires a connection but none is live.
    #[error("Device not connected")]
    NotConnected,

    /// The device is not known to the adapter.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// The persistent store failed.
    #[error("Storage error: {reason}")]
    Storage {
        /// Description of the failure.
        reason: String,
    },

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of the problem.
        reason: String,
    },

    /// No tokio runtime was available to run background tasks.
    #[error("Runtime error: {reason}")]
    Runtime {
        /// Description of the problem.
        reason: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
