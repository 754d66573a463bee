//! Link events and callback registration.
//!
//! Observers either hold a `broadcast::Receiver<LinkEvent>` or register a
//! callback and keep the returned [`CallbackHandle`] alive.

use crate::ble::connection::ConnectionState;
use crate::ble::monitor::{MonitoringMode, SignalSample};
use crate::ble::notifications::ReceivedMessage;
use crate::ble::transport::DeviceId;

/// Why a link ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectReason {
    /// `disconnect()` was called.
    Requested,
    /// The liveness check found the link gone.
    Unexpected,
    /// The link was replaced by a connection to another device.
    Replaced,
    /// The manager shut down.
    Shutdown,
}

/// Something observable changed on the link.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// The connection state changed.
    StateChanged {
        /// Device the state refers to, if any.
        device: Option<DeviceId>,
        /// The new state.
        state: ConnectionState,
    },
    /// A link ended.
    Disconnected {
        /// Device that was linked.
        device: DeviceId,
        /// Why it ended.
        reason: DisconnectReason,
    },
    /// A new signal sample, or `None` when sampling stopped.
    Signal(Option<SignalSample>),
    /// Sampling was paused or resumed.
    MonitoringChanged(MonitoringMode),
    /// A message arrived on the data channel.
    Message(ReceivedMessage),
}

/// Callback handle for unregistering callbacks.
pub struct CallbackHandle {
    id: u64,
    unregister_fn: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl CallbackHandle {
    /// Create a new callback handle.
    pub(crate) fn new(id: u64, unregister_fn: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unregister_fn: Some(Box::new(unregister_fn)),
        }
    }

    /// Unregister this callback.
    pub fn unregister(mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }

    /// Get the callback ID.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for CallbackHandle {
    fn drop(&mut self) {
        if let Some(f) = self.unregister_fn.take() {
            f();
        }
    }
}

impl std::fmt::Debug for CallbackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackHandle").field("id", &self.id).finish()
    }
}
