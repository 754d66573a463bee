//! Text message channel to the connected device.

use std::sync::Arc;

use crate::ble::connection::Shared;
use crate::ble::notifications::ReceivedMessage;
use crate::error::Result;

/// Send and read text messages over the link's data characteristic.
///
/// Obtained from [`ConnectionManager::channel`](crate::ConnectionManager::channel).
/// The channel follows whatever connection the manager currently holds.
#[derive(Clone)]
pub struct MessageChannel {
    shared: Arc<Shared>,
}

impl MessageChannel {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Send `text` as one base64 frame, without waiting for a response.
    ///
    /// # Errors
    ///
    /// * [`Error::NotConnected`](crate::Error::NotConnected) when no link is live.
    /// * [`Error::WriteFailed`](crate::Error::WriteFailed) if the write fails.
    pub async fn send(&self, text: &str) -> Result<()> {
        self.shared.send(text).await
    }

    /// Whether a link is live.
    pub fn is_open(&self) -> bool {
        self.shared.is_connected()
    }

    /// All received messages in arrival order.
    pub fn received(&self) -> Vec<ReceivedMessage> {
        self.shared.messages()
    }

    /// Empty the message log.
    pub fn clear(&self) {
        self.shared.clear_messages();
    }
}

impl std::fmt::Debug for MessageChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageChannel")
            .field("open", &self.is_open())
            .finish()
    }
}
