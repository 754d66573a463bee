//! Inbound notification handling.
//!
//! Frames arriving on the data characteristic are base64 text. Each decoded
//! frame becomes a [`ReceivedMessage`] in the [`MessageLog`].

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

use crate::ble::task::ScopedTask;
use crate::ble::transport::{DeviceId, FrameStream};
use crate::protocol::decode_frame;

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    /// Sending device.
    pub device: DeviceId,
    /// Decoded text.
    pub text: String,
    /// When the frame arrived.
    pub received_at: DateTime<Utc>,
}

impl ReceivedMessage {
    /// Stamp a message as received now.
    pub fn new(device: DeviceId, text: impl Into<String>) -> Self {
        Self {
            device,
            text: text.into(),
            received_at: Utc::now(),
        }
    }
}

/// Append-only, arrival-ordered log of received messages.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ReceivedMessage>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message.
    pub fn push(&mut self, message: ReceivedMessage) {
        self.messages.push(message);
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Most recent message.
    pub fn latest(&self) -> Option<&ReceivedMessage> {
        self.messages.last()
    }

    /// Messages in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &ReceivedMessage> {
        self.messages.iter()
    }

    /// Copy of all messages.
    pub fn to_vec(&self) -> Vec<ReceivedMessage> {
        self.messages.clone()
    }

    /// Remove all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Consumes the notification stream of one connection.
#[derive(Debug)]
pub struct NotificationListener {
    device: DeviceId,
    task: ScopedTask,
}

impl NotificationListener {
    /// Start consuming `frames`.
    ///
    /// `sink` receives every decoded message and returns `false` once the
    /// connection it belongs to is gone, which ends the listener.
    pub(crate) fn start<F>(
        runtime: &Handle,
        device: DeviceId,
        mut frames: FrameStream,
        sink: F,
    ) -> Self
    where
        F: Fn(ReceivedMessage) -> bool + Send + 'static,
    {
        let task_device = device.clone();
        let task = ScopedTask::spawn("notification-listener", runtime, move |flag| async move {
            while let Some(frame) = frames.next().await {
                if flag.is_cancelled() {
                    break;
                }
                match decode_frame(&frame) {
                    Ok(text) => {
                        trace!("Received {:?} from {}", text, task_device);
                        if !sink(ReceivedMessage::new(task_device.clone(), text)) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Dropping frame from {}: {}", task_device, e);
                    }
                }
            }
            debug!("Notification listener for {} stopped", task_device);
        });

        Self { device, task }
    }

    /// Stop listening. The notification stream is dropped with the task.
    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// Device being listened to.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Whether frames are still being consumed.
    pub fn is_running(&self) -> bool {
        !self.task.is_cancelled() && !self.task.is_finished()
    }
}
