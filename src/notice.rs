//! User-visible notices.
//!
//! The link decides when a notice fires; [`UserNotifier`] implementations
//! decide how it is shown (dialog, toast, log line, vibration motor).

use std::time::Duration;
use tracing::{info, warn};

use crate::ble::transport::{AdapterState, DeviceId};

/// A human-visible alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The radio must be switched on before connecting.
    AdapterOff {
        /// State the adapter reported.
        state: AdapterState,
    },
    /// A connection attempt failed; the device may be off or out of range.
    ConnectionFailed {
        /// Device that could not be reached.
        device: DeviceId,
    },
    /// The link dropped without an explicit disconnect.
    UnexpectedDisconnect {
        /// Device that dropped.
        device: DeviceId,
    },
}

impl Notice {
    /// Short title for the alert.
    pub fn title(&self) -> &'static str {
        match self {
            Self::AdapterOff { .. } => "Bluetooth off",
            Self::ConnectionFailed { .. } => "Connection error",
            Self::UnexpectedDisconnect { .. } => "Disconnected",
        }
    }

    /// Body text for the alert.
    pub fn message(&self) -> String {
        match self {
            Self::AdapterOff { .. } => "Turn on Bluetooth to continue.".to_string(),
            Self::ConnectionFailed { device } => format!(
                "Could not connect to {}. Check that it is powered on and nearby.",
                device
            ),
            Self::UnexpectedDisconnect { device } => {
                format!("The device {} was disconnected.", device)
            }
        }
    }
}

/// Haptic feedback patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Haptic {
    /// The link dropped unexpectedly.
    Disconnected,
    /// The device drifted below the proximity alert threshold.
    ProximityAlert,
}

impl Haptic {
    /// Suggested vibration length.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Disconnected => Duration::from_millis(400),
            Self::ProximityAlert => Duration::from_secs(1),
        }
    }
}

/// Side channel for alerts and haptic feedback.
#[cfg_attr(test, mockall::automock)]
pub trait UserNotifier: Send + Sync {
    /// Show an alert.
    fn alert(&self, notice: Notice);

    /// Trigger haptic feedback.
    fn haptic(&self, pattern: Haptic);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn alert(&self, notice: Notice) {
        warn!("{}: {}", notice.title(), notice.message());
    }

    fn haptic(&self, pattern: Haptic) {
        info!("Haptic feedback: {:?} for {:?}", pattern, pattern.duration());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_text() {
        let notice = Notice::UnexpectedDisconnect {
            device: DeviceId::from("AA:BB:CC:DD:EE:FF"),
        };
        assert_eq!(notice.title(), "Disconnected");
        assert!(notice.message().contains("AA:BB:CC:DD:EE:FF"));

        let notice = Notice::AdapterOff {
            state: AdapterState::PoweredOff,
        };
        assert_eq!(notice.message(), "Turn on Bluetooth to continue.");
    }

    #[test]
    fn test_haptic_durations() {
        assert_eq!(Haptic::ProximityAlert.duration(), Duration::from_secs(1));
        assert!(Haptic::Disconnected.duration() < Haptic::ProximityAlert.duration());
    }

    #[test]
    fn test_mock_notifier_counts_calls() {
        let mut mock = MockUserNotifier::new();
        mock.expect_alert()
            .withf(|n| matches!(n, Notice::ConnectionFailed { .. }))
            .times(1)
            .return_const(());
        mock.alert(Notice::ConnectionFailed {
            device: DeviceId::from("AA"),
        });
    }
}
