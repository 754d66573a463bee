//! Link configuration.
//!
//! Loaded from TOML; every field has a default so an empty or missing file
//! yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::ble::transport::DeviceId;
use crate::ble::uuids::{LINK_CHARACTERISTIC_UUID, LINK_SERVICE_UUID};
use crate::error::{Error, Result};

/// Device reconnected to when nothing has been persisted yet.
pub const DEFAULT_DEVICE_ID: &str = "FC:B4:67:51:4A:7A";

/// Default signal polling period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Fallback device for `reconnect_last` when none is persisted.
    pub default_device: DeviceId,

    /// Liveness and signal polling period in milliseconds.
    pub poll_interval_ms: u64,

    /// Service carrying the data characteristic.
    pub service_uuid: Uuid,

    /// Characteristic used for notifications and writes.
    pub characteristic_uuid: Uuid,

    /// Whether signal sampling starts active.
    pub start_monitoring: bool,

    /// Whether the proximity haptic alert is enabled.
    pub proximity_alert: bool,

    /// Proximity score at or below which the haptic alert fires.
    pub proximity_alert_threshold: f64,

    /// Duration of a device scan in milliseconds.
    pub scan_duration_ms: u64,

    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            default_device: DeviceId::from(DEFAULT_DEVICE_ID),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            service_uuid: LINK_SERVICE_UUID,
            characteristic_uuid: LINK_CHARACTERISTIC_UUID,
            start_monitoring: true,
            proximity_alert: true,
            proximity_alert_threshold: 0.3,
            scan_duration_ms: 5000,
            event_capacity: 64,
        }
    }
}

impl LinkConfig {
    /// Polling period as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Scan duration as a duration.
    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }

    /// Set the fallback device.
    pub fn with_default_device(mut self, device: impl Into<DeviceId>) -> Self {
        self.default_device = device.into();
        self
    }

    /// Set the polling period.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Alert threshold, `None` when the alert is disabled.
    pub fn alert_threshold(&self) -> Option<f64> {
        self.proximity_alert.then_some(self.proximity_alert_threshold)
    }

    /// Set the proximity alert threshold, or disable the alert with `None`.
    ///
    /// Disabling keeps the stored threshold for when the alert is turned
    /// back on.
    pub fn with_proximity_alert(mut self, threshold: Option<f64>) -> Self {
        self.proximity_alert = threshold.is_some();
        if let Some(threshold) = threshold {
            self.proximity_alert_threshold = threshold;
        }
        self
    }

    /// Set the initial monitoring mode.
    pub fn with_monitoring(mut self, active: bool) -> Self {
        self.start_monitoring = active;
        self
    }

    /// Check the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config {
                reason: "poll_interval_ms must be greater than zero".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.proximity_alert_threshold) {
            return Err(Error::Config {
                reason: format!(
                    "proximity_alert_threshold must be within [0, 1], got {}",
                    self.proximity_alert_threshold
                ),
            });
        }

        if self.event_capacity == 0 {
            return Err(Error::Config {
                reason: "event_capacity must be greater than zero".to_string(),
            });
        }

        if self.default_device.as_str().is_empty() {
            return Err(Error::Config {
                reason: "default_device must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Write to a file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: e.to_string(),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Platform config location, e.g. `~/.config/proximity-link/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "proximity-link").ok_or_else(|| {
            Error::Config {
                reason: "Cannot determine config directory".to_string(),
            }
        })?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.default_device.as_str(), DEFAULT_DEVICE_ID);
        assert_eq!(config.service_uuid, LINK_SERVICE_UUID);
        assert_eq!(config.alert_threshold(), Some(0.3));
        assert!(config.start_monitoring);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = LinkConfig::from_toml_str(
            r#"
            default_device = "AA:BB:CC:DD:EE:FF"
            poll_interval_ms = 250
            "#,
        )
        .expect("valid config");

        assert_eq!(config.default_device, DeviceId::from("AA:BB:CC:DD:EE:FF"));
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.characteristic_uuid, LINK_CHARACTERISTIC_UUID);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = LinkConfig::default().with_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        let config = LinkConfig::default().with_proximity_alert(Some(1.5));
        assert!(matches!(config.validate(), Err(Error::Config { .. })));

        assert!(LinkConfig::from_toml_str("event_capacity = 0").is_err());
        assert!(LinkConfig::from_toml_str("poll_interval_ms = \"fast\"").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cfg").join("config.toml");

        let config = LinkConfig::default()
            .with_default_device("11:22:33:44:55:66")
            .with_proximity_alert(Some(0.5))
            .with_monitoring(false);
        config.save(&path).expect("save");

        let loaded = LinkConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_disabled_alert_survives_save_and_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        let config = LinkConfig::default().with_proximity_alert(None);
        assert_eq!(config.alert_threshold(), None);
        config.save(&path).expect("save");

        let loaded = LinkConfig::load(&path).expect("load");
        assert_eq!(loaded.alert_threshold(), None);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_alert_can_be_disabled_in_toml() {
        let config = LinkConfig::from_toml_str("proximity_alert = false").expect("valid config");
        assert_eq!(config.alert_threshold(), None);

        let config =
            LinkConfig::from_toml_str("proximity_alert_threshold = 0.45").expect("valid config");
        assert_eq!(config.alert_threshold(), Some(0.45));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = LinkConfig::load(dir.path().join("nope.toml")).expect("load");
        assert_eq!(loaded, LinkConfig::default());
    }
}
