//! Device discovery.
//!
//! Runs a timed scan and keeps the peripherals worth offering to a user:
//! those that advertise a name, once each, in the order they were seen.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::ble::transport::{DiscoveredDevice, Transport};
use crate::error::{Error, Result};

/// Scanner for nearby named peripherals.
#[derive(Clone)]
pub struct DeviceScanner {
    transport: Arc<dyn Transport>,
}

impl DeviceScanner {
    /// Create a scanner over a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Scan for `duration` and return named devices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a zero duration, or the
    /// transport's error if the scan cannot run.
    pub async fn scan(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>> {
        if duration.is_zero() {
            return Err(Error::InvalidParameter {
                name: "duration".to_string(),
                value: format!("{:?}", duration),
            });
        }

        info!("Starting BLE scan for {:?}", duration);
        let seen = self.transport.scan(duration).await?;
        let total = seen.len();
        let named = named_devices(seen);
        debug!("Scan saw {} devices, {} named", total, named.len());
        Ok(named)
    }
}

/// Keep devices with a non-blank name, first sighting wins.
pub fn named_devices(devices: impl IntoIterator<Item = DiscoveredDevice>) -> Vec<DiscoveredDevice> {
    let mut ids = HashSet::new();
    devices
        .into_iter()
        .filter(|d| d.name.as_deref().map_or(false, |n| !n.trim().is_empty()))
        .filter(|d| ids.insert(d.id.clone()))
        .collect()
}

impl std::fmt::Debug for DeviceScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceScanner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::transport::DeviceId;
    use crate::testing::{Call, FakeTransport};
    use pretty_assertions::assert_eq;

    fn seen(id: &str, name: Option<&str>, rssi: i16) -> DiscoveredDevice {
        DiscoveredDevice {
            id: DeviceId::from(id),
            name: name.map(str::to_string),
            rssi: Some(rssi),
        }
    }

    #[test]
    fn test_named_devices_filters_and_dedupes() {
        let devices = vec![
            seen("AA", Some("Tag"), -60),
            seen("BB", None, -50),
            seen("CC", Some("  "), -70),
            seen("AA", Some("Tag"), -55),
            seen("DD", Some("Beacon"), -80),
        ];

        let named = named_devices(devices);
        let ids: Vec<&str> = named.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["AA", "DD"]);
        assert_eq!(named[0].rssi, Some(-60));
    }

    #[tokio::test]
    async fn test_scan_uses_transport() {
        let transport = Arc::new(FakeTransport::new());
        transport.set_scan_results(vec![
            seen("11:22:33:44:55:66", Some("ESP32"), -40),
            seen("AA:BB:CC:DD:EE:FF", None, -90),
        ]);

        let scanner = DeviceScanner::new(transport.clone());
        let found = scanner.scan(Duration::from_secs(5)).await.expect("scan");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name.as_deref(), Some("ESP32"));
        assert_eq!(transport.count(|c| *c == Call::Scan), 1);
    }

    #[tokio::test]
    async fn test_zero_duration_is_rejected() {
        let scanner = DeviceScanner::new(Arc::new(FakeTransport::new()));
        let result = scanner.scan(Duration::ZERO).await;
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
