//! [`Transport`] over a real Bluetooth adapter via `btleplug`.

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Characteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::transport::{AdapterState, DeviceId, DiscoveredDevice, FrameStream, Transport};
use crate::error::{Error, Result};

/// How long to scan for a device that the adapter has not seen yet.
const LOOKUP_SCAN: Duration = Duration::from_secs(3);

const NULL_ADDRESS: &str = "00:00:00:00:00:00";

/// Identifier used for a peripheral: its address, or the platform id where
/// addresses are hidden (macOS).
fn device_id_of(peripheral: &Peripheral) -> DeviceId {
    let address = peripheral.address().to_string();
    if address == NULL_ADDRESS {
        DeviceId::new(peripheral.id().to_string())
    } else {
        DeviceId::new(address)
    }
}

fn matches_id(peripheral: &Peripheral, id: &DeviceId) -> bool {
    peripheral.address().to_string().eq_ignore_ascii_case(id.as_str())
        || peripheral.id().to_string() == id.as_str()
}

/// Radio stack backed by the first system adapter.
pub struct BtleplugTransport {
    adapter: Adapter,
    peripherals: RwLock<HashMap<DeviceId, Peripheral>>,
}

impl BtleplugTransport {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable {
                state: AdapterState::Unsupported,
            })?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            peripherals: RwLock::new(HashMap::new()),
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    async fn find_known(&self, id: &DeviceId) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            if matches_id(&peripheral, id) {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }

    /// Resolve an id to a peripheral, scanning briefly if the adapter has
    /// not seen it yet.
    async fn peripheral(&self, id: &DeviceId) -> Result<Peripheral> {
        if let Some(peripheral) = self.peripherals.read().get(id).cloned() {
            return Ok(peripheral);
        }

        let peripheral = match self.find_known(id).await? {
            Some(peripheral) => peripheral,
            None => {
                debug!("{} not known to the adapter, scanning", id);
                self.adapter.start_scan(ScanFilter::default()).await?;
                tokio::time::sleep(LOOKUP_SCAN).await;
                if let Err(e) = self.adapter.stop_scan().await {
                    warn!("Failed to stop scan: {}", e);
                }
                self.find_known(id)
                    .await?
                    .ok_or_else(|| Error::DeviceNotFound {
                        identifier: id.to_string(),
                    })?
            }
        };

        self.peripherals
            .write()
            .insert(id.clone(), peripheral.clone());
        Ok(peripheral)
    }

    fn characteristic(
        peripheral: &Peripheral,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Characteristic> {
        let services = peripheral.services();
        let found = services
            .iter()
            .find(|s| s.uuid == service)
            .ok_or_else(|| Error::ServiceNotFound {
                uuid: service.to_string(),
            })?;

        found
            .characteristics
            .iter()
            .find(|c| c.uuid == characteristic)
            .cloned()
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: characteristic.to_string(),
            })
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    async fn adapter_state(&self) -> Result<AdapterState> {
        let state = match self.adapter.adapter_state().await? {
            CentralState::PoweredOn => AdapterState::PoweredOn,
            CentralState::PoweredOff => AdapterState::PoweredOff,
            _ => AdapterState::Unknown,
        };
        Ok(state)
    }

    async fn connect(&self, id: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(id).await?;
        if peripheral.is_connected().await.unwrap_or(false) {
            info!("Peripheral {} already connected at BLE level", id);
            return Ok(());
        }
        peripheral.connect().await?;
        Ok(())
    }

    async fn discover_services(&self, id: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(id).await?;
        peripheral.discover_services().await?;
        debug!(
            "Discovered {} services on {}",
            peripheral.services().len(),
            id
        );
        Ok(())
    }

    async fn is_connected(&self, id: &DeviceId) -> Result<bool> {
        let peripheral = self.peripheral(id).await?;
        Ok(peripheral.is_connected().await?)
    }

    async fn read_signal_strength(&self, id: &DeviceId) -> Result<i16> {
        let peripheral = self.peripheral(id).await?;
        peripheral
            .properties()
            .await?
            .and_then(|p| p.rssi)
            .ok_or_else(|| Error::SignalReadFailed {
                reason: format!("{} reported no RSSI", id),
            })
    }

    async fn subscribe(
        &self,
        id: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<FrameStream> {
        let peripheral = self.peripheral(id).await?;
        let target = Self::characteristic(&peripheral, service, characteristic)?;

        // Take the stream before enabling notifications so none are missed.
        let notifications = peripheral.notifications().await?;
        peripheral.subscribe(&target).await?;
        debug!("Subscribed to {} on {}", characteristic, id);

        Ok(notifications
            .filter(move |n| futures::future::ready(n.uuid == characteristic))
            .map(|n| n.value)
            .boxed())
    }

    async fn write(
        &self,
        id: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()> {
        let peripheral = self.peripheral(id).await?;
        let target = Self::characteristic(&peripheral, service, characteristic)?;
        peripheral
            .write(&target, data, WriteType::WithoutResponse)
            .await?;
        trace!("Wrote {} bytes to {}", data.len(), characteristic);
        Ok(())
    }

    async fn cancel_connection(&self, id: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(id).await?;
        peripheral.disconnect().await?;
        Ok(())
    }

    async fn scan(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>> {
        info!("Scanning for {:?}", duration);
        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let mut order = Vec::new();
        let deadline = tokio::time::Instant::now() + duration;
        loop {
            match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(Some(CentralEvent::DeviceDiscovered(pid)))
                | Ok(Some(CentralEvent::DeviceUpdated(pid))) => {
                    if !order.contains(&pid) {
                        trace!("Device discovered: {:?}", pid);
                        order.push(pid);
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => break,
            }
        }

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        let mut found = Vec::with_capacity(order.len());
        for pid in order {
            let peripheral = match self.adapter.peripheral(&pid).await {
                Ok(p) => p,
                Err(e) => {
                    trace!("Failed to get peripheral: {}", e);
                    continue;
                }
            };
            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                _ => continue,
            };
            let id = device_id_of(&peripheral);
            self.peripherals.write().insert(id.clone(), peripheral);
            found.push(DiscoveredDevice {
                id,
                name: properties.local_name,
                rssi: properties.rssi,
            });
        }

        debug!("Scan found {} devices", found.len());
        Ok(found)
    }
}

impl std::fmt::Debug for BtleplugTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleplugTransport")
            .field("known_peripherals", &self.peripherals.read().len())
            .finish_non_exhaustive()
    }
}
