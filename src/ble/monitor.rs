//! Liveness and signal strength polling.
//!
//! One [`RssiMonitor`] runs per connected device. Every tick it first asks
//! the transport whether the link is still up and only then, when sampling
//! is enabled, reads the signal strength.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::ble::task::{CancelFlag, ScopedTask};
use crate::ble::transport::{DeviceId, Transport};
use crate::error::Error;
use crate::proximity::ProximityReading;

/// Whether signal strength is sampled on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MonitoringMode {
    /// Sample every tick.
    #[default]
    Active,
    /// Liveness checks only.
    Paused,
}

impl MonitoringMode {
    /// Check if sampling.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl From<bool> for MonitoringMode {
    fn from(active: bool) -> Self {
        if active {
            Self::Active
        } else {
            Self::Paused
        }
    }
}

/// A single signal strength reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample {
    /// Signal strength in dBm.
    pub rssi: i16,
    /// Proximity derived from `rssi`.
    pub proximity: ProximityReading,
    /// When the value was read.
    pub read_at: DateTime<Utc>,
}

impl SignalSample {
    /// Build a sample read now.
    pub fn new(rssi: i16) -> Self {
        Self {
            rssi,
            proximity: ProximityReading::from_rssi(rssi),
            read_at: Utc::now(),
        }
    }
}

/// Identifies which connection and which monitor start a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MonitorTicket {
    /// Connection session number.
    pub session: u64,
    /// Monitor start number within the manager.
    pub epoch: u64,
}

/// The owner that receives what the monitor observes.
#[async_trait]
pub(crate) trait MonitorHost: Send + Sync {
    /// Store a sample. Returns `false` once the ticket is stale.
    fn record_sample(&self, ticket: MonitorTicket, rssi: i16) -> bool;

    /// Tear the link down after a failed liveness check.
    async fn link_lost(&self, ticket: MonitorTicket, cause: Error);
}

/// Polling loop for one connected device.
#[derive(Debug)]
pub struct RssiMonitor {
    device: DeviceId,
    ticket: MonitorTicket,
    sampling: bool,
    task: ScopedTask,
}

impl RssiMonitor {
    /// Start polling. The first tick fires one `interval` from now.
    pub(crate) fn start<H>(
        runtime: &Handle,
        device: DeviceId,
        ticket: MonitorTicket,
        interval: Duration,
        sampling: bool,
        transport: Arc<dyn Transport>,
        host: Weak<H>,
    ) -> Self
    where
        H: MonitorHost + 'static,
    {
        debug!(
            "Starting RSSI monitor for {} (session {}, epoch {}, sampling: {})",
            device, ticket.session, ticket.epoch, sampling
        );

        let task_device = device.clone();
        let task = ScopedTask::spawn("rssi-monitor", runtime, move |flag| {
            Self::run(task_device, ticket, interval, sampling, transport, host, flag)
        });

        Self {
            device,
            ticket,
            sampling,
            task,
        }
    }

    async fn run<H>(
        device: DeviceId,
        ticket: MonitorTicket,
        interval: Duration,
        sampling: bool,
        transport: Arc<dyn Transport>,
        host: Weak<H>,
        flag: CancelFlag,
    ) where
        H: MonitorHost + 'static,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if flag.is_cancelled() {
                break;
            }

            let alive = match transport.is_connected(&device).await {
                Ok(alive) => alive,
                Err(e) => {
                    warn!("Liveness check for {} failed: {}", device, e);
                    continue;
                }
            };
            if flag.is_cancelled() {
                break;
            }

            if !alive {
                info!("Device {} no longer connected", device);
                if let Some(host) = host.upgrade() {
                    let cause = Error::UnexpectedDisconnect {
                        identifier: device.to_string(),
                    };
                    host.link_lost(ticket, cause).await;
                }
                break;
            }

            if !sampling {
                trace!("Liveness ok for {}, sampling paused", device);
                continue;
            }

            match transport.read_signal_strength(&device).await {
                Ok(rssi) => {
                    if flag.is_cancelled() {
                        break;
                    }
                    trace!("RSSI for {}: {} dBm", device, rssi);
                    let Some(host) = host.upgrade() else {
                        break;
                    };
                    if !host.record_sample(ticket, rssi) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read RSSI from {}: {}", device, e);
                }
            }
        }

        debug!(
            "RSSI monitor for {} stopped (session {}, epoch {})",
            device, ticket.session, ticket.epoch
        );
    }

    /// Stop polling. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.task.is_cancelled() {
            debug!(
                "Stopping RSSI monitor for {} (session {}, epoch {})",
                self.device, self.ticket.session, self.ticket.epoch
            );
        }
        self.task.cancel();
    }

    /// Stop polling from inside the monitor's own task.
    pub(crate) fn release(self) {
        self.task.release();
    }

    /// The monitored device.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Whether this monitor reads signal strength.
    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    /// Whether the polling loop is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_cancelled() && !self.task.is_finished()
    }

    #[cfg(test)]
    pub(crate) fn ticket(&self) -> MonitorTicket {
        self.ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeTransport};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        samples: Mutex<Vec<i16>>,
        lost: Mutex<Vec<(MonitorTicket, String)>>,
        accept: std::sync::atomic::AtomicBool,
    }

    impl RecordingHost {
        fn accepting() -> Arc<Self> {
            let host = Self::default();
            host.accept.store(true, std::sync::atomic::Ordering::SeqCst);
            Arc::new(host)
        }
    }

    #[async_trait]
    impl MonitorHost for RecordingHost {
        fn record_sample(&self, _ticket: MonitorTicket, rssi: i16) -> bool {
            if !self.accept.load(std::sync::atomic::Ordering::SeqCst) {
                return false;
            }
            self.samples.lock().push(rssi);
            true
        }

        async fn link_lost(&self, ticket: MonitorTicket, cause: Error) {
            let identifier = match cause {
                Error::UnexpectedDisconnect { identifier } => identifier,
                other => panic!("unexpected cause: {other}"),
            };
            self.lost.lock().push((ticket, identifier));
        }
    }

    const TICKET: MonitorTicket = MonitorTicket {
        session: 1,
        epoch: 1,
    };

    fn device() -> DeviceId {
        DeviceId::from("AA:BB:CC:DD:EE:FF")
    }

    async fn linked_transport(rssi: Option<i16>) -> Arc<FakeTransport> {
        let transport = Arc::new(FakeTransport::new());
        transport.set_rssi(rssi);
        transport.connect_now(&device());
        transport
    }

    #[tokio::test(start_paused = true)]
    async fn test_samples_every_interval() {
        let transport = linked_transport(Some(-60)).await;
        let host = RecordingHost::accepting();

        let monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            true,
            transport.clone(),
            Arc::downgrade(&host),
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(host.samples.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(*host.samples.lock(), vec![-60, -60, -60]);
        assert!(monitor.is_running());
        assert!(monitor.is_sampling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_liveness_check_precedes_read() {
        let transport = linked_transport(Some(-60)).await;
        let host = RecordingHost::accepting();

        let _monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            true,
            transport.clone(),
            Arc::downgrade(&host),
        );
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let calls: Vec<Call> = transport
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::IsConnected(_) | Call::ReadSignalStrength(_)))
            .collect();
        assert_eq!(
            calls,
            vec![
                Call::IsConnected(device()),
                Call::ReadSignalStrength(device()),
                Call::IsConnected(device()),
                Call::ReadSignalStrength(device()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_sampling_only_checks_liveness() {
        let transport = linked_transport(Some(-60)).await;
        let host = RecordingHost::accepting();

        let _monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            false,
            transport.clone(),
            Arc::downgrade(&host),
        );
        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert!(host.samples.lock().is_empty());
        assert_eq!(transport.count(|c| matches!(c, Call::IsConnected(_))), 3);
        assert_eq!(
            transport.count(|c| matches!(c, Call::ReadSignalStrength(_))),
            0
        );

        transport.drop_link(&device());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*host.lost.lock(), vec![(TICKET, device().to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_reported_once_and_loop_ends() {
        let transport = linked_transport(Some(-60)).await;
        let host = RecordingHost::accepting();

        let monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            true,
            transport.clone(),
            Arc::downgrade(&host),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        transport.drop_link(&device());
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(host.lost.lock().len(), 1);
        assert_eq!(*host.samples.lock(), vec![-60]);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failures_do_not_stop_the_loop() {
        let transport = linked_transport(None).await;
        let host = RecordingHost::accepting();

        let _monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            true,
            transport.clone(),
            Arc::downgrade(&host),
        );

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(host.samples.lock().is_empty());

        transport.set_rssi(Some(-75));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*host.samples.lock(), vec![-75]);
        assert!(host.lost.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_final() {
        let transport = linked_transport(Some(-60)).await;
        let host = RecordingHost::accepting();

        let monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            true,
            transport.clone(),
            Arc::downgrade(&host),
        );

        tokio::time::sleep(Duration::from_millis(1500)).await;
        monitor.cancel();
        monitor.cancel();
        let polls = transport.calls().len();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(transport.calls().len(), polls);
        assert_eq!(host.samples.lock().len(), 1);
        assert!(!monitor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticket_stops_loop() {
        let transport = linked_transport(Some(-60)).await;
        let host = Arc::new(RecordingHost::default());

        let monitor = RssiMonitor::start(
            &Handle::current(),
            device(),
            TICKET,
            Duration::from_secs(1),
            true,
            transport.clone(),
            Arc::downgrade(&host),
        );

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(transport.count(|c| matches!(c, Call::IsConnected(_))), 1);
        assert!(!monitor.is_running());
        assert_eq!(monitor.ticket(), TICKET);
    }

    #[test]
    fn test_signal_sample_carries_proximity() {
        let sample = SignalSample::new(-70);
        assert_eq!(sample.rssi, -70);
        assert!((sample.proximity.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_monitoring_mode() {
        assert!(MonitoringMode::Active.is_active());
        assert!(!MonitoringMode::Paused.is_active());
        assert_eq!(MonitoringMode::from(false), MonitoringMode::Paused);
        assert_eq!(MonitoringMode::default(), MonitoringMode::Active);
    }
}
