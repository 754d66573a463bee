//! BLE connection management.
//!
//! [`ConnectionManager`] owns at most one link. While connected it runs one
//! [`RssiMonitor`] and one [`NotificationListener`]; both are torn down on
//! every path out of `Connected`.
//!
//! Every connection attempt gets a new session number. Background tasks
//! carry the session they were started for, and their state writes are
//! checked against the current session under the state lock, so a task that
//! was cancelled can never publish anything after the cancelling call
//! returns.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::ble::channel::MessageChannel;
use crate::ble::monitor::{MonitorHost, MonitorTicket, MonitoringMode, RssiMonitor, SignalSample};
use crate::ble::notifications::{MessageLog, NotificationListener, ReceivedMessage};
use crate::ble::scanner::DeviceScanner;
use crate::ble::transport::{AdapterState, DeviceId, DiscoveredDevice, Transport};
use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::events::{CallbackHandle, DisconnectReason, LinkEvent};
use crate::notice::{Haptic, LogNotifier, Notice, UserNotifier};
use crate::protocol::encode_frame;
use crate::storage::{IdentityStore, KeyValueStore, MemoryStore};

/// Connection state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No link.
    #[default]
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// Linked and monitored.
    Connected,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Check if in a transitional state.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Identifies one successful connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    device: DeviceId,
    session: u64,
}

impl ConnectionHandle {
    /// The connected device.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Session number of the connection.
    pub fn session(&self) -> u64 {
        self.session
    }
}

/// Point-in-time view of the link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSnapshot {
    /// Connection state.
    pub state: ConnectionState,
    /// Device being connected or connected to.
    pub device: Option<DeviceId>,
    /// Whether signal sampling is active.
    pub monitoring: MonitoringMode,
    /// Latest signal sample, `None` when not connected or paused.
    pub signal: Option<SignalSample>,
}

struct LinkState {
    state: ConnectionState,
    device: Option<DeviceId>,
    session: u64,
    monitor_epoch: u64,
    monitoring: MonitoringMode,
    signal: Option<SignalSample>,
    monitor: Option<RssiMonitor>,
    listener: Option<NotificationListener>,
}

impl LinkState {
    fn new(monitoring: MonitoringMode) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            device: None,
            session: 0,
            monitor_epoch: 0,
            monitoring,
            signal: None,
            monitor: None,
            listener: None,
        }
    }

    fn is_pending(&self, session: u64) -> bool {
        self.session == session && self.state == ConnectionState::Connecting
    }

    fn is_live(&self, session: u64) -> bool {
        self.session == session && self.state == ConnectionState::Connected
    }

    fn accepts(&self, ticket: MonitorTicket) -> bool {
        self.is_live(ticket.session) && self.monitor_epoch == ticket.epoch
    }

    /// Move to `Disconnected`, handing back whatever the link owned.
    fn detach(&mut self) -> Option<Detached> {
        if self.state == ConnectionState::Disconnected {
            return None;
        }
        let previous = self.state;
        self.session += 1;
        self.monitor_epoch += 1;
        self.state = ConnectionState::Disconnected;
        let had_signal = self.signal.take().is_some();
        let monitor = self.monitor.take();
        let listener = self.listener.take();
        let device = self.device.take()?;

        Some(Detached {
            device,
            previous,
            session: self.session,
            had_signal,
            monitor,
            listener,
        })
    }

    fn snapshot(&self) -> LinkSnapshot {
        LinkSnapshot {
            state: self.state,
            device: self.device.clone(),
            monitoring: self.monitoring,
            signal: self.signal.clone(),
        }
    }
}

/// What a torn-down link owned.
struct Detached {
    device: DeviceId,
    previous: ConnectionState,
    session: u64,
    had_signal: bool,
    monitor: Option<RssiMonitor>,
    listener: Option<NotificationListener>,
}

impl Detached {
    fn stop_tasks(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.cancel();
        }
        if let Some(listener) = self.listener.take() {
            listener.cancel();
        }
    }
}

pub(crate) struct Shared {
    transport: Arc<dyn Transport>,
    identity: IdentityStore,
    notifier: Arc<dyn UserNotifier>,
    config: LinkConfig,
    runtime: Handle,
    link: RwLock<LinkState>,
    messages: RwLock<MessageLog>,
    /// Serializes identity writes with the commit that justifies them.
    persist_lock: AsyncMutex<()>,
    event_tx: broadcast::Sender<LinkEvent>,
    callback_counter: AtomicU64,
    this: Weak<Shared>,
}

impl Shared {
    fn emit(&self, event: LinkEvent) {
        // No receivers is fine.
        let _ = self.event_tx.send(event);
    }

    fn emit_state(&self, device: Option<DeviceId>, state: ConnectionState) {
        debug!("Connection state changed: {}", state);
        self.emit(LinkEvent::StateChanged { device, state });
    }

    /// Emit the events for a detach that just happened under the lock.
    fn emit_detached(&self, detached: &Detached) {
        if detached.had_signal {
            self.emit(LinkEvent::Signal(None));
        }
        self.emit_state(Some(detached.device.clone()), ConnectionState::Disconnected);
    }

    fn start_monitor(&self, link: &mut LinkState) {
        if let Some(old) = link.monitor.take() {
            old.cancel();
        }
        let Some(device) = link.device.clone() else {
            return;
        };
        link.monitor_epoch += 1;
        let ticket = MonitorTicket {
            session: link.session,
            epoch: link.monitor_epoch,
        };
        link.monitor = Some(RssiMonitor::start(
            &self.runtime,
            device,
            ticket,
            self.config.poll_interval(),
            link.monitoring.is_active(),
            self.transport.clone(),
            self.this.clone(),
        ));
    }

    fn message_sink(&self, session: u64) -> impl Fn(ReceivedMessage) -> bool + Send + 'static {
        let shared = self.this.clone();
        move |message| {
            shared
                .upgrade()
                .map_or(false, |shared| shared.append_message(session, message))
        }
    }

    fn append_message(&self, session: u64, message: ReceivedMessage) -> bool {
        {
            let link = self.link.read();
            if !link.is_live(session) {
                return false;
            }
            self.messages.write().push(message.clone());
        }
        self.emit(LinkEvent::Message(message));
        true
    }

    async fn establish(&self, device: &DeviceId, session: u64) -> Result<()> {
        self.transport.connect(device).await?;

        let result = self.prepare_and_commit(device, session).await;
        if result.is_err() {
            // Leave the radio alone if a newer attempt already owns this device.
            let reused = {
                let link = self.link.read();
                link.session != session
                    && link.state != ConnectionState::Disconnected
                    && link.device.as_ref() == Some(device)
            };
            if !reused {
                if let Err(e) = self.transport.cancel_connection(device).await {
                    debug!("Closing failed link to {}: {}", device, e);
                }
            }
        }
        result
    }

    async fn prepare_and_commit(&self, device: &DeviceId, session: u64) -> Result<()> {
        self.transport.discover_services(device).await?;
        let frames = self
            .transport
            .subscribe(
                device,
                self.config.service_uuid,
                self.config.characteristic_uuid,
            )
            .await?;

        let _persist = self.persist_lock.lock().await;
        if !self.link.read().is_pending(session) {
            return Err(cancelled(device));
        }
        self.identity.remember(device).await?;

        let committed = {
            let mut link = self.link.write();
            if link.is_pending(session) {
                link.state = ConnectionState::Connected;
                link.listener = Some(NotificationListener::start(
                    &self.runtime,
                    device.clone(),
                    frames,
                    self.message_sink(session),
                ));
                self.start_monitor(&mut link);
                self.emit_state(Some(device.clone()), ConnectionState::Connected);
                true
            } else {
                false
            }
        };

        if !committed {
            if let Err(e) = self.identity.forget().await {
                warn!("Failed to clear persisted device: {}", e);
            }
            return Err(cancelled(device));
        }
        Ok(())
    }

    /// Reset a failed attempt. Returns `false` if it was already superseded.
    fn abandon_attempt(&self, session: u64) -> bool {
        let mut link = self.link.write();
        if !link.is_pending(session) {
            return false;
        }
        link.state = ConnectionState::Disconnected;
        link.session += 1;
        let device = link.device.take();
        self.emit_state(device, ConnectionState::Disconnected);
        true
    }

    async fn teardown(&self, reason: DisconnectReason) -> bool {
        let detached = {
            let mut link = self.link.write();
            let detached = link.detach();
            if let Some(detached) = &detached {
                self.emit_detached(detached);
            }
            detached
        };

        match detached {
            Some(detached) => {
                self.finish_teardown(detached, reason).await;
                true
            }
            None => false,
        }
    }

    async fn finish_teardown(&self, mut detached: Detached, reason: DisconnectReason) {
        detached.stop_tasks();
        let device = detached.device.clone();
        let was_connected = detached.previous == ConnectionState::Connected;

        if was_connected && reason != DisconnectReason::Unexpected {
            if let Err(e) = self.transport.cancel_connection(&device).await {
                warn!("Failed to close link to {}: {}", device, e);
            }
        }

        self.forget_identity(detached.session).await;

        if was_connected {
            if reason == DisconnectReason::Unexpected {
                self.notifier.alert(Notice::UnexpectedDisconnect {
                    device: device.clone(),
                });
                self.notifier.haptic(Haptic::Disconnected);
            }
            info!("Disconnected from {} ({:?})", device, reason);
            self.emit(LinkEvent::Disconnected { device, reason });
        } else {
            info!("Abandoned connection attempt to {}", device);
        }
    }

    /// Remove the persisted id unless a newer connection already owns it.
    async fn forget_identity(&self, session: u64) {
        let _persist = self.persist_lock.lock().await;
        let superseded = {
            let link = self.link.read();
            link.state == ConnectionState::Connected && link.session > session
        };
        if superseded {
            debug!("Persisted device belongs to a newer connection");
            return;
        }
        if let Err(e) = self.identity.forget().await {
            warn!("Failed to clear persisted device: {}", e);
        }
    }

    pub(crate) async fn send(&self, text: &str) -> Result<()> {
        let device = {
            let link = self.link.read();
            match (&link.state, &link.device) {
                (ConnectionState::Connected, Some(device)) => device.clone(),
                _ => return Err(Error::NotConnected),
            }
        };

        let frame = encode_frame(text);
        self.transport
            .write(
                &device,
                self.config.service_uuid,
                self.config.characteristic_uuid,
                &frame,
            )
            .await
            .map_err(|e| match e {
                e @ Error::WriteFailed { .. } => e,
                other => Error::WriteFailed {
                    reason: other.to_string(),
                },
            })?;

        debug!("Sent {} byte frame to {}", frame.len(), device);
        Ok(())
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.link.read().state.is_connected()
    }

    pub(crate) fn messages(&self) -> Vec<ReceivedMessage> {
        self.messages.read().to_vec()
    }

    pub(crate) fn clear_messages(&self) {
        self.messages.write().clear();
    }
}

#[async_trait]
impl MonitorHost for Shared {
    fn record_sample(&self, ticket: MonitorTicket, rssi: i16) -> bool {
        let sample = SignalSample::new(rssi);
        {
            let mut link = self.link.write();
            if !link.accepts(ticket) || !link.monitoring.is_active() {
                return false;
            }
            link.signal = Some(sample.clone());
        }

        let proximity = sample.proximity;
        self.emit(LinkEvent::Signal(Some(sample)));

        if let Some(threshold) = self.config.alert_threshold() {
            if proximity.is_below(threshold) {
                debug!(
                    "Proximity {:.2} at or below alert threshold {:.2}",
                    proximity.score, threshold
                );
                self.notifier.haptic(Haptic::ProximityAlert);
            }
        }
        true
    }

    async fn link_lost(&self, ticket: MonitorTicket, cause: Error) {
        let detached = {
            let mut link = self.link.write();
            if !link.accepts(ticket) {
                None
            } else {
                let detached = link.detach();
                if let Some(detached) = &detached {
                    self.emit_detached(detached);
                }
                detached
            }
        };
        let Some(mut detached) = detached else {
            debug!("Ignoring drop report from stale monitor");
            return;
        };

        warn!("{}", cause);
        // This runs on the monitor's own task.
        if let Some(monitor) = detached.monitor.take() {
            monitor.release();
        }
        self.finish_teardown(detached, DisconnectReason::Unexpected)
            .await;
    }
}

fn cancelled(device: &DeviceId) -> Error {
    Error::ConnectionFailed {
        identifier: device.to_string(),
        reason: "Connection attempt cancelled".to_string(),
    }
}

/// Manages the link to a single peripheral.
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Create a manager over explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` fails validation, or
    /// [`Error::Runtime`] when called outside a tokio runtime. Background
    /// tasks are spawned on that runtime, so the manager can be driven
    /// from any thread afterwards.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn UserNotifier>,
        config: LinkConfig,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| Error::Runtime {
            reason: e.to_string(),
        })?;
        let (event_tx, _) = broadcast::channel(config.event_capacity);
        let monitoring = MonitoringMode::from(config.start_monitoring);

        let shared = Arc::new_cyclic(|this| Shared {
            transport,
            identity: IdentityStore::new(store),
            notifier,
            config,
            runtime,
            link: RwLock::new(LinkState::new(monitoring)),
            messages: RwLock::new(MessageLog::new()),
            persist_lock: AsyncMutex::new(()),
            event_tx,
            callback_counter: AtomicU64::new(0),
            this: this.clone(),
        });

        Ok(Self { shared })
    }

    /// Create a manager with an in-memory store, log-only notices and the
    /// default configuration.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Result<Self> {
        Self::new(
            transport,
            Arc::new(MemoryStore::new()),
            Arc::new(LogNotifier),
            LinkConfig::default(),
        )
    }

    /// The active configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.shared.config
    }

    // === Connection lifecycle ===

    /// Connect to a device.
    ///
    /// A live link is torn down first. On success the device id is
    /// persisted and monitoring and notification handling start.
    ///
    /// # Errors
    ///
    /// * [`Error::ConnectionInProgress`] if another attempt is pending.
    /// * [`Error::ConnectionFailed`] if any step fails; the state is then
    ///   `Disconnected` and nothing is persisted.
    pub async fn connect(&self, device: impl Into<DeviceId>) -> Result<ConnectionHandle> {
        let device = device.into();

        let (session, replaced) = {
            let mut link = self.shared.link.write();
            if link.state.is_transitioning() {
                warn!("Rejecting connect to {}: attempt already pending", device);
                return Err(Error::ConnectionInProgress);
            }
            let replaced = link.detach();
            if let Some(replaced) = &replaced {
                self.shared.emit_detached(replaced);
            }
            link.session += 1;
            link.state = ConnectionState::Connecting;
            link.device = Some(device.clone());
            self.shared
                .emit_state(Some(device.clone()), ConnectionState::Connecting);
            (link.session, replaced)
        };

        if let Some(replaced) = replaced {
            self.shared
                .finish_teardown(replaced, DisconnectReason::Replaced)
                .await;
        }

        info!("Connecting to {}", device);
        match self.shared.establish(&device, session).await {
            Ok(()) => {
                info!("Connected to {}", device);
                Ok(ConnectionHandle { device, session })
            }
            Err(e) => {
                error!("Connection to {} failed: {}", device, e);
                if self.shared.abandon_attempt(session) {
                    self.shared.notifier.alert(Notice::ConnectionFailed {
                        device: device.clone(),
                    });
                }
                Err(match e {
                    e @ Error::ConnectionFailed { .. } => e,
                    other => Error::ConnectionFailed {
                        identifier: device.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    /// Close the link, stop monitoring and forget the persisted device.
    ///
    /// Idempotent. A pending connection attempt is abandoned.
    pub async fn disconnect(&self) {
        if !self.shared.teardown(DisconnectReason::Requested).await {
            debug!("Disconnect requested while not connected");
        }
    }

    /// Connect to the persisted device, or the configured default.
    pub async fn reconnect_last(&self) -> Result<ConnectionHandle> {
        let device = match self.shared.identity.last_device().await {
            Ok(Some(device)) => device,
            Ok(None) => {
                debug!("No persisted device, using {}", self.shared.config.default_device);
                self.shared.config.default_device.clone()
            }
            Err(e) => {
                warn!("Failed to read persisted device: {}", e);
                self.shared.config.default_device.clone()
            }
        };
        self.connect(device).await
    }

    /// Startup reconnection: check the adapter, then [`reconnect_last`].
    ///
    /// [`reconnect_last`]: Self::reconnect_last
    pub async fn restore(&self) -> Result<ConnectionHandle> {
        if !self.verify_adapter_ready().await {
            let state = self
                .shared
                .transport
                .adapter_state()
                .await
                .unwrap_or_default();
            return Err(Error::AdapterUnavailable { state });
        }
        self.reconnect_last().await
    }

    /// Whether the radio adapter is powered on.
    ///
    /// Fires [`Notice::AdapterOff`] when it is not.
    pub async fn verify_adapter_ready(&self) -> bool {
        let state = match self.shared.transport.adapter_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to query adapter state: {}", e);
                AdapterState::Unknown
            }
        };

        if state.is_ready() {
            debug!("Adapter ready");
            true
        } else {
            warn!("Adapter not ready: {}", state);
            self.shared.notifier.alert(Notice::AdapterOff { state });
            false
        }
    }

    /// Stop all tasks and close the link.
    pub async fn shutdown(&self) {
        info!("Shutting down connection manager");
        self.shared.teardown(DisconnectReason::Shutdown).await;
    }

    // === Monitoring ===

    /// Pause or resume signal sampling.
    ///
    /// Liveness checks continue while paused. After this returns with
    /// `Paused`, no further sample is recorded.
    pub fn set_monitoring_mode(&self, mode: MonitoringMode) {
        let cleared = {
            let mut link = self.shared.link.write();
            if link.monitoring == mode {
                return;
            }
            link.monitoring = mode;
            if link.state.is_connected() {
                self.shared.start_monitor(&mut link);
            }
            let cleared = if mode.is_active() {
                false
            } else {
                link.signal.take().is_some()
            };
            self.shared.emit(LinkEvent::MonitoringChanged(mode));
            cleared
        };

        info!("Signal monitoring {:?}", mode);
        if cleared {
            self.shared.emit(LinkEvent::Signal(None));
        }
    }

    /// Current monitoring mode.
    pub fn monitoring_mode(&self) -> MonitoringMode {
        self.shared.link.read().monitoring
    }

    // === State ===

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.link.read().state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Device being connected or connected to.
    pub fn device(&self) -> Option<DeviceId> {
        self.shared.link.read().device.clone()
    }

    /// Handle of the live connection.
    pub fn connection(&self) -> Option<ConnectionHandle> {
        let link = self.shared.link.read();
        match (&link.state, &link.device) {
            (ConnectionState::Connected, Some(device)) => Some(ConnectionHandle {
                device: device.clone(),
                session: link.session,
            }),
            _ => None,
        }
    }

    /// Latest signal sample.
    pub fn signal(&self) -> Option<SignalSample> {
        self.shared.link.read().signal.clone()
    }

    /// Snapshot of the whole link state.
    pub fn snapshot(&self) -> LinkSnapshot {
        self.shared.link.read().snapshot()
    }

    // === Messages ===

    /// Channel for sending text to the connected device.
    pub fn channel(&self) -> MessageChannel {
        MessageChannel::new(self.shared.clone())
    }

    /// Send a text message to the connected device.
    pub async fn send(&self, text: &str) -> Result<()> {
        self.shared.send(text).await
    }

    /// All received messages in arrival order.
    pub fn messages(&self) -> Vec<ReceivedMessage> {
        self.shared.messages()
    }

    /// Most recently received message.
    pub fn latest_message(&self) -> Option<ReceivedMessage> {
        self.shared.messages.read().latest().cloned()
    }

    /// Empty the message log.
    pub fn clear_messages(&self) {
        self.shared.clear_messages();
    }

    // === Discovery ===

    /// Scan for named devices for the configured duration.
    pub async fn scan_devices(&self) -> Result<Vec<DiscoveredDevice>> {
        DeviceScanner::new(self.shared.transport.clone())
            .scan(self.shared.config.scan_duration())
            .await
    }

    // === Observers ===

    /// Subscribe to link events.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.shared.event_tx.subscribe()
    }

    /// Register a callback for connection state changes.
    pub fn on_state_changed<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(ConnectionState, Option<&DeviceId>) + Send + Sync + 'static,
    {
        self.register(move |event| {
            if let LinkEvent::StateChanged { device, state } = event {
                callback(*state, device.as_ref());
            }
        })
    }

    /// Register a callback for signal samples. `None` means sampling stopped.
    pub fn on_signal<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(Option<&SignalSample>) + Send + Sync + 'static,
    {
        self.register(move |event| {
            if let LinkEvent::Signal(sample) = event {
                callback(sample.as_ref());
            }
        })
    }

    /// Register a callback for received messages.
    pub fn on_message<F>(&self, callback: F) -> CallbackHandle
    where
        F: Fn(&ReceivedMessage) + Send + Sync + 'static,
    {
        self.register(move |event| {
            if let LinkEvent::Message(message) = event {
                callback(message);
            }
        })
    }

    fn register<F>(&self, handler: F) -> CallbackHandle
    where
        F: Fn(&LinkEvent) + Send + Sync + 'static,
    {
        let callback_id = self.shared.callback_counter.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.shared.event_tx.subscribe();

        let handle = self.shared.runtime.spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Callback {} skipped {} events", callback_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        CallbackHandle::new(callback_id, move || {
            handle.abort();
        })
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let detached = self.shared.link.write().detach();
        if let Some(mut detached) = detached {
            debug!("Dropping link to {}", detached.device);
            detached.stop_tasks();
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let link = self.shared.link.read();
        f.debug_struct("ConnectionManager")
            .field("state", &link.state)
            .field("device", &link.device)
            .field("monitoring", &link.monitoring)
            .finish_non_exhaustive()
    }
}
