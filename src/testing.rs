//! In-memory transport for tests.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::ble::transport::{AdapterState, DeviceId, DiscoveredDevice, FrameStream, Transport};
use crate::error::{Error, Result};

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    AdapterState,
    Connect(DeviceId),
    DiscoverServices(DeviceId),
    IsConnected(DeviceId),
    ReadSignalStrength(DeviceId),
    Subscribe(DeviceId),
    Write(DeviceId),
    CancelConnection(DeviceId),
    Scan,
}

struct FakeState {
    adapter: AdapterState,
    linked: HashSet<DeviceId>,
    unreachable: HashSet<DeviceId>,
    fail_discovery: bool,
    fail_writes: bool,
    rssi: Option<i16>,
    calls: Vec<Call>,
    writes: Vec<(DeviceId, Uuid, Vec<u8>)>,
    frames: Vec<(DeviceId, mpsc::UnboundedSender<Vec<u8>>)>,
    connect_gate: Option<Arc<Notify>>,
    scan_results: Vec<DiscoveredDevice>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            adapter: AdapterState::PoweredOn,
            linked: HashSet::new(),
            unreachable: HashSet::new(),
            fail_discovery: false,
            fail_writes: false,
            rssi: Some(-60),
            calls: Vec::new(),
            writes: Vec::new(),
            frames: Vec::new(),
            connect_gate: None,
            scan_results: Vec::new(),
        }
    }
}

/// Scriptable stand-in for a radio stack.
#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Mutex<FakeState>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_adapter_state(&self, adapter: AdapterState) {
        self.state.lock().adapter = adapter;
    }

    /// `None` makes signal reads fail.
    pub fn set_rssi(&self, rssi: Option<i16>) {
        self.state.lock().rssi = rssi;
    }

    pub fn make_unreachable(&self, id: &DeviceId) {
        self.state.lock().unreachable.insert(id.clone());
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.state.lock().fail_discovery = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn set_scan_results(&self, results: Vec<DiscoveredDevice>) {
        self.state.lock().scan_results = results;
    }

    /// Make `connect` wait until the returned gate is notified.
    pub fn hold_connections(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().connect_gate = Some(gate.clone());
        gate
    }

    /// Link a device without going through `connect`.
    pub fn connect_now(&self, id: &DeviceId) {
        self.state.lock().linked.insert(id.clone());
    }

    /// Simulate the peripheral going away.
    pub fn drop_link(&self, id: &DeviceId) {
        let mut state = self.state.lock();
        state.linked.remove(id);
        state.frames.retain(|(device, _)| device != id);
    }

    pub fn is_linked(&self, id: &DeviceId) -> bool {
        self.state.lock().linked.contains(id)
    }

    /// Deliver a raw frame to every live subscription.
    pub fn push_frame(&self, frame: &[u8]) {
        let mut state = self.state.lock();
        state
            .frames
            .retain(|(_, tx)| tx.unbounded_send(frame.to_vec()).is_ok());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn writes(&self) -> Vec<(DeviceId, Uuid, Vec<u8>)> {
        self.state.lock().writes.clone()
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn adapter_state(&self) -> Result<AdapterState> {
        self.record(Call::AdapterState);
        Ok(self.state.lock().adapter)
    }

    async fn connect(&self, id: &DeviceId) -> Result<()> {
        self.record(Call::Connect(id.clone()));
        let gate = self.state.lock().connect_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        if state.unreachable.contains(id) {
            return Err(Error::DeviceNotFound {
                identifier: id.to_string(),
            });
        }
        state.linked.insert(id.clone());
        Ok(())
    }

    async fn discover_services(&self, id: &DeviceId) -> Result<()> {
        self.record(Call::DiscoverServices(id.clone()));
        if self.state.lock().fail_discovery {
            return Err(Error::ServiceNotFound {
                uuid: "discovery failed".to_string(),
            });
        }
        Ok(())
    }

    async fn is_connected(&self, id: &DeviceId) -> Result<bool> {
        self.record(Call::IsConnected(id.clone()));
        Ok(self.is_linked(id))
    }

    async fn read_signal_strength(&self, id: &DeviceId) -> Result<i16> {
        self.record(Call::ReadSignalStrength(id.clone()));
        let state = self.state.lock();
        if !state.linked.contains(id) {
            return Err(Error::NotConnected);
        }
        state.rssi.ok_or_else(|| Error::SignalReadFailed {
            reason: "no RSSI reported".to_string(),
        })
    }

    async fn subscribe(
        &self,
        id: &DeviceId,
        _service: Uuid,
        _characteristic: Uuid,
    ) -> Result<FrameStream> {
        self.record(Call::Subscribe(id.clone()));
        let (tx, rx) = mpsc::unbounded();
        self.state.lock().frames.push((id.clone(), tx));
        Ok(rx.boxed())
    }

    async fn write(
        &self,
        id: &DeviceId,
        _service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()> {
        self.record(Call::Write(id.clone()));
        let mut state = self.state.lock();
        if state.fail_writes || !state.linked.contains(id) {
            return Err(Error::WriteFailed {
                reason: "peripheral rejected write".to_string(),
            });
        }
        state.writes.push((id.clone(), characteristic, data.to_vec()));
        Ok(())
    }

    async fn cancel_connection(&self, id: &DeviceId) -> Result<()> {
        self.record(Call::CancelConnection(id.clone()));
        let mut state = self.state.lock();
        state.linked.remove(id);
        state.frames.retain(|(device, _)| device != id);
        Ok(())
    }

    async fn scan(&self, _duration: Duration) -> Result<Vec<DiscoveredDevice>> {
        self.record(Call::Scan);
        Ok(self.state.lock().scan_results.clone())
    }
}
