//! The peripheral manager: device map, fleet operations and event fan-out.
//!
//! One manager owns every configured peripheral. Each device lives behind its
//! own `Arc<Mutex<AnyPeripheral>>` session lock, so operations on different
//! devices never serialize against each other; the manager's own map lock is
//! held only for map mutation and lookup. Every entry also keeps a cloned
//! status-cell handle, which is how `check_all_status` reports a last-known
//! status for a device whose session lock is held by a hung operation.

use crate::devices::AnyPeripheral;
use crate::error::{PeripheralError, Result};
use crate::registry::{self, DeviceControls};
use crate::traits::Peripheral;
use caixa_core::{
    DeviceStatus, PeripheralConfig, PeripheralKind, StatusCell, StatusReport,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Per-device deadline for fleet operations.
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval of reader background loops.
const READER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Buffered events per subscriber before fan-out starts dropping.
const EVENT_QUEUE_DEPTH: usize = 128;

/// Something observable happened to a managed peripheral.
#[derive(Debug, Clone, PartialEq)]
pub enum PeripheralEvent {
    /// Device initialized and came online.
    Connected { id: String },
    /// Device was shut down or removed.
    Disconnected { id: String },
    /// Device status changed during a fleet status poll.
    StatusChanged { id: String, status: DeviceStatus },
    /// A device operation failed.
    DeviceError { id: String, message: String },
    /// A barcode reader decoded a symbol.
    BarcodeScanned { id: String, symbol: String },
    /// A PIX reader decoded a payment payload.
    PixScanned { id: String, payload: String },
}

impl PeripheralEvent {
    /// Id of the device the event concerns.
    pub fn peripheral_id(&self) -> &str {
        match self {
            Self::Connected { id }
            | Self::Disconnected { id }
            | Self::StatusChanged { id, .. }
            | Self::DeviceError { id, .. }
            | Self::BarcodeScanned { id, .. }
            | Self::PixScanned { id, .. } => id,
        }
    }
}

/// A live event subscription.
///
/// Dropping the subscription (or calling
/// [`PeripheralManager::unsubscribe`]) detaches it; a full queue makes the
/// fan-out drop events for this subscriber only.
#[derive(Debug)]
pub struct EventSubscription {
    id: u64,
    rx: mpsc::Receiver<PeripheralEvent>,
}

impl EventSubscription {
    /// Subscription id, used for `unsubscribe`.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Receive the next event; `None` after `unsubscribe`.
    pub async fn recv(&mut self) -> Option<PeripheralEvent> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<PeripheralEvent> {
        self.rx.try_recv().ok()
    }
}

/// Observer fan-out. Send failures never reach the emitting driver.
#[derive(Debug, Default)]
struct EventBus {
    subscribers: std::sync::Mutex<HashMap<u64, mpsc::Sender<PeripheralEvent>>>,
    next_id: AtomicU64,
}

impl EventBus {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, mpsc::Sender<PeripheralEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn subscribe(&self) -> EventSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        self.lock().insert(id, tx);
        EventSubscription { id, rx }
    }

    fn unsubscribe(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    fn publish(&self, event: PeripheralEvent) {
        let mut closed = Vec::new();
        {
            let subscribers = self.lock();
            for (&id, tx) in subscribers.iter() {
                match tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(subscriber = id, ?event, "event dropped, subscriber lagging");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
                }
            }
        }
        if !closed.is_empty() {
            let mut subscribers = self.lock();
            for id in closed {
                subscribers.remove(&id);
                debug!(subscriber = id, "closed subscriber dropped");
            }
        }
    }
}

/// One managed device.
struct DeviceEntry {
    device: Arc<Mutex<AnyPeripheral>>,
    /// Cloned from the driver; readable without the session lock.
    status: StatusCell,
    kind: PeripheralKind,
    reader_loop: Option<JoinHandle<()>>,
}

/// Owns the peripheral map, runs fleet operations and publishes events.
///
/// Constructed once at process start and handed to collaborators by
/// reference; there is no global instance.
pub struct PeripheralManager {
    devices: Mutex<HashMap<String, DeviceEntry>>,
    events: Arc<EventBus>,
    operation_timeout: Duration,
}

impl Default for PeripheralManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PeripheralManager {
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            events: Arc::new(EventBus::default()),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the per-device deadline of fleet operations.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Register a device from its configuration. No I/O; the device stays
    /// `Disconnected` until [`initialize`](Self::initialize).
    ///
    /// # Errors
    ///
    /// `DuplicateId` if the id is already mapped (the existing device is
    /// untouched); registry errors for unknown `(kind, driver)` pairs or
    /// incomplete configuration.
    pub async fn add(&self, config: &PeripheralConfig) -> Result<DeviceControls> {
        let mut devices = self.devices.lock().await;
        if devices.contains_key(&config.id) {
            return Err(PeripheralError::DuplicateId {
                id: config.id.clone(),
            });
        }

        let (device, controls) = registry::create(config)?;
        let entry = DeviceEntry {
            status: device.status_cell(),
            kind: device.kind(),
            device: Arc::new(Mutex::new(device)),
            reader_loop: None,
        };
        devices.insert(config.id.clone(), entry);
        info!(id = %config.id, kind = %config.kind, driver = %config.driver, "peripheral added");
        Ok(controls)
    }

    /// Unregister a device. The entry is always removed; shutdown is
    /// best-effort and its error is returned after the unmap.
    pub async fn remove(&self, id: &str) -> Result<()> {
        let entry = self
            .devices
            .lock()
            .await
            .remove(id)
            .ok_or_else(|| PeripheralError::UnknownPeripheral { id: id.to_string() })?;

        if let Some(handle) = entry.reader_loop {
            handle.abort();
        }

        let shutdown = {
            let mut device = entry.device.lock().await;
            device.shutdown().await
        };
        self.events.publish(PeripheralEvent::Disconnected {
            id: id.to_string(),
        });
        if let Err(e) = &shutdown {
            warn!(id, error = %e, "shutdown during remove failed");
        }
        info!(id, "peripheral removed");
        shutdown
    }

    /// Session handle for a device. Callers lock it and use the
    /// [`AnyPeripheral`] capability surface directly.
    pub async fn get(&self, id: &str) -> Result<Arc<Mutex<AnyPeripheral>>> {
        self.devices
            .lock()
            .await
            .get(id)
            .map(|entry| Arc::clone(&entry.device))
            .ok_or_else(|| PeripheralError::UnknownPeripheral { id: id.to_string() })
    }

    /// Ids of every managed device of one kind.
    pub async fn list_by_type(&self, kind: PeripheralKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .devices
            .lock()
            .await
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Ids and kinds of every managed device.
    pub async fn list(&self) -> Vec<(String, PeripheralKind)> {
        let mut all: Vec<(String, PeripheralKind)> = self
            .devices
            .lock()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.kind))
            .collect();
        all.sort();
        all
    }

    /// Last-known status of a device, read without its session lock.
    pub async fn status(&self, id: &str) -> Result<StatusReport> {
        self.devices
            .lock()
            .await
            .get(id)
            .map(|entry| entry.status.report())
            .ok_or_else(|| PeripheralError::UnknownPeripheral { id: id.to_string() })
    }

    /// Initialize one device and, for reader kinds, start its background
    /// read loop. Publishes `Connected` on success, `DeviceError` on failure.
    pub async fn initialize(&self, id: &str) -> Result<()> {
        let (device, kind) = {
            let devices = self.devices.lock().await;
            let entry = devices
                .get(id)
                .ok_or_else(|| PeripheralError::UnknownPeripheral { id: id.to_string() })?;
            (Arc::clone(&entry.device), entry.kind)
        };

        let result = {
            let mut device = device.lock().await;
            device.initialize().await
        };
        match &result {
            Ok(()) => {
                self.events.publish(PeripheralEvent::Connected {
                    id: id.to_string(),
                });
                if matches!(
                    kind,
                    PeripheralKind::BarcodeReader | PeripheralKind::PixReader
                ) {
                    self.spawn_reader_loop(id, kind, device).await;
                }
            }
            Err(e) => {
                self.events.publish(PeripheralEvent::DeviceError {
                    id: id.to_string(),
                    message: e.to_string(),
                });
            }
        }
        result
    }

    /// Shut one device down, stopping its reader loop first. Publishes
    /// `Disconnected`.
    pub async fn shutdown(&self, id: &str) -> Result<()> {
        let device = {
            let mut devices = self.devices.lock().await;
            let entry = devices
                .get_mut(id)
                .ok_or_else(|| PeripheralError::UnknownPeripheral { id: id.to_string() })?;
            if let Some(handle) = entry.reader_loop.take() {
                handle.abort();
            }
            Arc::clone(&entry.device)
        };

        let result = {
            let mut device = device.lock().await;
            device.shutdown().await
        };
        self.events.publish(PeripheralEvent::Disconnected {
            id: id.to_string(),
        });
        result
    }

    /// Initialize every device, isolated per device. One entry per id;
    /// a hung device shows up as `OperationTimeout` without delaying others.
    pub async fn initialize_all(&self) -> HashMap<String, Result<()>> {
        let entries = self.snapshot_entries().await;
        let results = self.fleet_operation(&entries, true).await;

        // Reader loops start only for devices that actually came up.
        let kinds: Vec<(String, PeripheralKind)> = self.list().await;
        for (id, kind) in kinds {
            if matches!(
                kind,
                PeripheralKind::BarcodeReader | PeripheralKind::PixReader
            ) && matches!(results.get(&id), Some(Ok(())))
                && let Some(device) = entries.get(&id)
            {
                self.spawn_reader_loop(&id, kind, Arc::clone(device)).await;
            }
        }
        results
    }

    /// Shut every device down, isolated per device. Reader loops end on
    /// their own once the device reports `Disconnected`.
    pub async fn shutdown_all(&self) -> HashMap<String, Result<()>> {
        let entries = self.snapshot_entries().await;
        self.fleet_operation(&entries, false).await
    }

    /// Poll every device's status.
    ///
    /// A device whose session lock cannot be taken before the per-device
    /// deadline reports its last-known status with a `stale` detail instead
    /// of blocking the sweep. Status changes observed here are published as
    /// `StatusChanged`.
    pub async fn check_all_status(&self) -> HashMap<String, StatusReport> {
        let entries: Vec<(String, Arc<Mutex<AnyPeripheral>>, StatusCell)> = {
            let devices = self.devices.lock().await;
            devices
                .iter()
                .map(|(id, e)| (id.clone(), Arc::clone(&e.device), e.status.clone()))
                .collect()
        };

        let mut set = JoinSet::new();
        let timeout = self.operation_timeout;
        for (id, device, status) in entries {
            let events = Arc::clone(&self.events);
            set.spawn(async move {
                let before = status.status();
                let report =
                    match tokio::time::timeout(timeout, device.lock()).await {
                        Ok(mut device) => device.refresh_status().await,
                        Err(_) => {
                            // Session lock held by a hung operation; report
                            // what we last knew.
                            let mut report = status.report();
                            report
                                .details
                                .insert("stale".to_string(), "true".to_string());
                            report
                        }
                    };
                if report.status != before {
                    events.publish(PeripheralEvent::StatusChanged {
                        id: id.clone(),
                        status: report.status,
                    });
                }
                (id, report)
            });
        }

        let mut snapshot = HashMap::new();
        while let Some(joined) = set.join_next().await {
            if let Ok((id, report)) = joined {
                snapshot.insert(id, report);
            }
        }
        snapshot
    }

    /// Subscribe to peripheral events.
    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    /// Detach a subscription by id. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription_id: u64) -> bool {
        self.events.unsubscribe(subscription_id)
    }

    /// Run initialize (`up`) or shutdown on every device with per-device
    /// timeout isolation. The result map has one entry per device.
    async fn fleet_operation(
        &self,
        entries: &HashMap<String, Arc<Mutex<AnyPeripheral>>>,
        up: bool,
    ) -> HashMap<String, Result<()>> {
        let mut set = JoinSet::new();
        let timeout = self.operation_timeout;
        for (id, device) in entries {
            let id = id.clone();
            let device = Arc::clone(device);
            let events = Arc::clone(&self.events);
            set.spawn(async move {
                let operation = async {
                    let mut device = device.lock().await;
                    if up {
                        device.initialize().await
                    } else {
                        device.shutdown().await
                    }
                };
                let result = match tokio::time::timeout(timeout, operation).await {
                    Ok(result) => result,
                    Err(_) => Err(PeripheralError::OperationTimeout {
                        id: id.clone(),
                        timeout_ms: timeout.as_millis() as u64,
                    }),
                };
                match &result {
                    Ok(()) if up => events.publish(PeripheralEvent::Connected { id: id.clone() }),
                    Ok(()) => events.publish(PeripheralEvent::Disconnected { id: id.clone() }),
                    Err(e) => events.publish(PeripheralEvent::DeviceError {
                        id: id.clone(),
                        message: e.to_string(),
                    }),
                }
                (id, result)
            });
        }

        let mut results = HashMap::new();
        while let Some(joined) = set.join_next().await {
            if let Ok((id, result)) = joined {
                results.insert(id, result);
            }
        }
        results
    }

    async fn snapshot_entries(&self) -> HashMap<String, Arc<Mutex<AnyPeripheral>>> {
        self.devices
            .lock()
            .await
            .iter()
            .map(|(id, e)| (id.clone(), Arc::clone(&e.device)))
            .collect()
    }

    async fn spawn_reader_loop(
        &self,
        id: &str,
        kind: PeripheralKind,
        device: Arc<Mutex<AnyPeripheral>>,
    ) {
        let events = Arc::clone(&self.events);
        let loop_id = id.to_string();
        let handle = tokio::spawn(async move {
            debug!(id = %loop_id, "reader loop started");
            loop {
                let read = {
                    let mut device = device.lock().await;
                    if device.status().status == DeviceStatus::Disconnected {
                        break;
                    }
                    match kind {
                        PeripheralKind::PixReader => {
                            device.read_pix(READER_POLL_INTERVAL).await
                        }
                        _ => device.read_barcode(READER_POLL_INTERVAL).await,
                    }
                };
                match read {
                    Ok(Some(value)) => {
                        let event = match kind {
                            PeripheralKind::PixReader => PeripheralEvent::PixScanned {
                                id: loop_id.clone(),
                                payload: value,
                            },
                            _ => PeripheralEvent::BarcodeScanned {
                                id: loop_id.clone(),
                                symbol: value,
                            },
                        };
                        events.publish(event);
                    }
                    Ok(None) => {
                        // Poll window elapsed without a scan; yield so a
                        // shutdown can take the session lock.
                        tokio::task::yield_now().await;
                    }
                    Err(e) => {
                        warn!(id = %loop_id, error = %e, "reader loop stopping");
                        events.publish(PeripheralEvent::DeviceError {
                            id: loop_id.clone(),
                            message: e.to_string(),
                        });
                        break;
                    }
                }
            }
            debug!(id = %loop_id, "reader loop ended");
        });

        if let Some(entry) = self.devices.lock().await.get_mut(id)
            && let Some(previous) = entry.reader_loop.replace(handle)
        {
            previous.abort();
        }
    }
}
