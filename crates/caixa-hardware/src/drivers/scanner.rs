//! Barcode and PIX-QR reader drivers.
//!
//! Scanners are input peripherals: the driver's job is to deliver each decoded
//! symbol exactly once, in order, to whoever calls `read`. Simulated readers
//! feed symbols through a control handle; the serial scanner reads
//! newline-terminated symbols off a keyboard-wedge-style serial stream.

use crate::error::{PeripheralError, Result};
use crate::traits::{BarcodeReader, Peripheral, PixReader};
use caixa_core::{
    DeviceInfo, DeviceStatus, PeripheralConfig, PeripheralKind, StatusCell, StatusReport,
};
use caixa_transport::{AnyTransport, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Scans buffered before the oldest is dropped.
const SCAN_QUEUE_DEPTH: usize = 64;

/// Control handle for a simulated reader.
///
/// Cloneable; `simulate_scan` enqueues one decoded symbol for the paired
/// device's next `read`.
#[derive(Debug, Clone)]
pub struct SimulatedReaderHandle {
    tx: mpsc::Sender<String>,
}

impl SimulatedReaderHandle {
    /// Enqueue a decoded symbol. Returns `false` if the device is gone or the
    /// queue is full.
    pub fn simulate_scan(&self, symbol: impl Into<String>) -> bool {
        self.tx.try_send(symbol.into()).is_ok()
    }
}

/// Shared innards of the two simulated readers.
#[derive(Debug)]
struct SimulatedReader {
    id: String,
    name: String,
    kind: PeripheralKind,
    status: StatusCell,
    rx: mpsc::Receiver<String>,
    scan_count: u64,
}

impl SimulatedReader {
    fn new(config: &PeripheralConfig, kind: PeripheralKind) -> (Self, SimulatedReaderHandle) {
        let (tx, rx) = mpsc::channel(SCAN_QUEUE_DEPTH);
        (
            Self {
                id: config.id.clone(),
                name: config.name.clone(),
                kind,
                status: StatusCell::new(),
                rx,
                scan_count: 0,
            },
            SimulatedReaderHandle { tx },
        )
    }

    async fn initialize(&mut self) -> Result<()> {
        // Drop anything scanned before the device was brought up.
        while self.rx.try_recv().is_ok() {}
        self.scan_count = 0;
        self.status.transition(DeviceStatus::Online, "Waiting for scan");
        debug!(id = %self.id, kind = %self.kind, "simulated reader initialized");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.status
            .transition(DeviceStatus::Disconnected, "Shut down");
        Ok(())
    }

    async fn read(&mut self, timeout: Duration) -> Result<Option<String>> {
        if self.status.status() == DeviceStatus::Disconnected {
            return Err(PeripheralError::Transport(
                caixa_transport::TransportError::not_connected(self.id.clone()),
            ));
        }
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(symbol)) => {
                self.scan_count += 1;
                debug!(id = %self.id, count = self.scan_count, "symbol decoded");
                Ok(Some(symbol))
            }
            // All handles dropped: nothing will ever arrive.
            Ok(None) => Ok(None),
            Err(_) => Ok(None),
        }
    }

    fn status(&self) -> StatusReport {
        self.status.report()
    }
}

/// A simulated hand scanner fed through [`SimulatedReaderHandle`].
#[derive(Debug)]
pub struct SimulatedBarcodeReader {
    inner: SimulatedReader,
}

impl SimulatedBarcodeReader {
    pub fn new(config: &PeripheralConfig) -> (Self, SimulatedReaderHandle) {
        let (inner, handle) = SimulatedReader::new(config, PeripheralKind::BarcodeReader);
        (Self { inner }, handle)
    }

    /// Symbols delivered since initialization.
    pub fn scan_count(&self) -> u64 {
        self.inner.scan_count
    }
}

impl Peripheral for SimulatedBarcodeReader {
    async fn initialize(&mut self) -> Result<()> {
        self.inner.initialize().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await
    }

    fn status(&self) -> StatusReport {
        self.inner.status()
    }

    fn status_cell(&self) -> StatusCell {
        self.inner.status.clone()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.inner.name.clone(), "Simulated barcode reader")
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::BarcodeReader
    }
}

impl BarcodeReader for SimulatedBarcodeReader {
    async fn read(&mut self, timeout: Duration) -> Result<Option<String>> {
        self.inner.read(timeout).await
    }
}

/// A simulated camera PIX reader fed through [`SimulatedReaderHandle`].
#[derive(Debug)]
pub struct SimulatedPixReader {
    inner: SimulatedReader,
}

impl SimulatedPixReader {
    pub fn new(config: &PeripheralConfig) -> (Self, SimulatedReaderHandle) {
        let (inner, handle) = SimulatedReader::new(config, PeripheralKind::PixReader);
        (Self { inner }, handle)
    }
}

impl Peripheral for SimulatedPixReader {
    async fn initialize(&mut self) -> Result<()> {
        self.inner.initialize().await
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await
    }

    fn status(&self) -> StatusReport {
        self.inner.status()
    }

    fn status_cell(&self) -> StatusCell {
        self.inner.status.clone()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.inner.name.clone(), "Simulated PIX reader")
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::PixReader
    }
}

impl PixReader for SimulatedPixReader {
    async fn read(&mut self, timeout: Duration) -> Result<Option<String>> {
        self.inner.read(timeout).await
    }
}

/// A serial-attached scanner emitting one symbol per line.
///
/// Most USB hand scanners expose a CDC serial profile in "serial wedge" mode:
/// each decoded symbol arrives as ASCII terminated by CR and/or LF. The driver
/// accumulates raw reads and surfaces complete lines one at a time.
#[derive(Debug)]
pub struct SerialBarcodeScanner {
    id: String,
    name: String,
    transport: AnyTransport,
    status: StatusCell,
    buffer: Vec<u8>,
}

impl SerialBarcodeScanner {
    pub fn new(config: &PeripheralConfig) -> Result<Self> {
        let transport = AnyTransport::from_config(config)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn with_transport(config: &PeripheralConfig, transport: AnyTransport) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            transport,
            status: StatusCell::new(),
            buffer: Vec::new(),
        }
    }

    /// Pop the next complete line out of the accumulation buffer.
    fn take_line(&mut self) -> Option<String> {
        loop {
            let pos = self
                .buffer
                .iter()
                .position(|&b| b == b'\n' || b == b'\r')?;
            let line: Vec<u8> = self.buffer.drain(..=pos).take(pos).collect();
            // CRLF leaves an empty "line" behind the CR; skip it.
            if line.is_empty() {
                continue;
            }
            return Some(String::from_utf8_lossy(&line).into_owned());
        }
    }
}

impl Peripheral for SerialBarcodeScanner {
    async fn initialize(&mut self) -> Result<()> {
        match self.transport.connect().await {
            Ok(()) => {
                self.buffer.clear();
                self.status.transition(DeviceStatus::Online, "Waiting for scan");
                Ok(())
            }
            Err(e) => {
                self.status
                    .transition(DeviceStatus::Error, format!("connect failed: {e}"));
                Err(e.into())
            }
        }
    }

    async fn shutdown(&mut self) -> Result<()> {
        let closed = self.transport.close().await;
        self.status
            .transition(DeviceStatus::Disconnected, "Shut down");
        closed.map_err(Into::into)
    }

    fn status(&self) -> StatusReport {
        self.status.report()
    }

    fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "Serial barcode scanner")
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::BarcodeReader
    }
}

impl BarcodeReader for SerialBarcodeScanner {
    async fn read(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(line) = self.take_line() {
                debug!(id = %self.id, "symbol decoded");
                return Ok(Some(line));
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.transport.read(remaining).await {
                Ok(bytes) => self.buffer.extend_from_slice(&bytes),
                Err(caixa_transport::TransportError::Timeout { .. }) => return Ok(None),
                Err(e) => {
                    self.status
                        .transition(DeviceStatus::Error, format!("read failed: {e}"));
                    return Err(e.into());
                }
            }
        }
    }
}
