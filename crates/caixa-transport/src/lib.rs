//! Byte-level transport abstraction for POS peripherals.
//!
//! A [`Transport`] moves raw bytes between a driver and a physical device and
//! nothing more: no framing, no retries, no protocol knowledge. Three real
//! implementations are provided (USB bulk endpoint, serial port, TCP socket)
//! plus an in-memory mock for simulated drivers and tests.
//!
//! # Contract
//!
//! - `connect` acquires the channel; construction never performs I/O.
//! - `write`/`read` apply the transport's own deadline; callers never rely on
//!   OS default timeouts.
//! - `close` is idempotent and safe to call from a failed or partial state.
//! - Every failure is classified as a [`TransportError`].
//!
//! # USB status asymmetry
//!
//! Serial and TCP channels support real status reads. USB printers often only
//! expose a bulk-OUT endpoint; when no IN endpoint is available, [`UsbTransport`]
//! reports reads as timeouts instead of pretending to poll. Drivers treat USB
//! status as best-effort/optimistic.

#![allow(async_fn_in_trait)]

pub mod error;
pub mod mock;
pub mod serial;
pub mod tcp;
pub mod usb;

pub use error::{Result, TransportError};
pub use mock::{MockTransport, MockTransportHandle};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use usb::UsbTransport;

use caixa_core::{ConnectionType, CoreError, PeripheralConfig};
use std::time::Duration;

/// Default deadline for connect and I/O operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// A byte-level channel to a peripheral.
pub trait Transport: Send {
    /// Open the channel. Idempotent: connecting an open transport is a no-op.
    async fn connect(&mut self) -> Result<()>;

    /// Write bytes, returning how many were accepted.
    async fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read whatever bytes arrive within `timeout`.
    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    /// Release the channel. Idempotent; safe from a failed/partial state.
    async fn close(&mut self) -> Result<()>;

    /// Whether the channel is currently open.
    fn is_connected(&self) -> bool;
}

/// Concrete-type dispatch over every transport implementation.
///
/// Native async-fn traits are not object-safe, so drivers own an
/// `AnyTransport` instead of a boxed trait object. The closed set of variants
/// mirrors the closed set of `connection_type` values a configuration can
/// declare.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    Tcp(TcpTransport),
    Serial(SerialTransport),
    Usb(UsbTransport),
    Mock(MockTransport),
}

impl AnyTransport {
    /// Build a transport from a peripheral configuration. No I/O happens
    /// here; bad addresses and malformed options fail with a typed
    /// configuration error.
    ///
    /// Recognized options: `timeout_ms`, `baud_rate`, `parity`
    /// (`none`/`even`/`odd`), `stop_bits` (`1`/`2`).
    pub fn from_config(config: &PeripheralConfig) -> std::result::Result<Self, CoreError> {
        let timeout = Duration::from_millis(config.opt_u64("timeout_ms", 3000)?);

        match config.connection_type {
            ConnectionType::Network => {
                let addr = config.require_address()?;
                Ok(Self::Tcp(TcpTransport::new(addr, timeout)?))
            }
            ConnectionType::Serial => {
                let path = config.require_device_path()?;
                Ok(Self::Serial(SerialTransport::from_options(path, config, timeout)?))
            }
            ConnectionType::Usb => {
                let addr = config.require_address()?;
                Ok(Self::Usb(UsbTransport::new(addr, timeout)?))
            }
            ConnectionType::Simulated => Ok(Self::Mock(MockTransport::new().0)),
        }
    }
}

impl Transport for AnyTransport {
    async fn connect(&mut self) -> Result<()> {
        match self {
            Self::Tcp(t) => t.connect().await,
            Self::Serial(t) => t.connect().await,
            Self::Usb(t) => t.connect().await,
            Self::Mock(t) => t.connect().await,
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        match self {
            Self::Tcp(t) => t.write(bytes).await,
            Self::Serial(t) => t.write(bytes).await,
            Self::Usb(t) => t.write(bytes).await,
            Self::Mock(t) => t.write(bytes).await,
        }
    }

    async fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        match self {
            Self::Tcp(t) => t.read(timeout).await,
            Self::Serial(t) => t.read(timeout).await,
            Self::Usb(t) => t.read(timeout).await,
            Self::Mock(t) => t.read(timeout).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Tcp(t) => t.close().await,
            Self::Serial(t) => t.close().await,
            Self::Usb(t) => t.close().await,
            Self::Mock(t) => t.close().await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Tcp(t) => t.is_connected(),
            Self::Serial(t) => t.is_connected(),
            Self::Usb(t) => t.is_connected(),
            Self::Mock(t) => t.is_connected(),
        }
    }
}
