//! Peripheral drivers and the device manager for the Caixa POS subsystem.
//!
//! This crate is where configuration meets hardware: the [`registry`] turns a
//! [`PeripheralConfig`](caixa_core::PeripheralConfig) into a concrete driver,
//! the capability [`traits`] define what each device class can do, and the
//! [`PeripheralManager`] owns the resulting fleet, running per-device
//! operations in isolation and fanning events out to subscribers.
//!
//! Capability traits use native `async fn` (edition 2024); because such
//! traits are not object-safe, drivers are dispatched through the
//! [`AnyPeripheral`] enum rather than boxed trait objects.
//!
//! # Example
//!
//! ```
//! use caixa_core::{PeripheralConfig, PeripheralKind};
//! use caixa_hardware::PeripheralManager;
//!
//! # async fn demo() -> caixa_hardware::Result<()> {
//! let manager = PeripheralManager::new();
//! let config = PeripheralConfig::new("printer-1", PeripheralKind::Printer, "simulated");
//! manager.add(&config).await?;
//! manager.initialize("printer-1").await?;
//!
//! let printer = manager.get("printer-1").await?;
//! printer.lock().await.print_text("OLA").await?;
//! # Ok(())
//! # }
//! ```

#![allow(async_fn_in_trait)]

pub mod devices;
pub mod drivers;
pub mod error;
pub mod manager;
pub mod registry;
pub mod traits;

pub use devices::AnyPeripheral;
pub use error::{PeripheralError, Result};
pub use manager::{EventSubscription, PeripheralEvent, PeripheralManager};
pub use registry::{DeviceControls, available_drivers, create, supports};
pub use traits::{BarcodeReader, CashDrawer, PaymentTerminal, Peripheral, PixReader, Printer};
