//! Capability trait contracts for peripheral drivers.
//!
//! Every driver implements [`Peripheral`] (lifecycle and status) plus one or
//! more capability traits. Callers depend on the trait, never the concrete
//! type, so a simulated terminal and a real one are interchangeable at the
//! call site.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro. Because such traits are
//! not object-safe, the manager dispatches through the
//! [`AnyPeripheral`](crate::devices::AnyPeripheral) enum instead of boxed
//! trait objects.
//!
//! # Status discipline
//!
//! Every method that touches hardware updates the driver's
//! [`StatusCell`](caixa_core::StatusCell) before returning an error, so
//! `status()` reflects reality even on the failure path.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use caixa_core::{
    DeviceInfo, PaymentRequest, PaymentResult, PeripheralKind, Receipt, StatusCell, StatusReport,
    Symbology, Transaction,
};
use std::time::Duration;

/// Lifecycle and status surface common to every peripheral.
pub trait Peripheral: Send {
    /// Open the transport and prepare the device. Moves status from
    /// `Disconnected` (or `Error`) to `Online` on success, `Error` on failure.
    async fn initialize(&mut self) -> Result<()>;

    /// Release the device. Always ends in `Disconnected`, from any state.
    async fn shutdown(&mut self) -> Result<()>;

    /// Current status snapshot. Never touches hardware.
    fn status(&self) -> StatusReport;

    /// Shared handle to this device's status cell. The manager keeps one per
    /// device so a last-known status stays readable while the device is busy.
    fn status_cell(&self) -> StatusCell;

    /// Device metadata.
    fn info(&self) -> DeviceInfo;

    /// Device class.
    fn kind(&self) -> PeripheralKind;
}

/// Thermal receipt printer.
pub trait Printer: Peripheral {
    /// Print a plain text line.
    async fn print_text(&mut self, text: &str) -> Result<()>;

    /// Print a complete receipt and cut.
    async fn print_receipt(&mut self, receipt: &Receipt) -> Result<()>;

    /// Cut the paper (partial or full).
    async fn cut_paper(&mut self, partial: bool) -> Result<()>;

    /// Print a raster image loaded from a file path.
    async fn print_image(&mut self, path: &str) -> Result<()>;

    /// Print a one-dimensional barcode.
    async fn print_barcode(&mut self, value: &str, symbology: Symbology) -> Result<()>;

    /// Print a QR code with the given module size.
    async fn print_qrcode(&mut self, value: &str, size: u8) -> Result<()>;

    /// Pulse the drawer-kick port.
    ///
    /// # Errors
    ///
    /// Fails with `CapabilityDisabled` when the configured model has no
    /// drawer pin or `cash_drawer_enabled` is off; no hardware is touched.
    async fn open_cash_drawer(&mut self) -> Result<()>;
}

/// Standalone cash drawer.
pub trait CashDrawer: Peripheral {
    /// Release the drawer solenoid. Status moves to `Warning` while the
    /// drawer is believed open.
    async fn open(&mut self) -> Result<()>;
}

/// Barcode scanner delivering decoded symbols.
pub trait BarcodeReader: Peripheral {
    /// Wait up to `timeout` for one decoded symbol. `Ok(None)` means nothing
    /// was scanned before the deadline; each decoded symbol is returned
    /// exactly once.
    async fn read(&mut self, timeout: Duration) -> Result<Option<String>>;
}

/// Camera-based payment-QR (PIX) reader.
pub trait PixReader: Peripheral {
    /// Wait up to `timeout` for one decoded PIX payload.
    async fn read(&mut self, timeout: Duration) -> Result<Option<String>>;
}

/// Card payment terminal.
///
/// Payment methods take `&self`: a terminal must be callable concurrently so
/// the per-terminal transaction lock (not the borrow checker) is what rejects
/// the second caller with `TransactionInProgress`.
pub trait PaymentTerminal: Peripheral {
    /// Run one payment transaction to completion.
    ///
    /// # Errors
    ///
    /// Fails fast with `TransactionInProgress` if another transaction is in
    /// flight; the existing transaction is untouched.
    async fn process_payment(&self, request: &PaymentRequest) -> Result<PaymentResult>;

    /// Cancel an in-flight transaction by id.
    async fn cancel_transaction(&self, transaction_id: &str) -> Result<()>;

    /// Look up a transaction from this terminal's history.
    fn transaction(&self, transaction_id: &str) -> Option<Transaction>;

    /// Render the customer receipt for a settled transaction.
    ///
    /// Terminals have no paper of their own here: rendering returns a
    /// [`Receipt`] the caller routes to whichever configured printer should
    /// produce it, instead of the terminal printing directly.
    fn receipt_for(&self, transaction_id: &str) -> Result<Receipt>;
}
