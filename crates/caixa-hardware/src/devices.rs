//! The closed set of driver types behind one dispatchable value.
//!
//! Capability traits use native `async fn` and are therefore not object-safe,
//! so the manager cannot hold `Box<dyn Printer>`. [`AnyPeripheral`] is the
//! enum alternative: every registered driver type is a variant, and the
//! capability surface is re-exposed as inherent methods that return
//! `Unsupported` when called on the wrong device class.

use crate::drivers::{
    EscPosPrinter, SerialBarcodeScanner, SimulatedBarcodeReader, SimulatedCashDrawer,
    SimulatedPaymentTerminal, SimulatedPixReader,
};
use crate::error::{PeripheralError, Result};
use crate::traits::{BarcodeReader, CashDrawer, PaymentTerminal, Peripheral, PixReader, Printer};
use caixa_core::{
    DeviceInfo, PaymentRequest, PaymentResult, PeripheralKind, Receipt, StatusCell, StatusReport,
    Symbology, Transaction,
};
use std::time::Duration;

/// Any driver the registry can construct.
#[derive(Debug)]
pub enum AnyPeripheral {
    EscPosPrinter(EscPosPrinter),
    SimulatedCashDrawer(SimulatedCashDrawer),
    SimulatedBarcodeReader(SimulatedBarcodeReader),
    SerialBarcodeScanner(SerialBarcodeScanner),
    SimulatedPixReader(SimulatedPixReader),
    SimulatedPaymentTerminal(SimulatedPaymentTerminal),
}

/// Forward a call to whichever variant is inside.
macro_rules! dispatch {
    ($self:expr, $device:ident => $body:expr) => {
        match $self {
            AnyPeripheral::EscPosPrinter($device) => $body,
            AnyPeripheral::SimulatedCashDrawer($device) => $body,
            AnyPeripheral::SimulatedBarcodeReader($device) => $body,
            AnyPeripheral::SerialBarcodeScanner($device) => $body,
            AnyPeripheral::SimulatedPixReader($device) => $body,
            AnyPeripheral::SimulatedPaymentTerminal($device) => $body,
        }
    };
}

impl Peripheral for AnyPeripheral {
    async fn initialize(&mut self) -> Result<()> {
        dispatch!(self, d => d.initialize().await)
    }

    async fn shutdown(&mut self) -> Result<()> {
        dispatch!(self, d => d.shutdown().await)
    }

    fn status(&self) -> StatusReport {
        dispatch!(self, d => d.status())
    }

    fn status_cell(&self) -> StatusCell {
        dispatch!(self, d => d.status_cell())
    }

    fn info(&self) -> DeviceInfo {
        dispatch!(self, d => d.info())
    }

    fn kind(&self) -> PeripheralKind {
        dispatch!(self, d => d.kind())
    }
}

impl AnyPeripheral {
    fn wrong_kind<T>(&self, operation: &str) -> Result<T> {
        Err(PeripheralError::unsupported(operation, self.kind()))
    }

    /// Re-read status from the device where the driver supports it; other
    /// drivers return their current snapshot.
    pub async fn refresh_status(&mut self) -> StatusReport {
        match self {
            // Failure is already recorded in the status cell.
            Self::EscPosPrinter(p) => p.query_status().await.unwrap_or_else(|_| p.status()),
            other => other.status(),
        }
    }

    pub async fn print_text(&mut self, text: &str) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.print_text(text).await,
            _ => self.wrong_kind("print_text"),
        }
    }

    pub async fn print_receipt(&mut self, receipt: &Receipt) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.print_receipt(receipt).await,
            _ => self.wrong_kind("print_receipt"),
        }
    }

    pub async fn cut_paper(&mut self, partial: bool) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.cut_paper(partial).await,
            _ => self.wrong_kind("cut_paper"),
        }
    }

    pub async fn print_image(&mut self, path: &str) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.print_image(path).await,
            _ => self.wrong_kind("print_image"),
        }
    }

    pub async fn print_barcode(&mut self, value: &str, symbology: Symbology) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.print_barcode(value, symbology).await,
            _ => self.wrong_kind("print_barcode"),
        }
    }

    pub async fn print_qrcode(&mut self, value: &str, size: u8) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.print_qrcode(value, size).await,
            _ => self.wrong_kind("print_qrcode"),
        }
    }

    /// Open a cash drawer, whether it is standalone or hangs off a printer's
    /// kick port.
    pub async fn open_cash_drawer(&mut self) -> Result<()> {
        match self {
            Self::EscPosPrinter(p) => p.open_cash_drawer().await,
            Self::SimulatedCashDrawer(d) => d.open().await,
            _ => self.wrong_kind("open_cash_drawer"),
        }
    }

    pub async fn read_barcode(&mut self, timeout: Duration) -> Result<Option<String>> {
        match self {
            Self::SimulatedBarcodeReader(r) => r.read(timeout).await,
            Self::SerialBarcodeScanner(r) => r.read(timeout).await,
            _ => self.wrong_kind("read_barcode"),
        }
    }

    pub async fn read_pix(&mut self, timeout: Duration) -> Result<Option<String>> {
        match self {
            Self::SimulatedPixReader(r) => PixReader::read(r, timeout).await,
            _ => self.wrong_kind("read_pix"),
        }
    }

    pub async fn process_payment(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        match self {
            Self::SimulatedPaymentTerminal(t) => t.process_payment(request).await,
            _ => self.wrong_kind("process_payment"),
        }
    }

    pub async fn cancel_transaction(&self, transaction_id: &str) -> Result<()> {
        match self {
            Self::SimulatedPaymentTerminal(t) => t.cancel_transaction(transaction_id).await,
            _ => self.wrong_kind("cancel_transaction"),
        }
    }

    pub fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
        match self {
            Self::SimulatedPaymentTerminal(t) => t.transaction(transaction_id),
            _ => None,
        }
    }

    pub fn receipt_for(&self, transaction_id: &str) -> Result<Receipt> {
        match self {
            Self::SimulatedPaymentTerminal(t) => t.receipt_for(transaction_id),
            _ => self.wrong_kind("receipt_for"),
        }
    }
}
