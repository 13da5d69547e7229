//! Driver registry: the closed `(kind, driver)` table.
//!
//! Construction never performs I/O; a freshly created device is
//! `Disconnected` until `initialize` runs. Unknown kinds and unknown drivers
//! fail with typed errors before any hardware is touched, which lets the
//! manager validate collaborator configuration up front.

use crate::devices::AnyPeripheral;
use crate::drivers::{
    EscPosPrinter, SerialBarcodeScanner, SimulatedBarcodeReader, SimulatedCashDrawer,
    SimulatedPaymentTerminal, SimulatedPixReader, SimulatedReaderHandle,
};
use crate::error::{PeripheralError, Result};
use caixa_core::{PeripheralConfig, PeripheralKind};
use caixa_transport::MockTransportHandle;

/// Simulation controls returned alongside a created device.
///
/// Real hardware yields `None`. Simulated readers yield the handle that feeds
/// scans in; simulated printers yield the transport tap that exposes every
/// byte the driver wrote.
#[derive(Debug, Clone)]
pub enum DeviceControls {
    None,
    Reader(SimulatedReaderHandle),
    PrinterTap(MockTransportHandle),
}

impl DeviceControls {
    /// The reader handle, if this device is a simulated reader.
    pub fn reader(&self) -> Option<&SimulatedReaderHandle> {
        match self {
            Self::Reader(handle) => Some(handle),
            _ => None,
        }
    }

    /// The transport tap, if this device is a simulated printer.
    pub fn printer_tap(&self) -> Option<&MockTransportHandle> {
        match self {
            Self::PrinterTap(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Driver names constructible for each peripheral kind.
pub fn available_drivers(kind: PeripheralKind) -> &'static [&'static str] {
    match kind {
        PeripheralKind::Printer => &["epson", "elgin", "simulated"],
        PeripheralKind::CashDrawer => &["simulated"],
        PeripheralKind::BarcodeReader => &["serial", "simulated"],
        PeripheralKind::PixReader => &["simulated"],
        PeripheralKind::PaymentTerminal => &["simulated"],
    }
}

/// Whether the registry can construct this `(kind, driver)` pair.
pub fn supports(kind: PeripheralKind, driver: &str) -> bool {
    available_drivers(kind).contains(&driver)
}

/// Construct the driver a configuration names.
///
/// # Errors
///
/// `UnsupportedDriver` when the `(kind, driver)` pair is not in the table;
/// `Configuration` when the config is missing what the driver needs (a serial
/// scanner without a device path, a network printer without an address).
pub fn create(config: &PeripheralConfig) -> Result<(AnyPeripheral, DeviceControls)> {
    match (config.kind, config.driver.as_str()) {
        (PeripheralKind::Printer, "epson" | "elgin") => Ok((
            AnyPeripheral::EscPosPrinter(EscPosPrinter::new(config)?),
            DeviceControls::None,
        )),
        (PeripheralKind::Printer, "simulated") => {
            let (printer, tap) = EscPosPrinter::simulated(config)?;
            Ok((
                AnyPeripheral::EscPosPrinter(printer),
                DeviceControls::PrinterTap(tap),
            ))
        }
        (PeripheralKind::CashDrawer, "simulated") => Ok((
            AnyPeripheral::SimulatedCashDrawer(SimulatedCashDrawer::new(config)?),
            DeviceControls::None,
        )),
        (PeripheralKind::BarcodeReader, "serial") => Ok((
            AnyPeripheral::SerialBarcodeScanner(SerialBarcodeScanner::new(config)?),
            DeviceControls::None,
        )),
        (PeripheralKind::BarcodeReader, "simulated") => {
            let (reader, handle) = SimulatedBarcodeReader::new(config);
            Ok((
                AnyPeripheral::SimulatedBarcodeReader(reader),
                DeviceControls::Reader(handle),
            ))
        }
        (PeripheralKind::PixReader, "simulated") => {
            let (reader, handle) = SimulatedPixReader::new(config);
            Ok((
                AnyPeripheral::SimulatedPixReader(reader),
                DeviceControls::Reader(handle),
            ))
        }
        (PeripheralKind::PaymentTerminal, "simulated") => Ok((
            AnyPeripheral::SimulatedPaymentTerminal(SimulatedPaymentTerminal::new(config)?),
            DeviceControls::None,
        )),
        (kind, driver) => Err(PeripheralError::UnsupportedDriver {
            kind,
            driver: driver.to_string(),
        }),
    }
}
