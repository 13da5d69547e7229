//! Peripheral classification and device metadata types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of point-of-sale peripheral.
///
/// The closed set of device classes the subsystem knows how to drive. The
/// registry keys constructors by `(PeripheralKind, driver name)`, so adding a
/// new kind means adding a variant here and a constructor there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralKind {
    /// Thermal receipt printer.
    Printer,

    /// Standalone cash drawer (not driven through a printer's kick port).
    CashDrawer,

    /// Barcode scanner (serial or simulated).
    BarcodeReader,

    /// Camera-based payment-QR (PIX) reader.
    PixReader,

    /// Card payment terminal.
    PaymentTerminal,
}

impl fmt::Display for PeripheralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Printer => "printer",
            Self::CashDrawer => "cash_drawer",
            Self::BarcodeReader => "barcode_reader",
            Self::PixReader => "pix_reader",
            Self::PaymentTerminal => "payment_terminal",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PeripheralKind {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "printer" => Ok(Self::Printer),
            "cash_drawer" => Ok(Self::CashDrawer),
            "barcode_reader" => Ok(Self::BarcodeReader),
            "pix_reader" => Ok(Self::PixReader),
            "payment_terminal" => Ok(Self::PaymentTerminal),
            other => Err(crate::CoreError::config(format!(
                "Unknown peripheral kind: {other}"
            ))),
        }
    }
}

/// Physical connection type of a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// USB bulk-endpoint connection.
    Usb,

    /// Serial port (RS-232 / USB-serial bridge).
    Serial,

    /// TCP socket.
    Network,

    /// In-memory transport for simulated devices and tests.
    Simulated,
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Usb => "usb",
            Self::Serial => "serial",
            Self::Network => "network",
            Self::Simulated => "simulated",
        };
        write!(f, "{s}")
    }
}

/// Generic device information.
///
/// Metadata reported by a driver about the device it controls, such as name,
/// model, serial number and firmware version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "Epson TM-T20", "Simulated Printer").
    pub name: String,

    /// Device model identifier.
    pub model: String,

    /// Optional device serial number.
    pub serial_number: Option<String>,

    /// Optional firmware version string.
    pub firmware_version: Option<String>,
}

impl DeviceInfo {
    /// Create a new DeviceInfo with required fields.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            serial_number: None,
            firmware_version: None,
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }
}
