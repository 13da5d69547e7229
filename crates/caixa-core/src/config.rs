//! Peripheral configuration record.
//!
//! A `PeripheralConfig` is produced by the configuration/CRUD collaborator and
//! consumed by the driver registry. It is immutable once a driver has been
//! constructed from it; changing a device's configuration means removing the
//! device and adding it again.

use crate::{ConnectionType, CoreError, PeripheralKind, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared configuration for a single peripheral.
///
/// The `options` map carries driver-specific settings (baud rate, paper width,
/// DPI, drawer enable flag, simulated decline rate, ...). Typed accessors
/// below validate and convert values on access so drivers never pattern-match
/// raw JSON themselves.
///
/// # Examples
///
/// ```
/// use caixa_core::{ConnectionType, PeripheralConfig, PeripheralKind};
///
/// let config = PeripheralConfig::new("printer-1", PeripheralKind::Printer, "epson")
///     .with_connection(ConnectionType::Network)
///     .with_address("192.168.0.50:9100")
///     .with_option("paper_width_mm", 80)
///     .with_option("cash_drawer_enabled", true);
///
/// assert_eq!(config.opt_u32("paper_width_mm", 58).unwrap(), 80);
/// assert!(config.opt_bool("cash_drawer_enabled", false).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    /// Identity, unique within one manager.
    pub id: String,

    /// Device class.
    #[serde(rename = "type")]
    pub kind: PeripheralKind,

    /// Driver/brand name (e.g. "epson", "elgin", "simulated").
    pub driver: String,

    /// Human-readable display name.
    pub name: String,

    /// Physical connection type.
    pub connection_type: ConnectionType,

    /// Device path for serial/USB-path connections (e.g. "/dev/ttyUSB0").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_path: Option<String>,

    /// Transport address: "host:port" for network, "bus:address" or
    /// "vid:pid" for USB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    /// Open driver-specific options map.
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl PeripheralConfig {
    /// Create a minimal configuration with a simulated connection.
    pub fn new(
        id: impl Into<String>,
        kind: PeripheralKind,
        driver: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            driver: driver.into(),
            connection_type: ConnectionType::Simulated,
            device_path: None,
            address: None,
            options: Map::new(),
        }
    }

    /// Set the connection type.
    pub fn with_connection(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the device path (serial port or USB device node).
    pub fn with_device_path(mut self, path: impl Into<String>) -> Self {
        self.device_path = Some(path.into());
        self
    }

    /// Set the transport address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Insert a driver option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Read a string option, falling back to `default` when absent.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidOption` if the value is present but not a string.
    pub fn opt_str(&self, key: &str, default: &str) -> Result<String> {
        match self.options.get(key) {
            None => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(CoreError::invalid_option(
                key,
                format!("expected string, got {other}"),
            )),
        }
    }

    /// Read an unsigned integer option, falling back to `default` when absent.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidOption` if the value is present but not an
    /// unsigned integer fitting in u32.
    pub fn opt_u32(&self, key: &str, default: u32) -> Result<u32> {
        match self.options.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| {
                    CoreError::invalid_option(key, format!("expected unsigned integer, got {value}"))
                }),
        }
    }

    /// Read a u64 option, falling back to `default` when absent.
    pub fn opt_u64(&self, key: &str, default: u64) -> Result<u64> {
        match self.options.get(key) {
            None => Ok(default),
            Some(value) => value.as_u64().ok_or_else(|| {
                CoreError::invalid_option(key, format!("expected unsigned integer, got {value}"))
            }),
        }
    }

    /// Read a boolean option, falling back to `default` when absent.
    pub fn opt_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.options.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(CoreError::invalid_option(
                key,
                format!("expected boolean, got {other}"),
            )),
        }
    }

    /// Read a floating-point option, falling back to `default` when absent.
    pub fn opt_f64(&self, key: &str, default: f64) -> Result<f64> {
        match self.options.get(key) {
            None => Ok(default),
            Some(value) => value.as_f64().ok_or_else(|| {
                CoreError::invalid_option(key, format!("expected number, got {value}"))
            }),
        }
    }

    /// Require the transport address to be present.
    ///
    /// # Errors
    /// Returns `CoreError::MissingConfig` when no address was declared.
    pub fn require_address(&self) -> Result<&str> {
        self.address
            .as_deref()
            .ok_or_else(|| CoreError::MissingConfig(format!("{}: address", self.id)))
    }

    /// Require the device path to be present.
    ///
    /// # Errors
    /// Returns `CoreError::MissingConfig` when no device path was declared.
    pub fn require_device_path(&self) -> Result<&str> {
        self.device_path
            .as_deref()
            .ok_or_else(|| CoreError::MissingConfig(format!("{}: device_path", self.id)))
    }
}
