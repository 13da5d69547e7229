//! Core domain types for the Caixa POS peripheral subsystem.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! peripheral kinds and configuration records, the device status state machine,
//! the receipt/print-job model and the payment transaction model. It performs
//! no I/O; everything here is plain data plus validation.

pub mod config;
pub mod error;
pub mod receipt;
pub mod status;
pub mod transaction;
pub mod types;

pub use config::PeripheralConfig;
pub use error::{CoreError, Result};
pub use receipt::{
    Alignment, ContentItem, LineStyle, Priority, Receipt, Section, Symbology, TextStyle,
};
pub use status::{DeviceStatus, StatusCell, StatusReport};
pub use transaction::{
    PaymentMethod, PaymentRequest, PaymentResult, Transaction, TransactionStatus,
};
pub use types::{ConnectionType, DeviceInfo, PeripheralKind};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
