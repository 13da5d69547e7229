//! Error types for peripheral drivers and the manager.
//!
//! The taxonomy follows how callers must react:
//!
//! - configuration errors are surfaced immediately and never retried;
//! - transport errors surface as a status transition to `Error` plus a
//!   returned failure (retry policy belongs to the caller);
//! - `CapabilityDisabled` and `TransactionInProgress` are rejected before any
//!   hardware access happens.

use caixa_core::{CoreError, PeripheralKind};
use caixa_protocol::ProtocolError;
use caixa_transport::TransportError;
use thiserror::Error;

/// Result type alias for peripheral operations.
pub type Result<T> = std::result::Result<T, PeripheralError>;

/// Errors that can occur while constructing or operating a peripheral.
#[derive(Error, Debug)]
pub enum PeripheralError {
    /// Malformed or inconsistent configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] CoreError),

    /// No driver table exists for this peripheral type.
    #[error("Unsupported peripheral type: {kind}")]
    UnsupportedType { kind: PeripheralKind },

    /// The (type, driver) pair is not in the registry.
    #[error("Unsupported driver '{driver}' for peripheral type {kind}")]
    UnsupportedDriver {
        kind: PeripheralKind,
        driver: String,
    },

    /// A peripheral id the manager does not know.
    #[error("Unknown peripheral: {id}")]
    UnknownPeripheral { id: String },

    /// A peripheral id that is already registered.
    #[error("Duplicate peripheral id: {id}")]
    DuplicateId { id: String },

    /// Byte-channel failure; the device status has already moved to `Error`.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Command encoding rejected the input data.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The operation exists but is disabled by this device's configuration.
    #[error("Capability disabled: {capability}")]
    CapabilityDisabled { capability: String },

    /// The operation does not exist for this device class.
    #[error("Operation '{operation}' not supported by {kind} devices")]
    Unsupported {
        operation: String,
        kind: PeripheralKind,
    },

    /// Another transaction is already in flight on this terminal.
    #[error("Transaction already in progress on terminal '{terminal}'")]
    TransactionInProgress { terminal: String },

    /// The referenced transaction id does not exist on this terminal.
    #[error("Unknown transaction: {id}")]
    TransactionNotFound { id: String },

    /// Image decoding failed for a raster print.
    #[error("Image error: {0}")]
    Image(String),

    /// A per-device manager operation exceeded its deadline.
    #[error("Operation on '{id}' timed out after {timeout_ms}ms")]
    OperationTimeout { id: String, timeout_ms: u64 },
}

impl PeripheralError {
    /// Create a capability-disabled error.
    pub fn capability_disabled(capability: impl Into<String>) -> Self {
        Self::CapabilityDisabled {
            capability: capability.into(),
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(operation: impl Into<String>, kind: PeripheralKind) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            kind,
        }
    }

    /// Whether this error is a configuration-class error (never retried).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::UnsupportedType { .. }
                | Self::UnsupportedDriver { .. }
                | Self::DuplicateId { .. }
        )
    }
}

impl From<image::ImageError> for PeripheralError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_class() {
        assert!(PeripheralError::DuplicateId { id: "p1".into() }.is_configuration());
        assert!(
            PeripheralError::UnsupportedDriver {
                kind: PeripheralKind::Printer,
                driver: "unknown".into(),
            }
            .is_configuration()
        );
        assert!(!PeripheralError::capability_disabled("cash_drawer").is_configuration());
    }

    #[test]
    fn test_display() {
        let err = PeripheralError::TransactionInProgress {
            terminal: "term-1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Transaction already in progress on terminal 'term-1'"
        );
    }
}
