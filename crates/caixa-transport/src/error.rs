//! Transport error classification.
//!
//! Every I/O failure at the byte-channel layer is classified into one of four
//! kinds so upper layers can react uniformly regardless of the physical
//! medium. Errors are never silently swallowed; a failed operation always
//! surfaces one of these.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur on a byte-level transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Device or endpoint does not exist (unplugged, wrong address).
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Operating system denied access (udev rules, port ownership).
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Operation did not complete within its deadline.
    #[error("Operation timeout after {}ms", duration.as_millis())]
    Timeout { duration: Duration },

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// Transport is not connected.
    #[error("Transport not connected: {0}")]
    NotConnected(String),
}

impl TransportError {
    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Create a generic I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Create a not-connected error.
    pub fn not_connected(what: impl Into<String>) -> Self {
        Self::NotConnected(what.into())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            ErrorKind::TimedOut | ErrorKind::WouldBlock => Self::Timeout {
                duration: Duration::ZERO,
            },
            _ => Self::Io(err.to_string()),
        }
    }
}

impl From<rusb::Error> for TransportError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::NoDevice | rusb::Error::NotFound => Self::NotFound(err.to_string()),
            rusb::Error::Access => Self::PermissionDenied(err.to_string()),
            rusb::Error::Timeout => Self::Timeout {
                duration: Duration::ZERO,
            },
            other => Self::Io(other.to_string()),
        }
    }
}

impl From<tokio_serial::Error> for TransportError {
    fn from(err: tokio_serial::Error) -> Self {
        use tokio_serial::ErrorKind;
        match err.kind() {
            ErrorKind::NoDevice => Self::NotFound(err.to_string()),
            ErrorKind::Io(kind) => Self::from(std::io::Error::from(kind)),
            _ => Self::Io(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_classification() {
        let not_found = TransportError::from(IoError::new(ErrorKind::NotFound, "gone"));
        assert!(matches!(not_found, TransportError::NotFound(_)));

        let denied = TransportError::from(IoError::new(ErrorKind::PermissionDenied, "no"));
        assert!(matches!(denied, TransportError::PermissionDenied(_)));

        let timeout = TransportError::from(IoError::new(ErrorKind::TimedOut, "slow"));
        assert!(matches!(timeout, TransportError::Timeout { .. }));

        let other = TransportError::from(IoError::new(ErrorKind::BrokenPipe, "pipe"));
        assert!(matches!(other, TransportError::Io(_)));
    }

    #[test]
    fn test_usb_error_classification() {
        assert!(matches!(
            TransportError::from(rusb::Error::NoDevice),
            TransportError::NotFound(_)
        ));
        assert!(matches!(
            TransportError::from(rusb::Error::Access),
            TransportError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_display() {
        let err = TransportError::timeout(Duration::from_millis(3000));
        assert_eq!(err.to_string(), "Operation timeout after 3000ms");
    }
}
