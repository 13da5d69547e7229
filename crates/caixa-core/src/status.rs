//! Device status model shared by every driver.
//!
//! Peripherals have no software model of their own state, so each driver keeps
//! a [`StatusCell`] and routes every state change through
//! [`StatusCell::transition`] — the single mutator. Everything else (the
//! driver's own methods, the manager's aggregate view) only reads snapshots.
//!
//! The state machine:
//!
//! ```text
//! Disconnected ──initialize ok──► Online ◄──────────┐
//!      ▲                           │  ▲             │
//!      │ shutdown (any state)      │  │ op ok       │ condition clears
//!      │                  op starts│  │             │
//!      │                           ▼  │             │
//!      │                          Busy │         Warning
//!      │                              │             ▲
//!      │        I/O failure ──────► Error ──────────┘ (drawer open, paper low)
//! ```
//!
//! `Error` is not terminal: a later successful operation or an explicit
//! re-`initialize` transitions back to `Online`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Health state of a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    /// Not initialized, or shut down.
    Disconnected,

    /// Initialized and idle.
    Online,

    /// A command is in flight.
    Busy,

    /// Recoverable condition (drawer open, paper low).
    Warning,

    /// Last operation failed; recoverable via a successful operation or
    /// re-initialize.
    Error,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Online => "online",
            Self::Busy => "busy",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of a device's status at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Current state.
    pub status: DeviceStatus,

    /// Human-readable message for the last transition.
    pub message: String,

    /// Structured details (error codes, drawer pin, transport address, ...).
    pub details: BTreeMap<String, String>,

    /// When the current state was entered.
    pub changed_at: DateTime<Utc>,
}

impl StatusReport {
    fn initial() -> Self {
        Self {
            status: DeviceStatus::Disconnected,
            message: "Not initialized".to_string(),
            details: BTreeMap::new(),
            changed_at: Utc::now(),
        }
    }
}

/// Shared, race-free holder of a device's status.
///
/// Cloning a `StatusCell` yields another handle to the same underlying state,
/// so the manager can keep a handle per device and read a last-known status
/// even while the device itself is busy with a blocking operation.
///
/// # Examples
///
/// ```
/// use caixa_core::{DeviceStatus, StatusCell};
///
/// let cell = StatusCell::new();
/// assert_eq!(cell.status(), DeviceStatus::Disconnected);
///
/// cell.transition(DeviceStatus::Online, "Initialized");
/// let report = cell.report();
/// assert_eq!(report.status, DeviceStatus::Online);
/// assert_eq!(report.message, "Initialized");
/// ```
#[derive(Debug, Clone)]
pub struct StatusCell {
    inner: Arc<RwLock<StatusReport>>,
}

impl StatusCell {
    /// Create a cell in the `Disconnected` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StatusReport::initial())),
        }
    }

    /// Transition to a new state with a message, clearing details.
    ///
    /// This is the single mutator of device status. Re-entering the current
    /// state refreshes the message and timestamp.
    pub fn transition(&self, status: DeviceStatus, message: impl Into<String>) {
        self.transition_with_details(status, message, BTreeMap::new());
    }

    /// Transition to a new state with structured details.
    pub fn transition_with_details(
        &self,
        status: DeviceStatus,
        message: impl Into<String>,
        details: BTreeMap<String, String>,
    ) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = StatusReport {
            status,
            message: message.into(),
            details,
            changed_at: Utc::now(),
        };
    }

    /// Current state.
    pub fn status(&self) -> DeviceStatus {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .status
    }

    /// Full snapshot of the current report.
    pub fn report(&self) -> StatusReport {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}
