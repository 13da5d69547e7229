//! Standalone cash drawer drivers.
//!
//! Most drawers in the field hang off a printer's kick port and are driven by
//! [`Printer::open_cash_drawer`](crate::traits::Printer::open_cash_drawer).
//! This module covers the drawers that are their own peripheral: a simulated
//! one for tests and demo setups.

use crate::error::Result;
use crate::traits::{CashDrawer, Peripheral};
use caixa_core::{
    DeviceInfo, DeviceStatus, PeripheralConfig, PeripheralKind, StatusCell, StatusReport,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default time the simulated drawer stays open.
const DEFAULT_AUTO_CLOSE_MS: u64 = 3_000;

/// An in-memory cash drawer.
///
/// `open` moves status to `Warning` ("drawer open") and arms a timer that
/// transitions the shared status cell back to `Online` after `auto_close_ms`,
/// so any status read — the driver's, the manager's — sees the drawer close
/// without touching the device. Re-opening re-arms the timer.
#[derive(Debug)]
pub struct SimulatedCashDrawer {
    id: String,
    name: String,
    status: StatusCell,
    auto_close: Duration,
    opened_at: Option<Instant>,
    /// Bumped on every open/shutdown; a pending close timer only fires if
    /// its generation is still current.
    generation: Arc<AtomicU64>,
    open_count: u64,
}

impl SimulatedCashDrawer {
    pub fn new(config: &PeripheralConfig) -> Result<Self> {
        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            status: StatusCell::new(),
            auto_close: Duration::from_millis(
                config.opt_u64("auto_close_ms", DEFAULT_AUTO_CLOSE_MS)?,
            ),
            opened_at: None,
            generation: Arc::new(AtomicU64::new(0)),
            open_count: 0,
        })
    }

    /// Times the drawer has been opened since initialization.
    pub fn open_count(&self) -> u64 {
        self.open_count
    }

    /// Whether the drawer is currently believed open.
    pub fn is_open(&self) -> bool {
        match self.opened_at {
            Some(at) => at.elapsed() < self.auto_close,
            None => false,
        }
    }
}

impl Peripheral for SimulatedCashDrawer {
    async fn initialize(&mut self) -> Result<()> {
        self.opened_at = None;
        self.open_count = 0;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.status.transition(DeviceStatus::Online, "Initialized");
        debug!(id = %self.id, "simulated cash drawer initialized");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.opened_at = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.status
            .transition(DeviceStatus::Disconnected, "Shut down");
        Ok(())
    }

    fn status(&self) -> StatusReport {
        self.status.report()
    }

    fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "Simulated cash drawer")
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::CashDrawer
    }
}

impl CashDrawer for SimulatedCashDrawer {
    async fn open(&mut self) -> Result<()> {
        self.opened_at = Some(Instant::now());
        self.open_count += 1;
        self.status.transition(DeviceStatus::Warning, "Drawer open");
        debug!(id = %self.id, count = self.open_count, "drawer opened");

        let armed = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let status = self.status.clone();
        let auto_close = self.auto_close;
        tokio::spawn(async move {
            tokio::time::sleep(auto_close).await;
            // A later open (or shutdown) supersedes this timer.
            if generation.load(Ordering::SeqCst) == armed
                && status.status() == DeviceStatus::Warning
            {
                status.transition(DeviceStatus::Online, "Drawer closed");
            }
        });
        Ok(())
    }
}
