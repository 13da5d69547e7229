//! Simulated card payment terminal (TEF pinpad).
//!
//! The simulator runs the full transaction lifecycle of a real terminal:
//! start, processing delay, approval or decline, cancellation, history and
//! customer-receipt rendering. Approval is deterministic per transaction id so
//! runs are reproducible without a seeded RNG dependency.

use crate::error::{PeripheralError, Result};
use crate::traits::{PaymentTerminal, Peripheral};
use caixa_core::{
    Alignment, ContentItem, DeviceInfo, DeviceStatus, LineStyle, PaymentMethod, PaymentRequest,
    PaymentResult, PeripheralConfig, PeripheralKind, Receipt, Section, StatusCell, StatusReport,
    TextStyle, Transaction, TransactionStatus,
};
use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Default simulated card-network round trip.
const DEFAULT_DELAY_MS: u64 = 200;

/// A payment terminal that approves or declines in memory.
///
/// One transaction at a time: the per-terminal lock rejects a second
/// `process_payment` with `TransactionInProgress` instead of queueing it,
/// matching how a physical pinpad behaves while its display is captive.
#[derive(Debug)]
pub struct SimulatedPaymentTerminal {
    id: String,
    name: String,
    status: StatusCell,
    decline_rate: f64,
    delay: Duration,
    txn_lock: Mutex<()>,
    history: StdMutex<HashMap<String, Transaction>>,
}

impl SimulatedPaymentTerminal {
    pub fn new(config: &PeripheralConfig) -> Result<Self> {
        Ok(Self {
            id: config.id.clone(),
            name: config.name.clone(),
            status: StatusCell::new(),
            decline_rate: config.opt_f64("decline_rate", 0.0)?.clamp(0.0, 1.0),
            delay: Duration::from_millis(config.opt_u64("delay_ms", DEFAULT_DELAY_MS)?),
            txn_lock: Mutex::new(()),
            history: StdMutex::new(HashMap::new()),
        })
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, HashMap<String, Transaction>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deterministic approve/decline decision from the transaction id.
    ///
    /// The first four bytes of the UUID are uniformly distributed, so mapping
    /// them onto [0, 1) and comparing against `decline_rate` declines the
    /// configured fraction of transactions over many runs while keeping any
    /// single id's outcome stable.
    fn declines(&self, transaction_id: &str) -> bool {
        if self.decline_rate <= 0.0 {
            return false;
        }
        if self.decline_rate >= 1.0 {
            return true;
        }
        let word = transaction_id
            .bytes()
            .filter(u8::is_ascii_hexdigit)
            .take(8)
            .fold(0u32, |acc, b| {
                let nibble = (b as char).to_digit(16).unwrap_or(0);
                (acc << 4) | nibble
            });
        (f64::from(word) / f64::from(u32::MAX)) < self.decline_rate
    }

    fn method_label(method: PaymentMethod) -> &'static str {
        match method {
            PaymentMethod::Credit => "CREDITO",
            PaymentMethod::Debit => "DEBITO",
            PaymentMethod::Pix => "PIX",
        }
    }

    fn format_amount(cents: i64) -> String {
        format!("R$ {},{:02}", cents / 100, (cents % 100).abs())
    }
}

impl Peripheral for SimulatedPaymentTerminal {
    async fn initialize(&mut self) -> Result<()> {
        self.lock_history().clear();
        self.status.transition(DeviceStatus::Online, "Idle");
        debug!(id = %self.id, "simulated payment terminal initialized");
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
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
        DeviceInfo::new(self.name.clone(), "Simulated payment terminal")
    }

    fn kind(&self) -> PeripheralKind {
        PeripheralKind::PaymentTerminal
    }
}

impl PaymentTerminal for SimulatedPaymentTerminal {
    async fn process_payment(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        let _guard = self
            .txn_lock
            .try_lock()
            .map_err(|_| PeripheralError::TransactionInProgress {
                terminal: self.id.clone(),
            })?;

        let transaction = Transaction::start(request);
        let transaction_id = transaction.id.clone();
        self.lock_history()
            .insert(transaction_id.clone(), transaction);
        self.status.transition(
            DeviceStatus::Busy,
            format!("Processing {}", Self::method_label(request.method)),
        );

        // Card-network round trip. Cancellation lands in the history entry
        // while this sleeps.
        tokio::time::sleep(self.delay).await;

        let result = {
            let mut history = self.lock_history();
            // Entry inserted above and never removed; the map survives for
            // the terminal's lifetime.
            let transaction = history
                .get_mut(&transaction_id)
                .ok_or_else(|| PeripheralError::TransactionNotFound {
                    id: transaction_id.clone(),
                })?;

            if transaction.status == TransactionStatus::Cancelled {
                transaction.finish(TransactionStatus::Cancelled, None);
            } else if self.declines(&transaction_id) {
                transaction.finish(TransactionStatus::Declined, None);
            } else {
                let auth = format!("AUT{}", &transaction_id[..8].to_uppercase());
                transaction.finish(TransactionStatus::Approved, Some(auth));
            }
            PaymentResult::from_transaction(transaction)
        };

        info!(
            id = %self.id,
            transaction = %transaction_id,
            approved = result.success,
            "payment settled"
        );
        self.status.transition(DeviceStatus::Online, "Idle");
        Ok(result)
    }

    async fn cancel_transaction(&self, transaction_id: &str) -> Result<()> {
        let mut history = self.lock_history();
        let transaction = history.get_mut(transaction_id).ok_or_else(|| {
            PeripheralError::TransactionNotFound {
                id: transaction_id.to_string(),
            }
        })?;

        if transaction.status == TransactionStatus::Processing {
            transaction.status = TransactionStatus::Cancelled;
            info!(id = %self.id, transaction = %transaction_id, "cancellation requested");
        }
        Ok(())
    }

    fn transaction(&self, transaction_id: &str) -> Option<Transaction> {
        self.lock_history().get(transaction_id).cloned()
    }

    fn receipt_for(&self, transaction_id: &str) -> Result<Receipt> {
        let transaction = self.transaction(transaction_id).ok_or_else(|| {
            PeripheralError::TransactionNotFound {
                id: transaction_id.to_string(),
            }
        })?;

        let status_line = match transaction.status {
            TransactionStatus::Approved => "TRANSACAO APROVADA",
            TransactionStatus::Declined => "TRANSACAO NEGADA",
            TransactionStatus::Cancelled => "TRANSACAO CANCELADA",
            TransactionStatus::Processing | TransactionStatus::Error => "TRANSACAO PENDENTE",
        };

        let mut items = vec![
            ContentItem::centered("COMPROVANTE DE PAGAMENTO", TextStyle::bold()),
            ContentItem::Line {
                style: LineStyle::Dashed,
            },
            ContentItem::text(format!(
                "{}  {}",
                Self::method_label(transaction.method),
                Self::format_amount(transaction.amount)
            )),
        ];
        if transaction.installments > 1 {
            items.push(ContentItem::text(format!(
                "{}x de {}",
                transaction.installments,
                Self::format_amount(transaction.amount / i64::from(transaction.installments)),
            )));
        }
        if let Some(auth) = &transaction.authorization_code {
            items.push(ContentItem::text(format!("AUT: {auth}")));
        }
        items.push(ContentItem::Text {
            value: status_line.to_string(),
            align: Alignment::Center,
            style: TextStyle::bold(),
        });

        Ok(Receipt::new(self.id.clone(), vec![Section::new(items)]))
    }
}
