//! Payment transaction model for card terminals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Payment method requested from a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Credit,
    Debit,
    Pix,
}

/// Outcome state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Processing,
    Approved,
    Declined,
    Cancelled,
    Error,
}

impl TransactionStatus {
    /// Whether the transaction has reached a final state.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// A payment request handed to a terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub method: PaymentMethod,

    /// Amount in cents.
    pub amount: i64,

    /// Number of installments (credit only, 1 = spot).
    #[serde(default = "default_installments")]
    pub installments: u8,
}

fn default_installments() -> u8 {
    1
}

impl PaymentRequest {
    pub fn new(method: PaymentMethod, amount: i64) -> Self {
        Self {
            method,
            amount,
            installments: 1,
        }
    }

    pub fn with_installments(mut self, installments: u8) -> Self {
        self.installments = installments;
        self
    }
}

/// A payment transaction, from start to settlement.
///
/// At most one transaction may be open per terminal instance; the terminal
/// driver enforces this with a lock, not by convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub method: PaymentMethod,

    /// Amount in cents.
    pub amount: i64,
    pub installments: u8,
    pub status: TransactionStatus,

    /// Issuer authorization code, present once approved.
    pub authorization_code: Option<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Start a new transaction in the `Processing` state.
    pub fn start(request: &PaymentRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: request.method,
            amount: request.amount,
            installments: request.installments,
            status: TransactionStatus::Processing,
            authorization_code: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Settle the transaction into a final state.
    pub fn finish(&mut self, status: TransactionStatus, authorization_code: Option<String>) {
        self.status = status;
        self.authorization_code = authorization_code;
        self.finished_at = Some(Utc::now());
    }
}

/// Result surface returned to collaborators from `process_payment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub message: String,
    pub transaction_id: String,

    /// Structured extras (authorization code, decline reason, ...).
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl PaymentResult {
    /// Build a result from a settled transaction.
    pub fn from_transaction(transaction: &Transaction) -> Self {
        let mut details = BTreeMap::new();
        if let Some(code) = &transaction.authorization_code {
            details.insert("authorization_code".to_string(), code.clone());
        }
        details.insert("status".to_string(), format!("{:?}", transaction.status));

        let (success, message) = match transaction.status {
            TransactionStatus::Approved => (true, "Transaction approved".to_string()),
            TransactionStatus::Declined => (false, "Transaction declined".to_string()),
            TransactionStatus::Cancelled => (false, "Transaction cancelled".to_string()),
            TransactionStatus::Error => (false, "Transaction failed".to_string()),
            TransactionStatus::Processing => (false, "Transaction still processing".to_string()),
        };

        Self {
            success,
            message,
            transaction_id: transaction.id.clone(),
            details,
        }
    }
}
