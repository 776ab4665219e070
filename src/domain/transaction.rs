//! Ledger entry domain entity.
//! Entries are append-only: once written they are never updated or deleted,
//! and every entry gets a freshly generated `transaction_id`, Failed and
//! Cancel entries included.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Use,
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Use => "USE",
            TransactionType::Cancel => "CANCEL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "USE" => Some(TransactionType::Use),
            "CANCEL" => Some(TransactionType::Cancel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResult {
    Success,
    Failed,
}

impl TransactionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionResult::Success => "SUCCESS",
            TransactionResult::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SUCCESS" => Some(TransactionResult::Success),
            "FAILED" => Some(TransactionResult::Failed),
            _ => None,
        }
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    /// Opaque 32-lowercase-hex token, unique across all entries.
    pub transaction_id: String,
    pub account_id: Uuid,
    /// Denormalized so results can be reported without another lookup.
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub result: TransactionResult,
    pub amount: i64,
    /// Account balance after the operation; for Failed entries, the
    /// unchanged balance at the time the failure was recorded.
    pub balance_snapshot: i64,
    pub transacted_at: DateTime<Utc>,
}
