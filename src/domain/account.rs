//! Account and owner domain entities.
//! Plain value snapshots; balance mutation lives in the transaction service,
//! which computes a new snapshot and persists it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered owner of one or more accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an account. `InUse` is set at creation; `Unregistered`
/// is terminal and only ever entered with a zero balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    InUse,
    Unregistered,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::InUse => "IN_USE",
            AccountStatus::Unregistered => "UNREGISTERED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_USE" => Some(AccountStatus::InUse),
            "UNREGISTERED" => Some(AccountStatus::Unregistered),
            _ => None,
        }
    }
}

/// Snapshot of a monetary account. `balance` is in the smallest currency
/// unit and is never negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Unique, fixed-length numeric string; also the lock key.
    pub account_number: String,
    pub status: AccountStatus,
    pub balance: i64,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_in_use(&self) -> bool {
        self.status == AccountStatus::InUse
    }

    /// Snapshot with `amount` taken off the balance. Callers validate
    /// `amount <= balance` first.
    pub fn debited(&self, amount: i64) -> Account {
        Account {
            balance: self.balance - amount,
            ..self.clone()
        }
    }

    /// Snapshot with `amount` added back to the balance.
    pub fn credited(&self, amount: i64) -> Account {
        Account {
            balance: self.balance + amount,
            ..self.clone()
        }
    }
}
