//! Collaborator ports consumed by the transaction service.
//!
//! The service only ever talks to storage, time, and id generation through
//! these traits; `adapters` provides the Postgres and in-memory
//! implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Account, Owner, TransactionRecord};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage error: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Owner and account records. Owns all `(balance, status)` state; the
/// service reads a snapshot, computes a new one, and saves it back while
/// holding the account's lock.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_owner(&self, id: Uuid) -> RepositoryResult<Option<Owner>>;

    async fn find_account_by_number(&self, number: &str) -> RepositoryResult<Option<Account>>;

    async fn save(&self, account: &Account) -> RepositoryResult<Account>;
}

/// Append-only transaction history.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Append an entry without touching any account. Used for Failed
    /// entries, which record the unchanged balance.
    async fn append(&self, entry: &TransactionRecord) -> RepositoryResult<TransactionRecord>;

    /// Persist the account's new balance and append the entry as a single
    /// storage transaction, so a mid-operation crash cannot leave one
    /// without the other.
    async fn append_with_balance(
        &self,
        account: &Account,
        entry: &TransactionRecord,
    ) -> RepositoryResult<TransactionRecord>;

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> RepositoryResult<Option<TransactionRecord>>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Source of globally unique transaction ids.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// UUIDv4 in simple form: 32 lowercase hex characters, no separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}
