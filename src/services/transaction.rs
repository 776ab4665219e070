//! The balance-mutation engine.
//!
//! `use_balance` and `cancel_balance` must run while the account's lock is
//! held (the handlers wrap them in `with_lock`); the failure recorders run
//! after the locked region has exited, and the query path needs no lock at
//! all. Every method validates first and mutates nothing until the whole
//! chain has passed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Account, TransactionRecord, TransactionResult, TransactionType};
use crate::error::AppError;
use crate::ports::{AccountDirectory, Clock, IdGenerator, Ledger};

/// A Use transaction older than this can no longer be canceled.
const CANCEL_WINDOW_DAYS: i64 = 365;

/// What the caller gets back for any transaction operation.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionDto {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub result: TransactionResult,
    pub transaction_id: String,
    pub amount: i64,
    pub balance_snapshot: i64,
    pub transacted_at: DateTime<Utc>,
}

impl TransactionDto {
    fn from_record(record: &TransactionRecord) -> Self {
        Self {
            account_number: record.account_number.clone(),
            transaction_type: record.transaction_type,
            result: record.result,
            transaction_id: record.transaction_id.clone(),
            amount: record.amount,
            balance_snapshot: record.balance_snapshot,
            transacted_at: record.transacted_at,
        }
    }
}

#[derive(Clone)]
pub struct TransactionService {
    directory: Arc<dyn AccountDirectory>,
    ledger: Arc<dyn Ledger>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl TransactionService {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        ledger: Arc<dyn Ledger>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            directory,
            ledger,
            clock,
            ids,
        }
    }

    /// Deduct `amount` from the account's balance and record the entry.
    /// Must be called with the account's lock held.
    pub async fn use_balance(
        &self,
        owner_id: Uuid,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionDto, AppError> {
        let owner = self
            .directory
            .find_owner(owner_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        let account = self
            .directory
            .find_account_by_number(account_number)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if account.owner_id != owner.id {
            return Err(AppError::UserAccountMismatch);
        }
        if !account.is_in_use() {
            return Err(AppError::AccountAlreadyUnregistered);
        }
        if account.balance < amount {
            return Err(AppError::AmountExceedsBalance);
        }

        let updated = account.debited(amount);
        let entry = self.new_entry(
            &updated,
            TransactionType::Use,
            TransactionResult::Success,
            amount,
        );
        let saved = self.ledger.append_with_balance(&updated, &entry).await?;

        tracing::info!(
            account = account_number,
            amount,
            balance = updated.balance,
            transaction_id = %saved.transaction_id,
            "balance used"
        );

        Ok(TransactionDto::from_record(&saved))
    }

    /// Reverse a prior Use in full and record the entry. Must be called
    /// with the account's lock held. The original Use entry is left
    /// untouched; the ledger stays append-only.
    pub async fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: i64,
    ) -> Result<TransactionDto, AppError> {
        let original = self
            .ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;
        let account = self
            .directory
            .find_account_by_number(account_number)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        if original.account_id != account.id {
            return Err(AppError::TransactionAccountMismatch);
        }
        if !account.is_in_use() {
            return Err(AppError::AccountAlreadyUnregistered);
        }
        if original.amount != amount {
            return Err(AppError::CancelMustBeFull);
        }
        let cutoff = self.clock.now() - chrono::Duration::days(CANCEL_WINDOW_DAYS);
        if original.transacted_at < cutoff {
            return Err(AppError::TooOldToCancel);
        }

        let updated = account.credited(amount);
        let entry = self.new_entry(
            &updated,
            TransactionType::Cancel,
            TransactionResult::Success,
            amount,
        );
        let saved = self.ledger.append_with_balance(&updated, &entry).await?;

        tracing::info!(
            account = account_number,
            amount,
            balance = updated.balance,
            canceled = transaction_id,
            transaction_id = %saved.transaction_id,
            "balance use canceled"
        );

        Ok(TransactionDto::from_record(&saved))
    }

    /// Record a Use attempt that was rejected by business validation.
    /// Runs outside the account lock; the snapshot is the balance as read
    /// here, which the audit trail accepts as possibly stale.
    pub async fn save_failed_use(&self, account_number: &str, amount: i64) -> Result<(), AppError> {
        self.save_failed(account_number, amount, TransactionType::Use)
            .await
    }

    /// Record a Cancel attempt that was rejected by business validation.
    pub async fn save_failed_cancel(
        &self,
        account_number: &str,
        amount: i64,
    ) -> Result<(), AppError> {
        self.save_failed(account_number, amount, TransactionType::Cancel)
            .await
    }

    async fn save_failed(
        &self,
        account_number: &str,
        amount: i64,
        transaction_type: TransactionType,
    ) -> Result<(), AppError> {
        let account = self
            .directory
            .find_account_by_number(account_number)
            .await?
            .ok_or(AppError::AccountNotFound)?;

        let entry = self.new_entry(&account, transaction_type, TransactionResult::Failed, amount);
        let saved = self.ledger.append(&entry).await?;

        tracing::info!(
            account = account_number,
            amount,
            kind = transaction_type.as_str(),
            transaction_id = %saved.transaction_id,
            "failed transaction recorded"
        );

        Ok(())
    }

    /// Look up a ledger entry. Read-only; committed entries are immutable,
    /// so no lock is needed.
    pub async fn query_transaction(&self, transaction_id: &str) -> Result<TransactionDto, AppError> {
        let record = self
            .ledger
            .find_by_transaction_id(transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound)?;

        Ok(TransactionDto::from_record(&record))
    }

    /// Shared entry constructor: fresh id and timestamp for every entry,
    /// snapshot taken from the account as passed in.
    fn new_entry(
        &self,
        account: &Account,
        transaction_type: TransactionType,
        result: TransactionResult,
        amount: i64,
    ) -> TransactionRecord {
        TransactionRecord {
            id: Uuid::new_v4(),
            transaction_id: self.ids.new_id(),
            account_id: account.id,
            account_number: account.account_number.clone(),
            transaction_type,
            result,
            amount,
            balance_snapshot: account.balance,
            transacted_at: self.clock.now(),
        }
    }
}
