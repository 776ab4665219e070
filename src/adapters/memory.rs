//! In-memory implementation of the storage ports. Backs the test suite and
//! local runs that don't need Postgres; `append_with_balance` holds the
//! single write guard across both writes, so the atomicity contract matches
//! the Postgres adapter's.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Account, Owner, TransactionRecord};
use crate::ports::{AccountDirectory, Ledger, RepositoryResult};

#[derive(Default)]
struct State {
    owners: HashMap<Uuid, Owner>,
    /// Keyed by account number, the unique external identifier.
    accounts: HashMap<String, Account>,
    entries: Vec<TransactionRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an owner record. Account creation workflows live outside this
    /// service, so tests and local runs insert their fixtures directly.
    pub async fn insert_owner(&self, owner: Owner) {
        self.state.write().await.owners.insert(owner.id, owner);
    }

    /// Every ledger entry appended so far, oldest first.
    pub async fn entries(&self) -> Vec<TransactionRecord> {
        self.state.read().await.entries.clone()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryStore {
    async fn find_owner(&self, id: Uuid) -> RepositoryResult<Option<Owner>> {
        Ok(self.state.read().await.owners.get(&id).cloned())
    }

    async fn find_account_by_number(&self, number: &str) -> RepositoryResult<Option<Account>> {
        Ok(self.state.read().await.accounts.get(number).cloned())
    }

    async fn save(&self, account: &Account) -> RepositoryResult<Account> {
        self.state
            .write()
            .await
            .accounts
            .insert(account.account_number.clone(), account.clone());
        Ok(account.clone())
    }
}

#[async_trait]
impl Ledger for InMemoryStore {
    async fn append(&self, entry: &TransactionRecord) -> RepositoryResult<TransactionRecord> {
        self.state.write().await.entries.push(entry.clone());
        Ok(entry.clone())
    }

    async fn append_with_balance(
        &self,
        account: &Account,
        entry: &TransactionRecord,
    ) -> RepositoryResult<TransactionRecord> {
        let mut state = self.state.write().await;
        state
            .accounts
            .insert(account.account_number.clone(), account.clone());
        state.entries.push(entry.clone());
        Ok(entry.clone())
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> RepositoryResult<Option<TransactionRecord>> {
        Ok(self
            .state
            .read()
            .await
            .entries
            .iter()
            .find(|entry| entry.transaction_id == transaction_id)
            .cloned())
    }
}
