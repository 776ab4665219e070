//! Postgres implementation of the AccountDirectory and Ledger ports.
//! One struct over one pool: both ports write the same database, and the
//! success path commits the balance update and the ledger append in a
//! single transaction.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{
    Account, AccountStatus, Owner, TransactionRecord, TransactionResult, TransactionType,
};
use crate::ports::{AccountDirectory, Ledger, RepositoryError, RepositoryResult};

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
}

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountDirectory for PostgresStore {
    async fn find_owner(&self, id: Uuid) -> RepositoryResult<Option<Owner>> {
        let row = sqlx::query_as::<_, OwnerRow>(
            "SELECT id, name, created_at FROM owners WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OwnerRow::into_domain))
    }

    async fn find_account_by_number(&self, number: &str) -> RepositoryResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, owner_id, account_number, status, balance,
                   registered_at, unregistered_at
            FROM accounts WHERE account_number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AccountRow::into_domain).transpose()
    }

    async fn save(&self, account: &Account) -> RepositoryResult<Account> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            INSERT INTO accounts (
                id, owner_id, account_number, status, balance,
                registered_at, unregistered_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE
                SET status = EXCLUDED.status,
                    balance = EXCLUDED.balance,
                    unregistered_at = EXCLUDED.unregistered_at
            RETURNING id, owner_id, account_number, status, balance,
                      registered_at, unregistered_at
            "#,
        )
        .bind(account.id)
        .bind(account.owner_id)
        .bind(&account.account_number)
        .bind(account.status.as_str())
        .bind(account.balance)
        .bind(account.registered_at)
        .bind(account.unregistered_at)
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }
}

#[async_trait]
impl Ledger for PostgresStore {
    async fn append(&self, entry: &TransactionRecord) -> RepositoryResult<TransactionRecord> {
        let row = insert_entry(&self.pool, entry).await?;
        row.into_domain()
    }

    async fn append_with_balance(
        &self,
        account: &Account,
        entry: &TransactionRecord,
    ) -> RepositoryResult<TransactionRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE accounts
            SET balance = $1, status = $2, unregistered_at = $3
            WHERE id = $4
            "#,
        )
        .bind(account.balance)
        .bind(account.status.as_str())
        .bind(account.unregistered_at)
        .bind(account.id)
        .execute(&mut *tx)
        .await?;

        let row = insert_entry(&mut *tx, entry).await?;

        tx.commit().await?;
        row.into_domain()
    }

    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> RepositoryResult<Option<TransactionRecord>> {
        let row = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, transaction_id, account_id, account_number,
                   transaction_type, result, amount, balance_snapshot, transacted_at
            FROM transactions WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TransactionRow::into_domain).transpose()
    }
}

async fn insert_entry<'e, E>(executor: E, entry: &TransactionRecord) -> Result<TransactionRow, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_as::<_, TransactionRow>(
        r#"
        INSERT INTO transactions (
            id, transaction_id, account_id, account_number,
            transaction_type, result, amount, balance_snapshot, transacted_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, transaction_id, account_id, account_number,
                  transaction_type, result, amount, balance_snapshot, transacted_at
        "#,
    )
    .bind(entry.id)
    .bind(&entry.transaction_id)
    .bind(entry.account_id)
    .bind(&entry.account_number)
    .bind(entry.transaction_type.as_str())
    .bind(entry.result.as_str())
    .bind(entry.amount)
    .bind(entry.balance_snapshot)
    .bind(entry.transacted_at)
    .fetch_one(executor)
    .await
}

// Internal row types; never exposed outside the adapter.

#[derive(Debug, sqlx::FromRow)]
struct OwnerRow {
    id: Uuid,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl OwnerRow {
    fn into_domain(self) -> Owner {
        Owner {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    owner_id: Uuid,
    account_number: String,
    status: String,
    balance: i64,
    registered_at: chrono::DateTime<chrono::Utc>,
    unregistered_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AccountRow {
    fn into_domain(self) -> RepositoryResult<Account> {
        let status = AccountStatus::parse(&self.status).ok_or_else(|| {
            RepositoryError::Backend(format!("unknown account status: {}", self.status))
        })?;

        Ok(Account {
            id: self.id,
            owner_id: self.owner_id,
            account_number: self.account_number,
            status,
            balance: self.balance,
            registered_at: self.registered_at,
            unregistered_at: self.unregistered_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    transaction_id: String,
    account_id: Uuid,
    account_number: String,
    transaction_type: String,
    result: String,
    amount: i64,
    balance_snapshot: i64,
    transacted_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<TransactionRecord> {
        let transaction_type = TransactionType::parse(&self.transaction_type).ok_or_else(|| {
            RepositoryError::Backend(format!(
                "unknown transaction type: {}",
                self.transaction_type
            ))
        })?;
        let result = TransactionResult::parse(&self.result).ok_or_else(|| {
            RepositoryError::Backend(format!("unknown transaction result: {}", self.result))
        })?;

        Ok(TransactionRecord {
            id: self.id,
            transaction_id: self.transaction_id,
            account_id: self.account_id,
            account_number: self.account_number,
            transaction_type,
            result,
            amount: self.amount,
            balance_snapshot: self.balance_snapshot,
            transacted_at: self.transacted_at,
        })
    }
}
