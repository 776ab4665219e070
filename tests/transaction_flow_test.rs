//! Engine-level flows over the in-memory store: validation order, balance
//! arithmetic, failure records, and ledger immutability properties.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use ledger_core::adapters::InMemoryStore;
use ledger_core::domain::{
    Account, AccountStatus, Owner, TransactionRecord, TransactionResult, TransactionType,
};
use ledger_core::error::AppError;
use ledger_core::ports::{AccountDirectory, Ledger, SystemClock, UuidIdGenerator};
use ledger_core::services::TransactionService;

struct Fixture {
    store: InMemoryStore,
    service: TransactionService,
    owner_id: Uuid,
}

const ACCOUNT: &str = "1000000001";

async fn fixture(balance: i64) -> Fixture {
    let store = InMemoryStore::new();
    let owner = Owner {
        id: Uuid::new_v4(),
        name: "pobi".to_string(),
        created_at: Utc::now(),
    };
    let owner_id = owner.id;
    store.insert_owner(owner).await;
    store
        .save(&Account {
            id: Uuid::new_v4(),
            owner_id,
            account_number: ACCOUNT.to_string(),
            status: AccountStatus::InUse,
            balance,
            registered_at: Utc::now(),
            unregistered_at: None,
        })
        .await
        .unwrap();

    let service = TransactionService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(SystemClock),
        Arc::new(UuidIdGenerator),
    );

    Fixture {
        store,
        service,
        owner_id,
    }
}

async fn balance_of(store: &InMemoryStore, number: &str) -> i64 {
    store
        .find_account_by_number(number)
        .await
        .unwrap()
        .unwrap()
        .balance
}

#[tokio::test]
async fn use_balance_deducts_and_records_entry() {
    // Scenario A: balance 10000, use 200 -> 9800.
    let fx = fixture(10_000).await;

    let dto = fx.service.use_balance(fx.owner_id, ACCOUNT, 200).await.unwrap();

    assert_eq!(dto.account_number, ACCOUNT);
    assert_eq!(dto.transaction_type, TransactionType::Use);
    assert_eq!(dto.result, TransactionResult::Success);
    assert_eq!(dto.amount, 200);
    assert_eq!(dto.balance_snapshot, 9_800);
    assert_eq!(dto.transaction_id.len(), 32);

    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 9_800);

    let entries = fx.store.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].balance_snapshot, 9_800);
}

#[tokio::test]
async fn use_balance_rejects_amount_exceeding_balance() {
    // Scenario B: balance 1000, use 100000 -> AmountExceedsBalance, no entry.
    let fx = fixture(1_000).await;

    let err = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 100_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AmountExceedsBalance));
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 1_000);
    assert!(fx.store.entries().await.is_empty());
}

#[tokio::test]
async fn use_balance_validation_order() {
    let fx = fixture(1_000).await;

    let err = fx
        .service
        .use_balance(Uuid::new_v4(), ACCOUNT, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UserNotFound));

    let err = fx
        .service
        .use_balance(fx.owner_id, "9999999999", 100)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound));

    // Second owner who does not hold the account.
    let stranger = Owner {
        id: Uuid::new_v4(),
        name: "stranger".to_string(),
        created_at: Utc::now(),
    };
    let stranger_id = stranger.id;
    fx.store.insert_owner(stranger).await;
    let err = fx
        .service
        .use_balance(stranger_id, ACCOUNT, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UserAccountMismatch));
}

#[tokio::test]
async fn use_balance_rejects_unregistered_account() {
    let fx = fixture(0).await;
    let account = fx
        .store
        .find_account_by_number(ACCOUNT)
        .await
        .unwrap()
        .unwrap();
    fx.store
        .save(&Account {
            status: AccountStatus::Unregistered,
            unregistered_at: Some(Utc::now()),
            ..account
        })
        .await
        .unwrap();

    let err = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 100)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountAlreadyUnregistered));
}

#[tokio::test]
async fn cancel_restores_balance_in_full() {
    // Scenario C: balance 10000 after a 2000 use; cancel -> 12000.
    let fx = fixture(12_000).await;
    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 2_000)
        .await
        .unwrap();
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 10_000);

    let dto = fx
        .service
        .cancel_balance(&used.transaction_id, ACCOUNT, 2_000)
        .await
        .unwrap();

    assert_eq!(dto.transaction_type, TransactionType::Cancel);
    assert_eq!(dto.result, TransactionResult::Success);
    assert_eq!(dto.balance_snapshot, 12_000);
    // A cancel entry never reuses the use entry's id.
    assert_ne!(dto.transaction_id, used.transaction_id);
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 12_000);
}

#[tokio::test]
async fn cancel_rejects_partial_amount() {
    // Scenario D: cancel 1000 of a 2000 use -> CancelMustBeFull.
    let fx = fixture(10_000).await;
    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 2_000)
        .await
        .unwrap();

    let err = fx
        .service
        .cancel_balance(&used.transaction_id, ACCOUNT, 1_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::CancelMustBeFull));
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 8_000);
}

#[tokio::test]
async fn cancel_rejects_transaction_older_than_one_year() {
    let fx = fixture(10_000).await;
    let account = fx
        .store
        .find_account_by_number(ACCOUNT)
        .await
        .unwrap()
        .unwrap();

    // Seed an old successful use directly in the ledger.
    let old = TransactionRecord {
        id: Uuid::new_v4(),
        transaction_id: "ab".repeat(16),
        account_id: account.id,
        account_number: ACCOUNT.to_string(),
        transaction_type: TransactionType::Use,
        result: TransactionResult::Success,
        amount: 500,
        balance_snapshot: 9_500,
        transacted_at: Utc::now() - Duration::days(366),
    };
    fx.store.append(&old).await.unwrap();

    let err = fx
        .service
        .cancel_balance(&old.transaction_id, ACCOUNT, 500)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TooOldToCancel));
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 10_000);
}

#[tokio::test]
async fn cancel_rejects_unregistered_account() {
    let fx = fixture(10_000).await;
    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 2_000)
        .await
        .unwrap();

    let account = fx
        .store
        .find_account_by_number(ACCOUNT)
        .await
        .unwrap()
        .unwrap();
    fx.store
        .save(&Account {
            status: AccountStatus::Unregistered,
            unregistered_at: Some(Utc::now()),
            ..account
        })
        .await
        .unwrap();

    let err = fx
        .service
        .cancel_balance(&used.transaction_id, ACCOUNT, 2_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccountAlreadyUnregistered));
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 8_000);
}

#[tokio::test]
async fn cancel_rejects_unknown_account() {
    let fx = fixture(10_000).await;
    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 2_000)
        .await
        .unwrap();

    // The transaction exists, so the account lookup is what fails.
    let err = fx
        .service
        .cancel_balance(&used.transaction_id, "9999999999", 2_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccountNotFound));
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 8_000);
}

#[tokio::test]
async fn cancel_rejects_foreign_account() {
    let fx = fixture(10_000).await;
    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 2_000)
        .await
        .unwrap();

    // A second account under the same owner.
    fx.store
        .save(&Account {
            id: Uuid::new_v4(),
            owner_id: fx.owner_id,
            account_number: "1000000002".to_string(),
            status: AccountStatus::InUse,
            balance: 500,
            registered_at: Utc::now(),
            unregistered_at: None,
        })
        .await
        .unwrap();

    let err = fx
        .service
        .cancel_balance(&used.transaction_id, "1000000002", 2_000)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionAccountMismatch));
    assert_eq!(balance_of(&fx.store, "1000000002").await, 500);
}

#[tokio::test]
async fn cancel_rejects_unknown_transaction() {
    let fx = fixture(10_000).await;

    let err = fx
        .service
        .cancel_balance(&"cd".repeat(16), ACCOUNT, 100)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TransactionNotFound));
}

#[tokio::test]
async fn failed_use_is_recorded_with_unchanged_snapshot() {
    let fx = fixture(1_000).await;

    fx.service.save_failed_use(ACCOUNT, 100_000).await.unwrap();

    let entries = fx.store.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transaction_type, TransactionType::Use);
    assert_eq!(entries[0].result, TransactionResult::Failed);
    assert_eq!(entries[0].amount, 100_000);
    assert_eq!(entries[0].balance_snapshot, 1_000);
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 1_000);
}

#[tokio::test]
async fn failed_cancel_requires_existing_account() {
    let fx = fixture(1_000).await;

    let err = fx
        .service
        .save_failed_cancel("9999999999", 100)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AccountNotFound));
    assert!(fx.store.entries().await.is_empty());
}

#[tokio::test]
async fn query_returns_entry_or_not_found() {
    let fx = fixture(10_000).await;
    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 300)
        .await
        .unwrap();

    let found = fx
        .service
        .query_transaction(&used.transaction_id)
        .await
        .unwrap();
    assert_eq!(found.amount, 300);
    assert_eq!(found.transaction_type, TransactionType::Use);

    let err = fx
        .service
        .query_transaction(&"ef".repeat(16))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TransactionNotFound));
}

#[tokio::test]
async fn transaction_ids_are_unique_across_all_entries() {
    let fx = fixture(10_000).await;

    let used = fx
        .service
        .use_balance(fx.owner_id, ACCOUNT, 500)
        .await
        .unwrap();
    fx.service
        .cancel_balance(&used.transaction_id, ACCOUNT, 500)
        .await
        .unwrap();
    fx.service.save_failed_use(ACCOUNT, 100_000).await.unwrap();
    fx.service.save_failed_cancel(ACCOUNT, 77).await.unwrap();

    let entries = fx.store.entries().await;
    assert_eq!(entries.len(), 4);

    let mut ids: Vec<&str> = entries.iter().map(|e| e.transaction_id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn balance_never_goes_negative_and_conserves() {
    let fx = fixture(1_000).await;

    // Drain in steps, over-drawing along the way.
    for amount in [400, 400, 400, 200] {
        let result = fx.service.use_balance(fx.owner_id, ACCOUNT, amount).await;
        if let Err(err) = result {
            assert!(matches!(err, AppError::AmountExceedsBalance));
        }
        assert!(balance_of(&fx.store, ACCOUNT).await >= 0);
    }

    // initial - successful uses: 1000 - 400 - 400 - 200 (third 400 rejected)
    assert_eq!(balance_of(&fx.store, ACCOUNT).await, 0);
}
