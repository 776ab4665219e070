//! Transaction endpoints.
//!
//! The handler is the "caller" of the engine: it validates request shape,
//! wraps the mutation in the account lock, and once the locked region has
//! exited it records a Failed ledger entry for business rejections before
//! surfacing them. Lock and storage failures are surfaced without a failure
//! record; there is nothing meaningful to audit for them.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::domain::{TransactionResult, TransactionType};
use crate::error::AppError;
use crate::lock::with_lock;
use crate::services::TransactionDto;
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct UseBalanceRequest {
    pub owner_id: Uuid,
    pub account_number: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct CancelBalanceRequest {
    pub transaction_id: String,
    pub account_number: String,
    pub amount: i64,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub account_number: String,
    pub result: TransactionResult,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

impl From<TransactionDto> for TransactionResponse {
    fn from(dto: TransactionDto) -> Self {
        Self {
            account_number: dto.account_number,
            result: dto.result,
            transaction_id: dto.transaction_id,
            amount: dto.amount,
            transacted_at: dto.transacted_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryTransactionResponse {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub result: TransactionResult,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

pub async fn use_balance(
    State(state): State<AppState>,
    Json(req): Json<UseBalanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_account_number(&req.account_number)?;
    validation::validate_use_amount(req.amount)?;

    let service = &state.transactions;
    let outcome = with_lock(
        state.locks.as_ref(),
        &req.account_number,
        state.lock_wait,
        || async { service.use_balance(req.owner_id, &req.account_number, req.amount).await },
    )
    .await;

    match outcome {
        Ok(dto) => Ok(Json(TransactionResponse::from(dto))),
        Err(err) if err.is_business() => {
            tracing::error!(
                account = %req.account_number,
                code = err.code(),
                "failed to use balance"
            );
            record_failure(&state, TransactionType::Use, &req.account_number, req.amount).await;
            Err(err)
        }
        Err(err) => Err(err),
    }
}

pub async fn cancel_balance(
    State(state): State<AppState>,
    Json(req): Json<CancelBalanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_account_number(&req.account_number)?;
    validation::validate_transaction_id(&req.transaction_id)?;
    validation::validate_positive_amount(req.amount)?;

    let service = &state.transactions;
    let outcome = with_lock(
        state.locks.as_ref(),
        &req.account_number,
        state.lock_wait,
        || async {
            service
                .cancel_balance(&req.transaction_id, &req.account_number, req.amount)
                .await
        },
    )
    .await;

    match outcome {
        Ok(dto) => Ok(Json(TransactionResponse::from(dto))),
        Err(err) if err.is_business() => {
            tracing::error!(
                account = %req.account_number,
                code = err.code(),
                "failed to cancel balance"
            );
            record_failure(
                &state,
                TransactionType::Cancel,
                &req.account_number,
                req.amount,
            )
            .await;
            Err(err)
        }
        Err(err) => Err(err),
    }
}

pub async fn query_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let dto = state.transactions.query_transaction(&transaction_id).await?;

    Ok(Json(QueryTransactionResponse {
        account_number: dto.account_number,
        transaction_type: dto.transaction_type,
        result: dto.result,
        transaction_id: dto.transaction_id,
        amount: dto.amount,
        transacted_at: dto.transacted_at,
    }))
}

/// Best-effort failure record, written outside the lock. A record that
/// cannot be written (account gone, storage down) is logged and dropped;
/// the original business error is what the caller sees either way.
async fn record_failure(state: &AppState, kind: TransactionType, account_number: &str, amount: i64) {
    let recorded = match kind {
        TransactionType::Use => state.transactions.save_failed_use(account_number, amount).await,
        TransactionType::Cancel => {
            state
                .transactions
                .save_failed_cancel(account_number, amount)
                .await
        }
    };

    if let Err(err) = recorded {
        tracing::error!(
            account = account_number,
            error = %err,
            "could not record failed transaction"
        );
    }
}
