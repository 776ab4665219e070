use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::lock::LockError;
use crate::ports::RepositoryError;
use crate::validation::ValidationError;

/// Every failure the service can surface. Business-validation kinds are
/// terminal for the attempted mutation and leave no partial state; the
/// HTTP layer records a Failed ledger entry for them after the locked
/// region has exited.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("user not found")]
    UserNotFound,

    #[error("account not found")]
    AccountNotFound,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("user does not own the account")]
    UserAccountMismatch,

    #[error("account is already unregistered")]
    AccountAlreadyUnregistered,

    #[error("amount exceeds account balance")]
    AmountExceedsBalance,

    #[error("transaction does not belong to the account")]
    TransactionAccountMismatch,

    #[error("cancel amount must match the original transaction in full")]
    CancelMustBeFull,

    #[error("transaction is older than the cancellation window")]
    TooOldToCancel,

    #[error("could not acquire lock for account {0}")]
    LockAcquisitionFailed(String),

    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl AppError {
    /// Stable machine-readable code for the wire.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::AccountNotFound => "ACCOUNT_NOT_FOUND",
            AppError::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            AppError::UserAccountMismatch => "USER_ACCOUNT_MISMATCH",
            AppError::AccountAlreadyUnregistered => "ACCOUNT_ALREADY_UNREGISTERED",
            AppError::AmountExceedsBalance => "AMOUNT_EXCEED_BALANCE",
            AppError::TransactionAccountMismatch => "TRANSACTION_ACCOUNT_MISMATCH",
            AppError::CancelMustBeFull => "CANCEL_MUST_BE_FULL",
            AppError::TooOldToCancel => "TOO_OLD_TO_CANCEL",
            AppError::LockAcquisitionFailed(_) => "LOCK_ACQUISITION_FAILED",
            AppError::Validation(_) => "INVALID_REQUEST",
            AppError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Business-validation failures: the attempt was understood and
    /// rejected, so the caller records a Failed ledger entry for it.
    pub fn is_business(&self) -> bool {
        matches!(
            self,
            AppError::UserNotFound
                | AppError::AccountNotFound
                | AppError::TransactionNotFound
                | AppError::UserAccountMismatch
                | AppError::AccountAlreadyUnregistered
                | AppError::AmountExceedsBalance
                | AppError::TransactionAccountMismatch
                | AppError::CancelMustBeFull
                | AppError::TooOldToCancel
        )
    }

    /// Transient failures worth retrying from the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::LockAcquisitionFailed(_))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UserNotFound
            | AppError::AccountNotFound
            | AppError::TransactionNotFound => StatusCode::NOT_FOUND,
            AppError::UserAccountMismatch
            | AppError::AccountAlreadyUnregistered
            | AppError::AmountExceedsBalance
            | AppError::TransactionAccountMismatch
            | AppError::CancelMustBeFull
            | AppError::TooOldToCancel
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::LockAcquisitionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LockError> for AppError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::Timeout(key) => AppError::LockAcquisitionFailed(key),
            // A broken lock backend means exclusion cannot be guaranteed;
            // fail the operation before any state is touched.
            LockError::Backend(detail) => AppError::LockAcquisitionFailed(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "code": self.code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
