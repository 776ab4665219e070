//! Mutual exclusion for balance mutations.
//!
//! One lock per account number, shared by every service instance through the
//! lock store. Call sites wrap the critical section in [`with_lock`], which
//! releases on every exit path. Locks are not reentrant: re-acquiring a key
//! the current request already holds blocks until the wait expires.

mod local;
mod redis;

pub use local::LocalLockCoordinator;
pub use redis::RedisLockCoordinator;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AppError;

/// Default time an operation waits for the account lock.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_millis(5_000);

/// Proof of lock ownership; required to release.
#[derive(Debug, Clone)]
pub struct LockHandle {
    pub key: String,
    pub(crate) token: String,
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("timed out waiting for lock on {0}")]
    Timeout(String),

    #[error("lock backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait LockCoordinator: Send + Sync {
    /// Block up to `wait` for exclusive ownership of `key`. On timeout
    /// nothing has been touched and the operation must be aborted.
    async fn acquire(&self, key: &str, wait: Duration) -> Result<LockHandle, LockError>;

    /// Give up ownership. Only the handle returned by `acquire` can
    /// release; a stale handle is a no-op.
    async fn release(&self, handle: LockHandle) -> Result<(), LockError>;
}

/// Run `op` while holding the lock for `key`.
///
/// The lock is released whether `op` succeeds or fails; a release error is
/// logged rather than masking the operation's own result, and the store's
/// lease TTL bounds how long such an orphan can live.
pub async fn with_lock<T, F, Fut>(
    locks: &dyn LockCoordinator,
    key: &str,
    wait: Duration,
    op: F,
) -> Result<T, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let handle = locks.acquire(key, wait).await.map_err(AppError::from)?;

    let result = op().await;

    if let Err(err) = locks.release(handle).await {
        tracing::warn!(key, error = %err, "failed to release account lock");
    }

    result
}
