//! Redis-backed lock coordinator, usable from any number of service
//! instances sharing one Redis.
//!
//! Acquire is a `SET key token NX PX <lease>` retry loop; release is a Lua
//! compare-and-delete so only the owning handle can free the key. The lease
//! exists purely as a crash backstop: normal operation always releases
//! explicitly, well inside the lease.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::time::Instant;
use uuid::Uuid;

use super::{LockCoordinator, LockError, LockHandle};

const LOCK_PREFIX: &str = "account-lock:";
const LEASE_MS: u64 = 15_000;
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

const RELEASE_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
    return redis.call('del', KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisLockCoordinator {
    client: redis::Client,
}

impl RedisLockCoordinator {
    pub fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, LockError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| LockError::Backend(e.to_string()))
    }
}

#[async_trait]
impl LockCoordinator for RedisLockCoordinator {
    async fn acquire(&self, key: &str, wait: Duration) -> Result<LockHandle, LockError> {
        let mut conn = self.connection().await?;
        let token = Uuid::new_v4().simple().to_string();
        let store_key = format!("{LOCK_PREFIX}{key}");
        let deadline = Instant::now() + wait;

        loop {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&store_key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(LEASE_MS)
                .query_async(&mut conn)
                .await
                .map_err(|e| LockError::Backend(e.to_string()))?;

            if acquired.is_some() {
                tracing::debug!(key, "acquired account lock");
                return Ok(LockHandle {
                    key: key.to_string(),
                    token,
                });
            }

            if Instant::now() + RETRY_INTERVAL > deadline {
                return Err(LockError::Timeout(key.to_string()));
            }

            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let mut conn = self.connection().await?;
        let store_key = format!("{LOCK_PREFIX}{}", handle.key);

        let released: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(&store_key)
            .arg(&handle.token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(e.to_string()))?;

        if released == 0 {
            // Lease already expired or the key was taken over; nothing to
            // free, but worth a trace while diagnosing slow critical
            // sections.
            tracing::warn!(key = %handle.key, "lock was no longer held at release");
        }

        Ok(())
    }
}
