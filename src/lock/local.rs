//! In-process lock coordinator with the same contract as the Redis one.
//! Suitable for single-instance deployments and for tests; it cannot
//! provide exclusion across processes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use super::{LockCoordinator, LockError, LockHandle};

const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Keys currently held, mapped to the owning handle's token.
#[derive(Clone, Default)]
pub struct LocalLockCoordinator {
    held: Arc<Mutex<HashMap<String, String>>>,
}

impl LocalLockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockCoordinator for LocalLockCoordinator {
    async fn acquire(&self, key: &str, wait: Duration) -> Result<LockHandle, LockError> {
        let token = Uuid::new_v4().simple().to_string();
        let deadline = Instant::now() + wait;

        loop {
            {
                let mut held = self.held.lock().await;
                if !held.contains_key(key) {
                    held.insert(key.to_string(), token.clone());
                    return Ok(LockHandle {
                        key: key.to_string(),
                        token,
                    });
                }
            }

            if Instant::now() + RETRY_INTERVAL > deadline {
                return Err(LockError::Timeout(key.to_string()));
            }

            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    async fn release(&self, handle: LockHandle) -> Result<(), LockError> {
        let mut held = self.held.lock().await;
        if held.get(&handle.key) == Some(&handle.token) {
            held.remove(&handle.key);
        }
        Ok(())
    }
}
