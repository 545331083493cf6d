use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thunai_core::UserId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-user async locks. Messages from one user are processed one at a time while
/// different users proceed concurrently.
#[derive(Default)]
pub struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub async fn acquire(&self, user_id: &UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody is holding or waiting on.
            locks.retain(|key, lock| key == user_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user_id.clone()).or_default())
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        match self.locks.lock() {
            Ok(locks) => locks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
