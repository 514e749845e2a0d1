//! Per-identity serialization of refresh operations
//!
//! Two requests refreshing with the same (or a sibling) token must not
//! race: each would rotate the family independently and the loser would
//! look like a replay. The guard hands out one permit per identity;
//! later callers wait for the holder, bounded by a timeout that surfaces
//! a retry-safe error instead of hanging.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::errors::AuthError;

struct GuardInner {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Keyed mutex over refresh operations
pub struct RefreshGuard {
    inner: Arc<GuardInner>,
    timeout: Duration,
}

/// Exclusive right to rotate for one identity.
///
/// Dropping the permit releases the lock on every exit path and removes
/// the map entry once no other caller is waiting on it.
pub struct RefreshPermit {
    key: String,
    inner: Arc<GuardInner>,
    guard: Option<OwnedMutexGuard<()>>,
    contended: bool,
}

impl RefreshPermit {
    /// Whether another refresh for this identity was in flight when this
    /// permit was requested.
    ///
    /// A contended permit means the token being presented may have just
    /// been rotated by the winner rather than replayed by an attacker.
    pub fn contended(&self) -> bool {
        self.contended
    }
}

impl RefreshGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                locks: Mutex::new(HashMap::new()),
            }),
            timeout,
        }
    }

    /// Acquires the per-identity permit, waiting at most the configured
    /// timeout for an in-flight refresh to finish.
    pub async fn acquire(&self, key: &str) -> Result<RefreshPermit, AuthError> {
        let lock = {
            let mut locks = self.inner.locks.lock().expect("refresh guard map poisoned");
            Arc::clone(
                locks
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        let (guard, contended) = match Arc::clone(&lock).try_lock_owned() {
            Ok(guard) => (guard, false),
            Err(_) => match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
                Ok(guard) => (guard, true),
                Err(_) => {
                    debug!(identity = key, "timed out waiting for in-flight refresh");
                    return Err(AuthError::RefreshInProgress);
                }
            },
        };

        Ok(RefreshPermit {
            key: key.to_string(),
            inner: Arc::clone(&self.inner),
            guard: Some(guard),
            contended,
        })
    }
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        // Release the lock before inspecting the map so a waiter can
        // proceed immediately.
        self.guard.take();

        let mut locks = self.inner.locks.lock().expect("refresh guard map poisoned");
        if let Some(entry) = locks.get(&self.key) {
            // Clones are only handed out under the map lock, so a count of
            // one means the map holds the last reference.
            if Arc::strong_count(entry) == 1 {
                locks.remove(&self.key);
            }
        }
    }
}
