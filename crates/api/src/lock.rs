//! Process-wide advisory request lock.
//!
//! Requests are serialized through one async mutex, acquired with a deadline.
//! When the deadline elapses the request proceeds WITHOUT the lock: this is
//! best-effort serialization, not a strict mutual-exclusion guarantee, and
//! callers are expected to tolerate the occasional unlocked request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct RequestLock {
    inner: Arc<Mutex<()>>,
}

impl RequestLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `deadline` for the lock. `None` means the deadline elapsed
    /// and the caller should proceed unlocked.
    pub async fn acquire(&self, deadline: Duration) -> Option<OwnedMutexGuard<()>> {
        match tokio::time::timeout(deadline, Arc::clone(&self.inner).lock_owned()).await {
            Ok(guard) => Some(guard),
            Err(_) => {
                tracing::warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    "advisory lock deadline elapsed; proceeding unlocked"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquires_when_uncontended() {
        let lock = RequestLock::new();
        let guard = lock.acquire(Duration::from_millis(10)).await;
        assert!(guard.is_some());
    }

    #[tokio::test]
    async fn proceeds_unlocked_after_deadline() {
        let lock = RequestLock::new();
        let held = lock.acquire(Duration::from_millis(10)).await;
        assert!(held.is_some());

        // Second acquisition cannot succeed while the guard is held.
        let second = lock.acquire(Duration::from_millis(20)).await;
        assert!(second.is_none());

        drop(held);
        let third = lock.acquire(Duration::from_millis(10)).await;
        assert!(third.is_some());
    }
}
