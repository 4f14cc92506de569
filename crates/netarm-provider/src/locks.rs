use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;
use tracing::debug;

/// Cooperative async mutexes keyed by `(kind, name)`.
///
/// Children of the same parent (subnets of a virtual network, connections
/// and gateways of a virtual hub) take the parent's lock around their
/// mutations so sibling updates are serialised.
#[derive(Clone, Default)]
pub struct NamedLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and hold the lock for `name` of resource type `kind`. The
    /// lock is released when the guard is dropped.
    pub async fn lock(&self, name: &str, kind: &str) -> OwnedMutexGuard<()> {
        let key = format!("{}.{}", kind, name);
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.clone()).or_default().clone()
        };
        debug!(lock = %key, "acquiring lock");
        let guard = mutex.lock_owned().await;
        debug!(lock = %key, "lock acquired");
        guard
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_serialised() {
        let locks = NamedLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock("hub1", "azurerm_virtual_hub").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = NamedLocks::new();
        let _a = locks.lock("hub1", "azurerm_virtual_hub").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("hub2", "azurerm_virtual_hub")).await;
        assert!(b.is_ok());
        let c = tokio::time::timeout(Duration::from_millis(100), locks.lock("hub1", "azurerm_virtual_network")).await;
        assert!(c.is_ok());
    }
}
