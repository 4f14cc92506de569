use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::state::{AuditEvent, ResourceAddress, ResourceState};
use crate::store::StateStore;

#[derive(Debug, Default)]
struct Inner {
    resources: BTreeMap<ResourceAddress, ResourceState>,
    events: Vec<AuditEvent>,
}

/// In-memory implementation of [`StateStore`].
///
/// All data is lost on process exit. Suitable for tests and the API server's
/// scratch mode.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(crate) fn last_events(events: Vec<AuditEvent>, address: Option<&ResourceAddress>, limit: u32) -> Vec<AuditEvent> {
    let filtered: Vec<AuditEvent> = events
        .into_iter()
        .filter(|ev| match address {
            Some(a) => ev.address() == Some(a),
            None => true,
        })
        .collect();
    let start = filtered.len().saturating_sub(limit as usize);
    filtered[start..].to_vec()
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, address: &ResourceAddress) -> Result<Option<ResourceState>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.resources.get(address).cloned())
    }

    async fn list(&self) -> Result<Vec<ResourceState>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.resources.values().cloned().collect())
    }

    async fn upsert(&self, state: &ResourceState) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.resources.insert(state.address.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, address: &ResourceAddress) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.resources.remove(address);
        Ok(())
    }

    async fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.events.push(event.clone());
        Ok(())
    }

    async fn list_events(
        &self,
        address: Option<&ResourceAddress>,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        let guard = self.inner.read().await;
        Ok(last_events(guard.events.clone(), address, limit))
    }
}
