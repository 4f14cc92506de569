use async_trait::async_trait;

use crate::error::StoreError;
use crate::state::{AuditEvent, ResourceAddress, ResourceState};

#[async_trait]
pub trait StateStore: Send + Sync + 'static {
    async fn get(&self, address: &ResourceAddress) -> Result<Option<ResourceState>, StoreError>;
    async fn list(&self) -> Result<Vec<ResourceState>, StoreError>;
    async fn upsert(&self, state: &ResourceState) -> Result<(), StoreError>;
    async fn delete(&self, address: &ResourceAddress) -> Result<(), StoreError>;

    async fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError>;

    /// The most recent `limit` events, oldest first, optionally only those
    /// concerning `address`.
    async fn list_events(
        &self,
        address: Option<&ResourceAddress>,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, StoreError>;
}
