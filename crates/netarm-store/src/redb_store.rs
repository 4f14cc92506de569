use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};

use crate::error::StoreError;
use crate::memory::last_events;
use crate::state::{AuditEvent, ResourceAddress, ResourceState};
use crate::store::StateStore;

const RESOURCES: TableDefinition<&str, &[u8]> = TableDefinition::new("resources");
const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

fn internal(e: impl std::fmt::Display) -> StoreError {
    StoreError::Internal(e.to_string())
}

/// Persistent state store backed by a redb database file, keyed by the
/// rendered resource address.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a redb database at `path`.
    ///
    /// Parent directories are created automatically.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(internal)?;
        }
        let db = Database::create(path).map_err(internal)?;

        {
            let wtxn = db.begin_write().map_err(internal)?;
            wtxn.open_table(RESOURCES).map_err(internal)?;
            wtxn.open_table(EVENTS).map_err(internal)?;
            wtxn.open_table(META).map_err(internal)?;
            wtxn.commit().map_err(internal)?;
        }

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl StateStore for RedbStore {
    async fn get(&self, address: &ResourceAddress) -> Result<Option<ResourceState>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(RESOURCES).map_err(internal)?;
        match table.get(address.to_string().as_str()).map_err(internal)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<ResourceState>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(RESOURCES).map_err(internal)?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(internal)? {
            let (_k, v) = entry.map_err(internal)?;
            results.push(serde_json::from_slice(v.value())?);
        }
        Ok(results)
    }

    async fn upsert(&self, state: &ResourceState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        let key = state.address.to_string();
        let wtxn = self.db.begin_write().map_err(internal)?;
        {
            let mut table = wtxn.open_table(RESOURCES).map_err(internal)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(internal)?;
        }
        wtxn.commit().map_err(internal)?;
        Ok(())
    }

    async fn delete(&self, address: &ResourceAddress) -> Result<(), StoreError> {
        let key = address.to_string();
        let wtxn = self.db.begin_write().map_err(internal)?;
        {
            let mut table = wtxn.open_table(RESOURCES).map_err(internal)?;
            table.remove(key.as_str()).map_err(internal)?;
        }
        wtxn.commit().map_err(internal)?;
        Ok(())
    }

    async fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(event)?;
        let wtxn = self.db.begin_write().map_err(internal)?;
        {
            let mut meta = wtxn.open_table(META).map_err(internal)?;
            let seq = meta.get("event_seq").map_err(internal)?.map(|g| g.value()).unwrap_or(0);
            let next = seq + 1;
            meta.insert("event_seq", next).map_err(internal)?;

            let mut events = wtxn.open_table(EVENTS).map_err(internal)?;
            events.insert(next, bytes.as_slice()).map_err(internal)?;
        }
        wtxn.commit().map_err(internal)?;
        Ok(())
    }

    async fn list_events(
        &self,
        address: Option<&ResourceAddress>,
        limit: u32,
    ) -> Result<Vec<AuditEvent>, StoreError> {
        let rtxn = self.db.begin_read().map_err(internal)?;
        let table = rtxn.open_table(EVENTS).map_err(internal)?;
        let mut all = Vec::new();
        for entry in table.iter().map_err(internal)? {
            let (_k, v) = entry.map_err(internal)?;
            all.push(serde_json::from_slice(v.value())?);
        }
        Ok(last_events(all, address, limit))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;
    use uuid::Uuid;

    use super::*;
    use crate::state::ResourceStatus;

    fn state(name: &str) -> ResourceState {
        let config = json!({ "name": name, "location": "westeurope" }).as_object().cloned().unwrap();
        let mut s = ResourceState::new(ResourceAddress::managed("azurerm_public_ip", name), config);
        s.id = Some(format!("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/{name}"));
        s
    }

    fn open_store(dir: &TempDir) -> RedbStore {
        RedbStore::open(&dir.path().join("state.redb")).unwrap()
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let mut expected = state("pip1");
        store.upsert(&expected).await.unwrap();
        let got = store.get(&ResourceAddress::managed("azurerm_public_ip", "pip1")).await.unwrap().unwrap();
        expected.updated_at = got.updated_at;
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn persistence_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            let mut s = state("persistent");
            s.touch(ResourceStatus::Tainted);
            store.upsert(&s).await.unwrap();
        }

        {
            let store = RedbStore::open(&path).unwrap();
            let got = store.get(&ResourceAddress::managed("azurerm_public_ip", "persistent")).await.unwrap();
            assert_eq!(got.unwrap().status, ResourceStatus::Tainted);
        }
    }

    #[tokio::test]
    async fn delete_and_list() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.upsert(&state("a")).await.unwrap();
        store.upsert(&state("b")).await.unwrap();
        store.delete(&ResourceAddress::managed("azurerm_public_ip", "a")).await.unwrap();
        let list = store.list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].address.name, "b");
    }

    #[tokio::test]
    async fn events_append_and_list() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let a = ResourceAddress::managed("azurerm_public_ip", "a");
        store
            .append_event(&AuditEvent::ResourceCreated {
                id: Uuid::new_v4(),
                at: Utc::now(),
                address: a.clone(),
                remote_id: "/x".into(),
            })
            .await
            .unwrap();
        store
            .append_event(&AuditEvent::ApplyCompleted { id: Uuid::new_v4(), at: Utc::now(), changes: 1, dry_run: false })
            .await
            .unwrap();

        assert_eq!(store.list_events(None, 100).await.unwrap().len(), 2);
        assert_eq!(store.list_events(Some(&a), 100).await.unwrap().len(), 1);
    }
}
