use async_trait::async_trait;
use netarm_schema::{ResourceData, Schema};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ProviderError;
use crate::meta::{ProviderMeta, Timeouts};

/// A managed resource type: schema plus the four lifecycle operations.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Checks spanning several fields. Runs after the schema check and
    /// before any request is sent.
    fn validate_config(&self, _config: &Map<String, Value>) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Parse an import ID with this type's ID codec.
    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError>;

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError>;

    /// Refresh `data` from the remote resource. A missing resource clears
    /// the ID and is not an error.
    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError>;

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError>;

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError>;

    /// Adopt an existing remote resource.
    async fn import(&self, id: &str, meta: &ProviderMeta) -> Result<ResourceData, ProviderError> {
        self.validate_import_id(id)?;
        let mut data = ResourceData::with_id(id);
        self.read(&mut data, meta).await?;
        if data.id.is_none() {
            return Err(ProviderError::NotFound(format!(
                "cannot import non-existent remote object {:?} as {}",
                id,
                self.type_name()
            )));
        }
        debug!(id, resource_type = self.type_name(), "imported");
        Ok(data)
    }

    /// Schema check followed by [`Resource::validate_config`].
    fn check(&self, config: &Map<String, Value>) -> Result<(), ProviderError> {
        self.schema().validate(config)?;
        self.validate_config(config)
    }
}

/// A read-only lookup of existing remote state.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    /// Populate `data` from the remote resource. Unlike a managed Read, a
    /// missing resource is an error.
    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError>;

    fn check(&self, config: &Map<String, Value>) -> Result<(), ProviderError> {
        self.schema().validate(config)?;
        Ok(())
    }
}
