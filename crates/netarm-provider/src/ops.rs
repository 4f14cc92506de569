use std::future::Future;
use std::time::Duration;

use netarm_schema::ResourceData;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::{DataSource, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

async fn bounded<F>(type_name: &str, op: Operation, limit: Duration, fut: F) -> Result<(), ProviderError>
where
    F: Future<Output = Result<(), ProviderError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            type_name: type_name.to_string(),
            operation: op.as_str(),
            seconds: limit.as_secs(),
        }),
    }
}

/// Run one lifecycle operation under the resource's deadline.
pub async fn run(
    resource: &dyn Resource,
    op: Operation,
    data: &mut ResourceData,
    meta: &ProviderMeta,
) -> Result<(), ProviderError> {
    let timeouts = meta.timeouts.apply(resource.timeouts());
    let type_name = resource.type_name();
    info!(resource_type = type_name, id = ?data.id, op = op.as_str(), "running operation");
    match op {
        Operation::Create => bounded(type_name, op, timeouts.create, resource.create(data, meta)).await,
        Operation::Read => bounded(type_name, op, timeouts.read, resource.read(data, meta)).await,
        Operation::Update => bounded(type_name, op, timeouts.update, resource.update(data, meta)).await,
        Operation::Delete => bounded(type_name, op, timeouts.delete, resource.delete(data, meta)).await,
    }
}

pub async fn read_data_source(
    source: &dyn DataSource,
    data: &mut ResourceData,
    meta: &ProviderMeta,
) -> Result<(), ProviderError> {
    let limit = meta.timeouts.apply(source.timeouts()).read;
    info!(data_source = source.type_name(), "reading data source");
    bounded(source.type_name(), Operation::Read, limit, source.read(data, meta)).await
}
