use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ArmError;
use crate::poller::{PollStatus, Poller};

/// Response to a create-or-update request.
#[derive(Debug, Clone)]
pub struct PutResponse {
    /// Body returned with the initial response (may be partial while the
    /// operation is running).
    pub body: Value,
    /// Present when ARM accepted the request asynchronously.
    pub poller: Option<Poller>,
}

/// The management-plane operations resources need.
#[async_trait]
pub trait ArmClient: Send + Sync {
    /// GET a resource. `None` when it does not exist.
    async fn get(&self, id: &str, api_version: &str) -> Result<Option<Value>, ArmError>;

    /// Start a create-or-update.
    async fn begin_put(&self, id: &str, api_version: &str, body: &Value) -> Result<PutResponse, ArmError>;

    /// Start a delete. `None` when the delete completed synchronously or the
    /// resource was already gone.
    async fn begin_delete(&self, id: &str, api_version: &str) -> Result<Option<Poller>, ArmError>;

    /// All resources in a collection, following `nextLink`.
    async fn list(&self, collection: &str, api_version: &str) -> Result<Vec<Value>, ArmError>;

    /// One status check of a long-running operation.
    async fn poll(&self, poller: &Poller) -> Result<PollStatus, ArmError>;
}

/// PUT and block until the operation completes.
pub async fn put_and_wait(
    client: &dyn ArmClient,
    id: &str,
    api_version: &str,
    body: &Value,
    timeout: Duration,
) -> Result<Value, ArmError> {
    let resp = client.begin_put(id, api_version, body).await?;
    match resp.poller {
        Some(poller) => {
            debug!(id, url = %poller.url, "waiting for create/update");
            poller.wait_for_completion(client, timeout).await
        }
        None => Ok(resp.body),
    }
}

/// DELETE and block until the operation completes. Already gone is success.
pub async fn delete_and_wait(
    client: &dyn ArmClient,
    id: &str,
    api_version: &str,
    timeout: Duration,
) -> Result<(), ArmError> {
    match client.begin_delete(id, api_version).await {
        Ok(Some(poller)) => {
            debug!(id, url = %poller.url, "waiting for delete");
            match poller.wait_for_completion(client, timeout).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e),
            }
        }
        Ok(None) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}
