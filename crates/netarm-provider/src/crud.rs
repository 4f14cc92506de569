//! Request plumbing shared by every resource: existence checks, PUT and
//! wait, read-back of the created ID, tolerant deletes.

use std::time::Duration;

use netarm_client::{delete_and_wait, put_and_wait};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::meta::ProviderMeta;

/// `Virtual Hub "hub1" (Resource Group "rg1")`, the context every error carries.
pub fn describe(kind: &str, name: &str, resource_group: &str) -> String {
    format!("{} {:?} (Resource Group {:?})", kind, name, resource_group)
}

/// Fail with [`ProviderError::AlreadyExists`] when `id` is already present.
pub async fn require_absent(
    meta: &ProviderMeta,
    type_name: &str,
    id: &str,
    api_version: &str,
    context: &str,
) -> Result<(), ProviderError> {
    let existing = meta
        .client()
        .get(id, api_version)
        .await
        .map_err(ProviderError::api(format!("checking for presence of existing {}", context)))?;
    match existing {
        Some(_) => Err(ProviderError::AlreadyExists { type_name: type_name.to_string(), id: id.to_string() }),
        None => Ok(()),
    }
}

/// GET and decode. `None` when the resource does not exist.
pub async fn fetch<T: DeserializeOwned>(
    meta: &ProviderMeta,
    id: &str,
    api_version: &str,
    context: &str,
) -> Result<Option<T>, ProviderError> {
    let body = meta
        .client()
        .get(id, api_version)
        .await
        .map_err(ProviderError::api(format!("retrieving {}", context)))?;
    body.map(|b| decode(b, context)).transpose()
}

pub fn decode<T: DeserializeOwned>(body: Value, context: &str) -> Result<T, ProviderError> {
    serde_json::from_value(body).map_err(|e| ProviderError::Validation(format!("decoding {}: {}", context, e)))
}

/// PUT `body` and block until the operation completes, then GET the
/// resource again and return its ID.
pub async fn put_and_read_id<B: Serialize>(
    meta: &ProviderMeta,
    id: &str,
    api_version: &str,
    body: &B,
    timeout: Duration,
    context: &str,
) -> Result<String, ProviderError> {
    let body = serde_json::to_value(body)
        .map_err(|e| ProviderError::Validation(format!("encoding {}: {}", context, e)))?;
    info!(id, "creating/updating {}", context);
    put_and_wait(meta.client(), id, api_version, &body, timeout)
        .await
        .map_err(ProviderError::api(format!("creating/updating {}", context)))?;

    let read = meta
        .client()
        .get(id, api_version)
        .await
        .map_err(ProviderError::api(format!("retrieving {}", context)))?;
    let remote_id = read
        .as_ref()
        .and_then(|b| b.get("id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("cannot read ID of {}", context)))?;
    Ok(remote_id.to_string())
}

/// DELETE and block until the operation completes. Already gone is success.
pub async fn delete(
    meta: &ProviderMeta,
    id: &str,
    api_version: &str,
    timeout: Duration,
    context: &str,
) -> Result<(), ProviderError> {
    info!(id, "deleting {}", context);
    delete_and_wait(meta.client(), id, api_version, timeout)
        .await
        .map_err(ProviderError::api(format!("deleting {}", context)))?;
    debug!(id, "deleted {}", context);
    Ok(())
}
