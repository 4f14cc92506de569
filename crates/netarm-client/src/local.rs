use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::client::{ArmClient, PutResponse};
use crate::config::PollPolicy;
use crate::error::ArmError;
use crate::poller::{PollKind, PollStatus, Poller};

#[derive(Default)]
struct Inner {
    /// Lower-cased ID → stored body.
    resources: BTreeMap<String, Value>,
    /// Outstanding operation URL → remaining in-progress polls.
    operations: HashMap<String, usize>,
    requests: HashMap<&'static str, usize>,
}

/// In-memory ARM used by tests and local dry runs.
///
/// Bodies are stored as sent, with `id`, `name`, `type`, `etag` and
/// `properties.provisioningState` filled in. Named sub-resources inside
/// `properties` get IDs under their parent. Request counts per verb let tests
/// assert that no write was sent.
#[derive(Default)]
pub struct LocalArm {
    inner: Mutex<Inner>,
    /// When set, writes return a poller that reports this many in-progress
    /// polls before succeeding.
    async_polls: Option<usize>,
}

impl LocalArm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes complete through a long-running operation instead of synchronously.
    pub fn with_async_operations(polls: usize) -> Self {
        Self { inner: Mutex::new(Inner::default()), async_polls: Some(polls) }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn count(&self, verb: &'static str) {
        *self.lock().requests.entry(verb).or_default() += 1;
    }

    /// Number of requests seen for `verb` (`GET`, `PUT`, `DELETE`, `LIST`).
    pub fn requests(&self, verb: &str) -> usize {
        self.lock().requests.get(verb).copied().unwrap_or(0)
    }

    /// Seed a resource as if it had been created out of band.
    pub fn insert(&self, id: &str, body: Value) {
        let body = complete(id, body);
        self.lock().resources.insert(id.to_ascii_lowercase(), body);
    }

    /// Remove a resource out of band.
    pub fn remove(&self, id: &str) -> Option<Value> {
        self.lock().resources.remove(&id.to_ascii_lowercase())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().resources.contains_key(&id.to_ascii_lowercase())
    }

    /// Raw stored body, without counting a request.
    pub fn body(&self, id: &str) -> Option<Value> {
        self.lock().resources.get(&id.to_ascii_lowercase()).cloned()
    }

    fn start_operation(&self) -> Option<Poller> {
        let polls = self.async_polls?;
        let url = format!("local://operations/{}", Uuid::new_v4());
        self.lock().operations.insert(url.clone(), polls);
        Some(Poller::new(url, PollKind::AsyncOperation, PollPolicy::immediate(polls + 2)))
    }
}

/// `Microsoft.Network/virtualNetworks/subnets` from a full ID.
fn resource_type(id: &str) -> String {
    let parts: Vec<&str> = id.trim_matches('/').split('/').collect();
    let Some(pos) = parts.iter().position(|p| p.eq_ignore_ascii_case("providers")) else {
        return String::new();
    };
    let mut out = parts.get(pos + 1).copied().unwrap_or_default().to_string();
    for t in parts.iter().skip(pos + 2).step_by(2) {
        out.push('/');
        out.push_str(t);
    }
    out
}

/// Parent ID for a nested resource, `None` for top-level resources.
fn parent_id(id: &str) -> Option<String> {
    let parts: Vec<&str> = id.trim_matches('/').split('/').collect();
    let pos = parts.iter().position(|p| p.eq_ignore_ascii_case("providers"))?;
    // providers/{ns}/{type}/{name} is four components; anything longer is nested
    if parts.len() <= pos + 4 {
        return None;
    }
    Some(format!("/{}", parts[..parts.len() - 2].join("/")))
}

fn complete(id: &str, body: Value) -> Value {
    let mut obj = match body {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    let name = id.rsplit('/').next().unwrap_or_default().to_string();
    obj.insert("id".into(), Value::String(id.to_string()));
    obj.insert("name".into(), Value::String(name));
    obj.insert("type".into(), Value::String(resource_type(id)));
    obj.insert("etag".into(), Value::String(format!("W/\"{}\"", Uuid::new_v4())));

    let props = obj.entry("properties").or_insert_with(|| json!({}));
    if let Value::Object(p) = props {
        p.insert("provisioningState".into(), Value::String("Succeeded".into()));
        assign_child_ids(id, p);
    }
    Value::Object(obj)
}

/// Named entries of array-valued properties get `{parent}/{collection}/{name}`.
fn assign_child_ids(parent: &str, props: &mut Map<String, Value>) {
    for (collection, value) in props.iter_mut() {
        let Value::Array(items) = value else { continue };
        for item in items.iter_mut() {
            let Value::Object(m) = item else { continue };
            let has_id = m.get("id").and_then(Value::as_str).is_some_and(|s| !s.is_empty());
            if has_id {
                continue;
            }
            if let Some(name) = m.get("name").and_then(Value::as_str).map(str::to_string) {
                m.insert("id".into(), Value::String(format!("{}/{}/{}", parent, collection, name)));
                if let Some(Value::Object(p)) = m.get_mut("properties") {
                    p.insert("provisioningState".into(), Value::String("Succeeded".into()));
                }
            }
        }
    }
}

#[async_trait]
impl ArmClient for LocalArm {
    async fn get(&self, id: &str, _api_version: &str) -> Result<Option<Value>, ArmError> {
        self.count("GET");
        debug!(id, "local GET");
        Ok(self.lock().resources.get(&id.to_ascii_lowercase()).cloned())
    }

    async fn begin_put(&self, id: &str, _api_version: &str, body: &Value) -> Result<PutResponse, ArmError> {
        self.count("PUT");
        debug!(id, "local PUT");
        if let Some(parent) = parent_id(id) {
            if !self.contains(&parent) {
                return Err(ArmError::Api {
                    status: 404,
                    url: id.to_string(),
                    code: "ParentResourceNotFound".into(),
                    message: format!("parent resource {} was not found", parent),
                });
            }
        }
        let stored = complete(id, body.clone());
        self.lock().resources.insert(id.to_ascii_lowercase(), stored.clone());
        Ok(PutResponse { body: stored, poller: self.start_operation() })
    }

    async fn begin_delete(&self, id: &str, _api_version: &str) -> Result<Option<Poller>, ArmError> {
        self.count("DELETE");
        debug!(id, "local DELETE");
        let key = id.to_ascii_lowercase();
        let removed = {
            let mut inner = self.lock();
            let child_prefix = format!("{}/", key);
            inner.resources.retain(|k, _| !k.starts_with(&child_prefix));
            inner.resources.remove(&key)
        };
        match removed {
            Some(_) => Ok(self.start_operation()),
            None => Ok(None),
        }
    }

    async fn list(&self, collection: &str, _api_version: &str) -> Result<Vec<Value>, ArmError> {
        self.count("LIST");
        let prefix = format!("{}/", collection.trim_end_matches('/').to_ascii_lowercase());
        let inner = self.lock();
        Ok(inner
            .resources
            .iter()
            .filter(|(k, _)| k.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn poll(&self, poller: &Poller) -> Result<PollStatus, ArmError> {
        let mut inner = self.lock();
        let Some(remaining) = inner.operations.get_mut(&poller.url) else {
            return Err(ArmError::NotFound(poller.url.clone()));
        };
        if *remaining == 0 {
            inner.operations.remove(&poller.url);
            return Ok(PollStatus::Succeeded(json!({ "status": "Succeeded" })));
        }
        *remaining -= 1;
        Ok(PollStatus::InProgress { retry_after: None })
    }
}
