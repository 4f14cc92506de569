use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// The data object handed to every lifecycle operation: the stored
/// identifier plus schema-shaped attributes. `prior` holds the attributes as
/// they were before the current operation and feeds [`ResourceData::has_change`]
/// and write-only carry-over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<Map<String, Value>>,
}

static EMPTY: Vec<Value> = Vec::new();

impl ResourceData {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self { id: None, attributes, prior: None }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), attributes: Map::new(), prior: None }
    }

    /// Data for an update: `attributes` is the new configuration, `prior`
    /// the last known state.
    pub fn with_prior(mut self, prior: Map<String, Value>) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn require_id(&self) -> Result<&str, SchemaError> {
        self.id().filter(|s| !s.is_empty()).ok_or_else(|| SchemaError::Missing("id".into()))
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Marks the resource as gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    // ── Getters ───────────────────────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_str(key).unwrap_or_default().to_string()
    }

    pub fn require_str(&self, key: &str) -> Result<&str, SchemaError> {
        self.get_str(key)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SchemaError::Missing(key.to_string()))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// List or set value; empty when unset.
    pub fn get_list(&self, key: &str) -> &[Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items,
            _ => &EMPTY,
        }
    }

    /// Nested blocks as maps, skipping anything that is not an object.
    pub fn get_blocks(&self, key: &str) -> Vec<&Map<String, Value>> {
        match self.get(key) {
            Some(Value::Object(m)) => vec![m],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
            _ => Vec::new(),
        }
    }

    /// First block of a `max_items(1)` field.
    pub fn get_block(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get_blocks(key).into_iter().next()
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get_list(key).iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
    }

    pub fn get_map(&self, key: &str) -> Option<&Map<String, Value>> {
        self.get(key).and_then(Value::as_object)
    }

    /// Value and whether it is non-zero (non-empty string, non-zero number,
    /// `true`, non-empty collection).
    pub fn get_ok(&self, key: &str) -> (Option<&Value>, bool) {
        let v = self.get(key);
        let ok = match v {
            None => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::Array(a)) => !a.is_empty(),
            Some(Value::Object(m)) => !m.is_empty(),
            Some(Value::Null) => false,
        };
        (v, ok)
    }

    pub fn prior_value(&self, key: &str) -> Option<&Value> {
        self.prior.as_ref().and_then(|p| p.get(key)).filter(|v| !v.is_null())
    }

    /// True when `key` differs from the prior state (always true on create).
    pub fn has_change(&self, key: &str) -> bool {
        match &self.prior {
            None => self.get(key).is_some(),
            Some(_) => self.prior_value(key) != self.get(key),
        }
    }

    // ── Setters ───────────────────────────────────────────────────────────────

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.attributes.insert(key.to_string(), value.into());
    }

    pub fn set_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        let v = value.map(Into::into).unwrap_or(Value::Null);
        self.attributes.insert(key.to_string(), v);
    }
}
