//! Wire models and schema fragments shared by the network resources.

use std::collections::BTreeMap;

use netarm_domain::normalize_location;
use netarm_schema::{expand_tags, flatten_tags, validators, Field, FieldType, ResourceData, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Wire models ───────────────────────────────────────────────────────────────

/// Top-level ARM resource body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<P>,
}

impl<P> Envelope<P> {
    pub fn new(location: Option<String>, tags: Option<BTreeMap<String, String>>, properties: P) -> Self {
        Self {
            id: None,
            name: None,
            location,
            tags,
            zones: None,
            etag: None,
            properties: Some(properties),
        }
    }
}

/// Named child entry inside a parent's properties (rules, subnets,
/// gateway sub-resources).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Named<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<P>,
}

impl<P> Named<P> {
    pub fn new(name: impl Into<String>, properties: P) -> Self {
        Self { id: None, name: Some(name.into()), properties: Some(properties) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl SubResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }

    pub fn id_str(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }
}

// ── Schema fragments ──────────────────────────────────────────────────────────

pub fn name_field(max_len: usize) -> Field {
    Field::string().required().force_new().validate(validators::resource_name(max_len))
}

pub fn resource_group_field() -> Field {
    Field::string().required().force_new().validate(validators::resource_name(90))
}

pub fn location_field() -> Field {
    Field::string().required().force_new().validate(validators::location())
}

pub fn tags_field() -> Field {
    Field::map(FieldType::String).optional()
}

/// `name`, `resource_group_name`, `location` and `tags`, the base of most
/// top-level resources.
pub fn base_schema(name_max_len: usize) -> Schema {
    Schema::new()
        .field("name", name_field(name_max_len))
        .field("resource_group_name", resource_group_field())
        .field("location", location_field())
        .field("tags", tags_field())
}

// ── Data helpers ──────────────────────────────────────────────────────────────

pub fn location_of(data: &ResourceData) -> Option<String> {
    data.get_str("location").map(normalize_location)
}

pub fn tags_of(data: &ResourceData) -> Option<BTreeMap<String, String>> {
    expand_tags(data.get("tags"))
}

/// Write the envelope fields common to every top-level resource.
pub fn set_envelope<P>(data: &mut ResourceData, name: &str, resource_group: &str, env: &Envelope<P>) {
    data.set("name", name);
    data.set("resource_group_name", resource_group);
    if let Some(loc) = &env.location {
        data.set("location", normalize_location(loc));
    }
    data.set("tags", flatten_tags(env.tags.as_ref()));
}

pub fn str_or_empty(v: &Option<String>) -> Value {
    Value::String(v.clone().unwrap_or_default())
}

pub fn strings(v: &Option<Vec<String>>) -> Value {
    Value::Array(v.clone().unwrap_or_default().into_iter().map(Value::String).collect())
}
