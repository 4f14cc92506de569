//! Generic block codec: configuration blocks (lists of maps) to request
//! structs and back.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::SchemaError;

/// A nested configuration block with a typed request/response counterpart.
pub trait Block: Sized {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError>;
    fn flatten(&self) -> Map<String, Value>;
}

fn as_objects(v: Option<&Value>) -> Vec<&Map<String, Value>> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        Some(Value::Object(m)) => vec![m],
        _ => Vec::new(),
    }
}

/// All blocks of a repeated field; `None` when the field is empty or unset.
pub fn expand_list<T: Block>(raw: Option<&Value>) -> Result<Option<Vec<T>>, SchemaError> {
    let items = as_objects(raw);
    if items.is_empty() {
        return Ok(None);
    }
    items.into_iter().map(T::expand).collect::<Result<Vec<_>, _>>().map(Some)
}

/// The single block of a `max_items(1)` field.
pub fn expand_single<T: Block>(raw: Option<&Value>) -> Result<Option<T>, SchemaError> {
    as_objects(raw).into_iter().next().map(T::expand).transpose()
}

/// Never returns an absent value: `None` flattens to an empty list.
pub fn flatten_list<T: Block>(items: Option<&[T]>) -> Vec<Value> {
    items
        .unwrap_or_default()
        .iter()
        .map(|i| Value::Object(i.flatten()))
        .collect()
}

pub fn flatten_single<T: Block>(item: Option<&T>) -> Vec<Value> {
    item.map(|i| vec![Value::Object(i.flatten())]).unwrap_or_default()
}

pub fn expand_string_list(raw: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<String> = match raw {
        Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
        _ => Vec::new(),
    };
    (!items.is_empty()).then_some(items)
}

pub fn flatten_string_list(items: Option<&[String]>) -> Value {
    Value::Array(items.unwrap_or_default().iter().cloned().map(Value::String).collect())
}

pub fn expand_tags(raw: Option<&Value>) -> Option<BTreeMap<String, String>> {
    let Some(Value::Object(m)) = raw else {
        return None;
    };
    Some(
        m.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
    )
}

pub fn flatten_tags(tags: Option<&BTreeMap<String, String>>) -> Value {
    let m: Map<String, Value> = tags
        .map(|t| t.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect())
        .unwrap_or_default();
    Value::Object(m)
}

// ── Raw field access inside a block ───────────────────────────────────────────

pub fn str_of<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub fn string_of(raw: &Map<String, Value>, key: &str) -> Option<String> {
    str_of(raw, key).map(str::to_string)
}

pub fn require_string(raw: &Map<String, Value>, key: &str) -> Result<String, SchemaError> {
    string_of(raw, key).ok_or_else(|| SchemaError::decode(key, "required value is missing"))
}

pub fn i64_of(raw: &Map<String, Value>, key: &str) -> Option<i64> {
    raw.get(key).and_then(Value::as_i64)
}

pub fn bool_of(raw: &Map<String, Value>, key: &str) -> Option<bool> {
    raw.get(key).and_then(Value::as_bool)
}

pub fn string_list_of(raw: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    expand_string_list(raw.get(key))
}

pub fn list_of<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Route {
        address_prefixes: Vec<String>,
        next_hop: String,
    }

    impl Block for Route {
        fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
            Ok(Route {
                address_prefixes: string_list_of(raw, "address_prefixes").unwrap_or_default(),
                next_hop: require_string(raw, "next_hop_ip_address")?,
            })
        }

        fn flatten(&self) -> Map<String, Value> {
            let mut m = Map::new();
            m.insert("address_prefixes".into(), flatten_string_list(Some(&self.address_prefixes)));
            m.insert("next_hop_ip_address".into(), Value::String(self.next_hop.clone()));
            m
        }
    }

    #[test]
    fn flatten_of_expand_is_identity() {
        let raw = json!([
            { "address_prefixes": ["10.0.0.0/24"], "next_hop_ip_address": "10.0.1.4" },
            { "address_prefixes": ["10.1.0.0/24", "10.2.0.0/24"], "next_hop_ip_address": "10.0.1.5" },
        ]);
        let routes = expand_list::<Route>(Some(&raw)).unwrap().unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(Value::Array(flatten_list(Some(&routes))), raw);
    }

    #[test]
    fn empty_list_expands_to_none_and_flattens_to_empty() {
        let raw = json!([]);
        let routes = expand_list::<Route>(Some(&raw)).unwrap();
        assert!(routes.is_none());
        assert_eq!(Value::Array(flatten_list(routes.as_deref())), raw);
        assert!(flatten_list::<Route>(None).is_empty());
        assert!(flatten_single::<Route>(None).is_empty());
    }

    #[test]
    fn missing_required_block_field_is_a_decode_error() {
        let raw = json!([{ "address_prefixes": [] }]);
        let err = expand_list::<Route>(Some(&raw)).unwrap_err();
        assert!(matches!(err, SchemaError::Decode { ref path, .. } if path == "next_hop_ip_address"));
    }

    #[test]
    fn tags_round_trip() {
        let raw = json!({ "env": "prod", "team": "net" });
        let tags = expand_tags(Some(&raw));
        assert_eq!(flatten_tags(tags.as_ref()), raw);
        assert_eq!(flatten_tags(None), json!({}));
    }
}
