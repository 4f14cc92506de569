//! `${type.name.attribute}` references between blocks.
//!
//! A value that is exactly one reference is replaced by the referenced
//! value with its JSON type intact; references embedded in longer strings
//! are rendered as text. `$${` escapes a literal `${`.

use std::fmt;

use netarm_store::ResourceAddress;
use serde_json::{Map, Value};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub address: ResourceAddress,
    /// Dotted path into the attributes; numeric segments index lists.
    pub attribute: String,
}

impl Reference {
    pub fn parse(inner: &str) -> Result<Self, String> {
        let parts: Vec<&str> = inner.trim().split('.').collect();
        let (address, rest) = match parts.as_slice() {
            ["data", t, n, rest @ ..] => (ResourceAddress::data(*t, *n), rest),
            [t, n, rest @ ..] => (ResourceAddress::managed(*t, *n), rest),
            _ => return Err("expected type.name.attribute".into()),
        };
        if address.type_name.is_empty() || address.name.is_empty() {
            return Err("expected type.name.attribute".into());
        }
        if rest.is_empty() || rest.iter().any(|s| s.is_empty()) {
            return Err("missing attribute".into());
        }
        Ok(Self { address, attribute: rest.join(".") })
    }

    /// Walk the attribute path through `attributes`.
    pub fn lookup(&self, attributes: &Map<String, Value>) -> Option<Value> {
        let mut segments = self.attribute.split('.');
        let mut current = attributes.get(segments.next()?)?;
        for seg in segments {
            current = match current {
                Value::Object(m) => m.get(seg)?,
                Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.attribute)
    }
}

enum Piece<'a> {
    Text(&'a str),
    Ref(&'a str),
}

fn pieces(s: &str) -> Result<Vec<Piece<'_>>, String> {
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        if start > 0 && rest[..start].ends_with('$') {
            out.push(Piece::Text(&rest[..start - 1]));
            out.push(Piece::Text("${"));
            rest = &rest[start + 2..];
            continue;
        }
        out.push(Piece::Text(&rest[..start]));
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| format!("unterminated reference in {:?}", s))?;
        out.push(Piece::Ref(&after[..end]));
        rest = &after[end + 1..];
    }
    out.push(Piece::Text(rest));
    out.retain(|p| !matches!(p, Piece::Text("")));
    Ok(out)
}

fn collect(value: &Value, out: &mut Vec<Reference>) -> Result<(), String> {
    match value {
        Value::String(s) => {
            for piece in pieces(s)? {
                if let Piece::Ref(inner) = piece {
                    let r = Reference::parse(inner).map_err(|e| format!("${{{}}}: {}", inner, e))?;
                    if !out.contains(&r) {
                        out.push(r);
                    }
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, out)?;
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                collect(v, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Every distinct reference in `value`, in order of first appearance.
pub fn references(value: &Value) -> Result<Vec<Reference>, String> {
    let mut out = Vec::new();
    collect(value, &mut out)?;
    Ok(out)
}

/// Replace references using `resolve`. An unresolved reference is an error.
pub fn interpolate(value: &Value, resolve: &dyn Fn(&Reference) -> Option<Value>) -> Result<Value, ConfigError> {
    match value {
        Value::String(s) => {
            let parts = pieces(s).map_err(ConfigError::Unresolved)?;
            let lookup = |inner: &str| -> Result<Value, ConfigError> {
                let r = Reference::parse(inner).map_err(|_| ConfigError::Unresolved(inner.to_string()))?;
                resolve(&r).ok_or_else(|| ConfigError::Unresolved(r.to_string()))
            };
            if let [Piece::Ref(inner)] = parts.as_slice() {
                return lookup(inner);
            }
            let mut rendered = String::new();
            for piece in parts {
                match piece {
                    Piece::Text(t) => rendered.push_str(t),
                    Piece::Ref(inner) => match lookup(inner)? {
                        Value::String(v) => rendered.push_str(&v),
                        other => rendered.push_str(&other.to_string()),
                    },
                }
            }
            Ok(Value::String(rendered))
        }
        Value::Array(items) => items.iter().map(|v| interpolate(v, resolve)).collect::<Result<Vec<_>, _>>().map(Value::Array),
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), interpolate(v, resolve)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}
