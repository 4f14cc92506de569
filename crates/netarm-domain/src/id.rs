use serde::{Deserialize, Serialize};

use crate::error::IdError;

// ── Generic resource ID ──────────────────────────────────────────────────────

/// A parsed ARM resource ID of the form
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{type}/{name}]*`.
///
/// Segment keys keep the casing they were given with; values are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: Option<String>,
    pub provider: Option<String>,
    /// Type/name pairs following the provider namespace, outermost first.
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    /// Parse any ARM ID without checking which resource type it names.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        if input.trim().is_empty() {
            return Err(IdError::malformed(input, "ID cannot be empty"));
        }
        let Some(rest) = input.strip_prefix('/') else {
            return Err(IdError::malformed(input, "ID must start with '/'"));
        };
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let components: Vec<&str> = rest.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(IdError::malformed(
                input,
                format!("the number of path segments ({}) is not divisible by 2", components.len()),
            ));
        }

        let mut pairs = Vec::with_capacity(components.len() / 2);
        for chunk in components.chunks(2) {
            let (key, value) = (chunk[0], chunk[1]);
            if key.is_empty() {
                return Err(IdError::malformed(input, "segment names cannot be empty"));
            }
            if value.is_empty() {
                return Err(IdError::EmptySegment {
                    id: input.to_string(),
                    segment: key.to_string(),
                });
            }
            pairs.push((key, value));
        }

        let mut pairs = pairs.into_iter().peekable();

        let subscription_id = match pairs.next() {
            Some((key, value)) if key.eq_ignore_ascii_case("subscriptions") => value.to_string(),
            Some((key, _)) => {
                return Err(IdError::UnexpectedSegment {
                    id: input.to_string(),
                    found: key.to_string(),
                    expected: "subscriptions".into(),
                })
            }
            None => {
                return Err(IdError::MissingSegment {
                    id: input.to_string(),
                    segment: "subscriptions".into(),
                })
            }
        };

        let resource_group = match pairs.peek() {
            Some((key, _)) if key.eq_ignore_ascii_case("resourceGroups") => {
                pairs.next().map(|(_, v)| v.to_string())
            }
            _ => None,
        };

        let provider = match pairs.next() {
            Some((key, value)) if key.eq_ignore_ascii_case("providers") => Some(value.to_string()),
            Some((key, _)) => {
                return Err(IdError::UnexpectedSegment {
                    id: input.to_string(),
                    found: key.to_string(),
                    expected: "providers".into(),
                })
            }
            None => None,
        };

        let path = pairs.map(|(k, v)| (k.to_string(), v.to_string())).collect();

        Ok(ResourceId { subscription_id, resource_group, provider, path })
    }

    /// Value of the first path segment whose key matches `key` (case-insensitive).
    pub fn segment(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// The innermost name in the path, e.g. `example` for `.../virtualHubs/example`.
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)?;
        if let Some(rg) = &self.resource_group {
            write!(f, "/resourceGroups/{}", rg)?;
        }
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

/// Last `/`-separated segment of an ID; used to recover sub-resource names
/// from the references ARM returns.
pub fn last_segment(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or("")
}
