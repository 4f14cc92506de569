use crate::error::IdError;
use crate::id::ResourceId;

/// A resource ID with a fixed provider namespace and a fixed sequence of
/// type segments. Implemented for each resource type through [`typed_id!`].
pub trait TypedId: Sized + std::fmt::Display {
    /// Provider namespace, e.g. `Microsoft.Network`.
    const PROVIDER: &'static str;
    /// Type tokens in path order, e.g. `["virtualNetworks", "subnets"]`.
    const SEGMENTS: &'static [&'static str];
    /// Human-readable name used in error messages.
    const DESCRIPTION: &'static str;

    fn from_parts(subscription_id: String, resource_group: String, values: Vec<String>) -> Self;

    fn subscription_id(&self) -> &str;
    fn resource_group(&self) -> &str;
    /// Segment values in the same order as [`Self::SEGMENTS`].
    fn values(&self) -> Vec<&str>;

    /// Innermost segment value.
    fn name(&self) -> &str {
        self.values().last().copied().unwrap_or_default()
    }

    fn parse(input: &str) -> Result<Self, IdError> {
        parse_typed(input, false)
    }

    /// Like [`TypedId::parse`] but ignores the casing of segment keys, as ARM
    /// sometimes returns `resourcegroups` or lower-cased type tokens.
    fn parse_insensitively(input: &str) -> Result<Self, IdError> {
        parse_typed(input, true)
    }

    /// Canonical string form.
    fn id(&self) -> String {
        format_typed(self)
    }
}

fn parse_typed<T: TypedId>(input: &str, insensitive: bool) -> Result<T, IdError> {
    let parsed = ResourceId::parse(input)?;

    let resource_group = parsed.resource_group.ok_or_else(|| IdError::MissingSegment {
        id: input.to_string(),
        segment: "resourceGroups".into(),
    })?;

    match &parsed.provider {
        Some(p) if p.eq_ignore_ascii_case(T::PROVIDER) => {}
        Some(p) => {
            return Err(IdError::UnexpectedSegment {
                id: input.to_string(),
                found: p.clone(),
                expected: T::PROVIDER.into(),
            })
        }
        None => {
            return Err(IdError::MissingSegment {
                id: input.to_string(),
                segment: "providers".into(),
            })
        }
    }

    if parsed.path.len() > T::SEGMENTS.len() {
        let (extra, _) = &parsed.path[T::SEGMENTS.len()];
        return Err(IdError::malformed(
            input,
            format!("unexpected trailing segment {:?} for a {} ID", extra, T::DESCRIPTION),
        ));
    }

    let mut values = Vec::with_capacity(T::SEGMENTS.len());
    for (i, expected) in T::SEGMENTS.iter().enumerate() {
        let Some((key, value)) = parsed.path.get(i) else {
            return Err(IdError::MissingSegment {
                id: input.to_string(),
                segment: (*expected).to_string(),
            });
        };
        let matches = if insensitive { key.eq_ignore_ascii_case(expected) } else { key == expected };
        if !matches {
            return Err(IdError::UnexpectedSegment {
                id: input.to_string(),
                found: key.clone(),
                expected: (*expected).to_string(),
            });
        }
        values.push(value.clone());
    }

    Ok(T::from_parts(parsed.subscription_id, resource_group, values))
}

fn format_typed<T: TypedId>(id: &T) -> String {
    let mut out = format!(
        "/subscriptions/{}/resourceGroups/{}/providers/{}",
        id.subscription_id(),
        id.resource_group(),
        T::PROVIDER
    );
    for (segment, value) in T::SEGMENTS.iter().zip(id.values()) {
        out.push('/');
        out.push_str(segment);
        out.push('/');
        out.push_str(value);
    }
    out
}

/// Declare a typed resource ID. The last field is always `name`.
///
/// ```ignore
/// typed_id!(
///     /// A subnet.
///     SubnetId, "Subnet", "Microsoft.Network",
///     [virtual_network_name => "virtualNetworks", name => "subnets"]
/// );
/// ```
#[macro_export]
macro_rules! typed_id {
    ($(#[$meta:meta])* $ty:ident, $desc:literal, $provider:literal, [$($field:ident => $segment:literal),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $ty {
            pub subscription_id: String,
            pub resource_group: String,
            $(pub $field: String,)+
        }

        impl $ty {
            pub fn new(
                subscription_id: impl Into<String>,
                resource_group: impl Into<String>,
                $($field: impl Into<String>,)+
            ) -> Self {
                Self {
                    subscription_id: subscription_id.into(),
                    resource_group: resource_group.into(),
                    $($field: $field.into(),)+
                }
            }
        }

        impl $crate::TypedId for $ty {
            const PROVIDER: &'static str = $provider;
            const SEGMENTS: &'static [&'static str] = &[$($segment),+];
            const DESCRIPTION: &'static str = $desc;

            fn from_parts(subscription_id: String, resource_group: String, values: Vec<String>) -> Self {
                let mut values = values.into_iter();
                Self {
                    subscription_id,
                    resource_group,
                    $($field: values.next().unwrap_or_default(),)+
                }
            }

            fn subscription_id(&self) -> &str {
                &self.subscription_id
            }

            fn resource_group(&self) -> &str {
                &self.resource_group
            }

            fn values(&self) -> Vec<&str> {
                vec![$(self.$field.as_str()),+]
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&$crate::TypedId::id(self))
            }
        }

        impl std::str::FromStr for $ty {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                <$ty as $crate::TypedId>::parse(s)
            }
        }
    };
}
