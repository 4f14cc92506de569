use std::collections::BTreeMap;
use std::sync::Arc;

use netarm_domain::Diagnostics;
use serde_json::{json, Value};

/// Validation hook attached to a field: `(value, attribute path) -> diagnostics`.
/// For list/set/map fields of primitives it runs once per element.
pub type ValidateFn = Arc<dyn Fn(&Value, &str) -> Diagnostics + Send + Sync>;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    List(Box<FieldType>),
    Set(Box<FieldType>),
    Map(Box<FieldType>),
    /// Repeated nested block. `set` blocks are unordered.
    Block { schema: Schema, set: bool },
}

impl FieldType {
    pub fn name(&self) -> String {
        match self {
            FieldType::String => "string".into(),
            FieldType::Int => "int".into(),
            FieldType::Float => "float".into(),
            FieldType::Bool => "bool".into(),
            FieldType::List(e) => format!("list({})", e.name()),
            FieldType::Set(e) => format!("set({})", e.name()),
            FieldType::Map(e) => format!("map({})", e.name()),
            FieldType::Block { set: false, .. } => "block".into(),
            FieldType::Block { set: true, .. } => "block set".into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// Set only by the provider from the remote response.
    Computed,
    /// May be set by the user; otherwise filled from the remote response.
    OptionalComputed,
}

// ── Field ─────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Field {
    pub ty: FieldType,
    pub presence: Presence,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub max_items: Option<usize>,
    pub min_items: Option<usize>,
    /// Sibling fields that must not be set together with this one.
    pub conflicts_with: Vec<&'static str>,
    /// Sibling fields of which at least one (this one included) must be set.
    pub at_least_one_of: Vec<&'static str>,
    pub validate: Option<ValidateFn>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("ty", &self.ty)
            .field("presence", &self.presence)
            .field("force_new", &self.force_new)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default)
            .field("max_items", &self.max_items)
            .field("min_items", &self.min_items)
            .field("conflicts_with", &self.conflicts_with)
            .field("at_least_one_of", &self.at_least_one_of)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

impl Field {
    fn of(ty: FieldType) -> Self {
        Self {
            ty,
            presence: Presence::Optional,
            force_new: false,
            sensitive: false,
            default: None,
            max_items: None,
            min_items: None,
            conflicts_with: Vec::new(),
            at_least_one_of: Vec::new(),
            validate: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn int() -> Self {
        Self::of(FieldType::Int)
    }

    pub fn float() -> Self {
        Self::of(FieldType::Float)
    }

    pub fn bool() -> Self {
        Self::of(FieldType::Bool)
    }

    pub fn list(elem: FieldType) -> Self {
        Self::of(FieldType::List(Box::new(elem)))
    }

    pub fn set(elem: FieldType) -> Self {
        Self::of(FieldType::Set(Box::new(elem)))
    }

    pub fn map(elem: FieldType) -> Self {
        Self::of(FieldType::Map(Box::new(elem)))
    }

    pub fn block(schema: Schema) -> Self {
        Self::of(FieldType::Block { schema, set: false })
    }

    pub fn block_set(schema: Schema) -> Self {
        Self::of(FieldType::Block { schema, set: true })
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Marks the field computed. Combined with [`Field::optional`] (in either
    /// order) the field becomes optional + computed.
    pub fn computed(mut self) -> Self {
        self.presence = match self.presence {
            Presence::Optional | Presence::OptionalComputed => Presence::OptionalComputed,
            _ => Presence::Computed,
        };
        self
    }

    /// Computed-only field the user can never set.
    pub fn computed_only(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn max_items(mut self, n: usize) -> Self {
        self.max_items = Some(n);
        self
    }

    pub fn min_items(mut self, n: usize) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn conflicts_with(mut self, fields: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(fields);
        self
    }

    pub fn at_least_one_of(mut self, fields: &[&'static str]) -> Self {
        self.at_least_one_of.extend_from_slice(fields);
        self
    }

    pub fn validate(mut self, f: ValidateFn) -> Self {
        self.validate = Some(f);
        self
    }

    pub fn is_user_settable(&self) -> bool {
        self.presence != Presence::Computed
    }

    fn describe(&self) -> Value {
        let mut out = json!({
            "type": self.ty.name(),
            "required": self.presence == Presence::Required,
            "optional": matches!(self.presence, Presence::Optional | Presence::OptionalComputed),
            "computed": matches!(self.presence, Presence::Computed | Presence::OptionalComputed),
            "force_new": self.force_new,
            "sensitive": self.sensitive,
        });
        if let Some(d) = &self.default {
            out["default"] = d.clone();
        }
        if let Some(n) = self.max_items {
            out["max_items"] = json!(n);
        }
        if let Some(n) = self.min_items {
            out["min_items"] = json!(n);
        }
        if !self.conflicts_with.is_empty() {
            out["conflicts_with"] = json!(self.conflicts_with);
        }
        if !self.at_least_one_of.is_empty() {
            out["at_least_one_of"] = json!(self.at_least_one_of);
        }
        if let FieldType::Block { schema, .. } = &self.ty {
            out["block"] = schema.describe();
        }
        out
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// The set of attributes a resource, data source or nested block accepts.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub fields: BTreeMap<&'static str, Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, field: Field) -> Self {
        self.fields.insert(name, field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// JSON description of the schema, served to host runtimes.
    pub fn describe(&self) -> Value {
        let fields: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, f)| (name.to_string(), f.describe()))
            .collect();
        Value::Object(fields)
    }

    /// The read-only view of a resource schema used by its data source:
    /// `keys` become required lookup arguments, everything else is computed.
    pub fn lookup(mut self, keys: &[&'static str]) -> Schema {
        for (name, field) in self.fields.iter_mut() {
            field.force_new = false;
            field.default = None;
            field.conflicts_with.clear();
            field.at_least_one_of.clear();
            if keys.contains(name) {
                field.presence = Presence::Required;
            } else {
                field.presence = Presence::Computed;
                field.validate = None;
                field.min_items = None;
                field.max_items = None;
            }
        }
        for key in keys {
            self.fields.entry(*key).or_insert_with(|| Field::string().required());
        }
        self
    }

    /// Names of fields flagged sensitive at the top level.
    pub fn sensitive_fields(&self) -> Vec<&'static str> {
        self.fields.iter().filter(|(_, f)| f.sensitive).map(|(n, _)| *n).collect()
    }
}
