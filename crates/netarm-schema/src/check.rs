//! Checking configuration against a [`Schema`], filling defaults and
//! detecting changed fields between a prior state and a new configuration.

use serde_json::{Map, Value};

use crate::error::{Diagnostic, SchemaError};
use crate::schema::{Field, FieldType, Presence, Schema};

/// Treat `null` the same as an absent key.
fn is_set(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Array(a)) => !a.is_empty(),
        Some(_) => true,
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Blocks may be written as a single object or as a list of objects.
fn block_items(v: &Value) -> Option<Vec<&Value>> {
    match v {
        Value::Array(items) => Some(items.iter().collect()),
        Value::Object(_) => Some(vec![v]),
        _ => None,
    }
}

impl Schema {
    /// Check `config` against the schema. All problems are collected and
    /// returned together.
    pub fn validate(&self, config: &Map<String, Value>) -> Result<(), SchemaError> {
        let mut diags = Vec::new();
        self.check_block(config, "", &mut diags);
        if diags.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(diags))
        }
    }

    fn check_block(&self, config: &Map<String, Value>, prefix: &str, diags: &mut Vec<Diagnostic>) {
        for key in config.keys() {
            if !self.fields.contains_key(key.as_str()) {
                diags.push(Diagnostic {
                    path: join_path(prefix, key),
                    message: "unsupported argument".into(),
                });
            }
        }

        // at_least_one_of groups are reported once per group
        let mut reported_groups: Vec<Vec<&str>> = Vec::new();

        for (name, field) in &self.fields {
            let path = join_path(prefix, name);
            let value = config.get(*name);
            let present = is_set(value);

            if !present {
                if field.presence == Presence::Required && field.default.is_none() {
                    diags.push(Diagnostic { path: path.clone(), message: "required argument is missing".into() });
                }
            } else if field.presence == Presence::Computed {
                diags.push(Diagnostic {
                    path: path.clone(),
                    message: "value is computed and cannot be set".into(),
                });
                continue;
            }

            if present {
                for other in &field.conflicts_with {
                    if is_set(config.get(*other)) {
                        diags.push(Diagnostic {
                            path: path.clone(),
                            message: format!("conflicts with {}", join_path(prefix, other)),
                        });
                    }
                }
            }

            if !field.at_least_one_of.is_empty() {
                let mut group: Vec<&str> = field.at_least_one_of.clone();
                if !group.contains(name) {
                    group.push(name);
                }
                group.sort_unstable();
                if !reported_groups.contains(&group) {
                    let any = group.iter().any(|g| is_set(config.get(*g)));
                    if !any {
                        let names: Vec<String> = group.iter().map(|g| join_path(prefix, g)).collect();
                        diags.push(Diagnostic {
                            path: path.clone(),
                            message: format!("one of `{}` must be specified", names.join(",")),
                        });
                    }
                    reported_groups.push(group);
                }
            }

            if let Some(v) = value.filter(|v| !v.is_null()) {
                check_value(field, &field.ty, v, &path, diags);
            }
        }
    }

    /// Fill defaults for unset fields, recursively through blocks, and turn
    /// single-object blocks into one-element lists.
    pub fn apply_defaults(&self, config: &mut Map<String, Value>) {
        for (name, field) in &self.fields {
            let entry = config.get_mut(*name);
            match entry {
                Some(v) if !v.is_null() => {
                    if let FieldType::Block { schema, .. } = &field.ty {
                        if v.is_object() {
                            let single = v.take();
                            *v = Value::Array(vec![single]);
                        }
                        if let Value::Array(items) = v {
                            for item in items.iter_mut() {
                                if let Value::Object(m) = item {
                                    schema.apply_defaults(m);
                                }
                            }
                        }
                    }
                }
                _ => {
                    if let Some(d) = &field.default {
                        config.insert(name.to_string(), d.clone());
                    }
                }
            }
        }
    }

    /// Paths of user-settable fields whose value differs between `prior`
    /// and `config`. Optional+computed fields that are not configured are
    /// skipped since their value comes from the remote side.
    pub fn diff(&self, prior: &Map<String, Value>, config: &Map<String, Value>) -> Vec<String> {
        let mut out = Vec::new();
        self.diff_block(prior, config, "", false, &mut out);
        out
    }

    /// Like [`Schema::diff`] but only reports fields marked force-new, i.e.
    /// changes that require the resource to be replaced.
    pub fn force_new_diff(&self, prior: &Map<String, Value>, config: &Map<String, Value>) -> Vec<String> {
        let mut out = Vec::new();
        self.diff_block(prior, config, "", true, &mut out);
        out
    }

    fn diff_block(
        &self,
        prior: &Map<String, Value>,
        config: &Map<String, Value>,
        prefix: &str,
        force_new_only: bool,
        out: &mut Vec<String>,
    ) {
        for (name, field) in &self.fields {
            if !field.is_user_settable() {
                continue;
            }
            let path = join_path(prefix, name);
            let new = config.get(*name).filter(|v| !v.is_null());
            if new.is_none() && field.presence == Presence::OptionalComputed {
                continue;
            }
            let old = prior.get(*name).filter(|v| !v.is_null());

            match &field.ty {
                FieldType::Block { schema, set } if !force_new_only || !field.force_new => {
                    let old_items = old.and_then(block_items).unwrap_or_default();
                    let new_items = new.and_then(block_items).unwrap_or_default();
                    if old_items.len() != new_items.len() {
                        if !force_new_only || field.force_new || schema.has_force_new() {
                            out.push(path);
                        }
                        continue;
                    }
                    if *set {
                        if !same_multiset(&old_items, &new_items) && (!force_new_only || schema.has_force_new()) {
                            out.push(path);
                        }
                        continue;
                    }
                    let empty = Map::new();
                    for (i, (o, n)) in old_items.iter().zip(new_items.iter()).enumerate() {
                        let o = o.as_object().unwrap_or(&empty);
                        let n = n.as_object().unwrap_or(&empty);
                        schema.diff_block(o, n, &format!("{}.{}", path, i), force_new_only, out);
                    }
                }
                ty => {
                    if force_new_only && !field.force_new {
                        continue;
                    }
                    if !values_equal(ty, old, new) {
                        out.push(path);
                    }
                }
            }
        }
    }

    fn has_force_new(&self) -> bool {
        self.fields.values().any(|f| {
            f.force_new
                || matches!(&f.ty, FieldType::Block { schema, .. } if schema.has_force_new())
        })
    }
}

fn values_equal(ty: &FieldType, old: Option<&Value>, new: Option<&Value>) -> bool {
    let empty = Value::Array(Vec::new());
    match ty {
        FieldType::List(_) | FieldType::Set(_) | FieldType::Block { .. } => {
            let o = old.unwrap_or(&empty);
            let n = new.unwrap_or(&empty);
            match (ty, o, n) {
                (FieldType::Set(_), Value::Array(a), Value::Array(b)) => {
                    let a: Vec<&Value> = a.iter().collect();
                    let b: Vec<&Value> = b.iter().collect();
                    same_multiset(&a, &b)
                }
                _ => o == n,
            }
        }
        FieldType::Map(_) => {
            let empty_map = Value::Object(Map::new());
            old.unwrap_or(&empty_map) == new.unwrap_or(&empty_map)
        }
        _ => old == new,
    }
}

fn same_multiset(a: &[&Value], b: &[&Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a: Vec<String> = a.iter().map(|v| v.to_string()).collect();
    let mut b: Vec<String> = b.iter().map(|v| v.to_string()).collect();
    a.sort();
    b.sort();
    a == b
}

fn type_error(path: &str, expected: &str, diags: &mut Vec<Diagnostic>) {
    diags.push(Diagnostic { path: path.to_string(), message: format!("expected {}", expected) });
}

fn run_validator(field: &Field, v: &Value, path: &str, diags: &mut Vec<Diagnostic>) {
    if let Some(f) = &field.validate {
        let result = f(v, path);
        for e in result.errors {
            diags.push(Diagnostic { path: path.to_string(), message: e });
        }
    }
}

fn check_count(field: &Field, len: usize, path: &str, diags: &mut Vec<Diagnostic>) {
    if let Some(max) = field.max_items {
        if len > max {
            diags.push(Diagnostic {
                path: path.to_string(),
                message: format!("at most {} item(s) allowed, got {}", max, len),
            });
        }
    }
    if let Some(min) = field.min_items {
        if len < min {
            diags.push(Diagnostic {
                path: path.to_string(),
                message: format!("at least {} item(s) required, got {}", min, len),
            });
        }
    }
}

fn check_value(field: &Field, ty: &FieldType, v: &Value, path: &str, diags: &mut Vec<Diagnostic>) {
    match ty {
        FieldType::String => {
            if v.is_string() {
                run_validator(field, v, path, diags);
            } else {
                type_error(path, "a string", diags);
            }
        }
        FieldType::Int => {
            if v.is_i64() || v.is_u64() {
                run_validator(field, v, path, diags);
            } else {
                type_error(path, "an integer", diags);
            }
        }
        FieldType::Float => {
            if v.is_number() {
                run_validator(field, v, path, diags);
            } else {
                type_error(path, "a number", diags);
            }
        }
        FieldType::Bool => {
            if v.is_boolean() {
                run_validator(field, v, path, diags);
            } else {
                type_error(path, "a bool", diags);
            }
        }
        FieldType::List(elem) | FieldType::Set(elem) => {
            let Value::Array(items) = v else {
                return type_error(path, "a list", diags);
            };
            check_count(field, items.len(), path, diags);
            if matches!(ty, FieldType::Set(_)) {
                let refs: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                for (i, item) in refs.iter().enumerate() {
                    if refs[..i].contains(item) {
                        diags.push(Diagnostic {
                            path: format!("{}.{}", path, i),
                            message: format!("duplicate set element {}", item),
                        });
                    }
                }
            }
            for (i, item) in items.iter().enumerate() {
                check_value(field, elem, item, &format!("{}.{}", path, i), diags);
            }
        }
        FieldType::Map(elem) => {
            let Value::Object(entries) = v else {
                return type_error(path, "a map", diags);
            };
            for (k, item) in entries {
                check_value(field, elem, item, &format!("{}.{}", path, k), diags);
            }
        }
        FieldType::Block { schema, .. } => {
            let Some(items) = block_items(v) else {
                return type_error(path, "a block", diags);
            };
            check_count(field, items.len(), path, diags);
            for (i, item) in items.iter().enumerate() {
                match item.as_object() {
                    Some(m) => schema.check_block(m, &format!("{}.{}", path, i), diags),
                    None => type_error(&format!("{}.{}", path, i), "a block", diags),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validators::int_between;

    fn rule_schema() -> Schema {
        Schema::new()
            .field("name", Field::string().required().force_new())
            .field("location", Field::string().required().force_new())
            .field("tags", Field::map(FieldType::String).optional())
            .field("guid", Field::string().computed_only())
            .field("dns_servers", Field::list(FieldType::String).optional())
            .field("address_space", Field::set(FieldType::String).required().min_items(1))
            .field(
                "rule",
                Field::block_set(
                    Schema::new()
                        .field("name", Field::string().required())
                        .field("priority", Field::int().required().validate(int_between(100, 4096)))
                        .field("source_port_range", Field::string().optional().conflicts_with(&["source_port_ranges"]))
                        .field("source_port_ranges", Field::set(FieldType::String).optional()),
                )
                .optional(),
            )
            .field("sku", Field::string().optional().default("Basic"))
            .field("fqdn", Field::string().optional().computed())
            .field("allocation_a", Field::string().optional().at_least_one_of(&["allocation_b"]))
            .field("allocation_b", Field::string().optional().at_least_one_of(&["allocation_a"]))
    }

    fn base() -> Map<String, Value> {
        json!({
            "name": "n1",
            "location": "westeurope",
            "address_space": ["10.0.0.0/16"],
            "allocation_a": "x",
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn paths(err: SchemaError) -> Vec<String> {
        err.diagnostics().iter().map(|d| d.path.clone()).collect()
    }

    #[test]
    fn minimal_config_is_valid() {
        rule_schema().validate(&base()).unwrap();
    }

    #[test]
    fn missing_required_and_unknown_fields() {
        let mut cfg = base();
        cfg.remove("location");
        cfg.insert("bogus".into(), json!(1));
        let p = paths(rule_schema().validate(&cfg).unwrap_err());
        assert!(p.contains(&"location".to_string()));
        assert!(p.contains(&"bogus".to_string()));
    }

    #[test]
    fn computed_only_cannot_be_set() {
        let mut cfg = base();
        cfg.insert("guid".into(), json!("abc"));
        assert_eq!(paths(rule_schema().validate(&cfg).unwrap_err()), vec!["guid"]);
    }

    #[test]
    fn nested_validation_attaches_to_block_path() {
        let mut cfg = base();
        cfg.insert(
            "rule".into(),
            json!([
                { "name": "ok", "priority": 100 },
                { "name": "bad", "priority": 5000, "source_port_range": "*", "source_port_ranges": ["80"] }
            ]),
        );
        let err = rule_schema().validate(&cfg).unwrap_err();
        let p = paths(err);
        assert!(p.contains(&"rule.1.priority".to_string()), "{p:?}");
        assert!(p.contains(&"rule.1.source_port_range".to_string()), "{p:?}");
        assert!(!p.iter().any(|x| x.starts_with("rule.0")));
    }

    #[test]
    fn min_items_and_type_mismatch() {
        let mut cfg = base();
        cfg.insert("address_space".into(), json!([]));
        cfg.insert("dns_servers".into(), json!("1.1.1.1"));
        let p = paths(rule_schema().validate(&cfg).unwrap_err());
        assert!(p.contains(&"address_space".to_string()));
        assert!(p.contains(&"dns_servers".to_string()));
    }

    #[test]
    fn at_least_one_of_reported_once() {
        let mut cfg = base();
        cfg.remove("allocation_a");
        let err = rule_schema().validate(&cfg).unwrap_err();
        assert_eq!(err.diagnostics().len(), 1);
        assert!(err.diagnostics()[0].message.contains("allocation_a"));
    }

    #[test]
    fn defaults_are_filled_and_blocks_normalised() {
        let mut cfg = base();
        cfg.insert("rule".into(), json!({ "name": "r", "priority": 200 }));
        rule_schema().apply_defaults(&mut cfg);
        assert_eq!(cfg["sku"], "Basic");
        assert!(cfg["rule"].is_array());
    }

    #[test]
    fn diff_ignores_computed_and_unconfigured_optional_computed() {
        let schema = rule_schema();
        let mut prior = base();
        prior.insert("guid".into(), json!("g"));
        prior.insert("fqdn".into(), json!("x.example"));
        let cfg = base();
        assert!(schema.diff(&prior, &cfg).is_empty());

        let mut changed = base();
        changed.insert("tags".into(), json!({ "env": "prod" }));
        assert_eq!(schema.diff(&prior, &changed), vec!["tags"]);
        assert!(schema.force_new_diff(&prior, &changed).is_empty());
    }

    #[test]
    fn force_new_diff_reports_replacement_fields() {
        let schema = rule_schema();
        let prior = base();
        let mut cfg = base();
        cfg.insert("location".into(), json!("northeurope"));
        assert_eq!(schema.force_new_diff(&prior, &cfg), vec!["location"]);
    }

    #[test]
    fn set_order_does_not_matter() {
        let schema = rule_schema();
        let mut prior = base();
        prior.insert("address_space".into(), json!(["10.0.0.0/16", "10.1.0.0/16"]));
        let mut cfg = base();
        cfg.insert("address_space".into(), json!(["10.1.0.0/16", "10.0.0.0/16"]));
        assert!(schema.diff(&prior, &cfg).is_empty());
    }
}
