//! Checks run on a whole configuration before any request is sent.

use netarm_config::Configuration;
use netarm_provider::registry;
use netarm_schema::{Schema, SchemaError};
use netarm_store::ResourceAddress;
use serde_json::{Map, Value};

/// Value at a dotted diagnostic path such as `security_rule.0.priority`.
fn value_at<'a>(config: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = config.get(segments.next()?)?;
    for seg in segments {
        current = match current {
            Value::Object(m) => m.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn holds_reference(v: &Value) -> bool {
    match v {
        Value::String(s) => s.contains("${"),
        Value::Array(items) => items.iter().any(holds_reference),
        _ => false,
    }
}

/// Schema-check `config`, ignoring problems with values that are still
/// references: those are only known after their target is applied.
fn check_schema(schema: &Schema, config: &Map<String, Value>) -> Vec<String> {
    match schema.validate(config) {
        Ok(()) => Vec::new(),
        Err(SchemaError::Invalid(diags)) => diags
            .into_iter()
            .filter(|d| !value_at(config, &d.path).is_some_and(holds_reference))
            .map(|d| d.to_string())
            .collect(),
        Err(other) => vec![other.to_string()],
    }
}

/// Schema of a declared block, used to check reference attributes.
fn target_schema(config: &Configuration, target: &ResourceAddress) -> Option<Schema> {
    config.get(target)?;
    if target.is_data() {
        registry::data_source(&target.type_name).ok().map(|d| d.schema())
    } else {
        registry::resource(&target.type_name).ok().map(|r| r.schema())
    }
}

/// Every problem in the configuration, prefixed with the block address.
/// Empty means the configuration can be planned.
pub fn check(config: &Configuration) -> Vec<String> {
    let mut errors = Vec::new();

    for block in &config.blocks {
        let address = &block.address;
        let problems = if address.is_data() {
            match registry::data_source(&address.type_name) {
                Ok(source) => check_schema(&source.schema(), &block.config),
                Err(e) => vec![e.to_string()],
            }
        } else {
            match registry::resource(&address.type_name) {
                Ok(resource) => {
                    let mut p = check_schema(&resource.schema(), &block.config);
                    if p.is_empty() && !holds_reference(&Value::Array(block.config.values().cloned().collect())) {
                        if let Err(e) = resource.validate_config(&block.config) {
                            p.push(e.to_string());
                        }
                    }
                    p
                }
                Err(e) => vec![e.to_string()],
            }
        };
        errors.extend(problems.into_iter().map(|p| format!("{}: {}", address, p)));

        for reference in block.references() {
            let attribute = reference.attribute.split('.').next().unwrap_or_default();
            match target_schema(config, &reference.address) {
                None => errors.push(format!("{}: reference to undeclared {}", address, reference.address)),
                Some(schema) if attribute != "id" && schema.get(attribute).is_none() => errors.push(format!(
                    "{}: {} has no attribute {:?}",
                    address, reference.address, attribute
                )),
                Some(_) => {}
            }
        }
    }
    errors
}
