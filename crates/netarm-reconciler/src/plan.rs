//! Comparing a configuration with stored state.

use std::collections::{HashMap, HashSet};

use netarm_config::{interpolate, references, Block, Configuration, Reference};
use netarm_domain::normalize_location;
use netarm_provider::registry;
use netarm_schema::Schema;
use netarm_store::{config_hash, ResourceAddress, ResourceState, ResourceStatus};
use serde_json::{Map, Value};

use crate::error::ReconcileError;
use crate::graph;
use crate::report::{Action, Change};

pub(crate) type Known = HashMap<ResourceAddress, ResourceState>;

/// Value of a reference from what is known about its target: `id` is the
/// remote ID, anything else is looked up in the cached attributes.
pub(crate) fn resolve(known: &Known, reference: &Reference) -> Option<Value> {
    let state = known.get(&reference.address)?;
    if reference.attribute == "id" {
        return state.id.clone().map(Value::String);
    }
    reference.lookup(&state.attributes)
}

/// Locations are compared in their canonical form, `westeurope` rather
/// than `West Europe`.
fn into_map(value: Value) -> Map<String, Value> {
    let mut config = match value {
        Value::Object(m) => m,
        _ => Map::new(),
    };
    if let Some(Value::String(location)) = config.get_mut("location") {
        if !location.contains("${") {
            *location = normalize_location(location);
        }
    }
    config
}

/// Configuration with every reference replaced. Defaults are filled in by
/// the caller once the result has been checked.
pub(crate) fn resolved_config(block: &Block, known: &Known) -> Result<Map<String, Value>, ReconcileError> {
    let value = interpolate(&Value::Object(block.config.clone()), &|r| resolve(known, r))?;
    Ok(into_map(value))
}

/// Like [`resolved_config`], but references that cannot be resolved yet are
/// left in place so they show up as changed.
fn planned_config(block: &Block, schema: &Schema, known: &Known) -> Result<Map<String, Value>, ReconcileError> {
    let value = interpolate(&Value::Object(block.config.clone()), &|r| {
        resolve(known, r).or_else(|| Some(Value::String(format!("${{{}}}", r))))
    })?;
    let mut config = into_map(value);
    schema.apply_defaults(&mut config);
    Ok(config)
}

/// Blocks in dependency order.
pub fn config_order(config: &Configuration) -> Result<Vec<ResourceAddress>, ReconcileError> {
    let nodes: Vec<(ResourceAddress, Vec<ResourceAddress>)> =
        config.blocks.iter().map(|b| (b.address.clone(), b.dependencies())).collect();
    Ok(graph::order(&nodes, true)?)
}

/// State entries in the order they must be deleted: dependents first.
pub fn teardown_order(states: &[ResourceState]) -> Result<Vec<ResourceAddress>, ReconcileError> {
    let nodes: Vec<(ResourceAddress, Vec<ResourceAddress>)> =
        states.iter().map(|s| (s.address.clone(), s.dependencies.clone())).collect();
    let mut order = graph::order(&nodes, false)?;
    order.reverse();
    Ok(order)
}

fn managed_action(schema: &Schema, state: Option<&ResourceState>, desired: &Map<String, Value>) -> Option<Action> {
    let Some(state) = state.filter(|s| s.id.is_some()) else {
        return Some(Action::Create);
    };
    if state.status == ResourceStatus::Tainted {
        return Some(Action::Replace { fields: Vec::new() });
    }
    if state.config_hash == config_hash(desired) {
        return None;
    }
    let force = schema.force_new_diff(&state.config, desired);
    if !force.is_empty() {
        return Some(Action::Replace { fields: force });
    }
    let fields = schema.diff(&state.config, desired);
    if fields.is_empty() {
        return None;
    }
    Some(Action::Update { fields })
}

/// Top-level fields of `block` that point at a replaced resource, or
/// `depends_on` when the link is only declared explicitly.
fn fields_referencing(block: &Block, replaced: &HashSet<ResourceAddress>) -> Vec<String> {
    let mut fields: Vec<String> = block
        .config
        .iter()
        .filter(|(_, v)| references(v).is_ok_and(|refs| refs.iter().any(|r| replaced.contains(&r.address))))
        .map(|(k, _)| k.clone())
        .collect();
    if fields.is_empty() && block.depends_on.iter().any(|d| replaced.contains(d)) {
        fields.push("depends_on".into());
    }
    fields
}

/// A resource whose dependency is replaced is replaced with it: deleting
/// the dependency takes nested objects such as subnets down too.
fn cascade(block: &Block, action: Option<Action>, replaced: &HashSet<ResourceAddress>) -> Option<Action> {
    if matches!(action, Some(Action::Create) | Some(Action::Replace { .. })) {
        return action;
    }
    if !block.dependencies().iter().any(|d| replaced.contains(d)) {
        return action;
    }
    let mut fields = match action {
        Some(Action::Update { fields }) => fields,
        _ => Vec::new(),
    };
    for field in fields_referencing(block, replaced) {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    Some(Action::Replace { fields })
}

/// Changes needed to bring `states` in line with `config`: deletes of
/// removed resources first, dependents before dependencies, then every
/// declared block in `order`.
pub fn plan_changes(
    config: &Configuration,
    order: &[ResourceAddress],
    states: &[ResourceState],
) -> Result<Vec<Change>, ReconcileError> {
    let known: Known = states.iter().map(|s| (s.address.clone(), s.clone())).collect();
    let mut changes = Vec::new();

    for address in teardown_order(states)? {
        if !address.is_data() && config.get(&address).is_none() {
            changes.push(Change { address, action: Action::Delete });
        }
    }

    let mut replaced = HashSet::new();
    for address in order {
        let Some(block) = config.get(address) else { continue };
        if address.is_data() {
            changes.push(Change { address: address.clone(), action: Action::Read });
            continue;
        }
        let resource = registry::resource(&address.type_name).map_err(ReconcileError::provider(address))?;
        let schema = resource.schema();
        let desired = planned_config(block, &schema, &known)?;
        let action = cascade(block, managed_action(&schema, known.get(address), &desired), &replaced);
        if let Some(action) = action {
            if matches!(action, Action::Replace { .. }) {
                replaced.insert(address.clone());
            }
            changes.push(Change { address: address.clone(), action });
        }
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use netarm_config::load_str;
    use serde_json::json;

    use super::*;

    const DOC: &str = r#"
resources:
  - type: azurerm_public_ip
    name: pip
    config:
      name: pip1
      resource_group_name: rg1
      location: westeurope
      allocation_method: Static
"#;

    fn applied(config: &Configuration, address: &ResourceAddress) -> ResourceState {
        let block = config.get(address).unwrap();
        let schema = registry::resource(&address.type_name).unwrap().schema();
        let mut cfg = resolved_config(block, &Known::new()).unwrap();
        schema.apply_defaults(&mut cfg);
        let mut state = ResourceState::new(address.clone(), cfg);
        state.id = Some("/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Network/publicIPAddresses/pip1".into());
        state.touch(ResourceStatus::Present);
        state
    }

    fn pip() -> ResourceAddress {
        ResourceAddress::managed("azurerm_public_ip", "pip")
    }

    #[test]
    fn unchanged_config_plans_nothing() {
        let cfg = load_str(DOC, "t.yml").unwrap();
        let order = config_order(&cfg).unwrap();
        assert_eq!(plan_changes(&cfg, &order, &[]).unwrap(), vec![Change { address: pip(), action: Action::Create }]);

        let states = vec![applied(&cfg, &pip())];
        assert!(plan_changes(&cfg, &order, &states).unwrap().is_empty());
    }

    #[test]
    fn force_new_change_replaces_and_others_update() {
        let cfg = load_str(DOC, "t.yml").unwrap();
        let states = vec![applied(&cfg, &pip())];

        let changed = load_str(&DOC.replace("location: westeurope", "location: westeurope\n      sku: Basic"), "t.yml").unwrap();
        let order = config_order(&changed).unwrap();
        let plan = plan_changes(&changed, &order, &states).unwrap();
        assert_eq!(plan[0].action, Action::Replace { fields: vec!["sku".into()] });

        let changed = load_str(
            &DOC.replace("location: westeurope", "location: westeurope\n      idle_timeout_in_minutes: 10"),
            "t.yml",
        )
        .unwrap();
        let plan = plan_changes(&changed, &order, &states).unwrap();
        assert_eq!(plan[0].action, Action::Update { fields: vec!["idle_timeout_in_minutes".into()] });
    }

    #[test]
    fn tainted_and_vanished_resources() {
        let cfg = load_str(DOC, "t.yml").unwrap();
        let order = config_order(&cfg).unwrap();

        let mut tainted = applied(&cfg, &pip());
        tainted.touch(ResourceStatus::Tainted);
        let plan = plan_changes(&cfg, &order, &[tainted]).unwrap();
        assert_eq!(plan[0].action, Action::Replace { fields: vec![] });

        let mut vanished = applied(&cfg, &pip());
        vanished.id = None;
        let plan = plan_changes(&cfg, &order, &[vanished]).unwrap();
        assert_eq!(plan[0].action, Action::Create);
    }

    const SPOKE: &str = r#"
resources:
  - type: azurerm_virtual_network
    name: spoke
    config:
      name: vnet-spoke
      resource_group_name: rg1
      location: westeurope
      address_space: ["10.1.0.0/16"]
  - type: azurerm_subnet
    name: app
    config:
      name: app
      resource_group_name: rg1
      virtual_network_name: "${azurerm_virtual_network.spoke.name}"
      address_prefixes: ["10.1.1.0/24"]
  - type: azurerm_network_security_group
    name: nsg
    depends_on: [azurerm_subnet.app]
    config:
      name: nsg1
      resource_group_name: rg1
      location: westeurope
"#;

    fn present(config: &Configuration, address: &ResourceAddress, known: &Known) -> ResourceState {
        let block = config.get(address).unwrap();
        let schema = registry::resource(&address.type_name).unwrap().schema();
        let mut cfg = resolved_config(block, known).unwrap();
        schema.apply_defaults(&mut cfg);
        let mut state = ResourceState::new(address.clone(), cfg);
        state.id = Some(format!("/{}", address));
        state.attributes = state.config.clone();
        state.dependencies = block.dependencies();
        state.touch(ResourceStatus::Present);
        state
    }

    #[test]
    fn replacing_a_parent_replaces_its_dependents() {
        let cfg = load_str(SPOKE, "t.yml").unwrap();
        let order = config_order(&cfg).unwrap();
        let mut known = Known::new();
        for address in &order {
            let state = present(&cfg, address, &known);
            known.insert(address.clone(), state);
        }
        let states: Vec<ResourceState> = order.iter().map(|a| known[a].clone()).collect();
        assert!(plan_changes(&cfg, &order, &states).unwrap().is_empty());

        let moved = load_str(&SPOKE.replacen("location: westeurope", "location: northeurope", 1), "t.yml").unwrap();
        let plan = plan_changes(&moved, &order, &states).unwrap();
        let actions: Vec<(String, Action)> = plan.iter().map(|c| (c.address.to_string(), c.action.clone())).collect();
        assert_eq!(
            actions,
            vec![
                ("azurerm_virtual_network.spoke".into(), Action::Replace { fields: vec!["location".into()] }),
                ("azurerm_subnet.app".into(), Action::Replace { fields: vec!["virtual_network_name".into()] }),
                ("azurerm_network_security_group.nsg".into(), Action::Replace { fields: vec!["depends_on".into()] }),
            ]
        );
    }

    #[test]
    fn removed_blocks_are_deleted_dependents_first() {
        let cfg = load_str("resources: []", "t.yml").unwrap();
        let vnet = ResourceAddress::managed("azurerm_virtual_network", "v");
        let subnet = ResourceAddress::managed("azurerm_subnet", "s");
        let mut subnet_state = ResourceState::new(subnet.clone(), Map::new());
        subnet_state.id = Some("x".into());
        subnet_state.dependencies = vec![vnet.clone()];
        let mut vnet_state = ResourceState::new(vnet.clone(), Map::new());
        vnet_state.id = Some("y".into());

        let plan = plan_changes(&cfg, &[], &[vnet_state, subnet_state]).unwrap();
        let order: Vec<&ResourceAddress> = plan.iter().map(|c| &c.address).collect();
        assert_eq!(order, vec![&subnet, &vnet]);
        assert!(plan.iter().all(|c| c.action == Action::Delete));
    }

    #[test]
    fn references_resolve_against_known_state() {
        let mut known = Known::new();
        let mut hub = ResourceState::new(ResourceAddress::managed("azurerm_virtual_hub", "hub"), Map::new());
        hub.id = Some("/hub".into());
        hub.attributes = json!({ "virtual_router_ips": ["10.0.0.4", "10.0.0.5"] }).as_object().cloned().unwrap();
        known.insert(hub.address.clone(), hub);

        let r = |s: &str| Reference::parse(s).unwrap();
        assert_eq!(resolve(&known, &r("azurerm_virtual_hub.hub.id")), Some(json!("/hub")));
        assert_eq!(resolve(&known, &r("azurerm_virtual_hub.hub.virtual_router_ips.1")), Some(json!("10.0.0.5")));
        assert_eq!(resolve(&known, &r("azurerm_virtual_hub.other.id")), None);
    }
}
