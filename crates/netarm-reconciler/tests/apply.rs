use std::path::Path;
use std::sync::Arc;

use netarm_client::LocalArm;
use netarm_config::{load_dir, load_str, Configuration};
use netarm_domain::{PublicIpAddressId, SubnetId, TypedId, VirtualNetworkId};
use netarm_provider::ProviderMeta;
use netarm_reconciler::{
    apply, destroy, import, plan, reconcile, Action, Change, ReconcileError, ReconcileRequest,
};
use netarm_store::{AuditEvent, InMemoryStore, ResourceAddress, ResourceStatus, StateStore};
use serde_json::json;

const SUB: &str = "00000000-0000-0000-0000-000000000000";

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn spoke() -> Configuration {
    load_dir(&fixture("spoke")).unwrap()
}

fn vnet() -> ResourceAddress {
    ResourceAddress::managed("azurerm_virtual_network", "spoke")
}

fn subnet() -> ResourceAddress {
    ResourceAddress::managed("azurerm_subnet", "app")
}

fn setup() -> (Arc<LocalArm>, ProviderMeta, InMemoryStore) {
    let arm = Arc::new(LocalArm::new());
    let meta = ProviderMeta::new(arm.clone(), SUB);
    (arm, meta, InMemoryStore::new())
}

fn creates(addresses: &[ResourceAddress]) -> Vec<Change> {
    addresses.iter().map(|a| Change { address: a.clone(), action: Action::Create }).collect()
}

#[tokio::test]
async fn dry_run_returns_changes_without_sending_anything() {
    let (arm, meta, store) = setup();
    let req = ReconcileRequest { config_dir: fixture("spoke"), dry_run: true };

    let report = reconcile(req, &store, &meta).await.unwrap();
    assert!(report.dry_run);
    assert_eq!(report.changes, creates(&[vnet(), subnet()]));

    assert!(store.list().await.unwrap().is_empty(), "dry run should not persist state");
    assert_eq!(arm.requests("GET") + arm.requests("PUT"), 0);
}

#[tokio::test]
async fn apply_creates_dependencies_first_and_persists_state() {
    let (arm, meta, store) = setup();

    let report = apply(&spoke(), &store, &meta).await.unwrap();
    assert_eq!(report.changes, creates(&[vnet(), subnet()]));

    let subnet_id = SubnetId::new(SUB, "rg1", "vnet-spoke", "app");
    assert!(arm.contains(&subnet_id.id()));

    let state = store.get(&subnet()).await.unwrap().unwrap();
    assert_eq!(state.id.as_deref(), Some(subnet_id.id().as_str()));
    assert_eq!(state.status, ResourceStatus::Present);
    assert_eq!(state.dependencies, vec![vnet()]);
    assert_eq!(state.config["virtual_network_name"], "vnet-spoke");
    assert_eq!(state.config["private_endpoint_network_policies"], "Disabled");

    let vnet_state = store.get(&vnet()).await.unwrap().unwrap();
    assert_eq!(vnet_state.config["location"], "westeurope");

    let events = store.list_events(None, 100).await.unwrap();
    assert!(matches!(events.first(), Some(AuditEvent::ApplyStarted { .. })));
    assert!(matches!(events.last(), Some(AuditEvent::ApplyCompleted { changes: 2, .. })));
    let created = events.iter().filter(|e| matches!(e, AuditEvent::ResourceCreated { .. })).count();
    assert_eq!(created, 2);
}

#[tokio::test]
async fn second_apply_changes_nothing() {
    let (arm, meta, store) = setup();
    apply(&spoke(), &store, &meta).await.unwrap();
    let puts = arm.requests("PUT");

    let report = apply(&spoke(), &store, &meta).await.unwrap();
    assert_eq!(report.mutations().count(), 0, "{:?}", report.changes);
    assert_eq!(arm.requests("PUT"), puts);

    let planned = plan(&spoke(), &store).await.unwrap();
    assert!(planned.changes.is_empty());
}

#[tokio::test]
async fn invalid_configuration_sends_nothing() {
    let (arm, meta, store) = setup();
    let doc = r#"
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
      virtual_network_name: vnet-spoke
      address_prefixes: ["not-a-cidr"]
"#;
    let err = apply(&load_str(doc, "bad.yml").unwrap(), &store, &meta).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Invalid(ref e) if e.len() == 1), "{err}");
    assert!(err.to_string().contains("azurerm_subnet.app: address_prefixes"), "{err}");
    assert!(err.is_invalid());
    assert_eq!(arm.requests("GET") + arm.requests("PUT"), 0);
}

#[tokio::test]
async fn dependency_cycles_are_rejected() {
    let (_arm, meta, store) = setup();
    let doc = r#"
resources:
  - { type: azurerm_virtual_wan, name: a, depends_on: [azurerm_virtual_wan.b], config: { name: a, resource_group_name: rg1, location: westeurope } }
  - { type: azurerm_virtual_wan, name: b, depends_on: [azurerm_virtual_wan.a], config: { name: b, resource_group_name: rg1, location: westeurope } }
"#;
    let err = apply(&load_str(doc, "cycle.yml").unwrap(), &store, &meta).await.unwrap_err();
    assert!(err.to_string().contains("dependency cycle"), "{err}");
}

#[tokio::test]
async fn removed_block_is_deleted() {
    let (arm, meta, store) = setup();
    apply(&spoke(), &store, &meta).await.unwrap();

    let mut only_vnet = spoke();
    only_vnet.blocks.retain(|b| b.address == vnet());
    let report = apply(&only_vnet, &store, &meta).await.unwrap();

    assert_eq!(report.changes, vec![Change { address: subnet(), action: Action::Delete }]);
    assert!(!arm.contains(&SubnetId::new(SUB, "rg1", "vnet-spoke", "app").id()));
    assert!(store.get(&subnet()).await.unwrap().is_none());
    assert!(store.get(&vnet()).await.unwrap().is_some());
}

#[tokio::test]
async fn vanished_resource_is_recreated() {
    let (arm, meta, store) = setup();
    apply(&spoke(), &store, &meta).await.unwrap();

    let vnet_id = VirtualNetworkId::new(SUB, "rg1", "vnet-spoke").id();
    arm.remove(&vnet_id);

    let report = apply(&spoke(), &store, &meta).await.unwrap();
    assert_eq!(report.vanished, vec![vnet()]);
    assert_eq!(report.changes, creates(&[vnet()]));
    assert!(arm.contains(&vnet_id));

    let vanished = store.list_events(Some(&vnet()), 100).await.unwrap();
    assert!(vanished.iter().any(|e| matches!(e, AuditEvent::ResourceVanished { .. })));
}

#[tokio::test]
async fn force_new_change_replaces_the_resource() {
    let (arm, meta, store) = setup();
    let doc = r#"
resources:
  - type: azurerm_public_ip
    name: pip
    config:
      name: pip1
      resource_group_name: rg1
      location: westeurope
      allocation_method: Static
"#;
    apply(&load_str(doc, "pip.yml").unwrap(), &store, &meta).await.unwrap();
    let id = PublicIpAddressId::new(SUB, "rg1", "pip1").id();
    assert_eq!(arm.body(&id).unwrap()["sku"]["name"], "Standard");

    let changed = doc.replace("allocation_method: Static", "allocation_method: Static\n      sku: Basic");
    let report = apply(&load_str(&changed, "pip.yml").unwrap(), &store, &meta).await.unwrap();
    let pip = ResourceAddress::managed("azurerm_public_ip", "pip");
    assert_eq!(report.changes, vec![Change { address: pip.clone(), action: Action::Replace { fields: vec!["sku".into()] } }]);
    assert_eq!(arm.requests("DELETE"), 1);
    assert_eq!(arm.body(&id).unwrap()["sku"]["name"], "Basic");

    let events = store.list_events(Some(&pip), 100).await.unwrap();
    assert!(matches!(events.last(), Some(AuditEvent::ResourceReplaced { .. })));
}

#[tokio::test]
async fn replacing_a_network_recreates_its_subnet() {
    let (arm, meta, store) = setup();
    apply(&spoke(), &store, &meta).await.unwrap();
    let subnet_id = SubnetId::new(SUB, "rg1", "vnet-spoke", "app").id();

    let mut moved = spoke();
    for b in moved.blocks.iter_mut().filter(|b| b.address == vnet()) {
        b.config.insert("location".into(), json!("North Europe"));
    }
    let planned = plan(&moved, &store).await.unwrap();
    assert_eq!(
        planned.changes,
        vec![
            Change { address: vnet(), action: Action::Replace { fields: vec!["location".into()] } },
            Change { address: subnet(), action: Action::Replace { fields: vec!["virtual_network_name".into()] } },
        ]
    );

    let report = apply(&moved, &store, &meta).await.unwrap();
    assert_eq!(report.changes, planned.changes);
    assert_eq!(arm.requests("DELETE"), 2);
    assert!(arm.contains(&subnet_id));
    assert_eq!(arm.body(&VirtualNetworkId::new(SUB, "rg1", "vnet-spoke").id()).unwrap()["location"], "northeurope");

    let state = store.get(&subnet()).await.unwrap().unwrap();
    assert_eq!(state.id.as_deref(), Some(subnet_id.as_str()));
    assert_eq!(state.status, ResourceStatus::Present);

    let again = apply(&moved, &store, &meta).await.unwrap();
    assert_eq!(again.mutations().count(), 0, "{:?}", again.changes);
}

#[tokio::test]
async fn failed_create_without_remote_object_leaves_no_state() {
    let (_arm, meta, store) = setup();
    let doc = r#"
resources:
  - type: azurerm_subnet
    name: app
    config:
      name: app
      resource_group_name: rg1
      virtual_network_name: missing
      address_prefixes: ["10.1.1.0/24"]
"#;
    let err = apply(&load_str(doc, "orphan.yml").unwrap(), &store, &meta).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("azurerm_subnet.app: "), "{msg}");
    assert!(msg.contains("ParentResourceNotFound"), "{msg}");
    assert!(store.get(&subnet()).await.unwrap().is_none());
}

#[tokio::test]
async fn data_source_feeds_references() {
    let (arm, meta, store) = setup();
    let existing = VirtualNetworkId::new(SUB, "rg-shared", "vnet-shared");
    arm.insert(
        &existing.id(),
        json!({ "location": "westeurope", "properties": { "addressSpace": { "addressPrefixes": ["10.9.0.0/16"] } } }),
    );
    let doc = r#"
data:
  - type: azurerm_virtual_network
    name: shared
    config: { name: vnet-shared, resource_group_name: rg-shared }
resources:
  - type: azurerm_subnet
    name: app
    config:
      name: app
      resource_group_name: "${data.azurerm_virtual_network.shared.resource_group_name}"
      virtual_network_name: "${data.azurerm_virtual_network.shared.name}"
      address_prefixes: ["10.9.1.0/24"]
"#;
    let report = apply(&load_str(doc, "lookup.yml").unwrap(), &store, &meta).await.unwrap();
    let shared = ResourceAddress::data("azurerm_virtual_network", "shared");
    assert_eq!(
        report.changes,
        vec![Change { address: shared.clone(), action: Action::Read }, Change { address: subnet(), action: Action::Create }]
    );
    assert!(arm.contains(&SubnetId::new(SUB, "rg-shared", "vnet-shared", "app").id()));

    let looked_up = store.get(&shared).await.unwrap().unwrap();
    assert_eq!(looked_up.attributes["address_space"], json!(["10.9.0.0/16"]));
}

#[tokio::test]
async fn imported_resource_matches_its_block() {
    let (arm, meta, store) = setup();
    let id = VirtualNetworkId::new(SUB, "rg1", "vnet-spoke");
    arm.insert(
        &id.id(),
        json!({ "location": "westeurope", "properties": { "addressSpace": { "addressPrefixes": ["10.1.0.0/16"] } } }),
    );

    let state = import(&vnet(), &id.id(), &store, &meta).await.unwrap();
    assert_eq!(state.status, ResourceStatus::Present);
    assert_eq!(state.config["address_space"], json!(["10.1.0.0/16"]));
    assert!(!state.config.contains_key("guid"));

    let planned = plan(&spoke(), &store).await.unwrap();
    assert_eq!(planned.changes, creates(&[subnet()]));

    let again = import(&vnet(), &id.id(), &store, &meta).await.unwrap_err();
    assert!(matches!(again, ReconcileError::AlreadyManaged(_)));
}

#[tokio::test]
async fn destroy_deletes_dependents_first() {
    let (arm, meta, store) = setup();
    apply(&spoke(), &store, &meta).await.unwrap();

    let preview = destroy(&store, &meta, true).await.unwrap();
    let order: Vec<ResourceAddress> = preview.changes.iter().map(|c| c.address.clone()).collect();
    assert_eq!(order, vec![subnet(), vnet()]);
    assert_eq!(store.list().await.unwrap().len(), 2);

    destroy(&store, &meta, false).await.unwrap();
    assert!(store.list().await.unwrap().is_empty());
    assert!(!arm.contains(&VirtualNetworkId::new(SUB, "rg1", "vnet-spoke").id()));
    assert_eq!(arm.requests("DELETE"), 2);
}
