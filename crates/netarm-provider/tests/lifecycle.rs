use std::sync::Arc;

use netarm_client::LocalArm;
use netarm_domain::{NetworkSecurityGroupId, SubnetId, TypedId, VirtualNetworkId};
use netarm_provider::{registry, run, Operation, ProviderError, ProviderMeta};
use netarm_schema::ResourceData;
use serde_json::{json, Map, Value};

const SUB: &str = "00000000-0000-0000-0000-000000000000";

fn data(v: Value) -> ResourceData {
    ResourceData::new(v.as_object().cloned().unwrap_or_else(Map::new))
}

fn nsg_config() -> ResourceData {
    data(json!({
        "name": "nsg1",
        "resource_group_name": "rg1",
        "location": "West Europe",
        "security_rule": [{
            "name": "allow-https",
            "priority": 100,
            "direction": "Inbound",
            "access": "Allow",
            "protocol": "Tcp",
            "source_port_range": "*",
            "destination_port_range": "443",
            "source_address_prefix": "*",
            "destination_address_prefix": "*",
        }],
    }))
}

fn vnet_config() -> ResourceData {
    data(json!({
        "name": "vnet1",
        "resource_group_name": "rg1",
        "location": "westeurope",
        "address_space": ["10.0.0.0/16"],
    }))
}

fn subnet_config(name: &str, prefix: &str) -> ResourceData {
    data(json!({
        "name": name,
        "resource_group_name": "rg1",
        "virtual_network_name": "vnet1",
        "address_prefixes": [prefix],
    }))
}

#[tokio::test]
async fn create_then_read_round_trips() {
    let arm = Arc::new(LocalArm::new());
    let meta = ProviderMeta::new(arm.clone(), SUB);
    let nsg = registry::resource("azurerm_network_security_group").unwrap();

    let mut d = nsg_config();
    run(nsg.as_ref(), Operation::Create, &mut d, &meta).await.unwrap();

    let id = NetworkSecurityGroupId::new(SUB, "rg1", "nsg1");
    assert_eq!(d.id(), Some(id.id().as_str()));
    assert_eq!(d.get_str("location"), Some("westeurope"));
    assert_eq!(d.get_list("security_rule").len(), 1);
    assert_eq!(d.get_list("security_rule")[0]["destination_port_range"], "443");
}

#[tokio::test]
async fn create_over_existing_object_sends_no_put() {
    let arm = Arc::new(LocalArm::new());
    let id = NetworkSecurityGroupId::new(SUB, "rg1", "nsg1");
    arm.insert(&id.id(), json!({ "location": "westeurope", "properties": {} }));
    let meta = ProviderMeta::new(arm.clone(), SUB);
    let nsg = registry::resource("azurerm_network_security_group").unwrap();

    let mut d = nsg_config();
    let err = nsg.create(&mut d, &meta).await.unwrap_err();

    assert!(err.is_already_exists(), "{err}");
    assert!(err.to_string().contains("needs to be imported"), "{err}");
    assert_eq!(arm.requests("PUT"), 0);
    assert!(d.id().is_none());
}

#[tokio::test]
async fn read_of_deleted_object_clears_the_id() {
    let arm = Arc::new(LocalArm::new());
    let meta = ProviderMeta::new(arm.clone(), SUB);
    let vnet = registry::resource("azurerm_virtual_network").unwrap();

    let mut d = vnet_config();
    vnet.create(&mut d, &meta).await.unwrap();
    let id = d.id().unwrap().to_string();
    arm.remove(&id);

    vnet.read(&mut d, &meta).await.unwrap();
    assert!(d.id().is_none());
}

#[tokio::test]
async fn delete_of_missing_object_succeeds() {
    let meta = ProviderMeta::new(Arc::new(LocalArm::new()), SUB);
    let vnet = registry::resource("azurerm_virtual_network").unwrap();
    let mut d = ResourceData::with_id(VirtualNetworkId::new(SUB, "rg1", "gone").id());
    vnet.delete(&mut d, &meta).await.unwrap();
}

#[tokio::test]
async fn import_reads_existing_object() {
    let arm = Arc::new(LocalArm::new());
    let id = VirtualNetworkId::new(SUB, "rg1", "vnet1");
    arm.insert(
        &id.id(),
        json!({ "location": "westeurope", "properties": { "addressSpace": { "addressPrefixes": ["10.1.0.0/16"] } } }),
    );
    let meta = ProviderMeta::new(arm, SUB);
    let vnet = registry::resource("azurerm_virtual_network").unwrap();

    let imported = vnet.import(&id.id(), &meta).await.unwrap();
    assert_eq!(imported.get_str("name"), Some("vnet1"));
    assert_eq!(imported.get_string_list("address_space"), vec!["10.1.0.0/16"]);
}

#[tokio::test]
async fn import_rejects_wrong_type_and_missing_objects() {
    let meta = ProviderMeta::new(Arc::new(LocalArm::new()), SUB);
    let vnet = registry::resource("azurerm_virtual_network").unwrap();

    let nsg = NetworkSecurityGroupId::new(SUB, "rg1", "nsg1");
    let err = vnet.import(&nsg.id(), &meta).await.unwrap_err();
    assert!(err.is_validation(), "{err}");

    let missing = VirtualNetworkId::new(SUB, "rg1", "vnet1");
    let err = vnet.import(&missing.id(), &meta).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)), "{err}");
}

#[tokio::test]
async fn sibling_subnets_are_created_concurrently() {
    let arm = Arc::new(LocalArm::with_async_operations(2));
    let meta = ProviderMeta::new(arm.clone(), SUB);
    let vnet = registry::resource("azurerm_virtual_network").unwrap();
    vnet.create(&mut vnet_config(), &meta).await.unwrap();

    let tasks: Vec<_> = [("app", "10.0.1.0/24"), ("data", "10.0.2.0/24"), ("mgmt", "10.0.3.0/24")]
        .into_iter()
        .map(|(name, prefix)| {
            let meta = meta.clone();
            tokio::spawn(async move {
                let subnet = registry::resource("azurerm_subnet")?;
                let mut d = subnet_config(name, prefix);
                subnet.create(&mut d, &meta).await?;
                Ok::<_, ProviderError>(d)
            })
        })
        .collect();

    for task in tasks {
        let d = task.await.unwrap().unwrap();
        let id = SubnetId::parse(d.id().unwrap()).unwrap();
        assert_eq!(id.virtual_network_name, "vnet1");
        assert!(arm.contains(&id.id()));
    }
}

#[tokio::test]
async fn network_update_keeps_existing_subnets() {
    let arm = Arc::new(LocalArm::new());
    let id = VirtualNetworkId::new(SUB, "rg1", "vnet1");
    arm.insert(
        &id.id(),
        json!({
            "location": "westeurope",
            "properties": {
                "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] },
                "subnets": [{ "name": "app", "properties": { "addressPrefix": "10.0.1.0/24" } }],
            },
        }),
    );
    let meta = ProviderMeta::new(arm.clone(), SUB);
    let vnet = registry::resource("azurerm_virtual_network").unwrap();

    let mut d = vnet_config();
    d.attributes.insert("dns_servers".into(), json!(["10.0.0.4"]));
    d.set_id(id.id());
    vnet.update(&mut d, &meta).await.unwrap();

    let stored = arm.body(&id.id()).unwrap();
    assert_eq!(stored["properties"]["subnets"][0]["name"], "app");
    assert_eq!(stored["properties"]["dhcpOptions"]["dnsServers"][0], "10.0.0.4");
    assert_eq!(d.get_list("subnet")[0]["name"], "app");
}

#[tokio::test]
async fn subnet_without_parent_fails_with_context() {
    let meta = ProviderMeta::new(Arc::new(LocalArm::new()), SUB);
    let subnet = registry::resource("azurerm_subnet").unwrap();
    let err = subnet.create(&mut subnet_config("app", "10.0.1.0/24"), &meta).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Subnet \"app\""), "{msg}");
    assert!(msg.contains("ParentResourceNotFound"), "{msg}");
}
