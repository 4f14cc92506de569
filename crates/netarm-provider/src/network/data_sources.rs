//! Read-only lookups of existing network resources by name.
//!
//! Each data source reuses the schema and the flatten helpers of the managed
//! resource it mirrors, so a looked-up object has the same shape in state.

use async_trait::async_trait;
use netarm_domain::{
    ApplicationGatewayId, NetworkSecurityGroupId, PublicIpAddressId, SubnetId, TypedId, VirtualHubId, VirtualNetworkId,
};
use netarm_schema::{Field, FieldType, ResourceData, Schema};
use serde::de::DeserializeOwned;

use super::application_gateway::{flatten_gateway, ApplicationGateway, ApplicationGatewayResource};
use super::common::{set_envelope, Envelope, Named};
use super::network_security_group::{flatten_security_rules, NetworkSecurityGroupProperties, NetworkSecurityGroupResource};
use super::public_ip::{flatten_public_ip, PublicIp, PublicIpResource};
use super::subnet::{flatten_subnet, SubnetProperties, SubnetResource};
use super::virtual_hub::{flatten_hub, VirtualHubProperties, VirtualHubResource};
use super::virtual_network::{flatten_common, VirtualNetworkProperties, VirtualNetworkResource};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::{DataSource, Resource};

const LOOKUP: &[&str] = &["name", "resource_group_name"];

/// GET the object or fail; a data source never tolerates absence.
async fn lookup<T: DeserializeOwned>(meta: &ProviderMeta, id: &str, context: &str) -> Result<T, ProviderError> {
    crud::fetch::<T>(meta, id, API_VERSION, context)
        .await?
        .ok_or_else(|| ProviderError::NotFound(format!("{} was not found", context)))
}

// ── azurerm_virtual_network ───────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualNetworkDataSource;

#[async_trait]
impl DataSource for VirtualNetworkDataSource {
    fn type_name(&self) -> &'static str {
        super::virtual_network::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        VirtualNetworkResource
            .schema()
            .lookup(LOOKUP)
            .field("subnets", Field::list(FieldType::String).computed_only())
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualNetworkId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Virtual Network", &id.name, &id.resource_group);
        let vnet: Envelope<VirtualNetworkProperties> = lookup(meta, &id.id(), &context).await?;

        data.set_id(id.id());
        set_envelope(data, &id.name, &id.resource_group, &vnet);
        flatten_common(data, vnet.properties.as_ref());
        let names: Vec<String> = vnet
            .properties
            .as_ref()
            .map(|p| p.subnets.iter().filter_map(|s| s.name.clone()).collect())
            .unwrap_or_default();
        data.set("subnets", names);
        Ok(())
    }
}

// ── azurerm_subnet ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct SubnetDataSource;

#[async_trait]
impl DataSource for SubnetDataSource {
    fn type_name(&self) -> &'static str {
        super::subnet::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        SubnetResource
            .schema()
            .lookup(&["name", "resource_group_name", "virtual_network_name"])
            .field("network_security_group_id", Field::string().computed_only())
            .field("route_table_id", Field::string().computed_only())
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = SubnetId::new(
            &meta.subscription_id,
            data.require_str("resource_group_name")?,
            data.require_str("virtual_network_name")?,
            data.require_str("name")?,
        );
        let context = format!(
            "Subnet {:?} (Virtual Network {:?} / Resource Group {:?})",
            id.name, id.virtual_network_name, id.resource_group
        );
        let subnet: Named<SubnetProperties> = lookup(meta, &id.id(), &context).await?;

        data.set_id(id.id());
        let props = subnet.properties.as_ref();
        flatten_subnet(data, props);
        let reference = |r: Option<&super::common::SubResource>| r.map(|r| r.id_str().to_string()).unwrap_or_default();
        data.set(
            "network_security_group_id",
            reference(props.and_then(|p| p.network_security_group.as_ref())),
        );
        data.set("route_table_id", reference(props.and_then(|p| p.route_table.as_ref())));
        Ok(())
    }
}

// ── azurerm_network_security_group ────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkSecurityGroupDataSource;

#[async_trait]
impl DataSource for NetworkSecurityGroupDataSource {
    fn type_name(&self) -> &'static str {
        super::network_security_group::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        NetworkSecurityGroupResource.schema().lookup(LOOKUP)
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = NetworkSecurityGroupId::new(
            &meta.subscription_id,
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );
        let context = crud::describe("Network Security Group", &id.name, &id.resource_group);
        let nsg: Envelope<NetworkSecurityGroupProperties> = lookup(meta, &id.id(), &context).await?;

        data.set_id(id.id());
        set_envelope(data, &id.name, &id.resource_group, &nsg);
        data.set("security_rule", flatten_security_rules(nsg.properties.as_ref()));
        Ok(())
    }
}

// ── azurerm_virtual_hub ───────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualHubDataSource;

#[async_trait]
impl DataSource for VirtualHubDataSource {
    fn type_name(&self) -> &'static str {
        super::virtual_hub::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        VirtualHubResource.schema().lookup(LOOKUP)
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualHubId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Virtual Hub", &id.name, &id.resource_group);
        let hub: Envelope<VirtualHubProperties> = lookup(meta, &id.id(), &context).await?;

        data.set_id(id.id());
        set_envelope(data, &id.name, &id.resource_group, &hub);
        flatten_hub(data, &id, hub.properties.as_ref());
        Ok(())
    }
}

// ── azurerm_public_ip ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct PublicIpDataSource;

#[async_trait]
impl DataSource for PublicIpDataSource {
    fn type_name(&self) -> &'static str {
        super::public_ip::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        PublicIpResource.schema().lookup(LOOKUP)
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = PublicIpAddressId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Public IP Address", &id.name, &id.resource_group);
        let ip: PublicIp = lookup(meta, &id.id(), &context).await?;

        data.set_id(id.id());
        set_envelope(data, &id.name, &id.resource_group, &ip.envelope);
        flatten_public_ip(data, &ip);
        Ok(())
    }
}

// ── azurerm_application_gateway ───────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationGatewayDataSource;

#[async_trait]
impl DataSource for ApplicationGatewayDataSource {
    fn type_name(&self) -> &'static str {
        super::application_gateway::TYPE_NAME
    }

    fn schema(&self) -> Schema {
        ApplicationGatewayResource.schema().lookup(LOOKUP)
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = ApplicationGatewayId::new(
            &meta.subscription_id,
            data.require_str("resource_group_name")?,
            data.require_str("name")?,
        );
        let context = crud::describe("Application Gateway", &id.name, &id.resource_group);
        let gateway: ApplicationGateway = lookup(meta, &id.id(), &context).await?;

        data.set_id(id.id());
        set_envelope(data, &id.name, &id.resource_group, &gateway);
        flatten_gateway(data, &gateway);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use netarm_client::LocalArm;
    use serde_json::{json, Map, Value};

    use super::*;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    fn lookup_data(v: Value) -> ResourceData {
        ResourceData::new(v.as_object().cloned().unwrap_or_else(Map::new))
    }

    #[tokio::test]
    async fn missing_object_is_an_error() {
        let meta = ProviderMeta::new(Arc::new(LocalArm::new()), SUB);
        let mut data = lookup_data(json!({ "name": "nope", "resource_group_name": "rg1" }));
        let err = VirtualNetworkDataSource.read(&mut data, &meta).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert_eq!(err.to_string(), "Virtual Network \"nope\" (Resource Group \"rg1\") was not found");
    }

    #[tokio::test]
    async fn virtual_network_lists_subnet_names() {
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
        let meta = ProviderMeta::new(arm, SUB);
        let mut data = lookup_data(json!({ "name": "vnet1", "resource_group_name": "rg1" }));
        VirtualNetworkDataSource.read(&mut data, &meta).await.unwrap();

        assert_eq!(data.id(), Some(id.id().as_str()));
        assert_eq!(data.get_string_list("subnets"), vec!["app"]);
        assert_eq!(data.get_string_list("address_space"), vec!["10.0.0.0/16"]);
        assert_eq!(data.get_list("subnet")[0]["address_prefix"], "10.0.1.0/24");
    }

    #[test]
    fn lookup_schema_only_accepts_keys() {
        let schema = NetworkSecurityGroupDataSource.schema();
        let ok = json!({ "name": "nsg1", "resource_group_name": "rg1" });
        schema.validate(ok.as_object().unwrap()).unwrap();

        let bad = json!({ "name": "nsg1", "resource_group_name": "rg1", "location": "westeurope" });
        let err = schema.validate(bad.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("location"), "{err}");
    }

    #[test]
    fn lookup_keys_keep_the_name_rules() {
        let cfg = json!({ "name": "vnet1/subnets/app", "resource_group_name": "rg1" });
        let err = VirtualNetworkDataSource.check(cfg.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("name: \"name\" may only contain"), "{err}");

        let cfg = json!({ "name": "app", "resource_group_name": "rg/1", "virtual_network_name": "vnet1" });
        let err = SubnetDataSource.check(cfg.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("resource_group_name: \"resource_group_name\" may only contain"), "{err}");
    }

    #[test]
    fn subnet_lookup_needs_the_network() {
        let cfg = json!({ "name": "app", "resource_group_name": "rg1" });
        let err = SubnetDataSource.check(cfg.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("virtual_network_name"), "{err}");
    }
}
