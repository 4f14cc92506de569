use async_trait::async_trait;
use netarm_domain::{DdosProtectionPlanId, TypedId, VirtualNetworkId};
use netarm_schema::{
    bool_of, expand_single, flatten_single, require_string, validators, Block, Field, FieldType,
    ResourceData, Schema, SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use super::common::{base_schema, location_of, set_envelope, str_or_empty, strings, tags_of, Envelope, Named, SubResource};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_virtual_network";

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DhcpOptions {
    #[serde(default)]
    pub dns_servers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpCommunities {
    pub virtual_network_community: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<DhcpOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_communities: Option<BgpCommunities>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddos_protection_plan: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_ddos_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_timeout_in_minutes: Option<i64>,
    #[serde(skip_serializing)]
    pub resource_guid: Option<String>,
    /// Owned by `azurerm_subnet`; carried over unchanged on update.
    #[serde(default)]
    pub subnets: Vec<Named<Value>>,
}

/// `ddos_protection_plan` block.
#[derive(Debug, Clone, PartialEq)]
pub struct DdosProtection {
    pub id: String,
    pub enable: bool,
}

impl Block for DdosProtection {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self { id: require_string(raw, "id")?, enable: bool_of(raw, "enable").unwrap_or(false) })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("id".into(), Value::String(self.id.clone()));
        m.insert("enable".into(), Value::Bool(self.enable));
        m
    }
}

/// Summary of the subnets currently in the network, as exposed in state.
pub(crate) fn flatten_subnet_summary(subnets: &[Named<Value>]) -> Vec<Value> {
    subnets
        .iter()
        .map(|s| {
            let props = s.properties.as_ref();
            let prefix = props
                .and_then(|p| p.get("addressPrefix"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    props
                        .and_then(|p| p["addressPrefixes"].as_array())
                        .and_then(|a| a.first())
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_default();
            let nsg = props
                .and_then(|p| p["networkSecurityGroup"]["id"].as_str())
                .unwrap_or_default();
            json!({
                "id": s.id.clone().unwrap_or_default(),
                "name": s.name.clone().unwrap_or_default(),
                "address_prefix": prefix,
                "security_group": nsg,
            })
        })
        .collect()
}

pub(crate) fn flatten_common(data: &mut ResourceData, props: Option<&VirtualNetworkProperties>) {
    let Some(p) = props else {
        data.set("address_space", Value::Array(Vec::new()));
        data.set("dns_servers", Value::Array(Vec::new()));
        data.set("subnet", Value::Array(Vec::new()));
        return;
    };
    data.set("address_space", strings(&p.address_space.as_ref().map(|a| a.address_prefixes.clone())));
    data.set("dns_servers", strings(&p.dhcp_options.as_ref().map(|d| d.dns_servers.clone())));
    data.set("guid", str_or_empty(&p.resource_guid));
    data.set("subnet", flatten_subnet_summary(&p.subnets));
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualNetworkResource;

impl VirtualNetworkResource {
    fn expand(data: &ResourceData) -> Result<VirtualNetworkProperties, ProviderError> {
        let ddos: Option<DdosProtection> = expand_single(data.get("ddos_protection_plan"))?;
        Ok(VirtualNetworkProperties {
            address_space: Some(AddressSpace { address_prefixes: data.get_string_list("address_space") }),
            dhcp_options: Some(DhcpOptions { dns_servers: data.get_string_list("dns_servers") }),
            bgp_communities: data
                .get_str("bgp_community")
                .filter(|s| !s.is_empty())
                .map(|c| BgpCommunities { virtual_network_community: c.to_string() }),
            enable_ddos_protection: ddos.as_ref().map(|d| d.enable),
            ddos_protection_plan: ddos.map(|d| SubResource::new(d.id)),
            flow_timeout_in_minutes: data.get_i64("flow_timeout_in_minutes"),
            resource_guid: None,
            subnets: Vec::new(),
        })
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = VirtualNetworkId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Virtual Network", &id.name, &id.resource_group);

        let guard = meta.locks.lock(&id.name, TYPE_NAME).await;

        let mut props = Self::expand(data)?;
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        } else if let Some(existing) =
            crud::fetch::<Envelope<VirtualNetworkProperties>>(meta, &id.id(), API_VERSION, &context).await?
        {
            // a PUT without the current subnets would delete them
            props.subnets = existing.properties.map(|p| p.subnets).unwrap_or_default();
        }

        let body = Envelope::new(location_of(data), tags_of(data), props);
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        data.set_id(remote_id);
        drop(guard);
        self.read(data, meta).await
    }
}

#[async_trait]
impl Resource for VirtualNetworkResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(64)
            .field(
                "address_space",
                Field::list(FieldType::String).required().min_items(1).validate(validators::is_cidr()),
            )
            .field("dns_servers", Field::list(FieldType::String).optional().validate(validators::is_ipv4_address()))
            .field("bgp_community", Field::string().optional().validate(validators::string_not_empty()))
            .field(
                "ddos_protection_plan",
                Field::block(
                    Schema::new()
                        .field("id", Field::string().required().validate(validators::resource_id::<DdosProtectionPlanId>()))
                        .field("enable", Field::bool().required()),
                )
                .optional()
                .max_items(1),
            )
            .field("flow_timeout_in_minutes", Field::int().optional().validate(validators::int_between(4, 30)))
            .field("guid", Field::string().computed_only())
            .field(
                "subnet",
                Field::block_set(
                    Schema::new()
                        .field("id", Field::string().computed_only())
                        .field("name", Field::string().computed_only())
                        .field("address_prefix", Field::string().computed_only())
                        .field("security_group", Field::string().computed_only()),
                )
                .computed_only(),
            )
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        VirtualNetworkId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualNetworkId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Virtual Network", &id.name, &id.resource_group);
        let Some(vnet) = crud::fetch::<Envelope<VirtualNetworkProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "virtual network was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &vnet);
        let props = vnet.properties.as_ref();
        flatten_common(data, props);
        data.set(
            "bgp_community",
            props
                .and_then(|p| p.bgp_communities.as_ref())
                .map(|b| Value::String(b.virtual_network_community.clone()))
                .unwrap_or(Value::Null),
        );
        let ddos = props.and_then(|p| {
            p.ddos_protection_plan.as_ref().map(|plan| DdosProtection {
                id: plan.id_str().to_string(),
                enable: p.enable_ddos_protection.unwrap_or(false),
            })
        });
        data.set("ddos_protection_plan", flatten_single(ddos.as_ref()));
        data.set_opt("flow_timeout_in_minutes", props.and_then(|p| p.flow_timeout_in_minutes));
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualNetworkId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Virtual Network", &id.name, &id.resource_group);
        let _lock = meta.locks.lock(&id.name, TYPE_NAME).await;
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddos_block_round_trip() {
        let raw = json!([{ "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/ddosProtectionPlans/p", "enable": true }]);
        let plan: Option<DdosProtection> = expand_single(Some(&raw)).unwrap();
        assert_eq!(Value::Array(flatten_single(plan.as_ref())), raw);
    }

    #[test]
    fn subnet_summary_prefers_single_prefix() {
        let subnets: Vec<Named<Value>> = serde_json::from_value(json!([
            { "id": "sid", "name": "s1", "properties": { "addressPrefix": "10.0.1.0/24" } },
            { "id": "sid2", "name": "s2", "properties": { "addressPrefixes": ["10.0.2.0/24"], "networkSecurityGroup": { "id": "nsg" } } }
        ]))
        .unwrap();
        let summary = flatten_subnet_summary(&subnets);
        assert_eq!(summary[0]["address_prefix"], "10.0.1.0/24");
        assert_eq!(summary[1]["address_prefix"], "10.0.2.0/24");
        assert_eq!(summary[1]["security_group"], "nsg");
    }

    #[test]
    fn address_space_must_be_cidr() {
        let cfg = json!({
            "name": "vnet1", "resource_group_name": "rg1", "location": "westeurope",
            "address_space": ["10.0.0.0/16", "banana"],
        });
        let err = VirtualNetworkResource.check(cfg.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("address_space.1"), "{err}");
    }
}
