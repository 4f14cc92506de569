use async_trait::async_trait;
use netarm_domain::{SubnetId, TypedId};
use netarm_schema::{
    expand_list, expand_single, flatten_list, flatten_single, require_string, string_list_of, validators, Block,
    Field, FieldType, ResourceData, Schema, SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::common::{name_field, resource_group_field, Named, SubResource};
use super::API_VERSION;
use super::virtual_network::TYPE_NAME as VIRTUAL_NETWORK_TYPE;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_subnet";

const ENDPOINT_POLICIES: &[&str] = &["Disabled", "Enabled", "NetworkSecurityGroupEnabled", "RouteTableEnabled"];

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(skip_serializing)]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
    #[serde(default)]
    pub service_endpoints: Vec<ServiceEndpoint>,
    #[serde(default)]
    pub delegations: Vec<Delegation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_endpoint_network_policies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_outbound_access: Option<bool>,
    /// Associations managed elsewhere; kept as found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table: Option<SubResource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    pub service: String,
}

pub type Delegation = Named<DelegationProperties>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationProperties {
    pub service_name: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// `service_delegation` nested inside a `delegation` block.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDelegation {
    pub name: String,
    pub actions: Vec<String>,
}

impl Block for ServiceDelegation {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            name: require_string(raw, "name")?,
            actions: string_list_of(raw, "actions").unwrap_or_default(),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("actions".into(), self.actions.clone().into());
        m
    }
}

impl Block for Delegation {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        let name = require_string(raw, "name")?;
        let service: ServiceDelegation = expand_single(raw.get("service_delegation"))?
            .ok_or_else(|| SchemaError::decode("service_delegation", "required value is missing"))?;
        Ok(Named::new(name, DelegationProperties { service_name: service.name, actions: service.actions }))
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("name".into(), Value::String(self.name.clone().unwrap_or_default()));
        let service = self
            .properties
            .as_ref()
            .map(|p| ServiceDelegation { name: p.service_name.clone(), actions: p.actions.clone() });
        m.insert("service_delegation".into(), flatten_single(service.as_ref()).into());
        m
    }
}

fn flatten_prefixes(props: &SubnetProperties) -> Vec<String> {
    match (&props.address_prefixes, &props.address_prefix) {
        (Some(list), _) if !list.is_empty() => list.clone(),
        (_, Some(single)) => vec![single.clone()],
        _ => Vec::new(),
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

fn delegation_schema() -> Schema {
    Schema::new()
        .field("name", Field::string().required().validate(validators::string_not_empty()))
        .field(
            "service_delegation",
            Field::block(
                Schema::new()
                    .field("name", Field::string().required().validate(validators::string_not_empty()))
                    .field("actions", Field::set(FieldType::String).optional()),
            )
            .required()
            .max_items(1),
        )
}

pub(crate) fn flatten_subnet(data: &mut ResourceData, props: Option<&SubnetProperties>) {
    let default = SubnetProperties::default();
    let p = props.unwrap_or(&default);
    data.set("address_prefixes", flatten_prefixes(p));
    data.set(
        "service_endpoints",
        p.service_endpoints.iter().map(|s| s.service.clone()).collect::<Vec<_>>(),
    );
    data.set("delegation", flatten_list(Some(p.delegations.as_slice())));
    data.set(
        "private_endpoint_network_policies",
        p.private_endpoint_network_policies.clone().unwrap_or_else(|| "Disabled".to_string()),
    );
    data.set("default_outbound_access_enabled", p.default_outbound_access.unwrap_or(true));
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct SubnetResource;

impl SubnetResource {
    fn expand(data: &ResourceData) -> Result<SubnetProperties, ProviderError> {
        let delegations: Option<Vec<Delegation>> = expand_list(data.get("delegation"))?;
        Ok(SubnetProperties {
            address_prefix: None,
            address_prefixes: Some(data.get_string_list("address_prefixes")),
            service_endpoints: data
                .get_string_list("service_endpoints")
                .into_iter()
                .map(|service| ServiceEndpoint { service })
                .collect(),
            delegations: delegations.unwrap_or_default(),
            private_endpoint_network_policies: Some(
                data.get_str("private_endpoint_network_policies").unwrap_or("Disabled").to_string(),
            ),
            default_outbound_access: Some(data.get_bool("default_outbound_access_enabled").unwrap_or(true)),
            network_security_group: None,
            route_table: None,
        })
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
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

        let guard = meta.locks.lock(&id.virtual_network_name, VIRTUAL_NETWORK_TYPE).await;

        let mut props = Self::expand(data)?;
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        } else if let Some(existing) = crud::fetch::<Named<SubnetProperties>>(meta, &id.id(), API_VERSION, &context).await? {
            if let Some(current) = existing.properties {
                props.network_security_group = current.network_security_group;
                props.route_table = current.route_table;
            }
        }

        let body = Named::new(id.name.clone(), props);
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        data.set_id(remote_id);
        drop(guard);
        self.read(data, meta).await
    }
}

#[async_trait]
impl Resource for SubnetResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field("name", name_field(80))
            .field("resource_group_name", resource_group_field())
            .field("virtual_network_name", name_field(64))
            .field(
                "address_prefixes",
                Field::list(FieldType::String).required().min_items(1).validate(validators::is_cidr()),
            )
            .field("service_endpoints", Field::set(FieldType::String).optional())
            .field("delegation", Field::block(delegation_schema()).optional())
            .field(
                "private_endpoint_network_policies",
                Field::string().optional().default("Disabled").validate(validators::string_in_slice(ENDPOINT_POLICIES)),
            )
            .field("default_outbound_access_enabled", Field::bool().optional().default(true))
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        SubnetId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = SubnetId::parse_insensitively(data.require_id()?)?;
        let context = format!("Subnet {:?} (Virtual Network {:?})", id.name, id.virtual_network_name);
        let Some(subnet) = crud::fetch::<Named<SubnetProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "subnet was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        data.set("name", id.name.as_str());
        data.set("resource_group_name", id.resource_group.as_str());
        data.set("virtual_network_name", id.virtual_network_name.as_str());
        flatten_subnet(data, subnet.properties.as_ref());
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = SubnetId::parse_insensitively(data.require_id()?)?;
        let context = format!("Subnet {:?} (Virtual Network {:?})", id.name, id.virtual_network_name);
        let _guard = meta.locks.lock(&id.virtual_network_name, VIRTUAL_NETWORK_TYPE).await;
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn delegation_flatten_of_expand_is_identity() {
        let raw = json!({
            "name": "aci",
            "service_delegation": [{
                "name": "Microsoft.ContainerInstance/containerGroups",
                "actions": ["Microsoft.Network/virtualNetworks/subnets/action"],
            }]
        });
        let d = Delegation::expand(raw.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(d.flatten()), raw);
    }

    #[test]
    fn delegation_needs_service() {
        let raw = json!({ "name": "aci" });
        let err = Delegation::expand(raw.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("service_delegation"), "{err}");
    }

    #[test]
    fn single_prefix_is_flattened_as_list() {
        let props = SubnetProperties { address_prefix: Some("10.0.1.0/24".into()), ..Default::default() };
        let mut data = ResourceData::default();
        flatten_subnet(&mut data, Some(&props));
        assert_eq!(data.get_string_list("address_prefixes"), vec!["10.0.1.0/24"]);
        assert_eq!(data.get_str("private_endpoint_network_policies"), Some("Disabled"));
        assert_eq!(data.get_bool("default_outbound_access_enabled"), Some(true));
    }
}
