use async_trait::async_trait;
use netarm_domain::{HubRouteTableId, P2sVpnGatewayId, TypedId, VirtualHubId, VpnServerConfigurationId};
use netarm_schema::{
    bool_of, expand_single, flatten_single, list_of, require_string, str_of, string_list_of, validators, Block,
    Field, FieldType, ResourceData, Schema, SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::common::{base_schema, location_of, set_envelope, tags_of, Envelope, Named, SubResource};
use super::virtual_hub::TYPE_NAME as VIRTUAL_HUB_TYPE;
use super::virtual_hub_connection::{PropagatedRouteTables, RoutingConfiguration};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::{ProviderMeta, Timeouts};
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_point_to_site_vpn_gateway";

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct P2sVpnGatewayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_hub: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_server_configuration: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_gateway_scale_unit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_dns_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_routing_preference_internet: Option<bool>,
    #[serde(rename = "p2SConnectionConfigurations", default)]
    pub connection_configurations: Vec<ConnectionConfiguration>,
}

pub type ConnectionConfiguration = Named<ConnectionConfigurationProperties>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfigurationProperties {
    pub vpn_client_address_pool: AddressPool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_configuration: Option<RoutingConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_internet_security: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPool {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

/// `route` inside `connection_configuration`.
#[derive(Debug, Clone, PartialEq)]
pub struct P2sRoute(pub RoutingConfiguration);

impl Block for P2sRoute {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        let propagated = match list_of(raw, "propagated_route_table") {
            Some(v) => {
                let block = match v {
                    Value::Array(items) => items.first().and_then(Value::as_object),
                    Value::Object(m) => Some(m),
                    _ => None,
                };
                block.map(|b| PropagatedRouteTables {
                    ids: string_list_of(b, "ids").unwrap_or_default().into_iter().map(SubResource::new).collect(),
                    labels: string_list_of(b, "labels").unwrap_or_default(),
                })
            }
            None => None,
        };
        Ok(Self(RoutingConfiguration {
            associated_route_table: Some(SubResource::new(require_string(raw, "associated_route_table_id")?)),
            propagated_route_tables: propagated,
        }))
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(
            "associated_route_table_id".into(),
            Value::String(self.0.associated_route_table.as_ref().map(|r| r.id_str().to_string()).unwrap_or_default()),
        );
        let propagated: Vec<Value> = self
            .0
            .propagated_route_tables
            .iter()
            .map(|p| {
                let mut b = Map::new();
                b.insert("ids".into(), p.ids.iter().map(|r| r.id_str().to_string()).collect::<Vec<_>>().into());
                b.insert("labels".into(), p.labels.clone().into());
                Value::Object(b)
            })
            .collect();
        m.insert("propagated_route_table".into(), Value::Array(propagated));
        m
    }
}

impl Block for ConnectionConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        let name = require_string(raw, "name")?;
        let pool = match list_of(raw, "vpn_client_address_pool") {
            Some(Value::Array(items)) => items.first().and_then(Value::as_object).cloned(),
            Some(Value::Object(m)) => Some(m.clone()),
            _ => None,
        }
        .ok_or_else(|| SchemaError::decode("vpn_client_address_pool", "required value is missing"))?;
        let route: Option<P2sRoute> = expand_single(raw.get("route"))?;
        Ok(Named::new(
            name,
            ConnectionConfigurationProperties {
                vpn_client_address_pool: AddressPool {
                    address_prefixes: string_list_of(&pool, "address_prefixes").unwrap_or_default(),
                },
                routing_configuration: route.map(|r| r.0),
                enable_internet_security: Some(bool_of(raw, "internet_security_enabled").unwrap_or(false)),
            },
        ))
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("name".into(), Value::String(self.name.clone().unwrap_or_default()));
        let props = self.properties.clone().unwrap_or_default();
        let mut pool = Map::new();
        pool.insert("address_prefixes".into(), props.vpn_client_address_pool.address_prefixes.into());
        m.insert("vpn_client_address_pool".into(), Value::Array(vec![Value::Object(pool)]));
        let route = props.routing_configuration.map(P2sRoute);
        m.insert("route".into(), flatten_single(route.as_ref()).into());
        m.insert("internet_security_enabled".into(), Value::Bool(props.enable_internet_security.unwrap_or(false)));
        m
    }
}

fn connection_configuration_schema() -> Schema {
    Schema::new()
        .field("name", Field::string().required().validate(validators::string_not_empty()))
        .field(
            "vpn_client_address_pool",
            Field::block(
                Schema::new().field(
                    "address_prefixes",
                    Field::set(FieldType::String).required().min_items(1).validate(validators::is_cidr()),
                ),
            )
            .required()
            .max_items(1),
        )
        .field(
            "route",
            Field::block(
                Schema::new()
                    .field(
                        "associated_route_table_id",
                        Field::string().required().validate(validators::resource_id::<HubRouteTableId>()),
                    )
                    .field(
                        "propagated_route_table",
                        Field::block(
                            Schema::new()
                                .field("ids", Field::list(FieldType::String).required().min_items(1))
                                .field("labels", Field::set(FieldType::String).optional().computed()),
                        )
                        .optional()
                        .computed()
                        .max_items(1),
                    ),
            )
            .optional()
            .computed()
            .max_items(1),
        )
        .field("internet_security_enabled", Field::bool().optional().default(false))
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct PointToSiteVpnGatewayResource;

impl PointToSiteVpnGatewayResource {
    fn expand(data: &ResourceData) -> Result<Envelope<P2sVpnGatewayProperties>, ProviderError> {
        let config: Option<ConnectionConfiguration> = expand_single(data.get("connection_configuration"))?;
        let dns = data.get_string_list("dns_servers");
        let props = P2sVpnGatewayProperties {
            virtual_hub: Some(SubResource::new(data.require_str("virtual_hub_id")?)),
            vpn_server_configuration: Some(SubResource::new(data.require_str("vpn_server_configuration_id")?)),
            vpn_gateway_scale_unit: data.get_i64("scale_unit"),
            custom_dns_servers: (!dns.is_empty()).then_some(dns),
            is_routing_preference_internet: Some(data.get_bool("routing_preference_internet_enabled").unwrap_or(false)),
            connection_configurations: config.into_iter().collect(),
        };
        Ok(Envelope::new(location_of(data), tags_of(data), props))
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = P2sVpnGatewayId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let hub = VirtualHubId::parse(data.require_str("virtual_hub_id")?)?;
        let context = crud::describe("Point-to-Site VPN Gateway", &id.name, &id.resource_group);

        let guard = meta.locks.lock(&hub.name, VIRTUAL_HUB_TYPE).await;
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        }

        let body = Self::expand(data)?;
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        data.set_id(remote_id);
        drop(guard);
        self.read(data, meta).await
    }
}

#[async_trait]
impl Resource for PointToSiteVpnGatewayResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80)
            .field(
                "virtual_hub_id",
                Field::string().required().force_new().validate(validators::resource_id::<VirtualHubId>()),
            )
            .field(
                "vpn_server_configuration_id",
                Field::string().required().validate(validators::resource_id::<VpnServerConfigurationId>()),
            )
            .field("scale_unit", Field::int().required().validate(validators::int_at_least(1)))
            .field(
                "connection_configuration",
                Field::block(connection_configuration_schema()).required().max_items(1),
            )
            .field("dns_servers", Field::list(FieldType::String).optional().validate(validators::is_ipv4_address()))
            .field("routing_preference_internet_enabled", Field::bool().optional().force_new().default(false))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::gateway()
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), ProviderError> {
        let Some(hub) = config
            .get("virtual_hub_id")
            .and_then(Value::as_str)
            .and_then(|h| VirtualHubId::parse(h).ok())
        else {
            return Ok(());
        };
        let connection = match config.get("connection_configuration") {
            Some(Value::Array(items)) => items.first().and_then(Value::as_object),
            Some(Value::Object(m)) => Some(m),
            _ => None,
        };
        match connection.and_then(route_table_hub) {
            Some(table_hub) if !table_hub.eq_ignore_ascii_case(&hub.name) => Err(ProviderError::Validation(format!(
                "`connection_configuration.0.route.0.associated_route_table_id` must be a route table of virtual hub {:?}, got one of {:?}",
                hub.name, table_hub
            ))),
            _ => Ok(()),
        }
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        P2sVpnGatewayId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = P2sVpnGatewayId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Point-to-Site VPN Gateway", &id.name, &id.resource_group);
        let Some(gw) = crud::fetch::<Envelope<P2sVpnGatewayProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "point-to-site vpn gateway was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &gw);
        let props = gw.properties.unwrap_or_default();
        data.set(
            "virtual_hub_id",
            props.virtual_hub.as_ref().map(|h| h.id_str().to_string()).unwrap_or_default(),
        );
        data.set(
            "vpn_server_configuration_id",
            props.vpn_server_configuration.as_ref().map(|c| c.id_str().to_string()).unwrap_or_default(),
        );
        data.set_opt("scale_unit", props.vpn_gateway_scale_unit);
        data.set("dns_servers", props.custom_dns_servers.clone().unwrap_or_default());
        data.set("routing_preference_internet_enabled", props.is_routing_preference_internet.unwrap_or(false));
        data.set("connection_configuration", flatten_single(props.connection_configurations.first()));
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = P2sVpnGatewayId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Point-to-Site VPN Gateway", &id.name, &id.resource_group);
        let hub = data
            .get_str("virtual_hub_id")
            .and_then(|h| VirtualHubId::parse_insensitively(h).ok());
        let _guard = match &hub {
            Some(hub) => Some(meta.locks.lock(&hub.name, VIRTUAL_HUB_TYPE).await),
            None => None,
        };
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

/// Name of the hub owning the route table a `route` block associates with.
pub(crate) fn route_table_hub(raw: &Map<String, Value>) -> Option<String> {
    let route = match raw.get("route") {
        Some(Value::Array(items)) => items.first().and_then(Value::as_object),
        Some(Value::Object(m)) => Some(m),
        _ => None,
    }?;
    let table = HubRouteTableId::parse_insensitively(str_of(route, "associated_route_table_id")?).ok()?;
    Some(table.virtual_hub_name)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const HUB: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/virtualHubs/hub1";

    fn connection() -> Value {
        json!({
            "name": "p2s-conn",
            "vpn_client_address_pool": [{ "address_prefixes": ["10.100.0.0/24"] }],
            "route": [{
                "associated_route_table_id": format!("{HUB}/hubRouteTables/defaultRouteTable"),
                "propagated_route_table": [{
                    "ids": [format!("{HUB}/hubRouteTables/defaultRouteTable")],
                    "labels": ["default"],
                }],
            }],
            "internet_security_enabled": true,
        })
    }

    #[test]
    fn connection_flatten_of_expand_is_identity() {
        let raw = connection();
        let conn = ConnectionConfiguration::expand(raw.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(conn.flatten()), raw);
    }

    #[test]
    fn connection_without_route_flattens_empty_route() {
        let raw = json!({
            "name": "p2s-conn",
            "vpn_client_address_pool": [{ "address_prefixes": ["10.100.0.0/24"] }],
        });
        let conn = ConnectionConfiguration::expand(raw.as_object().unwrap()).unwrap();
        let flat = conn.flatten();
        assert_eq!(flat["route"], json!([]));
        assert_eq!(flat["internet_security_enabled"], false);
    }

    #[test]
    fn wire_name_of_connection_configurations() {
        let data = ResourceData::new(
            json!({
                "name": "p2s1", "resource_group_name": "rg1", "location": "westeurope",
                "virtual_hub_id": HUB,
                "vpn_server_configuration_id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/vpnServerConfigurations/cfg1",
                "scale_unit": 1,
                "connection_configuration": [connection()],
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let body = serde_json::to_value(PointToSiteVpnGatewayResource::expand(&data).unwrap()).unwrap();
        let conf = &body["properties"]["p2SConnectionConfigurations"][0];
        assert_eq!(conf["name"], "p2s-conn");
        assert_eq!(conf["properties"]["vpnClientAddressPool"]["addressPrefixes"][0], "10.100.0.0/24");
        assert!(body["properties"].get("customDnsServers").is_none());
    }

    #[test]
    fn route_table_must_belong_to_the_gateway_hub() {
        let cfg = json!({
            "name": "p2s1", "resource_group_name": "rg1", "location": "westeurope",
            "virtual_hub_id": HUB.replace("hub1", "hub2"),
            "vpn_server_configuration_id": "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/vpnServerConfigurations/cfg1",
            "scale_unit": 1,
            "connection_configuration": [connection()],
        });
        let err = PointToSiteVpnGatewayResource.check(cfg.as_object().unwrap()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("hub2"), "{err}");
    }

    #[test]
    fn route_table_hub_reads_parent() {
        let raw = connection();
        assert_eq!(route_table_hub(raw.as_object().unwrap()).as_deref(), Some("hub1"));
    }
}
