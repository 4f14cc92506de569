use async_trait::async_trait;
use netarm_client::PollPolicy;
use netarm_domain::{TypedId, VirtualHubId, VirtualWanId};
use netarm_schema::{
    expand_list, flatten_list, require_string, string_list_of, validators, Block, Field, FieldType, ResourceData,
    Schema, SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::common::{base_schema, location_of, set_envelope, str_or_empty, tags_of, Envelope, SubResource};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_virtual_hub";

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHubProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_wan: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_table: Option<HubRouteTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hub_routing_preference: Option<String>,
    #[serde(skip_serializing)]
    pub virtual_router_asn: Option<i64>,
    #[serde(default, skip_serializing)]
    pub virtual_router_ips: Vec<String>,
    #[serde(skip_serializing)]
    pub routing_state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRouteTable {
    #[serde(default)]
    pub routes: Vec<HubRoute>,
}

/// `route` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRoute {
    pub address_prefixes: Vec<String>,
    pub next_hop_ip_address: String,
}

impl Block for HubRoute {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            address_prefixes: string_list_of(raw, "address_prefixes").unwrap_or_default(),
            next_hop_ip_address: require_string(raw, "next_hop_ip_address")?,
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("address_prefixes".into(), self.address_prefixes.clone().into());
        m.insert("next_hop_ip_address".into(), Value::String(self.next_hop_ip_address.clone()));
        m
    }
}

pub(crate) fn flatten_hub(data: &mut ResourceData, id: &VirtualHubId, props: Option<&VirtualHubProperties>) {
    let default = VirtualHubProperties::default();
    let p = props.unwrap_or(&default);
    data.set("virtual_wan_id", p.virtual_wan.as_ref().map(|w| w.id_str().to_string()).unwrap_or_default());
    data.set("address_prefix", str_or_empty(&p.address_prefix));
    data.set("sku", str_or_empty(&p.sku));
    data.set("route", flatten_list(p.route_table.as_ref().map(|t| t.routes.as_slice())));
    data.set("hub_routing_preference", p.hub_routing_preference.clone().unwrap_or_else(|| "ExpressRoute".into()));
    data.set("default_route_table_id", id.default_route_table().id());
    data.set_opt("virtual_router_asn", p.virtual_router_asn);
    data.set("virtual_router_ips", p.virtual_router_ips.clone());
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualHubResource;

impl VirtualHubResource {
    fn expand(data: &ResourceData) -> Result<Envelope<VirtualHubProperties>, ProviderError> {
        let routes: Option<Vec<HubRoute>> = expand_list(data.get("route"))?;
        let props = VirtualHubProperties {
            virtual_wan: data.get_str("virtual_wan_id").filter(|s| !s.is_empty()).map(SubResource::new),
            address_prefix: data.get_str("address_prefix").filter(|s| !s.is_empty()).map(str::to_string),
            sku: data.get_str("sku").filter(|s| !s.is_empty()).map(str::to_string),
            route_table: Some(HubRouteTable { routes: routes.unwrap_or_default() }),
            hub_routing_preference: Some(data.get_str("hub_routing_preference").unwrap_or("ExpressRoute").to_string()),
            ..Default::default()
        };
        Ok(Envelope::new(location_of(data), tags_of(data), props))
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = VirtualHubId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Virtual Hub", &id.name, &id.resource_group);

        let guard = meta.locks.lock(&id.name, TYPE_NAME).await;
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        }

        let body = Self::expand(data)?;
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        wait_for_routing(meta, &id, &context).await?;
        data.set_id(remote_id);
        drop(guard);
        self.read(data, meta).await
    }
}

/// A hub accepts connections and gateways only once its router is
/// provisioned, which finishes after the PUT itself.
async fn wait_for_routing(meta: &ProviderMeta, id: &VirtualHubId, context: &str) -> Result<(), ProviderError> {
    let policy = PollPolicy::default();
    for poll in 0..policy.max_polls {
        let hub = crud::fetch::<Envelope<VirtualHubProperties>>(meta, &id.id(), API_VERSION, context).await?;
        let state = hub.and_then(|h| h.properties).and_then(|p| p.routing_state);
        match state.as_deref() {
            Some("Provisioning") => {
                debug!(id = %id, poll, "waiting for virtual hub routing state");
                tokio::time::sleep(policy.delay(poll)).await;
            }
            Some("Failed") => {
                return Err(ProviderError::Validation(format!("routing of {} failed to provision", context)));
            }
            _ => return Ok(()),
        }
    }
    Err(ProviderError::Validation(format!("routing of {} is still provisioning", context)))
}

#[async_trait]
impl Resource for VirtualHubResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80)
            .field(
                "virtual_wan_id",
                Field::string().optional().force_new().validate(validators::resource_id::<VirtualWanId>()),
            )
            .field("address_prefix", Field::string().optional().force_new().validate(validators::is_cidr()))
            .field("sku", Field::string().optional().validate(validators::string_in_slice(&["Basic", "Standard"])))
            .field(
                "route",
                Field::block_set(
                    Schema::new()
                        .field(
                            "address_prefixes",
                            Field::list(FieldType::String).required().min_items(1).validate(validators::is_cidr()),
                        )
                        .field("next_hop_ip_address", Field::string().required().validate(validators::is_ipv4_address())),
                )
                .optional(),
            )
            .field(
                "hub_routing_preference",
                Field::string()
                    .optional()
                    .default("ExpressRoute")
                    .validate(validators::string_in_slice(&["ExpressRoute", "ASPath", "VpnGateway"])),
            )
            .field("default_route_table_id", Field::string().computed_only())
            .field("virtual_router_asn", Field::int().computed_only())
            .field("virtual_router_ips", Field::list(FieldType::String).computed_only())
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        VirtualHubId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualHubId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Virtual Hub", &id.name, &id.resource_group);
        let Some(hub) = crud::fetch::<Envelope<VirtualHubProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "virtual hub was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &hub);
        flatten_hub(data, &id, hub.properties.as_ref());
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualHubId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Virtual Hub", &id.name, &id.resource_group);
        let _guard = meta.locks.lock(&id.name, TYPE_NAME).await;
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn route_flatten_of_expand_is_identity() {
        let raw = json!([
            { "address_prefixes": ["10.10.0.0/16"], "next_hop_ip_address": "10.0.0.4" },
            { "address_prefixes": ["172.16.0.0/12", "192.168.0.0/16"], "next_hop_ip_address": "10.0.0.5" },
        ]);
        let routes: Option<Vec<HubRoute>> = expand_list(Some(&raw)).unwrap();
        assert_eq!(Value::Array(flatten_list(routes.as_deref())), raw);
    }

    #[test]
    fn flatten_derives_default_route_table() {
        let id = VirtualHubId::new("00000000-0000-0000-0000-000000000000", "rg1", "hub1");
        let mut data = ResourceData::default();
        flatten_hub(&mut data, &id, None);
        assert_eq!(
            data.get_str("default_route_table_id"),
            Some("/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/rg1/providers/Microsoft.Network/virtualHubs/hub1/hubRouteTables/defaultRouteTable")
        );
        assert_eq!(data.get_list("route").len(), 0);
    }

    #[test]
    fn next_hop_must_be_an_address() {
        let cfg = json!({
            "name": "hub1", "resource_group_name": "rg1", "location": "westeurope",
            "address_prefix": "10.0.0.0/23",
            "route": [{ "address_prefixes": ["10.1.0.0/16"], "next_hop_ip_address": "gateway" }],
        });
        let err = VirtualHubResource.check(cfg.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("next_hop_ip_address"), "{err}");
    }
}
