use async_trait::async_trait;
use netarm_domain::{TypedId, VirtualHubId, VpnGatewayId};
use netarm_schema::{expand_single, flatten_single, i64_of, validators, Block, Field, ResourceData, Schema, SchemaError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::common::{base_schema, location_of, set_envelope, tags_of, Envelope, SubResource};
use super::virtual_hub::TYPE_NAME as VIRTUAL_HUB_TYPE;
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::{ProviderMeta, Timeouts};
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_vpn_gateway";

const ROUTING_PREFERENCES: &[&str] = &["Microsoft Network", "Internet"];

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpnGatewayProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_hub: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpn_gateway_scale_unit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bgp_settings: Option<BgpSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_routing_preference_internet: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_bgp_route_translation_for_nat: Option<bool>,
}

/// `bgp_settings` block. The peering address is assigned by ARM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpSettings {
    pub asn: i64,
    pub peer_weight: i64,
    #[serde(skip_serializing)]
    pub bgp_peering_address: Option<String>,
}

impl Block for BgpSettings {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            asn: i64_of(raw, "asn").ok_or_else(|| SchemaError::decode("asn", "required value is missing"))?,
            peer_weight: i64_of(raw, "peer_weight").unwrap_or(0),
            bgp_peering_address: None,
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("asn".into(), Value::from(self.asn));
        m.insert("peer_weight".into(), Value::from(self.peer_weight));
        m.insert(
            "bgp_peering_address".into(),
            Value::String(self.bgp_peering_address.clone().unwrap_or_default()),
        );
        m
    }
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct VpnGatewayResource;

impl VpnGatewayResource {
    fn expand(data: &ResourceData) -> Result<Envelope<VpnGatewayProperties>, ProviderError> {
        let bgp: Option<BgpSettings> = expand_single(data.get("bgp_settings"))?;
        let preference = data.get_str("routing_preference").unwrap_or("Microsoft Network");
        let props = VpnGatewayProperties {
            virtual_hub: Some(SubResource::new(data.require_str("virtual_hub_id")?)),
            vpn_gateway_scale_unit: Some(data.get_i64("scale_unit").unwrap_or(1)),
            bgp_settings: bgp,
            is_routing_preference_internet: Some(preference == "Internet"),
            enable_bgp_route_translation_for_nat: Some(data.get_bool("bgp_route_translation_for_nat_enabled").unwrap_or(false)),
        };
        Ok(Envelope::new(location_of(data), tags_of(data), props))
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = VpnGatewayId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let hub = VirtualHubId::parse(data.require_str("virtual_hub_id")?)?;
        let context = crud::describe("VPN Gateway", &id.name, &id.resource_group);

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
impl Resource for VpnGatewayResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80)
            .field(
                "virtual_hub_id",
                Field::string().required().force_new().validate(validators::resource_id::<VirtualHubId>()),
            )
            .field("scale_unit", Field::int().optional().default(1).validate(validators::int_at_least(1)))
            .field(
                "bgp_settings",
                Field::block(
                    Schema::new()
                        .field("asn", Field::int().required().force_new().validate(validators::int_at_least(1)))
                        .field("peer_weight", Field::int().required().force_new().validate(validators::int_between(0, 100)))
                        .field("bgp_peering_address", Field::string().computed_only()),
                )
                .optional()
                .computed()
                .force_new()
                .max_items(1),
            )
            .field(
                "routing_preference",
                Field::string()
                    .optional()
                    .force_new()
                    .default("Microsoft Network")
                    .validate(validators::string_in_slice(ROUTING_PREFERENCES)),
            )
            .field("bgp_route_translation_for_nat_enabled", Field::bool().optional().default(false))
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::gateway()
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        VpnGatewayId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VpnGatewayId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("VPN Gateway", &id.name, &id.resource_group);
        let Some(gw) = crud::fetch::<Envelope<VpnGatewayProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "vpn gateway was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &gw);
        let props = gw.properties.unwrap_or_default();
        data.set(
            "virtual_hub_id",
            props.virtual_hub.as_ref().map(|h| h.id_str().to_string()).unwrap_or_default(),
        );
        data.set("scale_unit", props.vpn_gateway_scale_unit.unwrap_or(1));
        data.set("bgp_settings", flatten_single(props.bgp_settings.as_ref()));
        let preference = if props.is_routing_preference_internet.unwrap_or(false) { "Internet" } else { "Microsoft Network" };
        data.set("routing_preference", preference);
        data.set(
            "bgp_route_translation_for_nat_enabled",
            props.enable_bgp_route_translation_for_nat.unwrap_or(false),
        );
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VpnGatewayId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("VPN Gateway", &id.name, &id.resource_group);
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

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;

    #[test]
    fn gateway_timeouts_are_longer() {
        let t = VpnGatewayResource.timeouts();
        assert_eq!(t.create, Duration::from_secs(90 * 60));
        assert_eq!(t.read, Duration::from_secs(5 * 60));
    }

    #[test]
    fn bgp_peering_address_is_not_sent() {
        let raw = json!([{ "asn": 65515, "peer_weight": 0, "bgp_peering_address": "10.0.0.12" }]);
        let bgp: Option<BgpSettings> = expand_single(Some(&raw)).unwrap();
        let body = serde_json::to_value(bgp.unwrap()).unwrap();
        assert_eq!(body, json!({ "asn": 65515, "peerWeight": 0 }));
    }

    #[test]
    fn internet_preference_maps_to_flag() {
        let data = ResourceData::new(
            json!({
                "name": "vpngw1", "resource_group_name": "rg1", "location": "westeurope",
                "virtual_hub_id": "/subscriptions/s/resourceGroups/rg1/providers/Microsoft.Network/virtualHubs/hub1",
                "routing_preference": "Internet",
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let body = serde_json::to_value(VpnGatewayResource::expand(&data).unwrap()).unwrap();
        assert_eq!(body["properties"]["isRoutingPreferenceInternet"], true);
        assert_eq!(body["properties"]["vpnGatewayScaleUnit"], 1);
    }
}
