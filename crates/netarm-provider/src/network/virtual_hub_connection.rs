use async_trait::async_trait;
use netarm_domain::{HubRouteTableId, HubVirtualNetworkConnectionId, TypedId, VirtualHubId, VirtualNetworkId};
use netarm_schema::{
    expand_single, flatten_single, string_list_of, string_of, validators, Block, Field, FieldType, ResourceData,
    Schema, SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::common::{name_field, Named, SubResource};
use super::virtual_hub::TYPE_NAME as VIRTUAL_HUB_TYPE;
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_virtual_hub_connection";

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConnectionProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_virtual_network: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_internet_security: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_configuration: Option<RoutingConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associated_route_table: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub propagated_route_tables: Option<PropagatedRouteTables>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagatedRouteTables {
    #[serde(default)]
    pub ids: Vec<SubResource>,
    #[serde(default)]
    pub labels: Vec<String>,
}

impl Block for RoutingConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        let ids = string_list_of(raw, "propagated_route_table_ids");
        let labels = string_list_of(raw, "propagated_route_table_labels");
        let propagated = (ids.is_some() || labels.is_some()).then(|| PropagatedRouteTables {
            ids: ids.unwrap_or_default().into_iter().map(SubResource::new).collect(),
            labels: labels.unwrap_or_default(),
        });
        Ok(Self {
            associated_route_table: string_of(raw, "associated_route_table_id")
                .filter(|s| !s.is_empty())
                .map(SubResource::new),
            propagated_route_tables: propagated,
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(
            "associated_route_table_id".into(),
            Value::String(self.associated_route_table.as_ref().map(|r| r.id_str().to_string()).unwrap_or_default()),
        );
        let propagated = self.propagated_route_tables.clone().unwrap_or_default();
        m.insert(
            "propagated_route_table_ids".into(),
            propagated.ids.iter().map(|r| r.id_str().to_string()).collect::<Vec<_>>().into(),
        );
        m.insert("propagated_route_table_labels".into(), propagated.labels.into());
        m
    }
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualHubConnectionResource;

fn describe(id: &HubVirtualNetworkConnectionId) -> String {
    format!(
        "Connection {:?} (Virtual Hub {:?} / Resource Group {:?})",
        id.name, id.virtual_hub_name, id.resource_group
    )
}

impl VirtualHubConnectionResource {
    fn expand(data: &ResourceData) -> Result<Named<HubConnectionProperties>, ProviderError> {
        let routing: Option<RoutingConfiguration> = expand_single(data.get("routing"))?;
        Ok(Named::new(
            data.get_string("name"),
            HubConnectionProperties {
                remote_virtual_network: Some(SubResource::new(data.require_str("remote_virtual_network_id")?)),
                enable_internet_security: Some(data.get_bool("internet_security_enabled").unwrap_or(false)),
                routing_configuration: routing,
            },
        ))
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let hub = VirtualHubId::parse(data.require_str("virtual_hub_id")?)?;
        let id = HubVirtualNetworkConnectionId::new(
            &hub.subscription_id,
            &hub.resource_group,
            &hub.name,
            data.require_str("name")?,
        );
        let context = describe(&id);

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
impl Resource for VirtualHubConnectionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new()
            .field("name", name_field(80))
            .field(
                "virtual_hub_id",
                Field::string().required().force_new().validate(validators::resource_id::<VirtualHubId>()),
            )
            .field(
                "remote_virtual_network_id",
                Field::string().required().force_new().validate(validators::resource_id::<VirtualNetworkId>()),
            )
            .field("internet_security_enabled", Field::bool().optional().default(false))
            .field(
                "routing",
                Field::block(
                    Schema::new()
                        .field(
                            "associated_route_table_id",
                            Field::string().optional().computed().validate(validators::resource_id::<HubRouteTableId>()),
                        )
                        .field("propagated_route_table_ids", Field::list(FieldType::String).optional().computed())
                        .field("propagated_route_table_labels", Field::set(FieldType::String).optional().computed()),
                )
                .optional()
                .computed()
                .max_items(1),
            )
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        HubVirtualNetworkConnectionId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = HubVirtualNetworkConnectionId::parse_insensitively(data.require_id()?)?;
        let context = describe(&id);
        let Some(conn) = crud::fetch::<Named<HubConnectionProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "virtual hub connection was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        let hub = VirtualHubId::new(&id.subscription_id, &id.resource_group, &id.virtual_hub_name);
        data.set("name", id.name.as_str());
        data.set("virtual_hub_id", hub.id());
        let props = conn.properties.unwrap_or_default();
        data.set(
            "remote_virtual_network_id",
            props.remote_virtual_network.as_ref().map(|r| r.id_str().to_string()).unwrap_or_default(),
        );
        data.set("internet_security_enabled", props.enable_internet_security.unwrap_or(false));
        data.set("routing", flatten_single(props.routing_configuration.as_ref()));
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = HubVirtualNetworkConnectionId::parse_insensitively(data.require_id()?)?;
        let context = describe(&id);
        let _guard = meta.locks.lock(&id.virtual_hub_name, VIRTUAL_HUB_TYPE).await;
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}
