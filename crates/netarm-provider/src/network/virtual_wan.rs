use async_trait::async_trait;
use netarm_domain::{TypedId, VirtualWanId};
use netarm_schema::{validators, Field, ResourceData, Schema};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::common::{base_schema, location_of, set_envelope, tags_of, Envelope};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_virtual_wan";

const BREAKOUT_CATEGORIES: &[&str] = &["All", "None", "Optimize", "OptimizeAndAllow"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualWanProperties {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub wan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_vpn_encryption: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_branch_to_branch_traffic: Option<bool>,
    #[serde(rename = "office365LocalBreakoutCategory", skip_serializing_if = "Option::is_none")]
    pub office365_local_breakout_category: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualWanResource;

impl VirtualWanResource {
    fn expand(data: &ResourceData) -> Envelope<VirtualWanProperties> {
        let props = VirtualWanProperties {
            wan_type: Some(data.get_str("type").unwrap_or("Standard").to_string()),
            disable_vpn_encryption: Some(data.get_bool("disable_vpn_encryption").unwrap_or(false)),
            allow_branch_to_branch_traffic: Some(data.get_bool("allow_branch_to_branch_traffic").unwrap_or(true)),
            office365_local_breakout_category: Some(
                data.get_str("office365_local_breakout_category").unwrap_or("None").to_string(),
            ),
        };
        Envelope::new(location_of(data), tags_of(data), props)
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = VirtualWanId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Virtual WAN", &id.name, &id.resource_group);
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        }

        let body = Self::expand(data);
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        data.set_id(remote_id);
        self.read(data, meta).await
    }
}

#[async_trait]
impl Resource for VirtualWanResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80)
            .field(
                "type",
                Field::string().optional().default("Standard").validate(validators::string_in_slice(&["Basic", "Standard"])),
            )
            .field("disable_vpn_encryption", Field::bool().optional().default(false))
            .field("allow_branch_to_branch_traffic", Field::bool().optional().default(true))
            .field(
                "office365_local_breakout_category",
                Field::string().optional().default("None").validate(validators::string_in_slice(BREAKOUT_CATEGORIES)),
            )
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        VirtualWanId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualWanId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Virtual WAN", &id.name, &id.resource_group);
        let Some(wan) = crud::fetch::<Envelope<VirtualWanProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "virtual wan was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &wan);
        let p = wan.properties.unwrap_or_default();
        data.set("type", p.wan_type.unwrap_or_else(|| "Standard".into()));
        data.set("disable_vpn_encryption", p.disable_vpn_encryption.unwrap_or(false));
        data.set("allow_branch_to_branch_traffic", p.allow_branch_to_branch_traffic.unwrap_or(true));
        data.set(
            "office365_local_breakout_category",
            p.office365_local_breakout_category.unwrap_or_else(|| "None".into()),
        );
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = VirtualWanId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Virtual WAN", &id.name, &id.resource_group);
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn body_fills_defaults() {
        let data = ResourceData::new(
            json!({ "name": "wan1", "resource_group_name": "rg1", "location": "West US 2" })
                .as_object()
                .cloned()
                .unwrap(),
        );
        let body = serde_json::to_value(VirtualWanResource::expand(&data)).unwrap();
        assert_eq!(body["location"], "westus2");
        assert_eq!(body["properties"]["type"], "Standard");
        assert_eq!(body["properties"]["allowBranchToBranchTraffic"], true);
        assert_eq!(body["properties"]["office365LocalBreakoutCategory"], "None");
    }

    #[test]
    fn rejects_unknown_breakout_category() {
        let cfg = json!({
            "name": "wan1", "resource_group_name": "rg1", "location": "westus2",
            "office365_local_breakout_category": "Sometimes",
        });
        assert!(VirtualWanResource.check(cfg.as_object().unwrap()).is_err());
    }
}
