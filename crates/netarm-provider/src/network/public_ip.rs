use async_trait::async_trait;
use netarm_domain::{PublicIpAddressId, TypedId};
use netarm_schema::{validators, Field, FieldType, ResourceData, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::common::{base_schema, location_of, set_envelope, str_or_empty, strings, tags_of, Envelope};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_public_ip";

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpSku {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_name_label: Option<String>,
    #[serde(skip_serializing)]
    pub fqdn: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpProperties {
    #[serde(rename = "publicIPAllocationMethod")]
    pub public_ip_allocation_method: String,
    #[serde(rename = "publicIPAddressVersion", skip_serializing_if = "Option::is_none")]
    pub public_ip_address_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<DnsSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<i64>,
    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
}

/// Public IP envelope; the SKU sits beside `properties`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicIp {
    #[serde(flatten)]
    pub envelope: Envelope<PublicIpProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<PublicIpSku>,
}

pub(crate) fn flatten_public_ip(data: &mut ResourceData, ip: &PublicIp) {
    data.set("zones", strings(&ip.envelope.zones));
    data.set("sku", ip.sku.as_ref().map(|s| s.name.clone()).unwrap_or_else(|| "Basic".into()));
    data.set(
        "sku_tier",
        ip.sku.as_ref().and_then(|s| s.tier.clone()).unwrap_or_else(|| "Regional".into()),
    );
    let Some(p) = ip.envelope.properties.as_ref() else {
        return;
    };
    data.set("allocation_method", p.public_ip_allocation_method.as_str());
    data.set("ip_version", p.public_ip_address_version.clone().unwrap_or_else(|| "IPv4".into()));
    data.set_opt("idle_timeout_in_minutes", p.idle_timeout_in_minutes);
    data.set("ip_address", str_or_empty(&p.ip_address));
    let dns = p.dns_settings.as_ref();
    data.set("domain_name_label", str_or_empty(&dns.and_then(|d| d.domain_name_label.clone())));
    data.set("fqdn", str_or_empty(&dns.and_then(|d| d.fqdn.clone())));
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct PublicIpResource;

impl PublicIpResource {
    fn expand(data: &ResourceData) -> PublicIp {
        let props = PublicIpProperties {
            public_ip_allocation_method: data.get_string("allocation_method"),
            public_ip_address_version: Some(data.get_str("ip_version").unwrap_or("IPv4").to_string()),
            dns_settings: data
                .get_str("domain_name_label")
                .filter(|s| !s.is_empty())
                .map(|label| DnsSettings { domain_name_label: Some(label.to_string()), fqdn: None }),
            idle_timeout_in_minutes: data.get_i64("idle_timeout_in_minutes"),
            ip_address: None,
        };
        let mut envelope = Envelope::new(location_of(data), tags_of(data), props);
        let zones = data.get_string_list("zones");
        if !zones.is_empty() {
            envelope.zones = Some(zones);
        }
        PublicIp {
            envelope,
            sku: Some(PublicIpSku {
                name: data.get_str("sku").unwrap_or("Standard").to_string(),
                tier: Some(data.get_str("sku_tier").unwrap_or("Regional").to_string()),
            }),
        }
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = PublicIpAddressId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Public IP Address", &id.name, &id.resource_group);
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
impl Resource for PublicIpResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80)
            .field(
                "allocation_method",
                Field::string().required().validate(validators::string_in_slice(&["Static", "Dynamic"])),
            )
            .field(
                "sku",
                Field::string()
                    .optional()
                    .force_new()
                    .default("Standard")
                    .validate(validators::string_in_slice(&["Basic", "Standard"])),
            )
            .field(
                "sku_tier",
                Field::string()
                    .optional()
                    .force_new()
                    .default("Regional")
                    .validate(validators::string_in_slice(&["Regional", "Global"])),
            )
            .field(
                "ip_version",
                Field::string()
                    .optional()
                    .force_new()
                    .default("IPv4")
                    .validate(validators::string_in_slice(&["IPv4", "IPv6"])),
            )
            .field("zones", Field::set(FieldType::String).optional().force_new())
            .field("domain_name_label", Field::string().optional().validate(validators::string_not_empty()))
            .field("idle_timeout_in_minutes", Field::int().optional().default(4).validate(validators::int_between(4, 30)))
            .field("ip_address", Field::string().computed_only())
            .field("fqdn", Field::string().computed_only())
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), ProviderError> {
        let sku = config.get("sku").and_then(Value::as_str).unwrap_or("Standard");
        let method = config.get("allocation_method").and_then(Value::as_str).unwrap_or_default();
        if sku.eq_ignore_ascii_case("Standard") && method.eq_ignore_ascii_case("Dynamic") {
            return Err(ProviderError::Validation(
                "Static IP allocation must be used when creating Standard SKU public IP addresses".into(),
            ));
        }
        Ok(())
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        PublicIpAddressId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = PublicIpAddressId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Public IP Address", &id.name, &id.resource_group);
        let Some(ip) = crud::fetch::<PublicIp>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "public ip address was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &ip.envelope);
        flatten_public_ip(data, &ip);
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = PublicIpAddressId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Public IP Address", &id.name, &id.resource_group);
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(extra: Value) -> Map<String, Value> {
        let mut m = json!({ "name": "pip1", "resource_group_name": "rg1", "location": "westeurope" })
            .as_object()
            .cloned()
            .unwrap();
        m.extend(extra.as_object().cloned().unwrap());
        m
    }

    #[test]
    fn standard_sku_requires_static_allocation() {
        let cfg = config(json!({ "allocation_method": "Dynamic", "sku": "Standard" }));
        assert!(PublicIpResource.check(&cfg).unwrap_err().is_validation());
        let cfg = config(json!({ "allocation_method": "Dynamic", "sku": "Basic" }));
        PublicIpResource.check(&cfg).unwrap();
    }

    #[test]
    fn idle_timeout_range() {
        let cfg = config(json!({ "allocation_method": "Static", "idle_timeout_in_minutes": 31 }));
        assert!(PublicIpResource.check(&cfg).is_err());
    }

    #[test]
    fn sku_sits_beside_properties() {
        let data = ResourceData::new(config(json!({ "allocation_method": "Static", "zones": ["1", "2"] })));
        let body = serde_json::to_value(PublicIpResource::expand(&data)).unwrap();
        assert_eq!(body["sku"]["name"], "Standard");
        assert_eq!(body["properties"]["publicIPAllocationMethod"], "Static");
        assert_eq!(body["zones"], json!(["1", "2"]));
    }

    #[test]
    fn flatten_reads_computed_address() {
        let ip: PublicIp = serde_json::from_value(json!({
            "location": "westeurope",
            "sku": { "name": "Standard", "tier": "Regional" },
            "properties": {
                "publicIPAllocationMethod": "Static",
                "ipAddress": "20.1.2.3",
                "dnsSettings": { "domainNameLabel": "app", "fqdn": "app.westeurope.cloudapp.azure.com" }
            }
        }))
        .unwrap();
        let mut data = ResourceData::default();
        flatten_public_ip(&mut data, &ip);
        assert_eq!(data.get_str("ip_address"), Some("20.1.2.3"));
        assert_eq!(data.get_str("fqdn"), Some("app.westeurope.cloudapp.azure.com"));
        assert_eq!(data.get_str("ip_version"), Some("IPv4"));
    }
}
