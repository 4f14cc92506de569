//! `azurerm_application_gateway`, a layer-7 load balancer whose listeners,
//! pools, probes and rules are all nested blocks of a single ARM resource.

mod blocks;
mod validate;
mod wire;

use std::collections::HashMap;

use async_trait::async_trait;
use netarm_domain::{ApplicationGatewayId, PublicIpAddressId, SubnetId, TypedId};
use netarm_schema::{expand_single, flatten_single, validators, Field, FieldType, ResourceData, Schema};
use serde_json::{Map, Value};
use tracing::info;

pub use blocks::GatewayBlock;
use blocks::*;
pub use wire::ApplicationGatewayProperties;

use super::common::{base_schema, location_of, set_envelope, strings, tags_of, Envelope};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::{ProviderMeta, Timeouts};
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_application_gateway";

const SKU_NAMES: &[&str] = &[
    "Basic",
    "Standard_Small",
    "Standard_Medium",
    "Standard_Large",
    "Standard_v2",
    "WAF_Medium",
    "WAF_Large",
    "WAF_v2",
];
const SKU_TIERS: &[&str] = &["Basic", "Standard", "Standard_v2", "WAF", "WAF_v2"];
const PROTOCOLS: &[&str] = &["Http", "Https"];
const SSL_PROTOCOLS: &[&str] = &["TLSv1_0", "TLSv1_1", "TLSv1_2", "TLSv1_3"];

pub type ApplicationGateway = Envelope<ApplicationGatewayProperties>;

// ── Schema ────────────────────────────────────────────────────────────────────

fn id_field() -> Field {
    Field::string().computed_only()
}

fn block_name() -> Field {
    Field::string().required().validate(validators::string_not_empty())
}

fn reference_id() -> Field {
    Field::string().computed_only()
}

fn sku_schema() -> Schema {
    Schema::new()
        .field("name", Field::string().required().validate(validators::string_in_slice(SKU_NAMES)))
        .field("tier", Field::string().required().validate(validators::string_in_slice(SKU_TIERS)))
        .field("capacity", Field::int().optional().validate(validators::int_between(1, 125)))
}

fn backend_http_settings_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("port", Field::int().required().validate(validators::int_between(1, 65535)))
        .field("protocol", Field::string().required().validate(validators::string_in_slice(PROTOCOLS)))
        .field(
            "cookie_based_affinity",
            Field::string().required().validate(validators::string_in_slice(&["Enabled", "Disabled"])),
        )
        .field("request_timeout", Field::int().optional().default(30).validate(validators::int_between(1, 86400)))
        .field("path", Field::string().optional())
        .field("host_name", Field::string().optional())
        .field("pick_host_name_from_backend_address", Field::bool().optional().default(false))
        .field("probe_name", Field::string().optional())
        .field("probe_id", reference_id())
        .field("trusted_root_certificate_names", Field::list(FieldType::String).optional())
}

fn http_listener_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("frontend_ip_configuration_name", block_name())
        .field("frontend_ip_configuration_id", reference_id())
        .field("frontend_port_name", block_name())
        .field("frontend_port_id", reference_id())
        .field("protocol", Field::string().required().validate(validators::string_in_slice(PROTOCOLS)))
        .field("host_name", Field::string().optional())
        .field("host_names", Field::set(FieldType::String).optional())
        .field("ssl_certificate_name", Field::string().optional())
        .field("ssl_certificate_id", reference_id())
        .field("require_sni", Field::bool().optional().default(false))
}

fn probe_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("protocol", Field::string().required().validate(validators::string_in_slice(PROTOCOLS)))
        .field("path", Field::string().required())
        .field("host", Field::string().optional())
        .field("interval", Field::int().required().validate(validators::int_between(1, 86400)))
        .field("timeout", Field::int().required().validate(validators::int_between(1, 86400)))
        .field("unhealthy_threshold", Field::int().required().validate(validators::int_between(1, 20)))
        .field("pick_host_name_from_backend_http_settings", Field::bool().optional().default(false))
        .field("minimum_servers", Field::int().optional().default(0).validate(validators::int_at_least(0)))
        .field(
            "match",
            Field::block(
                Schema::new()
                    .field("body", Field::string().optional())
                    .field("status_code", Field::list(FieldType::String).required().min_items(1)),
            )
            .optional()
            .max_items(1),
        )
}

fn request_routing_rule_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("rule_type", Field::string().required().validate(validators::string_in_slice(&["Basic", "PathBasedRouting"])))
        .field("http_listener_name", block_name())
        .field("http_listener_id", reference_id())
        .field("backend_address_pool_name", Field::string().optional())
        .field("backend_address_pool_id", reference_id())
        .field("backend_http_settings_name", Field::string().optional())
        .field("backend_http_settings_id", reference_id())
        .field("redirect_configuration_name", Field::string().optional())
        .field("redirect_configuration_id", reference_id())
        .field("url_path_map_name", Field::string().optional())
        .field("url_path_map_id", reference_id())
        .field("priority", Field::int().optional().validate(validators::int_between(1, 20000)))
}

fn path_rule_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("paths", Field::list(FieldType::String).required().min_items(1))
        .field("backend_address_pool_name", Field::string().optional())
        .field("backend_address_pool_id", reference_id())
        .field("backend_http_settings_name", Field::string().optional())
        .field("backend_http_settings_id", reference_id())
        .field("redirect_configuration_name", Field::string().optional())
        .field("redirect_configuration_id", reference_id())
}

fn url_path_map_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("default_backend_address_pool_name", Field::string().optional())
        .field("default_backend_address_pool_id", reference_id())
        .field("default_backend_http_settings_name", Field::string().optional())
        .field("default_backend_http_settings_id", reference_id())
        .field("default_redirect_configuration_name", Field::string().optional())
        .field("default_redirect_configuration_id", reference_id())
        .field("path_rule", Field::block(path_rule_schema()).required().min_items(1))
}

fn redirect_configuration_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field(
            "redirect_type",
            Field::string().required().validate(validators::string_in_slice(&["Permanent", "Temporary", "Found", "SeeOther"])),
        )
        .field("target_listener_name", Field::string().optional().conflicts_with(&["target_url"]))
        .field("target_listener_id", reference_id())
        .field("target_url", Field::string().optional().conflicts_with(&["target_listener_name"]))
        .field("include_path", Field::bool().optional().default(false))
        .field("include_query_string", Field::bool().optional().default(false))
}

fn ssl_certificate_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("data", Field::string().optional().sensitive())
        .field("password", Field::string().optional().sensitive())
        .field("key_vault_secret_id", Field::string().optional().validate(validators::key_vault_secret_id()))
        .field("public_cert_data", Field::string().optional().computed().validate(validators::is_base64()))
}

fn trusted_root_certificate_schema() -> Schema {
    Schema::new()
        .field("id", id_field())
        .field("name", block_name())
        .field("data", Field::string().optional().sensitive())
        .field("key_vault_secret_id", Field::string().optional().validate(validators::key_vault_secret_id()))
}

fn waf_schema() -> Schema {
    Schema::new()
        .field("enabled", Field::bool().required())
        .field(
            "firewall_mode",
            Field::string().required().validate(validators::string_in_slice(&["Detection", "Prevention"])),
        )
        .field("rule_set_type", Field::string().optional().default("OWASP"))
        .field("rule_set_version", Field::string().required())
        .field("file_upload_limit_mb", Field::int().optional().default(100).validate(validators::int_between(1, 750)))
        .field("request_body_check", Field::bool().optional().default(true))
        .field(
            "max_request_body_size_kb",
            Field::int().optional().default(128).validate(validators::int_between(1, 128)),
        )
}

fn ssl_policy_schema() -> Schema {
    Schema::new()
        .field("disabled_protocols", Field::list(FieldType::String).optional().validate(validators::string_in_slice(SSL_PROTOCOLS)))
        .field(
            "policy_type",
            Field::string().optional().validate(validators::string_in_slice(&["Custom", "CustomV2", "Predefined"])),
        )
        .field("policy_name", Field::string().optional())
        .field("cipher_suites", Field::list(FieldType::String).optional())
        .field("min_protocol_version", Field::string().optional().validate(validators::string_in_slice(SSL_PROTOCOLS)))
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicationGatewayResource;

impl ApplicationGatewayResource {
    fn expand(data: &ResourceData, id: &ApplicationGatewayId) -> Result<ApplicationGateway, ProviderError> {
        let mut sku: Option<wire::Sku> = expand_single(data.get("sku"))?;
        let autoscale: Option<wire::AutoscaleConfiguration> = expand_single(data.get("autoscale_configuration"))?;
        if autoscale.is_some() {
            if let Some(sku) = sku.as_mut() {
                sku.capacity = None;
            }
        }
        let props = ApplicationGatewayProperties {
            sku,
            autoscale_configuration: autoscale,
            gateway_ip_configurations: expand_blocks::<GatewayIpConfiguration>(data.get("gateway_ip_configuration"), id)?,
            frontend_ports: expand_blocks::<FrontendPort>(data.get("frontend_port"), id)?,
            frontend_ip_configurations: expand_blocks::<FrontendIpConfiguration>(data.get("frontend_ip_configuration"), id)?,
            backend_address_pools: expand_blocks::<BackendAddressPool>(data.get("backend_address_pool"), id)?,
            backend_http_settings_collection: expand_blocks::<BackendHttpSettings>(data.get("backend_http_settings"), id)?,
            http_listeners: expand_blocks::<HttpListener>(data.get("http_listener"), id)?,
            probes: expand_blocks::<Probe>(data.get("probe"), id)?,
            request_routing_rules: expand_blocks::<RequestRoutingRule>(data.get("request_routing_rule"), id)?,
            url_path_maps: expand_blocks::<UrlPathMap>(data.get("url_path_map"), id)?,
            redirect_configurations: expand_blocks::<RedirectConfiguration>(data.get("redirect_configuration"), id)?,
            ssl_certificates: expand_blocks::<SslCertificate>(data.get("ssl_certificate"), id)?,
            trusted_root_certificates: expand_blocks::<TrustedRootCertificate>(data.get("trusted_root_certificate"), id)?,
            web_application_firewall_configuration: expand_single(data.get("waf_configuration"))?,
            ssl_policy: expand_single(data.get("ssl_policy"))?,
            enable_http2: Some(data.get_bool("enable_http2").unwrap_or(false)),
            operational_state: None,
        };
        let mut gateway = Envelope::new(location_of(data), tags_of(data), props);
        let zones = data.get_string_list("zones");
        if !zones.is_empty() {
            gateway.zones = Some(zones);
        }
        Ok(gateway)
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        validate::validate(&data.attributes)?;
        let id = ApplicationGatewayId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Application Gateway", &id.name, &id.resource_group);
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        }

        let body = Self::expand(data, &id)?;
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        data.set_id(remote_id);
        self.read(data, meta).await
    }
}

/// Write-only fields of a named block, keyed by block name, taken from the
/// current data before it is overwritten by a read.
fn write_only(data: &ResourceData, block: &str, fields: &[&str]) -> HashMap<String, Map<String, Value>> {
    data.get_blocks(block)
        .into_iter()
        .filter_map(|b| {
            let name = b.get("name")?.as_str()?.to_string();
            let kept = fields.iter().filter_map(|f| Some((f.to_string(), b.get(*f)?.clone()))).collect();
            Some((name, kept))
        })
        .collect()
}

fn restore_write_only(flattened: Vec<Value>, kept: &HashMap<String, Map<String, Value>>) -> Vec<Value> {
    flattened
        .into_iter()
        .map(|mut v| {
            if let Value::Object(m) = &mut v {
                let name = m.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
                if let Some(fields) = kept.get(&name) {
                    for (k, val) in fields {
                        m.insert(k.clone(), val.clone());
                    }
                }
            }
            v
        })
        .collect()
}

pub(crate) fn flatten_gateway(data: &mut ResourceData, gateway: &ApplicationGateway) {
    data.set("zones", strings(&gateway.zones));
    let props = gateway.properties.clone().unwrap_or_default();
    data.set("sku", flatten_single(props.sku.as_ref()));
    data.set("autoscale_configuration", flatten_single(props.autoscale_configuration.as_ref()));
    data.set("gateway_ip_configuration", flatten_blocks::<GatewayIpConfiguration>(&props.gateway_ip_configurations));
    data.set("frontend_port", flatten_blocks::<FrontendPort>(&props.frontend_ports));
    data.set(
        "frontend_ip_configuration",
        flatten_blocks::<FrontendIpConfiguration>(&props.frontend_ip_configurations),
    );
    data.set("backend_address_pool", flatten_blocks::<BackendAddressPool>(&props.backend_address_pools));
    data.set(
        "backend_http_settings",
        flatten_blocks::<BackendHttpSettings>(&props.backend_http_settings_collection),
    );
    data.set("http_listener", flatten_blocks::<HttpListener>(&props.http_listeners));
    data.set("probe", flatten_blocks::<Probe>(&props.probes));
    data.set("request_routing_rule", flatten_blocks::<RequestRoutingRule>(&props.request_routing_rules));
    data.set("url_path_map", flatten_blocks::<UrlPathMap>(&props.url_path_maps));
    data.set(
        "redirect_configuration",
        flatten_blocks::<RedirectConfiguration>(&props.redirect_configurations),
    );
    data.set("ssl_certificate", flatten_blocks::<SslCertificate>(&props.ssl_certificates));
    data.set(
        "trusted_root_certificate",
        flatten_blocks::<TrustedRootCertificate>(&props.trusted_root_certificates),
    );
    data.set("waf_configuration", flatten_single(props.web_application_firewall_configuration.as_ref()));
    data.set("ssl_policy", flatten_single(props.ssl_policy.as_ref()));
    data.set("enable_http2", props.enable_http2.unwrap_or(false));
    data.set("operational_state", props.operational_state.unwrap_or_default());
}

#[async_trait]
impl Resource for ApplicationGatewayResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80)
            .field("zones", Field::set(FieldType::String).optional().force_new())
            .field("sku", Field::block(sku_schema()).required().max_items(1))
            .field(
                "autoscale_configuration",
                Field::block(
                    Schema::new()
                        .field("min_capacity", Field::int().required().validate(validators::int_between(0, 100)))
                        .field("max_capacity", Field::int().optional().validate(validators::int_between(2, 125))),
                )
                .optional()
                .max_items(1),
            )
            .field(
                "gateway_ip_configuration",
                Field::block(
                    Schema::new()
                        .field("id", id_field())
                        .field("name", block_name())
                        .field("subnet_id", Field::string().required().validate(validators::resource_id::<SubnetId>())),
                )
                .required()
                .min_items(1)
                .max_items(2),
            )
            .field(
                "frontend_port",
                Field::block_set(
                    Schema::new()
                        .field("id", id_field())
                        .field("name", block_name())
                        .field("port", Field::int().required().validate(validators::int_between(1, 65535))),
                )
                .required()
                .min_items(1),
            )
            .field(
                "frontend_ip_configuration",
                Field::block(
                    Schema::new()
                        .field("id", id_field())
                        .field("name", block_name())
                        .field("subnet_id", Field::string().optional().validate(validators::resource_id::<SubnetId>()))
                        .field(
                            "private_ip_address",
                            Field::string().optional().computed().validate(validators::is_ipv4_address()),
                        )
                        .field(
                            "private_ip_address_allocation",
                            Field::string()
                                .optional()
                                .default("Dynamic")
                                .validate(validators::string_in_slice(&["Dynamic", "Static"])),
                        )
                        .field(
                            "public_ip_address_id",
                            Field::string().optional().validate(validators::resource_id::<PublicIpAddressId>()),
                        ),
                )
                .required()
                .min_items(1)
                .max_items(2),
            )
            .field(
                "backend_address_pool",
                Field::block_set(
                    Schema::new()
                        .field("id", id_field())
                        .field("name", block_name())
                        .field("fqdns", Field::set(FieldType::String).optional())
                        .field("ip_addresses", Field::set(FieldType::String).optional()),
                )
                .required()
                .min_items(1),
            )
            .field("backend_http_settings", Field::block_set(backend_http_settings_schema()).required().min_items(1))
            .field("http_listener", Field::block_set(http_listener_schema()).required().min_items(1))
            .field("probe", Field::block_set(probe_schema()).optional())
            .field("request_routing_rule", Field::block_set(request_routing_rule_schema()).required().min_items(1))
            .field("url_path_map", Field::block_set(url_path_map_schema()).optional())
            .field("redirect_configuration", Field::block_set(redirect_configuration_schema()).optional())
            .field("ssl_certificate", Field::block_set(ssl_certificate_schema()).optional())
            .field("trusted_root_certificate", Field::block_set(trusted_root_certificate_schema()).optional())
            .field("waf_configuration", Field::block(waf_schema()).optional().max_items(1))
            .field("ssl_policy", Field::block(ssl_policy_schema()).optional().computed().max_items(1))
            .field("enable_http2", Field::bool().optional().default(false))
            .field("operational_state", Field::string().computed_only())
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts::gateway()
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), ProviderError> {
        validate::validate(config)
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        ApplicationGatewayId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = ApplicationGatewayId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Application Gateway", &id.name, &id.resource_group);
        let Some(gateway) = crud::fetch::<ApplicationGateway>(meta, &id.id(), API_VERSION, &context).await? else {
            info!(id = %id, "application gateway was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        // ARM never returns certificate payloads
        let certs = write_only(data, "ssl_certificate", &["data", "password"]);
        let roots = write_only(data, "trusted_root_certificate", &["data"]);

        set_envelope(data, &id.name, &id.resource_group, &gateway);
        flatten_gateway(data, &gateway);

        let props = gateway.properties.as_ref();
        let flattened = flatten_blocks::<SslCertificate>(props.map(|p| p.ssl_certificates.as_slice()).unwrap_or_default());
        data.set("ssl_certificate", restore_write_only(flattened, &certs));
        let flattened =
            flatten_blocks::<TrustedRootCertificate>(props.map(|p| p.trusted_root_certificates.as_slice()).unwrap_or_default());
        data.set("trusted_root_certificate", restore_write_only(flattened, &roots));
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = ApplicationGatewayId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Application Gateway", &id.name, &id.resource_group);
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use netarm_client::LocalArm;
    use serde_json::json;

    use super::*;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    fn config() -> Map<String, Value> {
        let subnet = format!("/subscriptions/{SUB}/resourceGroups/rg1/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/agw");
        let pip = format!("/subscriptions/{SUB}/resourceGroups/rg1/providers/Microsoft.Network/publicIPAddresses/agw-pip");
        json!({
            "name": "agw1",
            "resource_group_name": "rg1",
            "location": "West Europe",
            "sku": [{ "name": "Standard_v2", "tier": "Standard_v2", "capacity": 2 }],
            "gateway_ip_configuration": [{ "name": "gw-ip", "subnet_id": subnet }],
            "frontend_port": [{ "name": "https", "port": 443 }],
            "frontend_ip_configuration": [{ "name": "public", "public_ip_address_id": pip }],
            "backend_address_pool": [{ "name": "pool", "ip_addresses": ["10.0.2.4"] }],
            "backend_http_settings": [{
                "name": "settings", "port": 80, "protocol": "Http", "cookie_based_affinity": "Disabled",
            }],
            "http_listener": [{
                "name": "listener", "frontend_ip_configuration_name": "public",
                "frontend_port_name": "https", "protocol": "Https", "ssl_certificate_name": "cert",
            }],
            "request_routing_rule": [{
                "name": "rule", "rule_type": "Basic", "http_listener_name": "listener",
                "backend_address_pool_name": "pool", "backend_http_settings_name": "settings", "priority": 10,
            }],
            "ssl_certificate": [{ "name": "cert", "data": "cGZ4", "password": "s3cret" }],
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn config_passes_check() {
        ApplicationGatewayResource.check(&config()).unwrap();
    }

    #[test]
    fn public_certificate_must_be_base64() {
        let mut cfg = config();
        cfg.insert("ssl_certificate".into(), json!([{ "name": "cert", "public_cert_data": "not base64!" }]));
        let err = ApplicationGatewayResource.check(&cfg).unwrap_err().to_string();
        assert!(err.contains("to be a base64 string"), "{err}");

        cfg.insert("ssl_certificate".into(), json!([{ "name": "cert", "public_cert_data": "Y2VydA==" }]));
        ApplicationGatewayResource.check(&cfg).unwrap();
    }

    #[test]
    fn autoscale_drops_fixed_capacity_from_the_request() {
        let mut cfg = config();
        cfg.insert("autoscale_configuration".into(), json!([{ "min_capacity": 1, "max_capacity": 4 }]));
        let data = ResourceData::new(cfg);
        let id = ApplicationGatewayId::new(SUB, "rg1", "agw1");
        let body = serde_json::to_value(ApplicationGatewayResource::expand(&data, &id).unwrap()).unwrap();
        assert!(body["properties"]["sku"].get("capacity").is_none());
        assert_eq!(body["properties"]["autoscaleConfiguration"]["maxCapacity"], 4);
        assert_eq!(
            body["properties"]["requestRoutingRules"][0]["properties"]["httpListener"]["id"],
            json!(id.child("httpListeners", "listener"))
        );
    }

    #[tokio::test]
    async fn certificate_payload_survives_read() {
        let arm = Arc::new(LocalArm::new());
        let meta = ProviderMeta::new(arm.clone(), SUB);
        let mut data = ResourceData::new(config());
        ApplicationGatewayResource.create(&mut data, &meta).await.unwrap();

        // what ARM actually returns: no certificate data
        let id = data.id.clone().unwrap();
        let mut stored = arm.body(&id).unwrap();
        stored["properties"]["sslCertificates"][0]["properties"] = json!({ "publicCertData": "MIIB" });
        arm.insert(&id, stored);

        ApplicationGatewayResource.read(&mut data, &meta).await.unwrap();
        let cert = &data.get_list("ssl_certificate")[0];
        assert_eq!(cert["data"], "cGZ4");
        assert_eq!(cert["password"], "s3cret");
        assert_eq!(cert["public_cert_data"], "MIIB");
        assert_eq!(data.get_str("location"), Some("westeurope"));
        assert_eq!(data.get_list("http_listener")[0]["ssl_certificate_name"], "cert");
    }

    #[tokio::test]
    async fn invalid_config_sends_nothing() {
        let arm = Arc::new(LocalArm::new());
        let meta = ProviderMeta::new(arm.clone(), SUB);
        let mut cfg = config();
        cfg.insert("sku".into(), json!([{ "name": "Basic", "tier": "Basic", "capacity": 5 }]));
        let mut data = ResourceData::new(cfg);
        let err = ApplicationGatewayResource.create(&mut data, &meta).await.unwrap_err();
        assert!(err.is_validation(), "{err}");
        assert_eq!(arm.requests("GET") + arm.requests("PUT"), 0);
    }

    #[tokio::test]
    #[ignore = "requires a Key Vault with soft-delete enabled"]
    async fn key_vault_certificate() {
        let arm = Arc::new(LocalArm::new());
        let meta = ProviderMeta::new(arm, SUB);
        let mut cfg = config();
        cfg.insert(
            "ssl_certificate".into(),
            json!([{ "name": "cert", "key_vault_secret_id": "https://kv1.vault.azure.net/secrets/cert" }]),
        );
        let mut data = ResourceData::new(cfg);
        ApplicationGatewayResource.create(&mut data, &meta).await.unwrap();
    }
}
