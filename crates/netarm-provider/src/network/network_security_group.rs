use async_trait::async_trait;
use netarm_domain::{NetworkSecurityGroupId, TypedId};
use netarm_schema::{
    expand_list, flatten_list, i64_of, require_string, string_list_of, string_of, validators, Block, Field,
    FieldType, ResourceData, Schema, SchemaError,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::common::{base_schema, location_of, set_envelope, str_or_empty, strings, tags_of, Envelope, Named, SubResource};
use super::API_VERSION;
use crate::crud;
use crate::error::ProviderError;
use crate::meta::ProviderMeta;
use crate::resource::Resource;

pub const TYPE_NAME: &str = "azurerm_network_security_group";

// ── Wire model ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupProperties {
    #[serde(default)]
    pub security_rules: Vec<SecurityRule>,
    #[serde(skip_serializing)]
    pub subnets: Option<Vec<SubResource>>,
    #[serde(skip_serializing)]
    pub network_interfaces: Option<Vec<SubResource>>,
}

pub type SecurityRule = Named<SecurityRuleProperties>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_address_prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address_prefixes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_application_security_groups: Option<Vec<SubResource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_application_security_groups: Option<Vec<SubResource>>,
    pub access: String,
    pub priority: i64,
    pub direction: String,
}

fn asg_refs(raw: &Map<String, Value>, key: &str) -> Option<Vec<SubResource>> {
    string_list_of(raw, key).map(|ids| ids.into_iter().map(SubResource::new).collect())
}

fn asg_ids(refs: &Option<Vec<SubResource>>) -> Value {
    Value::Array(
        refs.iter()
            .flatten()
            .filter_map(|r| r.id.clone())
            .map(Value::String)
            .collect(),
    )
}

impl Block for SecurityRule {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        let name = require_string(raw, "name")?;
        let props = SecurityRuleProperties {
            description: string_of(raw, "description"),
            protocol: require_string(raw, "protocol")?,
            source_port_range: string_of(raw, "source_port_range"),
            source_port_ranges: string_list_of(raw, "source_port_ranges"),
            destination_port_range: string_of(raw, "destination_port_range"),
            destination_port_ranges: string_list_of(raw, "destination_port_ranges"),
            source_address_prefix: string_of(raw, "source_address_prefix"),
            source_address_prefixes: string_list_of(raw, "source_address_prefixes"),
            destination_address_prefix: string_of(raw, "destination_address_prefix"),
            destination_address_prefixes: string_list_of(raw, "destination_address_prefixes"),
            source_application_security_groups: asg_refs(raw, "source_application_security_group_ids"),
            destination_application_security_groups: asg_refs(raw, "destination_application_security_group_ids"),
            access: require_string(raw, "access")?,
            priority: i64_of(raw, "priority").ok_or_else(|| SchemaError::decode("priority", "required value is missing"))?,
            direction: require_string(raw, "direction")?,
        };
        Ok(Named::new(name, props))
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("name".into(), str_or_empty(&self.name));
        let Some(p) = &self.properties else {
            return m;
        };
        m.insert("description".into(), str_or_empty(&p.description));
        m.insert("protocol".into(), Value::String(p.protocol.clone()));
        m.insert("source_port_range".into(), str_or_empty(&p.source_port_range));
        m.insert("source_port_ranges".into(), strings(&p.source_port_ranges));
        m.insert("destination_port_range".into(), str_or_empty(&p.destination_port_range));
        m.insert("destination_port_ranges".into(), strings(&p.destination_port_ranges));
        m.insert("source_address_prefix".into(), str_or_empty(&p.source_address_prefix));
        m.insert("source_address_prefixes".into(), strings(&p.source_address_prefixes));
        m.insert("destination_address_prefix".into(), str_or_empty(&p.destination_address_prefix));
        m.insert("destination_address_prefixes".into(), strings(&p.destination_address_prefixes));
        m.insert(
            "source_application_security_group_ids".into(),
            asg_ids(&p.source_application_security_groups),
        );
        m.insert(
            "destination_application_security_group_ids".into(),
            asg_ids(&p.destination_application_security_groups),
        );
        m.insert("access".into(), Value::String(p.access.clone()));
        m.insert("priority".into(), Value::from(p.priority));
        m.insert("direction".into(), Value::String(p.direction.clone()));
        m
    }
}

// ── Schema ────────────────────────────────────────────────────────────────────

pub(crate) fn security_rule_schema() -> Schema {
    Schema::new()
        .field("name", Field::string().required().validate(validators::string_not_empty()))
        .field("description", Field::string().optional().validate(validators::string_not_empty()))
        .field(
            "protocol",
            Field::string().required().validate(validators::string_in_slice(&["Tcp", "Udp", "Icmp", "Esp", "Ah", "*"])),
        )
        .field(
            "source_port_range",
            Field::string().optional().conflicts_with(&["source_port_ranges"]).validate(validators::port_range()),
        )
        .field(
            "source_port_ranges",
            Field::set(FieldType::String).optional().conflicts_with(&["source_port_range"]),
        )
        .field(
            "destination_port_range",
            Field::string()
                .optional()
                .conflicts_with(&["destination_port_ranges"])
                .validate(validators::port_range()),
        )
        .field(
            "destination_port_ranges",
            Field::set(FieldType::String).optional().conflicts_with(&["destination_port_range"]),
        )
        .field(
            "source_address_prefix",
            Field::string().optional().conflicts_with(&["source_address_prefixes"]),
        )
        .field(
            "source_address_prefixes",
            Field::set(FieldType::String).optional().conflicts_with(&["source_address_prefix"]),
        )
        .field(
            "destination_address_prefix",
            Field::string().optional().conflicts_with(&["destination_address_prefixes"]),
        )
        .field(
            "destination_address_prefixes",
            Field::set(FieldType::String).optional().conflicts_with(&["destination_address_prefix"]),
        )
        .field("source_application_security_group_ids", Field::set(FieldType::String).optional().max_items(10))
        .field("destination_application_security_group_ids", Field::set(FieldType::String).optional().max_items(10))
        .field("access", Field::string().required().validate(validators::string_in_slice(&["Allow", "Deny"])))
        .field("priority", Field::int().required().validate(validators::int_between(100, 4096)))
        .field(
            "direction",
            Field::string().required().validate(validators::string_in_slice(&["Inbound", "Outbound"])),
        )
}

// ── Resource ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkSecurityGroupResource;

impl NetworkSecurityGroupResource {
    fn expand(data: &ResourceData) -> Result<Envelope<NetworkSecurityGroupProperties>, ProviderError> {
        let rules: Option<Vec<SecurityRule>> = expand_list(data.get("security_rule"))?;
        let props = NetworkSecurityGroupProperties {
            security_rules: rules.unwrap_or_default(),
            ..Default::default()
        };
        Ok(Envelope::new(location_of(data), tags_of(data), props))
    }

    async fn create_or_update(&self, data: &mut ResourceData, meta: &ProviderMeta, is_new: bool) -> Result<(), ProviderError> {
        let id = NetworkSecurityGroupId::new(&meta.subscription_id, data.require_str("resource_group_name")?, data.require_str("name")?);
        let context = crud::describe("Network Security Group", &id.name, &id.resource_group);
        if is_new {
            crud::require_absent(meta, TYPE_NAME, &id.id(), API_VERSION, &context).await?;
        }

        let body = Self::expand(data)?;
        let timeouts = meta.timeouts.apply(self.timeouts());
        let timeout = if is_new { timeouts.create } else { timeouts.update };
        let remote_id = crud::put_and_read_id(meta, &id.id(), API_VERSION, &body, timeout, &context).await?;
        data.set_id(remote_id);
        self.read(data, meta).await
    }
}

pub(crate) fn flatten_security_rules(props: Option<&NetworkSecurityGroupProperties>) -> Vec<Value> {
    flatten_list(props.map(|p| p.security_rules.as_slice()))
}

#[async_trait]
impl Resource for NetworkSecurityGroupResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        base_schema(80).field("security_rule", Field::block_set(security_rule_schema()).optional().computed())
    }

    fn validate_import_id(&self, id: &str) -> Result<(), ProviderError> {
        NetworkSecurityGroupId::parse(id)?;
        Ok(())
    }

    async fn create(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, true).await
    }

    async fn read(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = NetworkSecurityGroupId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Network Security Group", &id.name, &id.resource_group);
        let Some(nsg) = crud::fetch::<Envelope<NetworkSecurityGroupProperties>>(meta, &id.id(), API_VERSION, &context).await? else {
            tracing::info!(id = %id, "network security group was not found, removing from state");
            data.clear_id();
            return Ok(());
        };

        set_envelope(data, &id.name, &id.resource_group, &nsg);
        data.set("security_rule", flatten_security_rules(nsg.properties.as_ref()));
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        self.create_or_update(data, meta, false).await
    }

    async fn delete(&self, data: &mut ResourceData, meta: &ProviderMeta) -> Result<(), ProviderError> {
        let id = NetworkSecurityGroupId::parse_insensitively(data.require_id()?)?;
        let context = crud::describe("Network Security Group", &id.name, &id.resource_group);
        let timeout = meta.timeouts.apply(self.timeouts()).delete;
        crud::delete(meta, &id.id(), API_VERSION, timeout, &context).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rule_flatten_of_expand_is_identity() {
        let raw = json!({
            "name": "allow-https",
            "description": "",
            "protocol": "Tcp",
            "source_port_range": "*",
            "source_port_ranges": [],
            "destination_port_range": "",
            "destination_port_ranges": ["443", "8443"],
            "source_address_prefix": "Internet",
            "source_address_prefixes": [],
            "destination_address_prefix": "*",
            "destination_address_prefixes": [],
            "source_application_security_group_ids": [],
            "destination_application_security_group_ids": [],
            "access": "Allow",
            "priority": 100,
            "direction": "Inbound",
        });
        let rule = SecurityRule::expand(raw.as_object().unwrap()).unwrap();
        assert_eq!(Value::Object(rule.flatten()), raw);
    }

    #[test]
    fn rule_requires_priority() {
        let raw = json!({ "name": "r", "protocol": "Tcp", "access": "Allow", "direction": "Inbound" });
        assert!(SecurityRule::expand(raw.as_object().unwrap()).is_err());
    }

    #[test]
    fn schema_rejects_conflicting_ranges_and_bad_priority() {
        let cfg = json!({
            "name": "nsg1",
            "resource_group_name": "rg1",
            "location": "West Europe",
            "security_rule": [{
                "name": "r1",
                "protocol": "Tcp",
                "source_port_range": "*",
                "source_port_ranges": ["80"],
                "access": "Allow",
                "priority": 99,
                "direction": "Inbound",
            }]
        });
        let err = NetworkSecurityGroupResource.check(cfg.as_object().unwrap()).unwrap_err();
        let ProviderError::Schema(e) = err else { panic!("expected a schema error, got {err:?}") };
        let paths: Vec<&str> = e.diagnostics().iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"security_rule.0.priority"), "{paths:?}");
        assert!(paths.contains(&"security_rule.0.source_port_range"), "{paths:?}");
    }

    #[test]
    fn wire_body_uses_camel_case() {
        let data = ResourceData::new(
            json!({
                "name": "nsg1",
                "resource_group_name": "rg1",
                "location": "West Europe",
                "security_rule": [{
                    "name": "r1", "protocol": "Tcp", "destination_port_range": "22",
                    "access": "Deny", "priority": 4096, "direction": "Inbound"
                }]
            })
            .as_object()
            .cloned()
            .unwrap(),
        );
        let body = serde_json::to_value(NetworkSecurityGroupResource::expand(&data).unwrap()).unwrap();
        assert_eq!(body["location"], "westeurope");
        let rule = &body["properties"]["securityRules"][0];
        assert_eq!(rule["properties"]["destinationPortRange"], "22");
        assert!(rule["properties"].get("sourcePortRanges").is_none());
    }
}
