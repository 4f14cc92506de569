//! Configuration blocks of the application gateway.
//!
//! The blocks reference each other by name (`frontend_port_name`,
//! `probe_name`, ...). On the wire those references are sub-resource IDs
//! under the gateway, `{gateway_id}/{collection}/{name}`, so every named
//! block converts to and from its wire form with the gateway ID at hand.

use netarm_domain::{last_segment, ApplicationGatewayId};
use netarm_schema::{
    bool_of, expand_list, expand_single, flatten_list, flatten_single, i64_of, require_string, string_list_of,
    string_of, Block, SchemaError,
};
use serde_json::{Map, Value};

use super::wire::*;
use crate::network::common::{Named, SubResource};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn text(raw: &Map<String, Value>, key: &str) -> Option<String> {
    string_of(raw, key).filter(|s| !s.is_empty())
}

fn require_i64(raw: &Map<String, Value>, key: &str) -> Result<i64, SchemaError> {
    i64_of(raw, key).ok_or_else(|| SchemaError::decode(key, "required value is missing"))
}

fn put_text(m: &mut Map<String, Value>, key: &str, v: &Option<String>) {
    m.insert(key.into(), Value::String(v.clone().unwrap_or_default()));
}

fn child(gw: &ApplicationGatewayId, collection: &str, name: &Option<String>) -> Option<SubResource> {
    name.as_ref().map(|n| SubResource::new(gw.child(collection, n)))
}

fn ref_id(r: &Option<SubResource>) -> Option<String> {
    r.as_ref().and_then(|r| r.id.clone()).filter(|s| !s.is_empty())
}

fn ref_name(r: &Option<SubResource>) -> Option<String> {
    ref_id(r).map(|id| last_segment(&id).to_string())
}

fn non_empty(v: Vec<String>) -> Option<Vec<String>> {
    (!v.is_empty()).then_some(v)
}

/// A named block that lives in one of the gateway's child collections.
pub trait GatewayBlock: Block {
    type Properties;

    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<Self::Properties>;
    fn from_wire(wire: &Named<Self::Properties>) -> Self;
}

pub fn expand_blocks<T: GatewayBlock>(
    raw: Option<&Value>,
    gw: &ApplicationGatewayId,
) -> Result<Vec<Named<T::Properties>>, SchemaError> {
    let blocks: Option<Vec<T>> = expand_list(raw)?;
    Ok(blocks.unwrap_or_default().iter().map(|b| b.to_wire(gw)).collect())
}

pub fn flatten_blocks<T: GatewayBlock>(wires: &[Named<T::Properties>]) -> Vec<Value> {
    let blocks: Vec<T> = wires.iter().map(T::from_wire).collect();
    flatten_list(Some(&blocks))
}

fn named<P>(name: &str, props: P) -> Named<P> {
    Named::new(name, props)
}

fn wire_name<P>(wire: &Named<P>) -> String {
    wire.name.clone().unwrap_or_default()
}

// ── gateway_ip_configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayIpConfiguration {
    pub id: Option<String>,
    pub name: String,
    pub subnet_id: String,
}

impl Block for GatewayIpConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self { id: text(raw, "id"), name: require_string(raw, "name")?, subnet_id: require_string(raw, "subnet_id")? })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("subnet_id".into(), Value::String(self.subnet_id.clone()));
        m
    }
}

impl GatewayBlock for GatewayIpConfiguration {
    type Properties = GatewayIpConfigurationProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(&self.name, GatewayIpConfigurationProperties { subnet: Some(SubResource::new(&self.subnet_id)) })
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self { id: wire.id.clone(), name: wire_name(wire), subnet_id: ref_id(&props.subnet).unwrap_or_default() }
    }
}

// ── frontend_port ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FrontendPort {
    pub id: Option<String>,
    pub name: String,
    pub port: i64,
}

impl Block for FrontendPort {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self { id: text(raw, "id"), name: require_string(raw, "name")?, port: require_i64(raw, "port")? })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("port".into(), Value::from(self.port));
        m
    }
}

impl GatewayBlock for FrontendPort {
    type Properties = FrontendPortProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(&self.name, FrontendPortProperties { port: self.port })
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            port: wire.properties.as_ref().map(|p| p.port).unwrap_or_default(),
        }
    }
}

// ── frontend_ip_configuration ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FrontendIpConfiguration {
    pub id: Option<String>,
    pub name: String,
    pub subnet_id: Option<String>,
    pub private_ip_address: Option<String>,
    pub private_ip_address_allocation: String,
    pub public_ip_address_id: Option<String>,
}

impl Block for FrontendIpConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            subnet_id: text(raw, "subnet_id"),
            private_ip_address: text(raw, "private_ip_address"),
            private_ip_address_allocation: text(raw, "private_ip_address_allocation").unwrap_or_else(|| "Dynamic".into()),
            public_ip_address_id: text(raw, "public_ip_address_id"),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        put_text(&mut m, "subnet_id", &self.subnet_id);
        put_text(&mut m, "private_ip_address", &self.private_ip_address);
        m.insert(
            "private_ip_address_allocation".into(),
            Value::String(self.private_ip_address_allocation.clone()),
        );
        put_text(&mut m, "public_ip_address_id", &self.public_ip_address_id);
        m
    }
}

impl GatewayBlock for FrontendIpConfiguration {
    type Properties = FrontendIpConfigurationProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(
            &self.name,
            FrontendIpConfigurationProperties {
                subnet: self.subnet_id.as_ref().map(SubResource::new),
                private_ip_address: self.private_ip_address.clone(),
                private_ip_allocation_method: Some(self.private_ip_address_allocation.clone()),
                public_ip_address: self.public_ip_address_id.as_ref().map(SubResource::new),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            subnet_id: ref_id(&props.subnet),
            private_ip_address: props.private_ip_address.filter(|s| !s.is_empty()),
            private_ip_address_allocation: props.private_ip_allocation_method.unwrap_or_else(|| "Dynamic".into()),
            public_ip_address_id: ref_id(&props.public_ip_address),
        }
    }
}

// ── backend_address_pool ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BackendAddressPool {
    pub id: Option<String>,
    pub name: String,
    pub fqdns: Vec<String>,
    pub ip_addresses: Vec<String>,
}

impl Block for BackendAddressPool {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            fqdns: string_list_of(raw, "fqdns").unwrap_or_default(),
            ip_addresses: string_list_of(raw, "ip_addresses").unwrap_or_default(),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("fqdns".into(), self.fqdns.clone().into());
        m.insert("ip_addresses".into(), self.ip_addresses.clone().into());
        m
    }
}

impl GatewayBlock for BackendAddressPool {
    type Properties = BackendAddressPoolProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        let fqdns = self.fqdns.iter().map(|f| BackendAddress { fqdn: Some(f.clone()), ip_address: None });
        let ips = self.ip_addresses.iter().map(|ip| BackendAddress { fqdn: None, ip_address: Some(ip.clone()) });
        named(&self.name, BackendAddressPoolProperties { backend_addresses: fqdns.chain(ips).collect() })
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let addresses = wire.properties.as_ref().map(|p| p.backend_addresses.as_slice()).unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            fqdns: addresses.iter().filter_map(|a| a.fqdn.clone()).collect(),
            ip_addresses: addresses.iter().filter_map(|a| a.ip_address.clone()).collect(),
        }
    }
}

// ── backend_http_settings ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BackendHttpSettings {
    pub id: Option<String>,
    pub name: String,
    pub port: i64,
    pub protocol: String,
    pub cookie_based_affinity: String,
    pub request_timeout: i64,
    pub path: Option<String>,
    pub host_name: Option<String>,
    pub pick_host_name_from_backend_address: bool,
    pub probe_name: Option<String>,
    pub probe_id: Option<String>,
    pub trusted_root_certificate_names: Vec<String>,
}

impl Block for BackendHttpSettings {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            port: require_i64(raw, "port")?,
            protocol: require_string(raw, "protocol")?,
            cookie_based_affinity: require_string(raw, "cookie_based_affinity")?,
            request_timeout: i64_of(raw, "request_timeout").unwrap_or(30),
            path: text(raw, "path"),
            host_name: text(raw, "host_name"),
            pick_host_name_from_backend_address: bool_of(raw, "pick_host_name_from_backend_address").unwrap_or(false),
            probe_name: text(raw, "probe_name"),
            probe_id: text(raw, "probe_id"),
            trusted_root_certificate_names: string_list_of(raw, "trusted_root_certificate_names").unwrap_or_default(),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("port".into(), Value::from(self.port));
        m.insert("protocol".into(), Value::String(self.protocol.clone()));
        m.insert("cookie_based_affinity".into(), Value::String(self.cookie_based_affinity.clone()));
        m.insert("request_timeout".into(), Value::from(self.request_timeout));
        put_text(&mut m, "path", &self.path);
        put_text(&mut m, "host_name", &self.host_name);
        m.insert(
            "pick_host_name_from_backend_address".into(),
            Value::Bool(self.pick_host_name_from_backend_address),
        );
        put_text(&mut m, "probe_name", &self.probe_name);
        put_text(&mut m, "probe_id", &self.probe_id);
        m.insert(
            "trusted_root_certificate_names".into(),
            self.trusted_root_certificate_names.clone().into(),
        );
        m
    }
}

impl GatewayBlock for BackendHttpSettings {
    type Properties = BackendHttpSettingsProperties;

    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        let roots: Vec<SubResource> = self
            .trusted_root_certificate_names
            .iter()
            .map(|n| SubResource::new(gw.child("trustedRootCertificates", n)))
            .collect();
        named(
            &self.name,
            BackendHttpSettingsProperties {
                port: self.port,
                protocol: self.protocol.clone(),
                cookie_based_affinity: self.cookie_based_affinity.clone(),
                request_timeout: Some(self.request_timeout),
                path: self.path.clone(),
                host_name: self.host_name.clone(),
                pick_host_name_from_backend_address: Some(self.pick_host_name_from_backend_address),
                probe: child(gw, "probes", &self.probe_name),
                trusted_root_certificates: (!roots.is_empty()).then_some(roots),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            port: props.port,
            protocol: props.protocol,
            cookie_based_affinity: props.cookie_based_affinity,
            request_timeout: props.request_timeout.unwrap_or(30),
            path: props.path.filter(|s| !s.is_empty()),
            host_name: props.host_name.filter(|s| !s.is_empty()),
            pick_host_name_from_backend_address: props.pick_host_name_from_backend_address.unwrap_or(false),
            probe_name: ref_name(&props.probe),
            probe_id: ref_id(&props.probe),
            trusted_root_certificate_names: props
                .trusted_root_certificates
                .unwrap_or_default()
                .iter()
                .filter_map(|r| r.id.as_deref())
                .map(|id| last_segment(id).to_string())
                .collect(),
        }
    }
}

// ── http_listener ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct HttpListener {
    pub id: Option<String>,
    pub name: String,
    pub frontend_ip_configuration_name: String,
    pub frontend_ip_configuration_id: Option<String>,
    pub frontend_port_name: String,
    pub frontend_port_id: Option<String>,
    pub protocol: String,
    pub host_name: Option<String>,
    pub host_names: Vec<String>,
    pub ssl_certificate_name: Option<String>,
    pub ssl_certificate_id: Option<String>,
    pub require_sni: bool,
}

impl Block for HttpListener {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            frontend_ip_configuration_name: require_string(raw, "frontend_ip_configuration_name")?,
            frontend_ip_configuration_id: text(raw, "frontend_ip_configuration_id"),
            frontend_port_name: require_string(raw, "frontend_port_name")?,
            frontend_port_id: text(raw, "frontend_port_id"),
            protocol: require_string(raw, "protocol")?,
            host_name: text(raw, "host_name"),
            host_names: string_list_of(raw, "host_names").unwrap_or_default(),
            ssl_certificate_name: text(raw, "ssl_certificate_name"),
            ssl_certificate_id: text(raw, "ssl_certificate_id"),
            require_sni: bool_of(raw, "require_sni").unwrap_or(false),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert(
            "frontend_ip_configuration_name".into(),
            Value::String(self.frontend_ip_configuration_name.clone()),
        );
        put_text(&mut m, "frontend_ip_configuration_id", &self.frontend_ip_configuration_id);
        m.insert("frontend_port_name".into(), Value::String(self.frontend_port_name.clone()));
        put_text(&mut m, "frontend_port_id", &self.frontend_port_id);
        m.insert("protocol".into(), Value::String(self.protocol.clone()));
        put_text(&mut m, "host_name", &self.host_name);
        m.insert("host_names".into(), self.host_names.clone().into());
        put_text(&mut m, "ssl_certificate_name", &self.ssl_certificate_name);
        put_text(&mut m, "ssl_certificate_id", &self.ssl_certificate_id);
        m.insert("require_sni".into(), Value::Bool(self.require_sni));
        m
    }
}

impl GatewayBlock for HttpListener {
    type Properties = HttpListenerProperties;

    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(
            &self.name,
            HttpListenerProperties {
                frontend_ip_configuration: child(
                    gw,
                    "frontendIPConfigurations",
                    &Some(self.frontend_ip_configuration_name.clone()),
                ),
                frontend_port: child(gw, "frontendPorts", &Some(self.frontend_port_name.clone())),
                protocol: self.protocol.clone(),
                host_name: self.host_name.clone(),
                host_names: non_empty(self.host_names.clone()),
                ssl_certificate: child(gw, "sslCertificates", &self.ssl_certificate_name),
                require_server_name_indication: self.protocol.eq_ignore_ascii_case("Https").then_some(self.require_sni),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            frontend_ip_configuration_name: ref_name(&props.frontend_ip_configuration).unwrap_or_default(),
            frontend_ip_configuration_id: ref_id(&props.frontend_ip_configuration),
            frontend_port_name: ref_name(&props.frontend_port).unwrap_or_default(),
            frontend_port_id: ref_id(&props.frontend_port),
            protocol: props.protocol,
            host_name: props.host_name.filter(|s| !s.is_empty()),
            host_names: props.host_names.unwrap_or_default(),
            ssl_certificate_name: ref_name(&props.ssl_certificate),
            ssl_certificate_id: ref_id(&props.ssl_certificate),
            require_sni: props.require_server_name_indication.unwrap_or(false),
        }
    }
}

// ── probe ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub id: Option<String>,
    pub name: String,
    pub protocol: String,
    pub path: String,
    pub host: Option<String>,
    pub interval: i64,
    pub timeout: i64,
    pub unhealthy_threshold: i64,
    pub pick_host_name_from_backend_http_settings: bool,
    pub minimum_servers: i64,
    pub match_condition: Option<ProbeMatch>,
}

impl Block for ProbeMatch {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self { body: text(raw, "body"), status_codes: string_list_of(raw, "status_code").unwrap_or_default() })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "body", &self.body);
        m.insert("status_code".into(), self.status_codes.clone().into());
        m
    }
}

impl Block for Probe {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            protocol: require_string(raw, "protocol")?,
            path: require_string(raw, "path")?,
            host: text(raw, "host"),
            interval: require_i64(raw, "interval")?,
            timeout: require_i64(raw, "timeout")?,
            unhealthy_threshold: require_i64(raw, "unhealthy_threshold")?,
            pick_host_name_from_backend_http_settings: bool_of(raw, "pick_host_name_from_backend_http_settings")
                .unwrap_or(false),
            minimum_servers: i64_of(raw, "minimum_servers").unwrap_or(0),
            match_condition: expand_single(raw.get("match"))?,
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("protocol".into(), Value::String(self.protocol.clone()));
        m.insert("path".into(), Value::String(self.path.clone()));
        put_text(&mut m, "host", &self.host);
        m.insert("interval".into(), Value::from(self.interval));
        m.insert("timeout".into(), Value::from(self.timeout));
        m.insert("unhealthy_threshold".into(), Value::from(self.unhealthy_threshold));
        m.insert(
            "pick_host_name_from_backend_http_settings".into(),
            Value::Bool(self.pick_host_name_from_backend_http_settings),
        );
        m.insert("minimum_servers".into(), Value::from(self.minimum_servers));
        m.insert("match".into(), flatten_single(self.match_condition.as_ref()).into());
        m
    }
}

impl GatewayBlock for Probe {
    type Properties = ProbeProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(
            &self.name,
            ProbeProperties {
                protocol: self.protocol.clone(),
                path: self.path.clone(),
                host: self.host.clone(),
                interval: self.interval,
                timeout: self.timeout,
                unhealthy_threshold: self.unhealthy_threshold,
                pick_host_name_from_backend_http_settings: Some(self.pick_host_name_from_backend_http_settings),
                min_servers: Some(self.minimum_servers),
                match_condition: self.match_condition.clone(),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            protocol: props.protocol,
            path: props.path,
            host: props.host.filter(|s| !s.is_empty()),
            interval: props.interval,
            timeout: props.timeout,
            unhealthy_threshold: props.unhealthy_threshold,
            pick_host_name_from_backend_http_settings: props.pick_host_name_from_backend_http_settings.unwrap_or(false),
            minimum_servers: props.min_servers.unwrap_or(0),
            match_condition: props.match_condition,
        }
    }
}

// ── request_routing_rule ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RequestRoutingRule {
    pub id: Option<String>,
    pub name: String,
    pub rule_type: String,
    pub http_listener_name: String,
    pub http_listener_id: Option<String>,
    pub backend_address_pool_name: Option<String>,
    pub backend_address_pool_id: Option<String>,
    pub backend_http_settings_name: Option<String>,
    pub backend_http_settings_id: Option<String>,
    pub redirect_configuration_name: Option<String>,
    pub redirect_configuration_id: Option<String>,
    pub url_path_map_name: Option<String>,
    pub url_path_map_id: Option<String>,
    pub priority: Option<i64>,
}

impl Block for RequestRoutingRule {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            rule_type: require_string(raw, "rule_type")?,
            http_listener_name: require_string(raw, "http_listener_name")?,
            http_listener_id: text(raw, "http_listener_id"),
            backend_address_pool_name: text(raw, "backend_address_pool_name"),
            backend_address_pool_id: text(raw, "backend_address_pool_id"),
            backend_http_settings_name: text(raw, "backend_http_settings_name"),
            backend_http_settings_id: text(raw, "backend_http_settings_id"),
            redirect_configuration_name: text(raw, "redirect_configuration_name"),
            redirect_configuration_id: text(raw, "redirect_configuration_id"),
            url_path_map_name: text(raw, "url_path_map_name"),
            url_path_map_id: text(raw, "url_path_map_id"),
            priority: i64_of(raw, "priority"),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("rule_type".into(), Value::String(self.rule_type.clone()));
        m.insert("http_listener_name".into(), Value::String(self.http_listener_name.clone()));
        put_text(&mut m, "http_listener_id", &self.http_listener_id);
        put_text(&mut m, "backend_address_pool_name", &self.backend_address_pool_name);
        put_text(&mut m, "backend_address_pool_id", &self.backend_address_pool_id);
        put_text(&mut m, "backend_http_settings_name", &self.backend_http_settings_name);
        put_text(&mut m, "backend_http_settings_id", &self.backend_http_settings_id);
        put_text(&mut m, "redirect_configuration_name", &self.redirect_configuration_name);
        put_text(&mut m, "redirect_configuration_id", &self.redirect_configuration_id);
        put_text(&mut m, "url_path_map_name", &self.url_path_map_name);
        put_text(&mut m, "url_path_map_id", &self.url_path_map_id);
        m.insert("priority".into(), self.priority.map(Value::from).unwrap_or(Value::Null));
        m
    }
}

impl GatewayBlock for RequestRoutingRule {
    type Properties = RequestRoutingRuleProperties;

    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(
            &self.name,
            RequestRoutingRuleProperties {
                rule_type: self.rule_type.clone(),
                priority: self.priority,
                http_listener: child(gw, "httpListeners", &Some(self.http_listener_name.clone())),
                backend_address_pool: child(gw, "backendAddressPools", &self.backend_address_pool_name),
                backend_http_settings: child(gw, "backendHttpSettingsCollection", &self.backend_http_settings_name),
                redirect_configuration: child(gw, "redirectConfigurations", &self.redirect_configuration_name),
                url_path_map: child(gw, "urlPathMaps", &self.url_path_map_name),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            rule_type: props.rule_type,
            http_listener_name: ref_name(&props.http_listener).unwrap_or_default(),
            http_listener_id: ref_id(&props.http_listener),
            backend_address_pool_name: ref_name(&props.backend_address_pool),
            backend_address_pool_id: ref_id(&props.backend_address_pool),
            backend_http_settings_name: ref_name(&props.backend_http_settings),
            backend_http_settings_id: ref_id(&props.backend_http_settings),
            redirect_configuration_name: ref_name(&props.redirect_configuration),
            redirect_configuration_id: ref_id(&props.redirect_configuration),
            url_path_map_name: ref_name(&props.url_path_map),
            url_path_map_id: ref_id(&props.url_path_map),
            priority: props.priority,
        }
    }
}

// ── url_path_map ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PathRule {
    pub id: Option<String>,
    pub name: String,
    pub paths: Vec<String>,
    pub backend_address_pool_name: Option<String>,
    pub backend_address_pool_id: Option<String>,
    pub backend_http_settings_name: Option<String>,
    pub backend_http_settings_id: Option<String>,
    pub redirect_configuration_name: Option<String>,
    pub redirect_configuration_id: Option<String>,
}

impl Block for PathRule {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            paths: string_list_of(raw, "paths").unwrap_or_default(),
            backend_address_pool_name: text(raw, "backend_address_pool_name"),
            backend_address_pool_id: text(raw, "backend_address_pool_id"),
            backend_http_settings_name: text(raw, "backend_http_settings_name"),
            backend_http_settings_id: text(raw, "backend_http_settings_id"),
            redirect_configuration_name: text(raw, "redirect_configuration_name"),
            redirect_configuration_id: text(raw, "redirect_configuration_id"),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("paths".into(), self.paths.clone().into());
        put_text(&mut m, "backend_address_pool_name", &self.backend_address_pool_name);
        put_text(&mut m, "backend_address_pool_id", &self.backend_address_pool_id);
        put_text(&mut m, "backend_http_settings_name", &self.backend_http_settings_name);
        put_text(&mut m, "backend_http_settings_id", &self.backend_http_settings_id);
        put_text(&mut m, "redirect_configuration_name", &self.redirect_configuration_name);
        put_text(&mut m, "redirect_configuration_id", &self.redirect_configuration_id);
        m
    }
}

impl PathRule {
    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<PathRuleProperties> {
        named(
            &self.name,
            PathRuleProperties {
                paths: self.paths.clone(),
                backend_address_pool: child(gw, "backendAddressPools", &self.backend_address_pool_name),
                backend_http_settings: child(gw, "backendHttpSettingsCollection", &self.backend_http_settings_name),
                redirect_configuration: child(gw, "redirectConfigurations", &self.redirect_configuration_name),
            },
        )
    }

    fn from_wire(wire: &Named<PathRuleProperties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            paths: props.paths,
            backend_address_pool_name: ref_name(&props.backend_address_pool),
            backend_address_pool_id: ref_id(&props.backend_address_pool),
            backend_http_settings_name: ref_name(&props.backend_http_settings),
            backend_http_settings_id: ref_id(&props.backend_http_settings),
            redirect_configuration_name: ref_name(&props.redirect_configuration),
            redirect_configuration_id: ref_id(&props.redirect_configuration),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrlPathMap {
    pub id: Option<String>,
    pub name: String,
    pub default_backend_address_pool_name: Option<String>,
    pub default_backend_address_pool_id: Option<String>,
    pub default_backend_http_settings_name: Option<String>,
    pub default_backend_http_settings_id: Option<String>,
    pub default_redirect_configuration_name: Option<String>,
    pub default_redirect_configuration_id: Option<String>,
    pub path_rules: Vec<PathRule>,
}

impl Block for UrlPathMap {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            default_backend_address_pool_name: text(raw, "default_backend_address_pool_name"),
            default_backend_address_pool_id: text(raw, "default_backend_address_pool_id"),
            default_backend_http_settings_name: text(raw, "default_backend_http_settings_name"),
            default_backend_http_settings_id: text(raw, "default_backend_http_settings_id"),
            default_redirect_configuration_name: text(raw, "default_redirect_configuration_name"),
            default_redirect_configuration_id: text(raw, "default_redirect_configuration_id"),
            path_rules: expand_list(raw.get("path_rule"))?.unwrap_or_default(),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        put_text(&mut m, "default_backend_address_pool_name", &self.default_backend_address_pool_name);
        put_text(&mut m, "default_backend_address_pool_id", &self.default_backend_address_pool_id);
        put_text(&mut m, "default_backend_http_settings_name", &self.default_backend_http_settings_name);
        put_text(&mut m, "default_backend_http_settings_id", &self.default_backend_http_settings_id);
        put_text(&mut m, "default_redirect_configuration_name", &self.default_redirect_configuration_name);
        put_text(&mut m, "default_redirect_configuration_id", &self.default_redirect_configuration_id);
        m.insert("path_rule".into(), flatten_list(Some(&self.path_rules)).into());
        m
    }
}

impl GatewayBlock for UrlPathMap {
    type Properties = UrlPathMapProperties;

    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(
            &self.name,
            UrlPathMapProperties {
                default_backend_address_pool: child(gw, "backendAddressPools", &self.default_backend_address_pool_name),
                default_backend_http_settings: child(
                    gw,
                    "backendHttpSettingsCollection",
                    &self.default_backend_http_settings_name,
                ),
                default_redirect_configuration: child(
                    gw,
                    "redirectConfigurations",
                    &self.default_redirect_configuration_name,
                ),
                path_rules: self.path_rules.iter().map(|r| r.to_wire(gw)).collect(),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            default_backend_address_pool_name: ref_name(&props.default_backend_address_pool),
            default_backend_address_pool_id: ref_id(&props.default_backend_address_pool),
            default_backend_http_settings_name: ref_name(&props.default_backend_http_settings),
            default_backend_http_settings_id: ref_id(&props.default_backend_http_settings),
            default_redirect_configuration_name: ref_name(&props.default_redirect_configuration),
            default_redirect_configuration_id: ref_id(&props.default_redirect_configuration),
            path_rules: props.path_rules.iter().map(PathRule::from_wire).collect(),
        }
    }
}

// ── redirect_configuration ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RedirectConfiguration {
    pub id: Option<String>,
    pub name: String,
    pub redirect_type: String,
    pub target_listener_name: Option<String>,
    pub target_listener_id: Option<String>,
    pub target_url: Option<String>,
    pub include_path: bool,
    pub include_query_string: bool,
}

impl Block for RedirectConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            redirect_type: require_string(raw, "redirect_type")?,
            target_listener_name: text(raw, "target_listener_name"),
            target_listener_id: text(raw, "target_listener_id"),
            target_url: text(raw, "target_url"),
            include_path: bool_of(raw, "include_path").unwrap_or(false),
            include_query_string: bool_of(raw, "include_query_string").unwrap_or(false),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("redirect_type".into(), Value::String(self.redirect_type.clone()));
        put_text(&mut m, "target_listener_name", &self.target_listener_name);
        put_text(&mut m, "target_listener_id", &self.target_listener_id);
        put_text(&mut m, "target_url", &self.target_url);
        m.insert("include_path".into(), Value::Bool(self.include_path));
        m.insert("include_query_string".into(), Value::Bool(self.include_query_string));
        m
    }
}

impl GatewayBlock for RedirectConfiguration {
    type Properties = RedirectConfigurationProperties;

    fn to_wire(&self, gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        named(
            &self.name,
            RedirectConfigurationProperties {
                redirect_type: self.redirect_type.clone(),
                target_listener: child(gw, "httpListeners", &self.target_listener_name),
                target_url: self.target_url.clone(),
                include_path: Some(self.include_path),
                include_query_string: Some(self.include_query_string),
            },
        )
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            redirect_type: props.redirect_type,
            target_listener_name: ref_name(&props.target_listener),
            target_listener_id: ref_id(&props.target_listener),
            target_url: props.target_url.filter(|s| !s.is_empty()),
            include_path: props.include_path.unwrap_or(false),
            include_query_string: props.include_query_string.unwrap_or(false),
        }
    }
}

// ── ssl_certificate ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SslCertificate {
    pub id: Option<String>,
    pub name: String,
    pub data: Option<String>,
    pub password: Option<String>,
    pub key_vault_secret_id: Option<String>,
    pub public_cert_data: Option<String>,
}

/// PFX payloads may be given raw or already base64-encoded.
fn base64_if_not(data: &str) -> String {
    use base64::Engine;
    let engine = base64::engine::general_purpose::STANDARD;
    if engine.decode(data).is_ok() {
        data.to_string()
    } else {
        engine.encode(data)
    }
}

impl Block for SslCertificate {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            data: text(raw, "data"),
            password: text(raw, "password"),
            key_vault_secret_id: text(raw, "key_vault_secret_id"),
            public_cert_data: text(raw, "public_cert_data"),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        put_text(&mut m, "data", &self.data);
        put_text(&mut m, "password", &self.password);
        put_text(&mut m, "key_vault_secret_id", &self.key_vault_secret_id);
        put_text(&mut m, "public_cert_data", &self.public_cert_data);
        m
    }
}

impl GatewayBlock for SslCertificate {
    type Properties = SslCertificateProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        let props = if let Some(data) = &self.data {
            SslCertificateProperties {
                data: Some(base64_if_not(data)),
                password: Some(self.password.clone().unwrap_or_default()),
                ..Default::default()
            }
        } else if let Some(kv) = &self.key_vault_secret_id {
            SslCertificateProperties { key_vault_secret_id: Some(kv.clone()), ..Default::default() }
        } else {
            SslCertificateProperties { public_cert_data: self.public_cert_data.clone(), ..Default::default() }
        };
        named(&self.name, props)
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            data: None,
            password: None,
            key_vault_secret_id: props.key_vault_secret_id.filter(|s| !s.is_empty()),
            public_cert_data: props.public_cert_data.filter(|s| !s.is_empty()),
        }
    }
}

// ── trusted_root_certificate ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TrustedRootCertificate {
    pub id: Option<String>,
    pub name: String,
    pub data: Option<String>,
    pub key_vault_secret_id: Option<String>,
}

impl Block for TrustedRootCertificate {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            id: text(raw, "id"),
            name: require_string(raw, "name")?,
            data: text(raw, "data"),
            key_vault_secret_id: text(raw, "key_vault_secret_id"),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        put_text(&mut m, "id", &self.id);
        m.insert("name".into(), Value::String(self.name.clone()));
        put_text(&mut m, "data", &self.data);
        put_text(&mut m, "key_vault_secret_id", &self.key_vault_secret_id);
        m
    }
}

impl GatewayBlock for TrustedRootCertificate {
    type Properties = TrustedRootCertificateProperties;

    fn to_wire(&self, _gw: &ApplicationGatewayId) -> Named<Self::Properties> {
        let props = match (&self.data, &self.key_vault_secret_id) {
            (Some(data), _) => TrustedRootCertificateProperties { data: Some(base64_if_not(data)), key_vault_secret_id: None },
            (None, kv) => TrustedRootCertificateProperties { data: None, key_vault_secret_id: kv.clone() },
        };
        named(&self.name, props)
    }

    fn from_wire(wire: &Named<Self::Properties>) -> Self {
        let props = wire.properties.clone().unwrap_or_default();
        Self {
            id: wire.id.clone(),
            name: wire_name(wire),
            data: None,
            key_vault_secret_id: props.key_vault_secret_id.filter(|s| !s.is_empty()),
        }
    }
}

// ── Single blocks ─────────────────────────────────────────────────────────────

impl Block for Sku {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self { name: require_string(raw, "name")?, tier: require_string(raw, "tier")?, capacity: i64_of(raw, "capacity") })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("name".into(), Value::String(self.name.clone()));
        m.insert("tier".into(), Value::String(self.tier.clone()));
        m.insert("capacity".into(), self.capacity.map(Value::from).unwrap_or(Value::Null));
        m
    }
}

impl Block for AutoscaleConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self { min_capacity: require_i64(raw, "min_capacity")?, max_capacity: i64_of(raw, "max_capacity") })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("min_capacity".into(), Value::from(self.min_capacity));
        m.insert("max_capacity".into(), self.max_capacity.map(Value::from).unwrap_or(Value::Null));
        m
    }
}

impl Block for WafConfiguration {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            enabled: bool_of(raw, "enabled").unwrap_or(false),
            firewall_mode: require_string(raw, "firewall_mode")?,
            rule_set_type: text(raw, "rule_set_type").unwrap_or_else(|| "OWASP".into()),
            rule_set_version: require_string(raw, "rule_set_version")?,
            file_upload_limit_in_mb: Some(i64_of(raw, "file_upload_limit_mb").unwrap_or(100)),
            request_body_check: Some(bool_of(raw, "request_body_check").unwrap_or(true)),
            max_request_body_size_in_kb: Some(i64_of(raw, "max_request_body_size_kb").unwrap_or(128)),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("enabled".into(), Value::Bool(self.enabled));
        m.insert("firewall_mode".into(), Value::String(self.firewall_mode.clone()));
        m.insert("rule_set_type".into(), Value::String(self.rule_set_type.clone()));
        m.insert("rule_set_version".into(), Value::String(self.rule_set_version.clone()));
        m.insert("file_upload_limit_mb".into(), Value::from(self.file_upload_limit_in_mb.unwrap_or(100)));
        m.insert("request_body_check".into(), Value::Bool(self.request_body_check.unwrap_or(true)));
        m.insert(
            "max_request_body_size_kb".into(),
            Value::from(self.max_request_body_size_in_kb.unwrap_or(128)),
        );
        m
    }
}

impl Block for SslPolicy {
    fn expand(raw: &Map<String, Value>) -> Result<Self, SchemaError> {
        Ok(Self {
            disabled_ssl_protocols: string_list_of(raw, "disabled_protocols").and_then(non_empty),
            policy_type: text(raw, "policy_type"),
            policy_name: text(raw, "policy_name"),
            cipher_suites: string_list_of(raw, "cipher_suites").and_then(non_empty),
            min_protocol_version: text(raw, "min_protocol_version"),
        })
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert(
            "disabled_protocols".into(),
            self.disabled_ssl_protocols.clone().unwrap_or_default().into(),
        );
        put_text(&mut m, "policy_type", &self.policy_type);
        put_text(&mut m, "policy_name", &self.policy_name);
        m.insert("cipher_suites".into(), self.cipher_suites.clone().unwrap_or_default().into());
        put_text(&mut m, "min_protocol_version", &self.min_protocol_version);
        m
    }
}
