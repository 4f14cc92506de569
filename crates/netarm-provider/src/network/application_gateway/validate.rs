//! Cross-field checks of the application gateway configuration.

use std::collections::BTreeSet;

use netarm_schema::{expand_list, expand_single, Block};
use serde_json::{Map, Value};

use super::blocks::*;
use super::wire::{AutoscaleConfiguration, Sku, SslPolicy, WafConfiguration};
use crate::error::ProviderError;

fn blocks<T: Block>(config: &Map<String, Value>, key: &str) -> Result<Vec<T>, ProviderError> {
    Ok(expand_list(config.get(key))?.unwrap_or_default())
}

/// Every problem is reported, not just the first.
pub fn validate(config: &Map<String, Value>) -> Result<(), ProviderError> {
    let mut errors = Vec::new();

    let sku: Option<Sku> = expand_single(config.get("sku"))?;
    let autoscale: Option<AutoscaleConfiguration> = expand_single(config.get("autoscale_configuration"))?;
    if let Some(sku) = &sku {
        check_capacity(sku, autoscale.as_ref(), &mut errors);
    }

    let policy: Option<SslPolicy> = expand_single(config.get("ssl_policy"))?;
    if let Some(policy) = policy {
        check_ssl_policy(&policy, &mut errors);
    }

    let waf: Option<WafConfiguration> = expand_single(config.get("waf_configuration"))?;
    if let (Some(waf), Some(sku)) = (waf, &sku) {
        if waf.file_upload_limit_in_mb.unwrap_or(100) > 500 && sku.name != "WAF_v2" {
            errors.push("Only SKU `WAF_v2` allows `file_upload_limit_mb` to exceed 500MB".to_string());
        }
    }

    let settings: Vec<BackendHttpSettings> = blocks(config, "backend_http_settings")?;
    for s in &settings {
        if s.host_name.is_some() && s.pick_host_name_from_backend_address {
            errors.push(format!(
                "backend_http_settings {:?}: Only one of `host_name` or `pick_host_name_from_backend_address` can be set",
                s.name
            ));
        }
    }

    let probes: Vec<Probe> = blocks(config, "probe")?;
    for p in &probes {
        match (p.host.is_some(), p.pick_host_name_from_backend_http_settings) {
            (false, false) => errors.push(format!(
                "probe {:?}: One of `host` or `pick_host_name_from_backend_http_settings` must be set",
                p.name
            )),
            (true, true) => errors.push(format!(
                "probe {:?}: Only one of `host` or `pick_host_name_from_backend_http_settings` can be set",
                p.name
            )),
            _ => {}
        }
    }

    let listeners: Vec<HttpListener> = blocks(config, "http_listener")?;
    for l in &listeners {
        if l.host_name.is_some() && !l.host_names.is_empty() {
            errors.push(format!(
                "http_listener {:?}: `host_name` and `host_names` cannot be specified together",
                l.name
            ));
        }
        if l.protocol.eq_ignore_ascii_case("Https") && l.ssl_certificate_name.is_none() {
            errors.push(format!("http_listener {:?}: `ssl_certificate_name` is required for protocol Https", l.name));
        }
    }

    let certs: Vec<SslCertificate> = blocks(config, "ssl_certificate")?;
    for c in &certs {
        check_ssl_certificate(c, &mut errors);
    }

    let roots: Vec<TrustedRootCertificate> = blocks(config, "trusted_root_certificate")?;
    for r in &roots {
        match (&r.data, &r.key_vault_secret_id) {
            (Some(_), Some(_)) => errors.push(format!(
                "only one of `key_vault_secret_id` or `data` must be specified for the `trusted_root_certificate` block {:?}",
                r.name
            )),
            (None, None) => errors.push(format!(
                "either `key_vault_secret_id` or `data` must be specified for the `trusted_root_certificate` block {:?}",
                r.name
            )),
            _ => {}
        }
    }

    check_references(config, &settings, &probes, &listeners, &certs, &roots, &mut errors)?;

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ProviderError::Validation(errors.join("; ")))
    }
}

fn check_capacity(sku: &Sku, autoscale: Option<&AutoscaleConfiguration>, errors: &mut Vec<String>) {
    if sku.tier == "Basic" {
        if autoscale.is_some() {
            errors.push(
                "The Application Gateway does not support `autoscale_configuration` blocks for the selected SKU tier \"Basic\""
                    .into(),
            );
        }
        match sku.capacity {
            None => errors.push(
                "The Application Gateway must specify a `capacity` value between [1-2] for the selected SKU tier \"Basic\""
                    .into(),
            ),
            Some(c) if !(1..=2).contains(&c) => errors.push(format!(
                "`capacity` value \"{c}\" for the selected SKU tier \"Basic\" is invalid. Value must be between [1-2]"
            )),
            Some(_) => {}
        }
        return;
    }

    let Some(capacity) = sku.capacity else {
        if autoscale.is_none() {
            errors.push(format!(
                "The Application Gateway must specify either `capacity` or `autoscale_configuration` for the selected SKU tier {:?}",
                sku.tier
            ));
        }
        return;
    };
    let (generation, max) = if sku.tier.ends_with("_v2") { ("V2", 125) } else { ("V1", 32) };
    if !(1..=max).contains(&capacity) {
        errors.push(format!(
            "The value '{capacity}' exceeds the maximum capacity allowed for a {:?} {generation} SKU, the {:?} SKU must have a capacity value between 1 and {max}",
            sku.tier, sku.tier
        ));
    }
}

fn check_ssl_policy(policy: &SslPolicy, errors: &mut Vec<String>) {
    let disabled = policy.disabled_ssl_protocols.as_ref().is_some_and(|p| !p.is_empty());
    if disabled && policy.policy_type.is_some() {
        errors.push("setting disabled_protocols is not allowed when policy_type is defined".into());
    }
    if policy.policy_type.as_deref() == Some("Predefined") && policy.policy_name.is_none() {
        errors.push("`policy_name` is required when `policy_type` is \"Predefined\"".into());
    }
}

fn check_ssl_certificate(c: &SslCertificate, errors: &mut Vec<String>) {
    if c.key_vault_secret_id.is_some() {
        if c.data.is_some() {
            errors.push(format!(
                "only one of `key_vault_secret_id` or `data` must be specified for the `ssl_certificate` block {:?}",
                c.name
            ));
        }
        if c.password.is_some() {
            errors.push(format!(
                "only one of `key_vault_secret_id` or `password` must be specified for the `ssl_certificate` block {:?}",
                c.name
            ));
        }
    } else if c.data.is_none() && c.public_cert_data.is_none() {
        errors.push(format!(
            "either `key_vault_secret_id` or `data` must be specified for the `ssl_certificate` block {:?}",
            c.name
        ));
    }
}

fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> BTreeSet<String> {
    items.iter().map(|i| name(i).to_string()).collect()
}

fn missing(errors: &mut Vec<String>, owner: &str, owner_name: &str, field: &str, known: &BTreeSet<String>, value: &str) {
    if !known.contains(value) {
        errors.push(format!("{owner} {owner_name:?}: `{field}` {value:?} does not match any configured block"));
    }
}

/// Name references between blocks must resolve inside this gateway.
fn check_references(
    config: &Map<String, Value>,
    settings: &[BackendHttpSettings],
    probes: &[Probe],
    listeners: &[HttpListener],
    certs: &[SslCertificate],
    roots: &[TrustedRootCertificate],
    errors: &mut Vec<String>,
) -> Result<(), ProviderError> {
    let frontend_ips: Vec<FrontendIpConfiguration> = blocks(config, "frontend_ip_configuration")?;
    let ports: Vec<FrontendPort> = blocks(config, "frontend_port")?;
    let pools: Vec<BackendAddressPool> = blocks(config, "backend_address_pool")?;
    let rules: Vec<RequestRoutingRule> = blocks(config, "request_routing_rule")?;
    let path_maps: Vec<UrlPathMap> = blocks(config, "url_path_map")?;
    let redirects: Vec<RedirectConfiguration> = blocks(config, "redirect_configuration")?;

    let frontend_ips = names(&frontend_ips, |b| b.name.as_str());
    let ports = names(&ports, |b| b.name.as_str());
    let pools = names(&pools, |b| b.name.as_str());
    let setting_names = names(settings, |b| b.name.as_str());
    let probe_names = names(probes, |b| b.name.as_str());
    let listener_names = names(listeners, |b| b.name.as_str());
    let cert_names = names(certs, |b| b.name.as_str());
    let root_names = names(roots, |b| b.name.as_str());
    let path_map_names = names(&path_maps, |b| b.name.as_str());
    let redirect_names = names(&redirects, |b| b.name.as_str());
    let targets = Targets { pools: &pools, settings: &setting_names, redirects: &redirect_names };

    for l in listeners {
        missing(errors, "http_listener", &l.name, "frontend_ip_configuration_name", &frontend_ips, &l.frontend_ip_configuration_name);
        missing(errors, "http_listener", &l.name, "frontend_port_name", &ports, &l.frontend_port_name);
        if let Some(cert) = &l.ssl_certificate_name {
            missing(errors, "http_listener", &l.name, "ssl_certificate_name", &cert_names, cert);
        }
    }
    for s in settings {
        if let Some(probe) = &s.probe_name {
            missing(errors, "backend_http_settings", &s.name, "probe_name", &probe_names, probe);
        }
        for root in &s.trusted_root_certificate_names {
            missing(errors, "backend_http_settings", &s.name, "trusted_root_certificate_names", &root_names, root);
        }
    }
    for r in &rules {
        missing(errors, "request_routing_rule", &r.name, "http_listener_name", &listener_names, &r.http_listener_name);
        let target = Target {
            owner: "request_routing_rule",
            name: &r.name,
            prefix: "",
            pool: &r.backend_address_pool_name,
            settings: &r.backend_http_settings_name,
            redirect: &r.redirect_configuration_name,
        };
        if r.rule_type == "PathBasedRouting" {
            match &r.url_path_map_name {
                Some(map) => missing(errors, "request_routing_rule", &r.name, "url_path_map_name", &path_map_names, map),
                None => errors.push(format!(
                    "request_routing_rule {:?}: `url_path_map_name` is required when `rule_type` is \"PathBasedRouting\"",
                    r.name
                )),
            }
            target.check_names(&targets, errors);
        } else {
            if r.url_path_map_name.is_some() {
                errors.push(format!(
                    "request_routing_rule {:?}: `url_path_map_name` is only allowed when `rule_type` is \"PathBasedRouting\"",
                    r.name
                ));
            }
            target.check(&targets, errors);
        }
    }
    for map in &path_maps {
        Target {
            owner: "url_path_map",
            name: &map.name,
            prefix: "default_",
            pool: &map.default_backend_address_pool_name,
            settings: &map.default_backend_http_settings_name,
            redirect: &map.default_redirect_configuration_name,
        }
        .check(&targets, errors);
        for rule in &map.path_rules {
            let owner = format!("url_path_map {:?} path_rule", map.name);
            Target {
                owner: &owner,
                name: &rule.name,
                prefix: "",
                pool: &rule.backend_address_pool_name,
                settings: &rule.backend_http_settings_name,
                redirect: &rule.redirect_configuration_name,
            }
            .check(&targets, errors);
        }
    }
    for r in &redirects {
        match (&r.target_listener_name, &r.target_url) {
            (Some(listener), None) => {
                missing(errors, "redirect_configuration", &r.name, "target_listener_name", &listener_names, listener)
            }
            (None, None) => errors.push(format!(
                "redirect_configuration {:?}: One of `target_listener_name` or `target_url` must be set",
                r.name
            )),
            _ => {}
        }
    }
    Ok(())
}

struct Targets<'a> {
    pools: &'a BTreeSet<String>,
    settings: &'a BTreeSet<String>,
    redirects: &'a BTreeSet<String>,
}

/// Where a rule sends traffic: a backend pool with its settings, or a redirect.
struct Target<'a> {
    owner: &'a str,
    name: &'a str,
    prefix: &'a str,
    pool: &'a Option<String>,
    settings: &'a Option<String>,
    redirect: &'a Option<String>,
}

impl Target<'_> {
    fn field(&self, field: &str) -> String {
        format!("{}{}", self.prefix, field)
    }

    fn check(&self, known: &Targets<'_>, errors: &mut Vec<String>) {
        let (pool, settings) = (self.field("backend_address_pool_name"), self.field("backend_http_settings_name"));
        let redirect = self.field("redirect_configuration_name");
        match (self.pool, self.settings, self.redirect) {
            (Some(_), _, Some(_)) => errors.push(format!(
                "{} {:?}: Conflict between `{pool}` and `{redirect}`",
                self.owner, self.name
            )),
            (Some(_), None, None) => errors.push(format!(
                "{} {:?}: `{settings}` is required when `{pool}` is set",
                self.owner, self.name
            )),
            (None, Some(_), _) => errors.push(format!(
                "{} {:?}: `{settings}` is only allowed together with `{pool}`",
                self.owner, self.name
            )),
            (None, None, None) => errors.push(format!(
                "{} {:?}: One of `{pool}` or `{redirect}` must be set",
                self.owner, self.name
            )),
            _ => {}
        }
        self.check_names(known, errors);
    }

    fn check_names(&self, known: &Targets<'_>, errors: &mut Vec<String>) {
        if let Some(pool) = self.pool {
            missing(errors, self.owner, self.name, &self.field("backend_address_pool_name"), known.pools, pool);
        }
        if let Some(s) = self.settings {
            missing(errors, self.owner, self.name, &self.field("backend_http_settings_name"), known.settings, s);
        }
        if let Some(r) = self.redirect {
            missing(errors, self.owner, self.name, &self.field("redirect_configuration_name"), known.redirects, r);
        }
    }
}
