//! Reusable field validators. Each returns a [`ValidateFn`] to attach to a
//! [`Field`](crate::Field).

use std::net::Ipv4Addr;
use std::sync::Arc;

use base64::Engine;
use netarm_domain::{validate_id, Diagnostics, TypedId};
use serde_json::Value;

use crate::schema::ValidateFn;

fn string_check(f: impl Fn(&str, &str) -> Diagnostics + Send + Sync + 'static) -> ValidateFn {
    Arc::new(move |v: &Value, key: &str| match v.as_str() {
        Some(s) => f(s, key),
        None => Diagnostics::error(format!("expected {:?} to be a string", key)),
    })
}

pub fn string_not_empty() -> ValidateFn {
    string_check(|s, key| {
        if s.trim().is_empty() {
            Diagnostics::error(format!("{:?} must not be empty", key))
        } else {
            Diagnostics::ok()
        }
    })
}

pub fn string_in_slice(allowed: &'static [&'static str]) -> ValidateFn {
    string_check(move |s, key| {
        if allowed.contains(&s) {
            Diagnostics::ok()
        } else {
            Diagnostics::error(format!("expected {:?} to be one of {:?}, got {}", key, allowed, s))
        }
    })
}

pub fn int_between(min: i64, max: i64) -> ValidateFn {
    Arc::new(move |v: &Value, key: &str| match v.as_i64() {
        Some(n) if (min..=max).contains(&n) => Diagnostics::ok(),
        Some(n) => Diagnostics::error(format!("expected {:?} to be in the range ({} - {}), got {}", key, min, max, n)),
        None => Diagnostics::error(format!("expected {:?} to be an integer", key)),
    })
}

pub fn int_at_least(min: i64) -> ValidateFn {
    Arc::new(move |v: &Value, key: &str| match v.as_i64() {
        Some(n) if n >= min => Diagnostics::ok(),
        Some(n) => Diagnostics::error(format!("expected {:?} to be at least ({}), got {}", key, min, n)),
        None => Diagnostics::error(format!("expected {:?} to be an integer", key)),
    })
}

fn parse_cidr(s: &str) -> Option<(Ipv4Addr, u8)> {
    let (addr, bits) = s.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let bits: u8 = bits.parse().ok()?;
    (bits <= 32).then_some((addr, bits))
}

/// IPv4 network in CIDR notation, e.g. `10.0.0.0/16`.
pub fn is_cidr() -> ValidateFn {
    string_check(|s, key| match parse_cidr(s) {
        Some(_) => Diagnostics::ok(),
        None => Diagnostics::error(format!("expected {:?} to be a valid IPv4 CIDR, got {}", key, s)),
    })
}

pub fn is_ipv4_address() -> ValidateFn {
    string_check(|s, key| match s.parse::<Ipv4Addr>() {
        Ok(_) => Diagnostics::ok(),
        Err(_) => Diagnostics::error(format!("expected {:?} to contain a valid IPv4 address, got {}", key, s)),
    })
}

pub fn is_base64() -> ValidateFn {
    string_check(|s, key| {
        if s.is_empty() {
            return Diagnostics::error(format!("{:?} must not be empty", key));
        }
        match base64::engine::general_purpose::STANDARD.decode(s) {
            Ok(_) => Diagnostics::ok(),
            Err(_) => Diagnostics::error(format!("expected {:?} to be a base64 string", key)),
        }
    })
}

/// ARM resource names: 1..=max_len characters, alphanumerics plus `-`, `_`
/// and `.`, starting with an alphanumeric and not ending with `.` or `-`.
pub fn resource_name(max_len: usize) -> ValidateFn {
    string_check(move |s, key| {
        let mut d = Diagnostics::ok();
        if s.is_empty() || s.len() > max_len {
            d.errors.push(format!("{:?} must be between 1 and {} characters, got {}", key, max_len, s.len()));
            return d;
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')) {
            d.errors.push(format!(
                "{:?} may only contain alphanumerics, underscores, periods and hyphens, got {:?}",
                key, s
            ));
        }
        if !s.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            d.errors.push(format!("{:?} must start with a letter or number", key));
        }
        if s.ends_with('.') || s.ends_with('-') {
            d.errors.push(format!("{:?} must end with a letter, number or underscore", key));
        }
        d
    })
}

/// Wraps the ID codec so malformed references fail at configuration time.
pub fn resource_id<T: TypedId + 'static>() -> ValidateFn {
    string_check(|s, key| validate_id::<T>(s, key))
}

pub fn location() -> ValidateFn {
    string_check(|s, key| {
        if s.trim().is_empty() {
            Diagnostics::error(format!("{:?} must not be empty", key))
        } else {
            Diagnostics::ok()
        }
    })
}

/// Versioned or versionless Key Vault secret URL,
/// `https://{vault}.vault.azure.net/secrets/{name}[/{version}]`.
pub fn key_vault_secret_id() -> ValidateFn {
    string_check(|s, key| {
        let Some(rest) = s.strip_prefix("https://") else {
            return Diagnostics::error(format!("{:?} must be an https URL, got {}", key, s));
        };
        let parts: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
        let ok = matches!(parts.len(), 3 | 4)
            && !parts[0].is_empty()
            && parts[1] == "secrets"
            && parts[2..].iter().all(|p| !p.is_empty());
        if ok {
            Diagnostics::ok()
        } else {
            Diagnostics::error(format!("{:?} is not a valid Key Vault secret ID, got {}", key, s))
        }
    })
}

/// A port (`80`), a range (`1000-2000`) or `*`.
pub fn port_range() -> ValidateFn {
    fn port(s: &str) -> Option<u32> {
        s.parse::<u32>().ok().filter(|p| (1..=65535).contains(p))
    }
    string_check(|s, key| {
        let ok = s == "*"
            || port(s).is_some()
            || s.split_once('-').is_some_and(|(a, b)| matches!((port(a), port(b)), (Some(a), Some(b)) if a <= b));
        if ok {
            Diagnostics::ok()
        } else {
            Diagnostics::error(format!("{:?} must be a port, a port range or \"*\", got {}", key, s))
        }
    })
}

#[cfg(test)]
mod tests {
    use netarm_domain::VirtualHubId;
    use serde_json::json;

    use super::*;

    fn errs(f: &ValidateFn, v: Value) -> usize {
        f(&v, "field").errors.len()
    }

    #[test]
    fn ranges() {
        let f = int_between(100, 4096);
        assert_eq!(errs(&f, json!(100)), 0);
        assert_eq!(errs(&f, json!(4096)), 0);
        assert_eq!(errs(&f, json!(99)), 1);
        assert_eq!(errs(&f, json!("100")), 1);
        assert_eq!(errs(&int_at_least(1), json!(0)), 1);
    }

    #[test]
    fn cidr_and_addresses() {
        let f = is_cidr();
        assert_eq!(errs(&f, json!("10.0.0.0/16")), 0);
        assert_eq!(errs(&f, json!("10.0.0.0/33")), 1);
        assert_eq!(errs(&f, json!("10.0.0.0")), 1);
        assert_eq!(errs(&is_ipv4_address(), json!("168.63.129.16")), 0);
        assert_eq!(errs(&is_ipv4_address(), json!("not-an-ip")), 1);
    }

    #[test]
    fn names() {
        let f = resource_name(80);
        assert_eq!(errs(&f, json!("acctest-vnet_1.a")), 0);
        assert!(errs(&f, json!("-leading")) > 0);
        assert!(errs(&f, json!("trailing.")) > 0);
        assert!(errs(&f, json!("has space")) > 0);
        assert!(errs(&f, json!("a".repeat(81))) > 0);
    }

    #[test]
    fn enums_and_base64() {
        let f = string_in_slice(&["Allow", "Deny"]);
        assert_eq!(errs(&f, json!("Allow")), 0);
        assert_eq!(errs(&f, json!("allow")), 1);
        assert_eq!(errs(&is_base64(), json!("aGVsbG8=")), 0);
        assert_eq!(errs(&is_base64(), json!("%%%")), 1);
    }

    #[test]
    fn id_wrapper() {
        let f = resource_id::<VirtualHubId>();
        let good = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualHubs/h";
        assert_eq!(errs(&f, json!(good)), 0);
        assert_eq!(errs(&f, json!("/subscriptions/s/resourceGroups/rg")), 1);
    }

    #[test]
    fn ports_and_secrets() {
        let f = port_range();
        for ok in ["*", "80", "1000-2000"] {
            assert_eq!(errs(&f, json!(ok)), 0, "{ok}");
        }
        for bad in ["0", "70000", "2000-1000", "a-b"] {
            assert_eq!(errs(&f, json!(bad)), 1, "{bad}");
        }
        let kv = key_vault_secret_id();
        assert_eq!(errs(&kv, json!("https://vault1.vault.azure.net/secrets/cert")), 0);
        assert_eq!(errs(&kv, json!("https://vault1.vault.azure.net/secrets/cert/0123abcd")), 0);
        assert_eq!(errs(&kv, json!("http://vault1/secrets/cert")), 1);
        assert_eq!(errs(&kv, json!("https://vault1.vault.azure.net/keys/cert")), 1);
    }
}
