//! Compile-time table of every resource and data source this provider serves.

use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::network::*;
use crate::resource::{DataSource, Resource};

/// One row of the type table: the type name and how to build a handler.
pub struct Registration<T: ?Sized> {
    pub name: &'static str,
    pub build: fn() -> Box<T>,
}

impl<T: ?Sized> Registration<T> {
    pub const fn new(name: &'static str, build: fn() -> Box<T>) -> Self {
        Self { name, build }
    }
}

pub static RESOURCES: &[Registration<dyn Resource>] = &[
    Registration::new(application_gateway::TYPE_NAME, || Box::new(ApplicationGatewayResource)),
    Registration::new(network_security_group::TYPE_NAME, || Box::new(NetworkSecurityGroupResource)),
    Registration::new(point_to_site_vpn_gateway::TYPE_NAME, || Box::new(PointToSiteVpnGatewayResource)),
    Registration::new(public_ip::TYPE_NAME, || Box::new(PublicIpResource)),
    Registration::new(subnet::TYPE_NAME, || Box::new(SubnetResource)),
    Registration::new(virtual_hub::TYPE_NAME, || Box::new(VirtualHubResource)),
    Registration::new(virtual_hub_connection::TYPE_NAME, || Box::new(VirtualHubConnectionResource)),
    Registration::new(virtual_network::TYPE_NAME, || Box::new(VirtualNetworkResource)),
    Registration::new(virtual_wan::TYPE_NAME, || Box::new(VirtualWanResource)),
    Registration::new(vpn_gateway::TYPE_NAME, || Box::new(VpnGatewayResource)),
];

pub static DATA_SOURCES: &[Registration<dyn DataSource>] = &[
    Registration::new(application_gateway::TYPE_NAME, || Box::new(ApplicationGatewayDataSource)),
    Registration::new(network_security_group::TYPE_NAME, || Box::new(NetworkSecurityGroupDataSource)),
    Registration::new(public_ip::TYPE_NAME, || Box::new(PublicIpDataSource)),
    Registration::new(subnet::TYPE_NAME, || Box::new(SubnetDataSource)),
    Registration::new(virtual_hub::TYPE_NAME, || Box::new(VirtualHubDataSource)),
    Registration::new(virtual_network::TYPE_NAME, || Box::new(VirtualNetworkDataSource)),
];

pub fn resource(name: &str) -> Result<Box<dyn Resource>, ProviderError> {
    RESOURCES
        .iter()
        .find(|r| r.name == name)
        .map(|r| (r.build)())
        .ok_or_else(|| ProviderError::UnknownType(name.to_string()))
}

pub fn data_source(name: &str) -> Result<Box<dyn DataSource>, ProviderError> {
    DATA_SOURCES
        .iter()
        .find(|r| r.name == name)
        .map(|r| (r.build)())
        .ok_or_else(|| ProviderError::UnknownType(format!("data.{}", name)))
}

pub fn resource_types() -> impl Iterator<Item = &'static str> {
    RESOURCES.iter().map(|r| r.name)
}

pub fn data_source_types() -> impl Iterator<Item = &'static str> {
    DATA_SOURCES.iter().map(|r| r.name)
}

/// Schema description of every registered type, as served to a host runtime.
pub fn schemas() -> Value {
    let resources: Map<String, Value> = RESOURCES
        .iter()
        .map(|r| (r.name.to_string(), (r.build)().schema().describe()))
        .collect();
    let data_sources: Map<String, Value> = DATA_SOURCES
        .iter()
        .map(|r| (r.name.to_string(), (r.build)().schema().describe()))
        .collect();
    json!({ "resources": resources, "data_sources": data_sources })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique_and_match_handlers() {
        let mut seen = HashSet::new();
        for r in RESOURCES {
            assert!(seen.insert(r.name), "duplicate resource {}", r.name);
            assert_eq!((r.build)().type_name(), r.name);
        }
        let mut seen = HashSet::new();
        for d in DATA_SOURCES {
            assert!(seen.insert(d.name), "duplicate data source {}", d.name);
            assert_eq!((d.build)().type_name(), d.name);
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = resource("azurerm_nope").err().unwrap();
        assert!(matches!(err, ProviderError::UnknownType(_)));
        assert!(data_source("azurerm_virtual_wan").is_err());
    }

    #[test]
    fn schema_description_covers_every_type() {
        let all = schemas();
        assert_eq!(all["resources"].as_object().unwrap().len(), RESOURCES.len());
        assert_eq!(all["data_sources"]["azurerm_subnet"]["virtual_network_name"]["required"], true);
        assert_eq!(all["resources"]["azurerm_application_gateway"]["ssl_certificate"]["block"]["password"]["sensitive"], true);
    }
}
