//! Resources and data sources of the `Microsoft.Network` namespace.

pub mod application_gateway;
pub mod common;
pub mod data_sources;
pub mod network_security_group;
pub mod point_to_site_vpn_gateway;
pub mod public_ip;
pub mod subnet;
pub mod virtual_hub;
pub mod virtual_hub_connection;
pub mod virtual_network;
pub mod virtual_wan;
pub mod vpn_gateway;

pub const API_VERSION: &str = "2023-11-01";

pub use application_gateway::ApplicationGatewayResource;
pub use data_sources::{
    ApplicationGatewayDataSource, NetworkSecurityGroupDataSource, PublicIpDataSource, SubnetDataSource,
    VirtualHubDataSource, VirtualNetworkDataSource,
};
pub use network_security_group::NetworkSecurityGroupResource;
pub use point_to_site_vpn_gateway::PointToSiteVpnGatewayResource;
pub use public_ip::PublicIpResource;
pub use subnet::SubnetResource;
pub use virtual_hub::VirtualHubResource;
pub use virtual_hub_connection::VirtualHubConnectionResource;
pub use virtual_network::VirtualNetworkResource;
pub use virtual_wan::VirtualWanResource;
pub use vpn_gateway::VpnGatewayResource;
