//! Typed IDs for the `Microsoft.Network` resources managed by this workspace.

use crate::typed_id;

typed_id!(
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Network/networkSecurityGroups/{name}`
    NetworkSecurityGroupId, "Network Security Group", "Microsoft.Network",
    [name => "networkSecurityGroups"]
);

typed_id!(
    VirtualNetworkId, "Virtual Network", "Microsoft.Network",
    [name => "virtualNetworks"]
);

typed_id!(
    /// A subnet lives under its virtual network.
    SubnetId, "Subnet", "Microsoft.Network",
    [virtual_network_name => "virtualNetworks", name => "subnets"]
);

typed_id!(
    PublicIpAddressId, "Public IP Address", "Microsoft.Network",
    [name => "publicIPAddresses"]
);

typed_id!(
    DdosProtectionPlanId, "DDoS Protection Plan", "Microsoft.Network",
    [name => "ddosProtectionPlans"]
);

typed_id!(
    VirtualWanId, "Virtual WAN", "Microsoft.Network",
    [name => "virtualWans"]
);

typed_id!(
    VirtualHubId, "Virtual Hub", "Microsoft.Network",
    [name => "virtualHubs"]
);

typed_id!(
    HubVirtualNetworkConnectionId, "Virtual Hub Connection", "Microsoft.Network",
    [virtual_hub_name => "virtualHubs", name => "hubVirtualNetworkConnections"]
);

typed_id!(
    HubRouteTableId, "Virtual Hub Route Table", "Microsoft.Network",
    [virtual_hub_name => "virtualHubs", name => "hubRouteTables"]
);

typed_id!(
    VpnGatewayId, "VPN Gateway", "Microsoft.Network",
    [name => "vpnGateways"]
);

typed_id!(
    /// Point-to-site VPN gateway attached to a virtual hub.
    P2sVpnGatewayId, "Point-to-Site VPN Gateway", "Microsoft.Network",
    [name => "p2sVpnGateways"]
);

typed_id!(
    VpnServerConfigurationId, "VPN Server Configuration", "Microsoft.Network",
    [name => "vpnServerConfigurations"]
);

typed_id!(
    ApplicationGatewayId, "Application Gateway", "Microsoft.Network",
    [name => "applicationGateways"]
);

impl ApplicationGatewayId {
    /// ID of a named child collection entry, e.g. `frontendPorts/port-80`.
    /// These are the references the gateway's own blocks use for each other.
    pub fn child(&self, collection: &str, name: &str) -> String {
        format!("{}/{}/{}", self, collection, name)
    }
}

impl VirtualHubId {
    /// The route table every hub gets on creation.
    pub fn default_route_table(&self) -> HubRouteTableId {
        HubRouteTableId::new(&self.subscription_id, &self.resource_group, &self.name, "defaultRouteTable")
    }
}
