#[cfg(test)]
mod tests {
    use crate::*;

    const SUB: &str = "00000000-0000-0000-0000-000000000000";

    fn prefix() -> String {
        format!("/subscriptions/{}/resourceGroups/foo/providers/Microsoft.Network", SUB)
    }

    /// Run the same malformed / well-formed table against any single-segment ID type.
    fn check_single_segment<T: TypedId + std::fmt::Debug>(type_token: &str) {
        let p = prefix();
        let cases: Vec<(String, bool)> = vec![
            (String::new(), false),
            ("/".into(), false),
            (format!("/subscriptions/{}", SUB), false),
            (format!("/subscriptions/{}/resourceGroups/foo", SUB), false),
            (format!("/subscriptions/{}/resourceGroups/foo/providers/Microsoft.Network", SUB), false),
            // type token without a name
            (format!("{}/{}", p, type_token), false),
            (format!("{}/{}/", p, type_token), false),
            // wrong type token
            (format!("{}/notTheType/example", p), false),
            // missing type token altogether
            (format!("{}/example", p), false),
            (format!("{}/{}/example", p, type_token), true),
            (format!("{}/{}/example/extra/segment", p, type_token), false),
            // wrong provider namespace
            (
                format!("/subscriptions/{}/resourceGroups/foo/providers/Microsoft.Compute/{}/example", SUB, type_token),
                false,
            ),
        ];

        for (input, valid) in cases {
            let result = T::parse(&input);
            assert_eq!(result.is_ok(), valid, "{} for {:?}: {:?}", type_token, input, result);
            if let Ok(id) = result {
                assert_eq!(id.resource_group(), "foo");
                assert_eq!(id.name(), "example");
                assert_eq!(id.subscription_id(), SUB);
                // round trip
                assert_eq!(id.id(), input);
            }
        }
    }

    #[test]
    fn network_security_group_ids() {
        check_single_segment::<NetworkSecurityGroupId>("networkSecurityGroups");
    }

    #[test]
    fn virtual_hub_ids() {
        check_single_segment::<VirtualHubId>("virtualHubs");
    }

    #[test]
    fn p2s_vpn_gateway_ids() {
        check_single_segment::<P2sVpnGatewayId>("p2sVpnGateways");
    }

    #[test]
    fn other_single_segment_ids() {
        check_single_segment::<VirtualNetworkId>("virtualNetworks");
        check_single_segment::<PublicIpAddressId>("publicIPAddresses");
        check_single_segment::<VirtualWanId>("virtualWans");
        check_single_segment::<VpnGatewayId>("vpnGateways");
        check_single_segment::<VpnServerConfigurationId>("vpnServerConfigurations");
        check_single_segment::<ApplicationGatewayId>("applicationGateways");
        check_single_segment::<DdosProtectionPlanId>("ddosProtectionPlans");
    }

    #[test]
    fn subnet_id_parses_parent() {
        let input = format!("{}/virtualNetworks/network1/subnets/example", prefix());
        let id = SubnetId::parse(&input).unwrap();
        assert_eq!(id.resource_group, "foo");
        assert_eq!(id.virtual_network_name, "network1");
        assert_eq!(id.name, "example");
        assert_eq!(id.to_string(), input);
    }

    #[test]
    fn subnet_id_rejects_missing_child() {
        let input = format!("{}/virtualNetworks/network1", prefix());
        let err = SubnetId::parse(&input).unwrap_err();
        assert!(matches!(err, IdError::MissingSegment { ref segment, .. } if segment == "subnets"), "{err:?}");

        let input = format!("{}/virtualNetworks/network1/subnets/", prefix());
        assert!(SubnetId::parse(&input).is_err());
    }

    #[test]
    fn hub_connection_id_round_trip() {
        let id = HubVirtualNetworkConnectionId::new(SUB, "foo", "hub1", "conn1");
        let parsed: HubVirtualNetworkConnectionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.virtual_hub_name, "hub1");
    }

    #[test]
    fn case_sensitivity_of_type_tokens() {
        let input = format!("{}/virtualhubs/example", prefix());
        assert!(VirtualHubId::parse(&input).is_err());
        let id = VirtualHubId::parse_insensitively(&input).unwrap();
        assert_eq!(id.name, "example");
        // formatting always yields the canonical casing
        assert_eq!(id.to_string(), format!("{}/virtualHubs/example", prefix()));
    }

    #[test]
    fn validate_id_reports_errors_only() {
        let good = format!("{}/virtualHubs/example", prefix());
        assert!(validate_id::<VirtualHubId>(&good, "virtual_hub_id").is_ok());

        let diags = validate_id::<VirtualHubId>("not-an-id", "virtual_hub_id");
        assert_eq!(diags.errors.len(), 1);
        assert!(diags.errors[0].contains("virtual_hub_id"));
        assert!(diags.warnings.is_empty());
    }

    #[test]
    fn application_gateway_child_reference() {
        let id = ApplicationGatewayId::new(SUB, "foo", "gw");
        let child = id.child("frontendPorts", "port-80");
        assert!(child.ends_with("/applicationGateways/gw/frontendPorts/port-80"));
        assert_eq!(last_segment(&child), "port-80");
    }

    #[test]
    fn default_route_table_of_hub() {
        let hub = VirtualHubId::new(SUB, "foo", "hub1");
        assert_eq!(
            hub.default_route_table().to_string(),
            format!("{}/virtualHubs/hub1/hubRouteTables/defaultRouteTable", prefix())
        );
    }
}
