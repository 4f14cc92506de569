//! Dependency ordering of resource addresses.

use std::collections::HashMap;

use netarm_store::ResourceAddress;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{from} depends on {to}, which is not declared")]
    UnknownDependency { from: ResourceAddress, to: ResourceAddress },

    #[error("dependency cycle involving {0}")]
    CycleDetected(ResourceAddress),

    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<GraphError>),
}

/// Order `nodes` so that every address comes after the addresses it depends
/// on. Ties keep input order.
///
/// With `strict`, a dependency on an address outside `nodes` is an error;
/// otherwise such edges are ignored (state may hold fewer entries than the
/// configuration once did).
pub fn order(nodes: &[(ResourceAddress, Vec<ResourceAddress>)], strict: bool) -> Result<Vec<ResourceAddress>, GraphError> {
    let mut graph: DiGraph<&ResourceAddress, ()> = DiGraph::new();
    let index: HashMap<&ResourceAddress, NodeIndex> =
        nodes.iter().map(|(address, _)| (address, graph.add_node(address))).collect();

    let mut errors = Vec::new();
    // Edge dependency -> dependent: the dependency is handled first.
    for (address, deps) in nodes {
        for dep in deps {
            match index.get(dep) {
                Some(from) => {
                    graph.add_edge(*from, index[address], ());
                }
                None if strict => errors.push(GraphError::UnknownDependency { from: address.clone(), to: dep.clone() }),
                None => {}
            }
        }
    }
    if !errors.is_empty() {
        if errors.len() == 1 {
            return Err(errors.remove(0));
        }
        return Err(GraphError::Multiple(errors));
    }

    let sorted = toposort(&graph, None).map_err(|cycle| GraphError::CycleDetected(graph[cycle.node_id()].clone()))?;
    Ok(stable(&graph, sorted))
}

/// Re-run Kahn's algorithm picking the lowest input position among ready
/// nodes, so unrelated blocks keep the order they were declared in.
fn stable(graph: &DiGraph<&ResourceAddress, ()>, sorted: Vec<NodeIndex>) -> Vec<ResourceAddress> {
    use petgraph::Direction;

    let mut remaining: HashMap<NodeIndex, usize> = sorted
        .iter()
        .map(|n| (*n, graph.neighbors_directed(*n, Direction::Incoming).count()))
        .collect();
    let mut ready: Vec<NodeIndex> = remaining.iter().filter(|(_, d)| **d == 0).map(|(n, _)| *n).collect();
    let mut out = Vec::with_capacity(sorted.len());

    while !ready.is_empty() {
        ready.sort_by_key(|n| std::cmp::Reverse(n.index()));
        let Some(next) = ready.pop() else { break };
        out.push(graph[next].clone());
        for succ in graph.neighbors_directed(next, Direction::Outgoing) {
            if let Some(d) = remaining.get_mut(&succ) {
                *d -= 1;
                if *d == 0 {
                    ready.push(succ);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(name: &str) -> ResourceAddress {
        name.parse().unwrap()
    }

    #[test]
    fn dependencies_come_first() {
        let nodes = vec![
            (a("azurerm_subnet.app"), vec![a("azurerm_virtual_network.spoke")]),
            (a("azurerm_public_ip.pip"), vec![]),
            (a("azurerm_virtual_network.spoke"), vec![]),
        ];
        let order = order(&nodes, true).unwrap();
        assert_eq!(
            order,
            vec![a("azurerm_public_ip.pip"), a("azurerm_virtual_network.spoke"), a("azurerm_subnet.app")]
        );
    }

    #[test]
    fn duplicate_edges_do_not_break_ordering() {
        let nodes = vec![
            (a("azurerm_vpn_gateway.gw"), vec![a("azurerm_virtual_hub.hub"), a("azurerm_virtual_hub.hub")]),
            (a("azurerm_virtual_hub.hub"), vec![]),
        ];
        assert_eq!(order(&nodes, true).unwrap(), vec![a("azurerm_virtual_hub.hub"), a("azurerm_vpn_gateway.gw")]);
    }

    #[test]
    fn unknown_dependency_only_fails_when_strict() {
        let nodes = vec![(a("azurerm_subnet.app"), vec![a("azurerm_virtual_network.gone")])];
        let err = order(&nodes, true).unwrap_err();
        assert_eq!(err.to_string(), "azurerm_subnet.app depends on azurerm_virtual_network.gone, which is not declared");
        assert_eq!(order(&nodes, false).unwrap(), vec![a("azurerm_subnet.app")]);
    }

    #[test]
    fn cycles_are_rejected() {
        let nodes = vec![
            (a("azurerm_virtual_hub.a"), vec![a("azurerm_virtual_wan.b")]),
            (a("azurerm_virtual_wan.b"), vec![a("azurerm_virtual_hub.a")]),
        ];
        assert!(matches!(order(&nodes, true), Err(GraphError::CycleDetected(_))));

        let self_loop = vec![(a("azurerm_virtual_wan.w"), vec![a("azurerm_virtual_wan.w")])];
        assert!(matches!(order(&self_loop, true), Err(GraphError::CycleDetected(_))));
    }
}
