use netarm_reconciler::{Action, ReconcileReport};
use netarm_store::{ResourceState, ResourceStatus};

/// Render a plan or apply report as one line per change plus a summary.
pub fn render_report(report: &ReconcileReport) -> String {
    let mut out = String::new();
    for address in &report.vanished {
        out.push_str(&format!("! {} disappeared outside netarm\n", address));
    }
    for change in &report.changes {
        out.push_str(&change.to_string());
        out.push('\n');
    }

    let count = |pred: fn(&Action) -> bool| report.changes.iter().filter(|c| pred(&c.action)).count();
    let add = count(|a| matches!(a, Action::Create | Action::Replace { .. }));
    let change = count(|a| matches!(a, Action::Update { .. }));
    let destroy = count(|a| matches!(a, Action::Delete | Action::Replace { .. }));

    if add + change + destroy == 0 {
        out.push_str("No changes.\n");
    } else if report.dry_run {
        out.push_str(&format!("Plan: {} to add, {} to change, {} to destroy.\n", add, change, destroy));
    } else {
        out.push_str(&format!("Applied: {} added, {} changed, {} destroyed.\n", add, change, destroy));
    }
    out
}

/// One line per state entry: address, status and remote ID.
pub fn render_state(states: &[ResourceState]) -> String {
    if states.is_empty() {
        return "State is empty.\n".to_string();
    }
    let width = states.iter().map(|s| s.address.to_string().len()).max().unwrap_or(0);
    let mut out = String::new();
    for s in states {
        let status = match s.status {
            ResourceStatus::Creating => "creating",
            ResourceStatus::Present => "present",
            ResourceStatus::Updating => "updating",
            ResourceStatus::Deleting => "deleting",
            ResourceStatus::Tainted => "tainted",
        };
        let address = s.address.to_string();
        out.push_str(&format!(
            "{:width$}  {:8}  {}\n",
            address,
            status,
            s.id.as_deref().unwrap_or("-"),
            width = width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use netarm_reconciler::Change;
    use netarm_store::ResourceAddress;
    use serde_json::Map;

    use super::*;

    #[test]
    fn summary_counts_replacements_twice() {
        let mut report = ReconcileReport::new(true);
        report.changes = vec![
            Change { address: ResourceAddress::managed("azurerm_public_ip", "pip"), action: Action::Replace { fields: vec!["sku".into()] } },
            Change { address: ResourceAddress::managed("azurerm_subnet", "app"), action: Action::Create },
            Change { address: ResourceAddress::data("azurerm_virtual_network", "hub"), action: Action::Read },
        ];
        let out = render_report(&report);
        assert!(out.contains("-/+ azurerm_public_ip.pip (sku)\n"), "{out}");
        assert!(out.ends_with("Plan: 2 to add, 0 to change, 1 to destroy.\n"), "{out}");
    }

    #[test]
    fn reads_alone_are_no_changes() {
        let mut report = ReconcileReport::new(false);
        report.changes = vec![Change { address: ResourceAddress::data("azurerm_subnet", "s"), action: Action::Read }];
        assert!(render_report(&report).ends_with("No changes.\n"));
    }

    #[test]
    fn state_lines_are_aligned() {
        let mut a = ResourceState::new(ResourceAddress::managed("azurerm_subnet", "app"), Map::new());
        a.id = Some("/subscriptions/x/subnets/app".into());
        a.touch(ResourceStatus::Present);
        let b = ResourceState::new(ResourceAddress::managed("azurerm_virtual_network", "main"), Map::new());

        let out = render_state(&[a, b]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "azurerm_subnet.app            present   /subscriptions/x/subnets/app");
        assert_eq!(lines[1], "azurerm_virtual_network.main  creating  -");
    }
}
