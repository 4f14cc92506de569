use std::path::Path;
use std::time::Duration;

use netarm_config::{load_dir, ConfigError};
use netarm_store::ResourceAddress;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn load_valid_fixture() {
    let cfg = load_dir(&fixture("basic")).expect("should load without error");

    assert_eq!(cfg.managed().count(), 6);
    assert_eq!(cfg.data().count(), 1);
    assert_eq!(cfg.provider.subscription_id.as_deref(), Some("00000000-0000-0000-0000-000000000000"));
    assert_eq!(cfg.provider.timeouts.create, Some(Duration::from_secs(90 * 60)));
    assert_eq!(cfg.provider.timeouts.delete, Some(Duration::from_secs(60 * 60)));
    assert_eq!(cfg.provider.timeouts.read, None);

    let conn = cfg.get(&ResourceAddress::managed("azurerm_virtual_hub_connection", "spoke")).unwrap();
    let deps: Vec<String> = conn.dependencies().iter().map(|a| a.to_string()).collect();
    assert_eq!(
        deps,
        vec!["azurerm_subnet.app", "azurerm_virtual_network.spoke", "azurerm_virtual_hub.core"]
    );
    assert!(conn.source.ends_with("wan.yaml"));
}

#[test]
fn nested_directories_are_read_in_path_order() {
    let cfg = load_dir(&fixture("basic")).unwrap();
    let first: Vec<String> = cfg.blocks.iter().take(2).map(|b| b.address.to_string()).collect();
    // hub/wan.yaml sorts before network.yml
    assert_eq!(first, vec!["azurerm_virtual_wan.core", "azurerm_virtual_hub.core"]);
}

#[test]
fn second_provider_block_is_rejected() {
    let err = load_dir(&fixture("duplicate")).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateProvider { .. }), "{err}");
}

#[test]
fn blocks_may_span_files_but_not_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let doc = "resources: [{ type: azurerm_virtual_wan, name: core }]";
    std::fs::write(dir.path().join("a.yml"), doc).unwrap();
    std::fs::write(dir.path().join("b.yaml"), doc).unwrap();

    let err = load_dir(dir.path()).unwrap_err();
    assert_eq!(err.to_string(), "azurerm_virtual_wan.core is declared more than once");
}

#[test]
fn missing_dir_returns_error() {
    let dir = Path::new("/nonexistent/path/does/not/exist");
    assert!(matches!(load_dir(dir), Err(ConfigError::Io { .. })));
}
