use std::path::{Path, PathBuf};

use netarm_store::ResourceAddress;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::provider::ProviderSettings;
use crate::raw::{RawBlock, RawFile};
use crate::reference::{references, Reference};

/// One `resources:` or `data:` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub address: ResourceAddress,
    pub depends_on: Vec<ResourceAddress>,
    pub config: Map<String, Value>,
    /// File the block was declared in.
    pub source: String,
}

impl Block {
    /// References found in the block's configuration.
    pub fn references(&self) -> Vec<Reference> {
        // Every block was checked when loaded.
        references(&Value::Object(self.config.clone())).unwrap_or_default()
    }

    /// Addresses this block must come after: explicit `depends_on` first,
    /// then the targets of its references.
    pub fn dependencies(&self) -> Vec<ResourceAddress> {
        let mut deps = self.depends_on.clone();
        for r in self.references() {
            if !deps.contains(&r.address) {
                deps.push(r.address);
            }
        }
        deps
    }
}

/// Everything loaded from a configuration directory.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    pub provider: ProviderSettings,
    pub blocks: Vec<Block>,
    provider_source: Option<String>,
}

impl Configuration {
    pub fn get(&self, address: &ResourceAddress) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.address == address)
    }

    pub fn managed(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| !b.address.is_data())
    }

    pub fn data(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.address.is_data())
    }

    fn absorb(&mut self, other: Configuration) -> Result<(), ConfigError> {
        if let Some(second) = other.provider_source {
            if let Some(first) = &self.provider_source {
                return Err(ConfigError::DuplicateProvider { first: first.clone(), second });
            }
            self.provider = other.provider;
            self.provider_source = Some(second);
        }
        for block in other.blocks {
            if self.get(&block.address).is_some() {
                return Err(ConfigError::DuplicateAddress(block.address.to_string()));
            }
            self.blocks.push(block);
        }
        Ok(())
    }
}

/// Load every `*.yml` / `*.yaml` file under `dir`, recursively, in path order.
///
/// ```text
/// <dir>/
///   provider.yml     <- provider: {...}
///   network.yml      <- resources: [...]
///   hub/lookups.yml  <- data: [...]
/// ```
pub fn load_dir(dir: &Path) -> Result<Configuration, ConfigError> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let mut config = Configuration::default();
    for path in files {
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        debug!("Loading configuration from {}", path.display());
        config.absorb(load_str(&content, &path.display().to_string())?)?;
    }
    Ok(config)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
    let io = |e| ConfigError::Io { path: dir.display().to_string(), source: e };
    for entry in std::fs::read_dir(dir).map_err(io)? {
        let path = entry.map_err(io)?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("yml" | "yaml")) {
            out.push(path);
        }
    }
    Ok(())
}

/// Parse one configuration document. `path` is only used in messages.
pub fn load_str(content: &str, path: &str) -> Result<Configuration, ConfigError> {
    let mut config = Configuration::default();
    if content.trim().is_empty() {
        return Ok(config);
    }
    let raw: RawFile = serde_yaml::from_str(content).map_err(|e| ConfigError::YamlParse {
        path: path.to_string(),
        source: e,
    })?;

    if let Some(provider) = raw.provider {
        config.provider = ProviderSettings::from_raw(provider, path)?;
        config.provider_source = Some(path.to_string());
    }

    let managed = raw.resources.into_iter().map(|b| (b, false));
    let data = raw.data.into_iter().map(|b| (b, true));
    for (raw_block, is_data) in managed.chain(data) {
        let block = convert_block(raw_block, is_data, path)?;
        config.absorb(Configuration { blocks: vec![block], ..Default::default() })?;
    }
    Ok(config)
}

fn valid_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

fn convert_block(raw: RawBlock, is_data: bool, path: &str) -> Result<Block, ConfigError> {
    let conversion = |message: String| ConfigError::Conversion { path: path.to_string(), message };

    if !valid_name(&raw.type_name) {
        return Err(conversion(format!("invalid type {:?}", raw.type_name)));
    }
    if !valid_name(&raw.name) {
        return Err(conversion(format!(
            "invalid name {:?} for {}: use letters, digits, '_' or '-', not starting with a digit",
            raw.name, raw.type_name
        )));
    }
    let address = if is_data {
        ResourceAddress::data(&raw.type_name, &raw.name)
    } else {
        ResourceAddress::managed(&raw.type_name, &raw.name)
    };

    let depends_on = raw
        .depends_on
        .iter()
        .map(|d| d.parse::<ResourceAddress>().map_err(|e| conversion(format!("{}: depends_on: {}", address, e))))
        .collect::<Result<Vec<_>, _>>()?;

    if let Err(message) = references(&Value::Object(raw.config.clone())) {
        return Err(ConfigError::Reference { address: address.to_string(), reference: String::new(), message });
    }

    Ok(Block { address, depends_on, config: raw.config, source: path.to_string() })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const NETWORK: &str = r#"
resources:
  - type: azurerm_virtual_network
    name: hub
    config:
      name: vnet-hub
      resource_group_name: rg1
      location: West Europe
      address_space: ["10.0.0.0/16"]
  - type: azurerm_subnet
    name: app
    depends_on: [azurerm_virtual_network.hub]
    config:
      name: app
      resource_group_name: rg1
      virtual_network_name: "${azurerm_virtual_network.hub.name}"
      address_prefixes: ["10.0.1.0/24"]
data:
  - type: azurerm_public_ip
    name: existing
    config:
      name: pip1
      resource_group_name: rg1
"#;

    #[test]
    fn parses_blocks_and_dependencies() {
        let cfg = load_str(NETWORK, "network.yml").unwrap();
        assert_eq!(cfg.managed().count(), 2);
        assert_eq!(cfg.data().count(), 1);

        let subnet = cfg.get(&ResourceAddress::managed("azurerm_subnet", "app")).unwrap();
        assert_eq!(subnet.config["address_prefixes"], json!(["10.0.1.0/24"]));
        assert_eq!(subnet.dependencies(), vec![ResourceAddress::managed("azurerm_virtual_network", "hub")]);
        assert_eq!(subnet.source, "network.yml");

        let pip = cfg.get(&ResourceAddress::data("azurerm_public_ip", "existing")).unwrap();
        assert!(pip.dependencies().is_empty());
    }

    #[test]
    fn duplicate_address_is_rejected() {
        let doc = r#"
resources:
  - { type: azurerm_virtual_wan, name: wan, config: {} }
  - { type: azurerm_virtual_wan, name: wan, config: {} }
"#;
        let err = load_str(doc, "dup.yml").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateAddress(ref a) if a == "azurerm_virtual_wan.wan"));
        assert_eq!(err.to_string(), "azurerm_virtual_wan.wan is declared more than once");
    }

    #[test]
    fn invalid_names_and_references_are_rejected() {
        let err = load_str("resources: [{ type: azurerm_virtual_wan, name: 'my wan' }]", "x.yml").unwrap_err();
        assert!(err.to_string().contains("invalid name"), "{err}");

        let err = load_str("resources: [{ type: azurerm_subnet, name: s, depends_on: [nope] }]", "x.yml").unwrap_err();
        assert!(err.to_string().contains("depends_on"), "{err}");

        let doc = "resources: [{ type: azurerm_subnet, name: s, config: { virtual_network_name: '${azurerm_virtual_network}' } }]";
        let err = load_str(doc, "x.yml").unwrap_err();
        assert!(matches!(err, ConfigError::Reference { .. }), "{err}");
    }

    #[test]
    fn unknown_sections_and_empty_files() {
        assert!(load_str("outputs: []", "x.yml").is_err());
        assert!(load_str("  \n", "empty.yml").unwrap().blocks.is_empty());
    }

    #[test]
    fn provider_block() {
        let doc = r#"
provider:
  subscription_id: 00000000-0000-0000-0000-000000000000
  environment: usgovernment
  poll: { max_polls: 10 }
  timeouts: { create: 2h }
"#;
        let cfg = load_str(doc, "provider.yml").unwrap();
        let arm = cfg.provider.arm_config().unwrap();
        assert_eq!(arm.management_endpoint(), "https://management.usgovcloudapi.net");
        assert_eq!(arm.poll.max_polls, 10);
        assert_eq!(arm.poll.delays_secs, vec![1, 2, 4, 8, 16, 30]);
        assert_eq!(cfg.provider.timeouts.create, Some(std::time::Duration::from_secs(7200)));

        let err = load_str("provider: { environment: mars }", "p.yml").unwrap_err();
        assert!(err.to_string().contains("mars"), "{err}");
    }
}
