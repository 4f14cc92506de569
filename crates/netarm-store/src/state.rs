use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Managed,
    Data,
}

/// `azurerm_subnet.app` or `data.azurerm_subnet.app`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceAddress {
    pub mode: Mode,
    pub type_name: String,
    pub name: String,
}

impl ResourceAddress {
    pub fn managed(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self { mode: Mode::Managed, type_name: type_name.into(), name: name.into() }
    }

    pub fn data(type_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self { mode: Mode::Data, type_name: type_name.into(), name: name.into() }
    }

    pub fn is_data(&self) -> bool {
        self.mode == Mode::Data
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Managed => write!(f, "{}.{}", self.type_name, self.name),
            Mode::Data => write!(f, "data.{}.{}", self.type_name, self.name),
        }
    }
}

impl FromStr for ResourceAddress {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            ["data", t, n] if !t.is_empty() && !n.is_empty() => Ok(Self::data(*t, *n)),
            [t, n] if !t.is_empty() && !n.is_empty() => Ok(Self::managed(*t, *n)),
            _ => Err(StoreError::InvalidAddress(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Creating,
    Present,
    Updating,
    Deleting,
    /// A create or update failed after the remote object came into being.
    Tainted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub address: ResourceAddress,
    /// Remote ARM ID. `None` until a create has produced one.
    pub id: Option<String>,
    /// Attributes as last read from the remote object.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Configuration as last applied, after interpolation and defaults.
    #[serde(default)]
    pub config: Map<String, Value>,
    pub config_hash: String,
    /// Addresses this resource was applied after; destroy walks them in
    /// reverse.
    #[serde(default)]
    pub dependencies: Vec<ResourceAddress>,
    pub status: ResourceStatus,
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(address: ResourceAddress, config: Map<String, Value>) -> Self {
        Self {
            address,
            id: None,
            attributes: Map::new(),
            config_hash: config_hash(&config),
            config,
            dependencies: Vec::new(),
            status: ResourceStatus::Creating,
            updated_at: Utc::now(),
        }
    }

    pub fn touch(&mut self, status: ResourceStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// SHA-256 over the canonical JSON of a configuration. Object keys are
/// serialised in sorted order, so equal configurations hash equally.
pub fn config_hash(config: &Map<String, Value>) -> String {
    let bytes = serde_json::to_vec(config).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AuditEvent {
    ApplyStarted {
        id: Uuid,
        at: DateTime<Utc>,
        dry_run: bool,
    },
    ApplyCompleted {
        id: Uuid,
        at: DateTime<Utc>,
        changes: usize,
        dry_run: bool,
    },
    ResourceCreated {
        id: Uuid,
        at: DateTime<Utc>,
        address: ResourceAddress,
        remote_id: String,
    },
    ResourceUpdated {
        id: Uuid,
        at: DateTime<Utc>,
        address: ResourceAddress,
        fields: Vec<String>,
    },
    ResourceReplaced {
        id: Uuid,
        at: DateTime<Utc>,
        address: ResourceAddress,
        fields: Vec<String>,
    },
    ResourceDeleted {
        id: Uuid,
        at: DateTime<Utc>,
        address: ResourceAddress,
    },
    ResourceImported {
        id: Uuid,
        at: DateTime<Utc>,
        address: ResourceAddress,
        remote_id: String,
    },
    /// Refresh found the remote object gone.
    ResourceVanished {
        id: Uuid,
        at: DateTime<Utc>,
        address: ResourceAddress,
    },
}

impl AuditEvent {
    pub fn address(&self) -> Option<&ResourceAddress> {
        match self {
            AuditEvent::ResourceCreated { address, .. }
            | AuditEvent::ResourceUpdated { address, .. }
            | AuditEvent::ResourceReplaced { address, .. }
            | AuditEvent::ResourceDeleted { address, .. }
            | AuditEvent::ResourceImported { address, .. }
            | AuditEvent::ResourceVanished { address, .. } => Some(address),
            AuditEvent::ApplyStarted { .. } | AuditEvent::ApplyCompleted { .. } => None,
        }
    }
}
