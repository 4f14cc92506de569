use std::path::PathBuf;

use netarm_store::ResourceAddress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub config_dir: PathBuf,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Create,
    /// In-place update of the listed fields.
    Update { fields: Vec<String> },
    /// Delete then create; `fields` are the force-new fields that changed,
    /// or the fields pointing at a replaced dependency. Empty when the
    /// resource is tainted.
    Replace { fields: Vec<String> },
    Delete,
    /// Data source lookup.
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub address: ResourceAddress,
    pub action: Action,
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.action {
            Action::Create => write!(f, "+ {}", self.address),
            Action::Update { fields } => write!(f, "~ {} ({})", self.address, fields.join(", ")),
            Action::Replace { fields } if fields.is_empty() => write!(f, "-/+ {} (tainted)", self.address),
            Action::Replace { fields } => write!(f, "-/+ {} ({})", self.address, fields.join(", ")),
            Action::Delete => write!(f, "- {}", self.address),
            Action::Read => write!(f, "<= {}", self.address),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub dry_run: bool,
    pub changes: Vec<Change>,
    /// Addresses whose remote object had disappeared when refreshed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vanished: Vec<ResourceAddress>,
}

impl ReconcileReport {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run, ..Default::default() }
    }

    /// Changes other than data source reads.
    pub fn mutations(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| c.action != Action::Read)
    }
}
