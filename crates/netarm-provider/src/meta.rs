use std::sync::Arc;
use std::time::Duration;

use netarm_client::ArmClient;

use crate::locks::NamedLocks;

/// Per-operation deadlines for a resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(60 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(60 * 60),
            delete: Duration::from_secs(60 * 60),
        }
    }
}

impl Timeouts {
    /// Gateways take notably longer to provision.
    pub fn gateway() -> Self {
        Self {
            create: Duration::from_secs(90 * 60),
            update: Duration::from_secs(90 * 60),
            delete: Duration::from_secs(90 * 60),
            ..Self::default()
        }
    }
}

/// Operator-supplied overrides that replace a resource's own timeouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutOverrides {
    pub create: Option<Duration>,
    pub read: Option<Duration>,
    pub update: Option<Duration>,
    pub delete: Option<Duration>,
}

impl TimeoutOverrides {
    pub fn apply(&self, base: Timeouts) -> Timeouts {
        Timeouts {
            create: self.create.unwrap_or(base.create),
            read: self.read.unwrap_or(base.read),
            update: self.update.unwrap_or(base.update),
            delete: self.delete.unwrap_or(base.delete),
        }
    }
}

/// Everything a lifecycle operation needs besides its data object.
#[derive(Clone)]
pub struct ProviderMeta {
    pub client: Arc<dyn ArmClient>,
    pub subscription_id: String,
    pub locks: NamedLocks,
    pub timeouts: TimeoutOverrides,
}

impl ProviderMeta {
    pub fn new(client: Arc<dyn ArmClient>, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            locks: NamedLocks::new(),
            timeouts: TimeoutOverrides::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutOverrides) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn client(&self) -> &dyn ArmClient {
        self.client.as_ref()
    }
}
