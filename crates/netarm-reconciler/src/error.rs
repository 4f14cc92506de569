use netarm_provider::ProviderError;
use netarm_store::ResourceAddress;
use thiserror::Error;

use crate::graph::GraphError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("config error: {0}")]
    Config(#[from] netarm_config::ConfigError),

    #[error("dependency error: {0}")]
    Graph(#[from] GraphError),

    #[error("store error: {0}")]
    Store(#[from] netarm_store::StoreError),

    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("{address}: {source}")]
    Provider {
        address: ResourceAddress,
        #[source]
        source: ProviderError,
    },

    #[error("{0} is already managed; remove it from state before importing again")]
    AlreadyManaged(ResourceAddress),

    #[error("{0} is not in state")]
    NotInState(ResourceAddress),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ReconcileError {
    pub(crate) fn provider(address: &ResourceAddress) -> impl FnOnce(ProviderError) -> ReconcileError + '_ {
        move |source| ReconcileError::Provider { address: address.clone(), source }
    }

    /// Problems a caller can fix by changing its input.
    pub fn is_invalid(&self) -> bool {
        match self {
            ReconcileError::Config(_) | ReconcileError::Graph(_) | ReconcileError::Invalid(_) => true,
            ReconcileError::Provider { source, .. } => source.is_validation(),
            _ => false,
        }
    }
}
