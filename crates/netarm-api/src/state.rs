use std::sync::Arc;

use netarm_provider::ProviderMeta;
use netarm_store::StateStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StateStore>,
    pub meta: ProviderMeta,
    /// Bearer token required on every request except `/health`.
    pub auth_token: Arc<String>,
}
