pub mod error;
pub mod memory;
pub mod redb_store;
pub mod state;
pub mod store;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use redb_store::RedbStore;
pub use state::{config_hash, AuditEvent, Mode, ResourceAddress, ResourceState, ResourceStatus};
pub use store::StateStore;
