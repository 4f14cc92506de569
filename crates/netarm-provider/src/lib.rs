pub mod crud;
pub mod error;
pub mod locks;
pub mod meta;
pub mod network;
pub mod ops;
pub mod registry;
pub mod resource;

pub use error::ProviderError;
pub use locks::NamedLocks;
pub use meta::{ProviderMeta, TimeoutOverrides, Timeouts};
pub use ops::{read_data_source, run, Operation};
pub use registry::{data_source, resource, schemas, Registration, DATA_SOURCES, RESOURCES};
pub use resource::{DataSource, Resource};
