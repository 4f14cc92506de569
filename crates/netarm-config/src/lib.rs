mod raw;
mod loader;
pub mod error;
pub mod provider;
pub mod reference;

pub use error::ConfigError;
pub use loader::{load_dir, load_str, Block, Configuration};
pub use provider::{parse_duration, ProviderSettings};
pub use reference::{interpolate, references, Reference};
