pub mod diagnostics;
pub mod error;
pub mod id;
pub mod location;
pub mod network;
pub mod typed;
pub mod validate;

#[cfg(test)]
mod tests;

pub use diagnostics::Diagnostics;
pub use error::IdError;
pub use id::{last_segment, ResourceId};
pub use location::normalize_location;
pub use network::*;
pub use typed::TypedId;
pub use validate::validate_id;
