//! HTTP surface of the provider: schema lookup, per-resource lifecycle calls
//! for a host runtime, and plan/apply/destroy over a configuration directory.

pub mod app;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
