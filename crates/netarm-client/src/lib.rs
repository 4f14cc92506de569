pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod local;
pub mod poller;
pub mod token;

pub use client::{delete_and_wait, put_and_wait, ArmClient, PutResponse};
pub use config::{ArmConfig, Environment, PollPolicy};
pub use error::{format_arm_error, parse_arm_error, ArmError};
pub use http::AzureClient;
pub use local::LocalArm;
pub use poller::{PollKind, PollStatus, Poller};
pub use token::{StaticToken, TokenProvider};
