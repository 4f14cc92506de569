use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use netarm_client::Environment;
use netarm_config::ProviderSettings;

#[derive(Debug, Parser)]
#[command(name = "netarm", about = "Manage Azure network resources from YAML configuration", version)]
pub struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path of the state database.
    #[arg(long, env = "NETARM_STATE", default_value = ".netarm/state.redb", global = true)]
    pub state: PathBuf,

    #[command(flatten)]
    pub provider: ProviderArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Provider settings given on the command line. They override the
/// `provider:` block, which overrides the `ARM_*` environment.
#[derive(Debug, Clone, Default, Args)]
pub struct ProviderArgs {
    #[arg(long, global = true)]
    pub subscription_id: Option<String>,

    #[arg(long, global = true)]
    pub tenant_id: Option<String>,

    #[arg(long, global = true)]
    pub client_id: Option<String>,

    #[arg(long, global = true)]
    pub client_secret: Option<String>,

    /// public, usgovernment or china.
    #[arg(long, global = true)]
    pub environment: Option<Environment>,

    #[arg(long, global = true)]
    pub management_endpoint: Option<String>,
}

impl ProviderArgs {
    pub fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            subscription_id: self.subscription_id.clone(),
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            environment: self.environment,
            management_endpoint: self.management_endpoint.clone(),
            ..ProviderSettings::default()
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the provider over HTTP.
    Serve {
        /// Directory whose `provider:` block configures the ARM client.
        #[arg(long)]
        config_dir: Option<PathBuf>,

        #[arg(long, default_value = "0.0.0.0")]
        bind: String,

        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Bearer token clients must present. Generated when absent.
        #[arg(long, env = "NETARM_TOKEN")]
        token: Option<String>,

        /// Keep state in memory instead of the state database.
        #[arg(long)]
        ephemeral: bool,
    },

    /// Check a configuration directory without contacting Azure.
    Validate { config_dir: PathBuf },

    /// Show what apply would change.
    Plan { config_dir: PathBuf },

    /// Create, update and delete resources until Azure matches the configuration.
    Apply { config_dir: PathBuf },

    /// Delete every resource in state.
    Destroy {
        /// Directory whose `provider:` block configures the ARM client.
        config_dir: Option<PathBuf>,

        /// Delete without showing the plan first.
        #[arg(long)]
        auto_approve: bool,
    },

    /// Adopt an existing Azure object under a resource address.
    Import {
        /// e.g. `azurerm_virtual_network.hub`.
        address: String,
        /// The object's ARM ID.
        id: String,
        #[arg(long)]
        config_dir: Option<PathBuf>,
    },

    /// Re-read every managed resource and update state.
    Refresh { config_dir: Option<PathBuf> },

    /// Print the schema of one type, or of every type.
    Schema { type_name: Option<String> },

    /// Inspect or edit stored state.
    State {
        #[command(subcommand)]
        command: StateCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// List every address in state.
    List,
    /// Print the stored entry of one address.
    Show { address: String },
    /// Forget an address without deleting the remote object.
    Rm { address: String },
    /// Print recent audit events.
    Events {
        address: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_flags_are_global() {
        let cli = Cli::try_parse_from([
            "netarm",
            "plan",
            "./net",
            "--subscription-id",
            "sub1",
            "--environment",
            "china",
        ])
        .unwrap();
        let settings = cli.provider.settings();
        assert_eq!(settings.subscription_id.as_deref(), Some("sub1"));
        assert_eq!(settings.environment, Some(Environment::China));
        assert!(matches!(cli.command, Command::Plan { .. }));
    }

    #[test]
    fn destroy_defaults_to_confirmation() {
        let cli = Cli::try_parse_from(["netarm", "destroy"]).unwrap();
        match cli.command {
            Command::Destroy { config_dir, auto_approve } => {
                assert!(config_dir.is_none());
                assert!(!auto_approve);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(Cli::try_parse_from(["netarm", "validate", ".", "--environment", "mars"]).is_err());
    }
}
