mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command, StateCommand};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let flags = cli.provider.settings();
    let state = cli.state.as_path();

    match cli.command {
        Command::Serve { config_dir, bind, port, token, ephemeral } => {
            commands::serve(state, &flags, config_dir, bind, port, token, ephemeral).await
        }
        Command::Validate { config_dir } => commands::validate(&config_dir),
        Command::Plan { config_dir } => commands::plan(state, &config_dir).await,
        Command::Apply { config_dir } => commands::apply(state, &flags, &config_dir).await,
        Command::Destroy { config_dir, auto_approve } => commands::destroy(state, &flags, config_dir, auto_approve).await,
        Command::Import { address, id, config_dir } => commands::import(state, &flags, &address, &id, config_dir).await,
        Command::Refresh { config_dir } => commands::refresh(state, &flags, config_dir).await,
        Command::Schema { type_name } => commands::schema(type_name),
        Command::State { command } => match command {
            StateCommand::List => commands::state_list(state).await,
            StateCommand::Show { address } => commands::state_show(state, &address).await,
            StateCommand::Rm { address } => commands::state_rm(state, &address).await,
            StateCommand::Events { address, limit } => commands::state_events(state, address, limit).await,
        },
    }
}
