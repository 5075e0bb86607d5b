//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod hosts;
pub mod leases;
pub mod restore;
pub mod save;
pub mod system;

use fbxguard_core::Appliance;

use crate::cli::Command;
use crate::config::Context;
use crate::error::CliError;

/// Route a connected command to its handler.
pub async fn dispatch(cmd: Command, appliance: &Appliance, ctx: &Context) -> Result<(), CliError> {
    match cmd {
        Command::Restore => restore::handle(appliance, ctx).await,
        Command::Save => save::handle(appliance, ctx).await,
        Command::Hosts(args) => hosts::handle(appliance, &args, ctx).await,
        Command::Leases(args) => leases::handle(appliance, &args, ctx).await,
        Command::System => system::handle(appliance, ctx).await,
        Command::Config(_) | Command::Completions(_) => {
            unreachable!("handled before connecting")
        }
    }
}
