//! Lock command - read or change the door lock.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use ss3link_client::SetLockState;

use super::Context;

/// Arguments for the lock command.
#[derive(Args, Debug)]
pub struct LockArgs {
    #[command(subcommand)]
    pub command: LockCommand,
}

#[derive(Subcommand, Debug)]
pub enum LockCommand {
    /// Show the current lock state
    Get,

    /// Lock or unlock
    Set {
        /// Action: lock or unlock
        action: SetLockState,
    },
}

#[derive(Debug, Serialize)]
struct LockOutput {
    state: String,
    lock_id: Option<String>,
}

/// Run the lock command.
pub async fn run(args: LockArgs, ctx: &Context) -> Result<()> {
    let services = ctx.services().await?;
    services.ensure_authorized().await?;

    let state = match args.command {
        LockCommand::Get => services.client.lock_state().await?,
        LockCommand::Set { action } => services.client.set_lock_state(action).await?,
    };

    if ctx.json_output {
        let output = LockOutput {
            state: state.to_string(),
            lock_id: services.client.cached_lock_id(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Lock: {}", state);
    }
    Ok(())
}
