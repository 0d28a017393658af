//! Alarm command - read or change the alarm mode.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use ss3link_client::{AlarmState, SetAlarmState};

use super::Context;

/// Arguments for the alarm command.
#[derive(Args, Debug)]
pub struct AlarmArgs {
    #[command(subcommand)]
    pub command: AlarmCommand,
}

#[derive(Subcommand, Debug)]
pub enum AlarmCommand {
    /// Show the current alarm state
    Get,

    /// Change the alarm mode
    Set {
        /// Target mode: off, home or away
        mode: SetAlarmState,
    },
}

#[derive(Debug, Serialize)]
struct AlarmOutput {
    state: &'static str,
    subscription: Option<String>,
}

/// Run the alarm command.
pub async fn run(args: AlarmArgs, ctx: &Context) -> Result<()> {
    let services = ctx.services().await?;
    services.ensure_authorized().await?;

    let state = match args.command {
        AlarmCommand::Get => services.client.alarm_state().await?,
        AlarmCommand::Set { mode } => services.client.set_alarm_state(mode).await?,
    };

    print_state(state, services.client.cached_subscription_id(), ctx)
}

fn print_state(state: AlarmState, subscription: Option<String>, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        let output = AlarmOutput {
            state: state.as_api_str(),
            subscription,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Alarm: {}", state);
    }
    Ok(())
}
