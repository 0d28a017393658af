//! Auth command - session management.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in (refreshes a stored session, or runs the browser flow)
    Login,

    /// Show authentication status
    Status,

    /// Clear the stored session
    Logout,
}

/// Status for JSON output.
#[derive(Debug, Serialize)]
struct StatusOutput {
    signed_in: bool,
    authorized: bool,
    refresh_due_secs: Option<u64>,
    credentials_path: String,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login => cmd_login(ctx).await,
        AuthCommand::Status => cmd_status(ctx).await,
        AuthCommand::Logout => cmd_logout(ctx).await,
    }
}

async fn cmd_login(ctx: &Context) -> Result<()> {
    let services = ctx.services().await?;

    if services.tokens.is_authorized() {
        println!(
            "Already authenticated (refresh due in {})",
            services.tokens.status().refresh_due_display()
        );
        println!("Run 'ss3link auth logout' first to sign in again.");
        return Ok(());
    }

    services.ensure_authorized().await?;

    let user_id = services.client.user_id().await?;
    println!();
    println!("Authentication successful!");
    println!("User: {}", user_id);
    println!(
        "Refresh due in: {}",
        services.tokens.status().refresh_due_display()
    );
    Ok(())
}

async fn cmd_status(ctx: &Context) -> Result<()> {
    let services = ctx.services().await?;
    let status = services.tokens.status();
    let path = ctx.credentials_path();

    if ctx.json_output {
        let output = StatusOutput {
            signed_in: status.has_refresh_token,
            authorized: status.authorized,
            refresh_due_secs: status.refresh_due_in.map(|d| d.as_secs()),
            credentials_path: path.display().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Authentication Status");
    println!("---------------------");
    if status.has_refresh_token {
        println!("Session: signed in");
        println!("  Token live: {}", if status.authorized { "yes" } else { "no" });
        println!("  Refresh due: {}", status.refresh_due_display());
    } else {
        println!("Session: not signed in");
        println!("  Run 'ss3link auth login' to authenticate");
    }
    println!("Credentials: {}", path.display());

    Ok(())
}

async fn cmd_logout(ctx: &Context) -> Result<()> {
    let services = ctx.services().await?;

    if services.tokens.has_refresh_token() {
        services
            .tokens
            .logout()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to clear session: {}", e))?;
        println!("Session removed.");
    } else {
        println!("No stored session found.");
    }

    Ok(())
}
