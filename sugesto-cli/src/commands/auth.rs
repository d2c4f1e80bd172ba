//! Account commands - login, logout, and profile.

use anyhow::{Context, Result, bail};
use clap::Args;
use std::io::BufRead;
use sugesto_core::UserSnapshot;
use sugesto_fetch::LoginResponse;
use sugesto_store::{Identity, Session};
use tracing::{info, warn};

use super::{AppContext, BULK_TOOL_ID};
use crate::output::{JsonFormatter, ProfileOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    /// Account email.
    #[arg(long, short)]
    pub email: String,

    /// Password. Read from the first line of stdin when omitted.
    #[arg(long)]
    pub password: Option<String>,
}

/// Signs in and stores the session.
pub async fn login(args: &LoginArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;

    let password = match &args.password {
        Some(p) => p.clone(),
        None => read_password(cli.quiet)?,
    };
    if password.is_empty() {
        bail!("Password is required");
    }

    let client = ctx.api_client(None)?;
    let response = client
        .login(args.email.trim(), &password)
        .await
        .context("Login failed")?;

    let session = session_from_login(response);
    ctx.sessions().save(&session)?;

    let name = session
        .user
        .as_ref()
        .map_or_else(|| args.email.clone(), UserSnapshot::display_name);
    match cli.format {
        OutputFormat::Text => println!("Signed in as {name}"),
        OutputFormat::Json => {
            let output = serde_json::json!({ "signedIn": true, "user": session.user });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

/// Clears the stored session. Usage records are kept.
pub fn logout(cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;
    let was_signed_in = ctx.sessions().is_authenticated()?;
    ctx.sessions().clear()?;

    match cli.format {
        OutputFormat::Text if was_signed_in => println!("Signed out"),
        OutputFormat::Text => println!("Not signed in"),
        OutputFormat::Json => {
            let output = serde_json::json!({ "signedOut": was_signed_in });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

/// Shows the signed-in account and syncs its credits into the meter.
pub async fn profile(cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;
    let session = ctx.require_session()?;
    let client = ctx.api_client(Some(&session.access_token))?;

    let me = client.me().await.context("Failed to fetch profile")?;
    let profile = me.profile.context("User profile not found")?;
    let user = me.user.or(session.user);

    if let Err(e) = ctx
        .meter(Identity::Authenticated)
        .apply_profile(BULK_TOOL_ID, &profile)
    {
        warn!(error = %e, "Could not store synced credits");
    }
    info!(credits_remaining = profile.credits_remaining, "Profile fetched");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_profile(user.as_ref(), &profile));
        }
        OutputFormat::Json => {
            let output = ProfileOutput {
                user: user.as_ref(),
                profile: &profile,
            };
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

fn session_from_login(response: LoginResponse) -> Session {
    Session {
        access_token: response.tokens.access,
        refresh_token: Some(response.tokens.refresh).filter(|t| !t.is_empty()),
        user: Some(response.user),
    }
}

fn read_password(quiet: bool) -> Result<String> {
    if !quiet {
        eprint!("Password: ");
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
