//! Check command - validate one address on a free trial or a reserved credit.

use anyhow::{Result, bail};
use clap::Args;
use std::future::Future;
use sugesto_bulk::is_plausible_email;
use sugesto_store::{Identity, RefundPolicy, UsageMeter};
use tracing::{debug, info};

use super::{AppContext, CHECK_TOOL_ID, GateError, trial_call, upgrade_notice};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Address to validate.
    pub email: String,
}

/// Runs the check command.
pub async fn run(args: &CheckArgs, cli: &Cli) -> Result<()> {
    let email = args.email.trim();
    if !is_plausible_email(email) {
        bail!("Not an email address: {email}");
    }

    let ctx = AppContext::load(cli)?;
    let identity = ctx.identity()?;
    let meter = ctx.meter(identity);

    let (validation, last_trial) = match identity {
        Identity::Anonymous => {
            let client = ctx.api_client(None)?;
            trial_call(&meter, CHECK_TOOL_ID, || client.check_email(email)).await?
        }
        Identity::Authenticated => {
            let session = ctx.require_session()?;
            let client = ctx.api_client(Some(&session.access_token))?;
            let validation = metered_call(&meter, ctx.settings.refund_policy, CHECK_TOOL_ID, || {
                client.bulk_validate(email)
            })
            .await?;
            (validation, false)
        }
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_validation(email, &validation));
            if !cli.quiet {
                match identity {
                    Identity::Anonymous => eprintln!(
                        "Free trials left: {}",
                        meter.remaining_trials(CHECK_TOOL_ID)
                    ),
                    Identity::Authenticated => eprintln!(
                        "Credits remaining: {}",
                        meter.snapshot(CHECK_TOOL_ID)?.credits_available
                    ),
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&validation)?);
        }
    }
    if last_trial {
        eprintln!("{}", upgrade_notice(CHECK_TOOL_ID));
    }

    Ok(())
}

/// Reserves a credit, runs `call`, then settles the reservation.
///
/// The credit is taken before the call is sent. Whether a failed call gets
/// it back is decided by `policy`.
///
/// # Errors
///
/// Returns `GateError::Denied` when no credit can be reserved, or the
/// call's own error.
pub async fn metered_call<T, E, F, Fut>(
    meter: &UsageMeter,
    policy: RefundPolicy,
    tool_id: &str,
    call: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<anyhow::Error>,
{
    let reservation = meter.reserve_credit(tool_id).map_err(GateError::Denied)?;
    debug!(tool_id, reserved_at = reservation.reserved_at(), "Credit reserved");

    let result = call().await;
    if meter.settle(reservation, result.is_ok(), policy) {
        info!(tool_id, "Call failed, credit refunded");
    }
    result.map_err(Into::into)
}
