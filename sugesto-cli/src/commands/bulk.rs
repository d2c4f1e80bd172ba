//! Bulk command - validate a list and write the CSV report.

use anyhow::{Context, Result, bail};
use clap::Args;
use std::path::{Path, PathBuf};
use sugesto_bulk::{BulkError, BulkRunner, export_csv, parse_input_list, report_filename};
use sugesto_core::ProfileSource;
use sugesto_store::Identity;
use tracing::{info, warn};

use super::{AppContext, BULK_TOOL_ID, OutputTarget, now_ms, read_input};
use crate::output::{BulkOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the bulk command.
#[derive(Args, Default)]
pub struct BulkArgs {
    /// File with addresses separated by newlines, commas, or semicolons.
    /// Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Addresses given inline instead of a file.
    #[arg(long, short, conflicts_with = "input")]
    pub emails: Option<String>,

    /// Report path; `-` prints the CSV. Defaults to bulk-validation-<ms>.csv.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Validation calls in flight (overrides `bulk_concurrency`).
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Extensions accepted for a list file.
const INPUT_EXTENSIONS: &[&str] = &["txt", "csv"];

/// Refuses list files that are not `.txt` or `.csv`. Stdin is always accepted.
fn check_input_path(path: Option<&Path>) -> Result<()> {
    let Some(path) = path.filter(|p| *p != Path::new("-")) else {
        return Ok(());
    };
    let accepted = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| INPUT_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)));
    if !accepted {
        bail!("Please upload a .txt or .csv file");
    }
    Ok(())
}

/// Runs the bulk command.
///
/// The backend debits one credit per item, so nothing is decremented
/// locally; the profile is fetched again afterwards and copied into the
/// meter record.
pub async fn run(args: &BulkArgs, cli: &Cli) -> Result<()> {
    check_input_path(args.input.as_deref())?;
    let ctx = AppContext::load(cli)?;
    let session = ctx.require_session()?;
    let client = ctx.api_client(Some(&session.access_token))?;

    let raw = match &args.emails {
        Some(inline) => inline.clone(),
        None => read_input(args.input.as_deref())?,
    };

    // An empty list is refused by the runner without touching the network
    let total = parse_input_list(&raw).len();
    let quota = if total == 0 {
        0
    } else {
        client
            .fetch_profile()
            .await
            .context("Failed to fetch credit balance")?
            .credits_remaining
    };

    let concurrency = args.concurrency.unwrap_or(ctx.settings.bulk_concurrency);
    let runner = BulkRunner::new(client).with_concurrency(concurrency);

    let show_progress = cli.format == OutputFormat::Text && !cli.quiet;
    let formatter = TextFormatter::new(!cli.no_color);

    let run = runner
        .run_with(&raw, quota, |index, result| {
            if show_progress {
                eprintln!("{}", formatter.format_item(index, total, result));
            }
        })
        .await?;

    if let Some(rejection) = run.rejection.clone() {
        if cli.format == OutputFormat::Json {
            println!("{}", JsonFormatter::new(cli.pretty).format(&BulkOutput::from_run(&run))?);
        }
        return Err(BulkError::Rejected(rejection).into());
    }

    let target = OutputTarget::resolve(args.output.as_deref(), &report_filename(now_ms()));
    target.write(&export_csv(&run.results)).await?;
    if let Some(path) = target.path() {
        info!(path = %path.display(), rows = run.results.len(), "Report written");
    }

    let credits_remaining = sync_credits(&ctx, runner.validator()).await;

    match cli.format {
        OutputFormat::Text if cli.quiet => {}
        OutputFormat::Text => {
            if let Some(summary) = &run.summary {
                let report = target.path();
                let text = formatter.format_bulk_summary(summary, report, run.duration);
                // With `-o -` stdout carries the CSV
                if report.is_some() {
                    println!("{text}");
                } else {
                    eprintln!("{text}");
                }
            }
            if let Some(credits) = credits_remaining {
                eprintln!("Credits remaining: {credits}");
            }
        }
        OutputFormat::Json => {
            let mut output = BulkOutput::from_run(&run);
            output.report_path = target.path().map(|p| p.display().to_string());
            output.credits_remaining = credits_remaining;
            let json = JsonFormatter::new(cli.pretty).format(&output)?;
            if target.path().is_some() {
                println!("{json}");
            } else {
                eprintln!("{json}");
            }
        }
    }

    Ok(())
}

/// Refetches the profile and copies it into the bulk meter record.
///
/// A failure here does not fail the run; the report is already written.
async fn sync_credits<P: ProfileSource>(ctx: &AppContext, source: &P) -> Option<u64> {
    let profile = match source.fetch_profile().await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "Could not refresh credits after bulk run");
            return None;
        }
    };

    let meter = ctx.meter(Identity::Authenticated);
    if let Err(e) = meter.apply_profile(BULK_TOOL_ID, &profile) {
        warn!(error = %e, "Could not store refreshed credits");
    }
    Some(profile.credits_remaining)
}
