//! Clean command - deduplicate a list and drop malformed lines.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use sugesto_bulk::{CleanedList, clean_list, cleaned_filename};
use sugesto_store::{Identity, UsageMeter};
use tracing::info;

use super::{
    AppContext, CLEAN_TOOL_ID, OutputTarget, check_gate, now_ms, read_input, spend_trial,
    upgrade_notice,
};
use crate::output::{CleanOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the clean command.
#[derive(Args, Default)]
pub struct CleanArgs {
    /// File with one address per line. Reads stdin when omitted or `-`.
    pub input: Option<PathBuf>,

    /// Output path; `-` prints the list. Defaults to cleaned-emails-<ms>.txt.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Runs the clean command.
pub async fn run(args: &CleanArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;
    let meter = ctx.meter(ctx.identity()?);
    let raw = read_input(args.input.as_deref())?;

    let (cleaned, last_trial) = clean_metered(&meter, &raw)?;
    let stats = cleaned.stats();
    info!(
        total = stats.total_input,
        kept = stats.valid_unique,
        duplicates = stats.duplicates_removed,
        invalid = stats.invalid_removed,
        "List cleaned"
    );

    let target = OutputTarget::resolve(args.output.as_deref(), &cleaned_filename(now_ms()));
    target.write(&cleaned.clean_text()).await?;

    let remaining_trials =
        (meter.identity() == Identity::Anonymous).then(|| meter.remaining_trials(CLEAN_TOOL_ID));

    match cli.format {
        OutputFormat::Text if cli.quiet => {}
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let text = formatter.format_clean(&stats, target.path());
            // With `-o -` stdout carries the list
            if target.path().is_some() {
                println!("{text}");
            } else {
                eprintln!("{text}");
            }
            if let Some(left) = remaining_trials {
                eprintln!("Free trials left: {left}");
            }
            if last_trial {
                eprintln!("{}", upgrade_notice(CLEAN_TOOL_ID));
            }
        }
        OutputFormat::Json => {
            let mut output = CleanOutput::from_list(&cleaned);
            output.output_path = target.path().map(|p| p.display().to_string());
            output.remaining_trials = remaining_trials;
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

/// Cleans `raw` if the meter allows it.
///
/// Anonymous callers spend one trial per successful run. Signed-in
/// callers are not metered. Also returns whether the run used the last
/// trial.
///
/// # Errors
///
/// Returns a `GateError` when the tool may not run.
pub fn clean_metered(meter: &UsageMeter, raw: &str) -> Result<(CleanedList, bool)> {
    if meter.identity() == Identity::Authenticated {
        return Ok((clean_list(raw), false));
    }

    check_gate(meter, CLEAN_TOOL_ID)?;
    let cleaned = clean_list(raw);
    Ok((cleaned, spend_trial(meter, CLEAN_TOOL_ID)))
}
