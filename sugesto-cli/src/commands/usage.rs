//! Usage command - show trials and credits per tool.

use anyhow::Result;
use clap::Args;
use std::collections::BTreeSet;
use sugesto_store::UsageMeter;
use tracing::debug;

use super::{AppContext, KNOWN_TOOLS, now_ms};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the usage command.
#[derive(Args, Default)]
pub struct UsageArgs {
    /// Tool to show (e.g. bulk-checker, list-cleaner). Shows all when omitted.
    pub tool: Option<String>,

    /// Forget the free trials used for the tool.
    #[arg(long, requires = "tool")]
    pub reset_trials: bool,

    /// Restore the tool's local credit grant.
    #[arg(long, requires = "tool")]
    pub reset_credits: bool,
}

/// Runs the usage command.
pub fn run(args: &UsageArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::load(cli)?;
    let identity = ctx.identity()?;
    let meter = ctx.meter(identity);

    if let Some(tool) = &args.tool {
        apply_resets(&meter, tool, args)?;
    }

    let tools = match &args.tool {
        Some(tool) => vec![tool.clone()],
        None => tool_list(ctx.usage().tool_ids()?),
    };

    let states = tools
        .iter()
        .map(|tool| meter.snapshot(tool))
        .collect::<Result<Vec<_>, _>>()?;
    let now = now_ms();
    debug!(tools = states.len(), identity = ?identity, "Showing usage");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            let blocks: Vec<String> = states
                .iter()
                .map(|state| {
                    formatter.format_usage(
                        state,
                        identity,
                        ctx.settings.credit_cycle_days,
                        now,
                    )
                })
                .collect();
            println!("{}", blocks.join("\n\n"));
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_usage(&states, now)?);
        }
    }

    Ok(())
}

fn apply_resets(meter: &UsageMeter, tool: &str, args: &UsageArgs) -> Result<()> {
    if args.reset_trials {
        meter.reset_trials(tool)?;
    }
    if args.reset_credits {
        meter.reset_credits(tool)?;
    }
    Ok(())
}

/// Known tools plus every tool with a stored record, sorted.
fn tool_list(stored: Vec<String>) -> Vec<String> {
    let mut tools: BTreeSet<String> = KNOWN_TOOLS.iter().map(|t| (*t).to_string()).collect();
    tools.extend(stored);
    tools.into_iter().collect()
}
