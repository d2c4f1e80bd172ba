// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Sugesto CLI - usage metering and bulk email validation from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Sign in (password is read from stdin when omitted)
//! sugesto login --email me@example.com
//!
//! # Validate a list; writes bulk-validation-<ms>.csv
//! sugesto bulk emails.txt
//!
//! # Validate inline addresses and print the CSV
//! sugesto bulk --emails "a@x.com, b@y.com" --output -
//!
//! # Deduplicate a list locally (free trials, then sign-in)
//! sugesto clean list.txt
//!
//! # Show trials and credits per tool
//! sugesto usage --format json --pretty
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use sugesto_bulk::{BulkError, Rejection};
use sugesto_fetch::FetchError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{GateError, auth, bulk, check, clean, config, usage};

// ============================================================================
// CLI Definition
// ============================================================================

/// Sugesto CLI - email validation tools with trial and credit metering.
#[derive(Parser)]
#[command(name = "sugesto")]
#[command(about = "Bulk email validation and list cleaning CLI")]
#[command(long_about = r#"
Sugesto validates email addresses against the Sugesto API.

Anonymous use gets a few free trials per tool. Signed-in accounts spend
credits, which the backend resets monthly.

Examples:
  sugesto login --email me@example.com
  sugesto bulk emails.txt             # CSV report in the current directory
  sugesto check someone@example.com   # One address, one credit
  sugesto clean list.txt              # Local dedup and syntax filter
  sugesto usage                       # Trials and credits per tool
"#)]
#[command(version)]
#[command(author = "Sugesto Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'usage' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// API base URL for this invocation.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Validate a list of addresses and write a CSV report.
    #[command(visible_alias = "b")]
    Bulk(bulk::BulkArgs),

    /// Validate a single address, spending one credit.
    Check(check::CheckArgs),

    /// Remove duplicates and malformed lines from a list.
    #[command(visible_alias = "c")]
    Clean(clean::CleanArgs),

    /// Show trials and credits per tool (default if no command specified).
    #[command(visible_alias = "u")]
    Usage(usage::UsageArgs),

    /// Sign in and store the session.
    Login(auth::LoginArgs),

    /// Clear the stored session.
    Logout,

    /// Show the signed-in account and its credits.
    #[command(visible_alias = "p")]
    Profile,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Sign-in required or rejected.
    AuthRequired = 2,
    /// Not enough trials or credits.
    QuotaExceeded = 3,
    /// Network failure or timeout.
    Network = 4,
}

impl ExitCode {
    /// Picks the exit code for a command failure.
    pub fn for_error(error: &anyhow::Error) -> Self {
        if let Some(e) = error.downcast_ref::<FetchError>() {
            return match e {
                e if e.is_auth() => ExitCode::AuthRequired,
                FetchError::InsufficientCredits(_) | FetchError::RateLimited { .. } => {
                    ExitCode::QuotaExceeded
                }
                FetchError::Http(_) => ExitCode::Network,
                e if e.is_transient() => ExitCode::Network,
                _ => ExitCode::Error,
            };
        }
        if let Some(e) = error.downcast_ref::<GateError>() {
            return match e {
                GateError::UpgradeRequired(_) => ExitCode::AuthRequired,
                GateError::Denied(_) => ExitCode::QuotaExceeded,
            };
        }
        match error.downcast_ref::<BulkError>() {
            Some(BulkError::Rejected(Rejection::InsufficientQuota { .. })) => {
                ExitCode::QuotaExceeded
            }
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("sugesto=debug,info")
    } else {
        EnvFilter::new("sugesto=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Bulk(args)) => bulk::run(args, &cli).await,
        Some(Commands::Check(args)) => check::run(args, &cli).await,
        Some(Commands::Clean(args)) => clean::run(args, &cli).await,
        Some(Commands::Usage(args)) => usage::run(args, &cli),
        Some(Commands::Login(args)) => auth::login(args, &cli).await,
        Some(Commands::Logout) => auth::logout(&cli),
        Some(Commands::Profile) => auth::profile(&cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli),
        None => {
            // Default to usage command
            usage::run(&usage::UsageArgs::default(), &cli)
        }
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
