//! CLI module for the modulith tooling
//!
//! ## Commands
//!
//! - `stubs [--check] [--output PATH]` - Generate (or verify) the registry's declaration file
//! - `scan` - List the modules referencing the registry
//! - `capabilities` - List registered capabilities in registration order
//! - `module <NAME>` - Declare an independent module in the contract file
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.
//!
//! Capabilities are linked into the binary that calls `run()`. A host application declares its `#[capability]`
//! functions and calls `modulith::cli::run()` from its own `main` so the emitted stub describes them.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use miette::Diagnostic;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a library error as a miette report (code, causes, help) and wrap it as a failure.
    pub fn diagnostic<E>(err: E) -> Self
    where
        E: Diagnostic + Send + Sync + 'static,
    {
        Self::failure(format!("{:?}", miette::Report::new(err)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capability registry tooling: typing stubs, module scanning, module contracts
#[derive(Parser, Debug)]
#[command(name = "modulith")]
#[command(version = VERSION)]
#[command(about = "Capability registry tooling: typing stubs, module scanning, module contracts", long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./modulith.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the registry's typing stub
    Stubs {
        /// Fail if the stub on disk is out of date instead of writing it
        #[arg(long)]
        check: bool,
        /// Output path (overrides [stubs] path)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// List modules that reference the registry
    Scan,

    /// List registered capabilities
    Capabilities,

    /// Declare an independent module in the contract file
    Module {
        /// Module name (dotted identifier)
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Stubs { check, output } => commands::stubs(&config, check, output.as_deref()),
        Command::Scan => commands::scan(&config),
        Command::Capabilities => commands::capabilities(),
        Command::Module { name } => commands::module(&config, &name),
    }
}
