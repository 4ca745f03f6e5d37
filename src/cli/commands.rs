//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::path::Path;

use crate::config::{self, ProjectConfig};
use crate::contracts::ContractFile;
use crate::emit::{EmitError, EmitOutcome, StubEmitter};
use crate::registry;
use crate::scanner::ModuleScanner;

use super::{CliError, CliResult, ExitCode};

/// Load the project configuration.
///
/// An explicit `--config` path must exist; without one, `./modulith.toml` is used when present.
pub fn load_config(path: Option<&Path>) -> CliResult<ProjectConfig> {
    let loaded = match path {
        Some(path) => ProjectConfig::load(path),
        None => ProjectConfig::load_or_default(Path::new(config::FILE_NAME)),
    };
    loaded.map_err(CliError::diagnostic)
}

/// `modulith stubs`: scan for consumers, then write or verify the declaration file.
pub fn stubs(config: &ProjectConfig, check: bool, output: Option<&Path>) -> CliResult<ExitCode> {
    let report = ModuleScanner::from_config(&config.scan).scan();
    tracing::info!(
        modules = report.modules.len(),
        failures = report.failures.len(),
        "scanned registry consumers"
    );

    let registry = registry::global().map_err(CliError::diagnostic)?;
    let mut emitter = StubEmitter::from_config(&config.stubs);
    if let Some(output) = output {
        emitter = emitter.with_path(output);
    }

    if check {
        return match emitter.check(registry) {
            Ok(()) => {
                println!("✓ {} is up to date", emitter.path().display());
                Ok(ExitCode::SUCCESS)
            }
            Err(err @ EmitError::OutOfDate { .. }) => Err(CliError::failure(err.to_string())),
            Err(err) => Err(CliError::diagnostic(err)),
        };
    }

    match emitter.emit(registry).map_err(CliError::diagnostic)? {
        EmitOutcome::Written => println!(
            "Wrote {} ({} capabilities)",
            emitter.path().display(),
            registry.len()
        ),
        EmitOutcome::Unchanged => println!("✓ {} is up to date", emitter.path().display()),
    }
    Ok(ExitCode::SUCCESS)
}

/// `modulith scan`: print modules referencing the registry identifier.
///
/// Failures are reported but do not fail the command.
pub fn scan(config: &ProjectConfig) -> CliResult<ExitCode> {
    let report = ModuleScanner::from_config(&config.scan).scan();
    for module in &report.modules {
        println!("{module}");
    }
    for failure in &report.failures {
        eprintln!("warning: skipped {}: {}", failure.path.display(), failure.reason);
    }
    println!(
        "\n{} module(s) reference {}, {} failure(s)",
        report.modules.len(),
        config.scan.identifier,
        report.failures.len()
    );
    Ok(ExitCode::SUCCESS)
}

/// `modulith capabilities`: print registered names in registration order.
pub fn capabilities() -> CliResult<ExitCode> {
    let registry = registry::global().map_err(CliError::diagnostic)?;
    for name in registry.list_capabilities() {
        println!("{name}");
    }
    Ok(ExitCode::SUCCESS)
}

/// `modulith module <NAME>`: add a module to the contract file, creating the file if needed.
pub fn module(config: &ProjectConfig, name: &str) -> CliResult<ExitCode> {
    let path = &config.contracts.file;
    let mut contract = ContractFile::load_or_default(path, &config.contracts).map_err(CliError::diagnostic)?;
    let added = contract
        .add_module(name, &config.contracts)
        .map_err(CliError::diagnostic)?;
    if added {
        contract.save(path).map_err(CliError::diagnostic)?;
        println!("Added module '{name}' to {}", path.display());
    } else {
        println!("Module '{name}' is already declared in {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
