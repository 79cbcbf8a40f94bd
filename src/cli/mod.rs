//! CLI module for modcheck
//!
//! ## Usage
//!
//! - `modcheck [ARTIFACT]` - Load the module (default `build/optimized.wasm`) and run every check
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! `execute` returns `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};

use crate::harness::{self, CheckReporter, ConsoleReporter, HarnessConfig, HarnessError, JsonReporter};
use crate::loader::{ArtifactSource, DEFAULT_ARTIFACT, ImportConfig};
use crate::version::MODCHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

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
    /// Create a new CLI error with a message and exit code.
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
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<HarnessError> for CliError {
    fn from(err: HarnessError) -> Self {
        CliError::failure(format!("{:?}", miette::Report::new(err)))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Output format for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress on stderr
    #[default]
    Console,
    /// One JSON event per line on stdout
    Json,
}

/// Smoke-test an AssemblyScript-compiled WebAssembly module
#[derive(Parser, Debug)]
#[command(name = "modcheck")]
#[command(version = MODCHECK_VERSION)]
#[command(about = "Smoke-test an AssemblyScript-compiled WebAssembly module", long_about = None)]
pub struct Cli {
    /// Compiled module to check (.wasm or .wat)
    #[arg(value_name = "ARTIFACT", default_value = DEFAULT_ARTIFACT)]
    pub artifact: PathBuf,

    /// Print one line per check with timings
    #[arg(short, long)]
    pub verbose: bool,

    /// Result output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Initial size of the imported memory, in 64 KiB pages
    #[arg(long = "memory-pages", value_name = "N")]
    pub memory_pages: Option<u32>,

    /// Initial capacity of the imported function table
    #[arg(long = "table-size", value_name = "N")]
    pub table_size: Option<u32>,
}

impl Cli {
    /// Translate arguments into harness configuration.
    pub fn harness_config(&self) -> HarnessConfig {
        let mut imports = ImportConfig::new();
        if let Some(pages) = self.memory_pages {
            imports = imports.with_memory_pages(pages);
        }
        if let Some(elements) = self.table_size {
            imports = imports.with_table_elements(elements);
        }
        HarnessConfig::new()
            .with_artifact(ArtifactSource::Path(self.artifact.clone()))
            .with_imports(imports)
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. Argument errors exit
/// through clap (status 2).
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

/// Execute the checks and return the exit code.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    let config = cli.harness_config();
    let mut reporter: Box<dyn CheckReporter> = match cli.format {
        OutputFormat::Console => Box::new(ConsoleReporter::stderr(cli.verbose)),
        OutputFormat::Json => Box::new(JsonReporter::stdout()),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::failure(format!("Error: cannot start async runtime: {}", e)))?;

    let summary = runtime.block_on(harness::run(&config, reporter.as_mut()))?;
    tracing::info!(passed = summary.passed, "all checks passed");
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::loader::LoadError;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::try_parse_from(["modcheck"]).unwrap();
        assert_eq!(cli.artifact, PathBuf::from("build/optimized.wasm"));
        assert!(!cli.verbose);
        assert_eq!(cli.format, OutputFormat::Console);

        let config = cli.harness_config();
        assert_eq!(config.artifact, ArtifactSource::default());
        assert_eq!(config.imports, ImportConfig::default());
    }

    #[test]
    fn test_cli_parse_artifact_and_flags() {
        let cli = Cli::try_parse_from(["modcheck", "out/demo.wasm", "-v", "--format", "json"]).unwrap();
        assert_eq!(cli.artifact, PathBuf::from("out/demo.wasm"));
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn test_cli_parse_import_sizes() {
        let cli = Cli::try_parse_from(["modcheck", "--memory-pages", "2", "--table-size", "8"]).unwrap();
        let imports = cli.harness_config().imports;
        assert_eq!(imports.initial_memory_pages, 2);
        assert_eq!(imports.initial_table_elements, 8);
        assert!(imports.trap_unknown_imports);
    }

    #[test]
    fn test_cli_error_failure_exits_one() {
        let err = CliError::failure("Error: cannot start async runtime");
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert_eq!(err.to_string(), "Error: cannot start async runtime");
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["modcheck", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_rejects_non_numeric_pages() {
        assert!(Cli::try_parse_from(["modcheck", "--memory-pages", "lots"]).is_err());
    }

    #[test]
    fn test_harness_error_maps_to_failure() {
        let err: CliError = HarnessError::Load(LoadError::MissingRuntimeExport("__alloc")).into();
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("__alloc"));
    }
}
