//! Smoke-check harness.
//!
//! ## Modules
//!
//! - `assert` - Strict assertions that return errors
//! - `checks` - The fixed check sequence
//! - `runner` - Fail-fast execution
//! - `reporter` - Console and JSON reporting
//!
//! ## Flow
//!
//! `run` awaits module instantiation once, then runs every check synchronously in order.

pub mod assert;
pub mod checks;
pub mod error;
pub mod reporter;
pub mod runner;

pub use assert::{AssertionFailure, expect_eq, expect_true};
pub use checks::{Check, CheckResult};
pub use error::{CheckError, HarnessError};
pub use reporter::{CheckOutcome, CheckReporter, ConsoleReporter, JsonReporter, RunSummary};
pub use runner::run_checks;

use crate::loader::{self, ArtifactSource, ImportConfig};

/// Harness configuration.
#[derive(Debug, Clone, Default)]
pub struct HarnessConfig {
    /// Where the compiled module comes from
    pub artifact: ArtifactSource,
    /// Host-provided imports
    pub imports: ImportConfig,
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the artifact to load
    pub fn with_artifact(mut self, artifact: ArtifactSource) -> Self {
        self.artifact = artifact;
        self
    }

    /// Set the import configuration
    pub fn with_imports(mut self, imports: ImportConfig) -> Self {
        self.imports = imports;
        self
    }
}

/// Load the module described by `config` and run every check against it.
#[tracing::instrument(skip_all, fields(artifact = %config.artifact))]
pub async fn run(config: &HarnessConfig, reporter: &mut dyn CheckReporter) -> Result<RunSummary, HarnessError> {
    let module = loader::load(&config.artifact, &config.imports).await?;
    let checks = checks::all();
    reporter.on_run_start(&config.artifact.to_string(), checks.len());
    run_checks(&module, &checks, reporter)
}
