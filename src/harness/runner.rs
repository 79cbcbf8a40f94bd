//! Fail-fast check runner.
//!
//! Checks run strictly in order on the calling thread. The first failing check ends the run: it is
//! reported, the remaining checks are counted as not run, and its error is returned.

use std::time::Instant;

use super::checks::Check;
use super::error::HarnessError;
use super::reporter::{CheckOutcome, CheckReporter, RunSummary};
use crate::exports::ExportSurface;
use crate::runtime::Module;

/// Run `checks` against `module`, stopping at the first failure.
pub fn run_checks<M: Module + ?Sized>(
    module: &M,
    checks: &[Check<M>],
    reporter: &mut dyn CheckReporter,
) -> Result<RunSummary, HarnessError> {
    let start_time = Instant::now();
    let exports = ExportSurface::new(module);
    let mut summary = RunSummary {
        total: checks.len(),
        ..RunSummary::default()
    };

    for (index, check) in checks.iter().enumerate() {
        reporter.on_check_start(check.name);
        let started = Instant::now();
        let result = (check.run)(&exports);
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                tracing::debug!(check = check.name, ?elapsed, "check passed");
                summary.passed += 1;
                reporter.on_check_complete(check.name, &CheckOutcome::Passed(elapsed));
            }
            Err(err) => {
                tracing::error!(check = check.name, error = %err, "check failed");
                summary.failed += 1;
                summary.not_run = checks.len() - index - 1;
                summary.duration = start_time.elapsed();
                reporter.on_check_complete(check.name, &CheckOutcome::Failed(elapsed, err.to_string()));
                reporter.on_run_complete(&summary);
                return Err(HarnessError::Check {
                    name: check.name,
                    source: err,
                });
            }
        }
    }

    summary.duration = start_time.elapsed();
    reporter.on_run_complete(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::assert::expect_eq;
    use crate::harness::checks::{self, CheckResult};
    use crate::harness::reporter::JsonReporter;
    use crate::runtime::fake::FakeModule;

    fn always_fails(_: &ExportSurface<'_, FakeModule>) -> CheckResult {
        expect_eq("answer", &41, &42)?;
        Ok(())
    }

    fn always_passes(_: &ExportSurface<'_, FakeModule>) -> CheckResult {
        Ok(())
    }

    #[test]
    fn test_all_checks_pass_against_fake() {
        let module = FakeModule::new();
        let mut reporter = JsonReporter::new(Vec::new());
        let summary = run_checks(&module, &checks::all(), &mut reporter).unwrap();
        assert_eq!(summary.passed, 6);
        assert!(summary.is_success());
    }

    #[test]
    fn test_stops_at_first_failure() {
        let module = FakeModule::new();
        let sequence = [
            Check {
                name: "first",
                run: always_passes,
            },
            Check {
                name: "second",
                run: always_fails,
            },
            Check {
                name: "third",
                run: always_passes,
            },
        ];
        let mut reporter = JsonReporter::new(Vec::new());
        let err = run_checks(&module, &sequence, &mut reporter).unwrap_err();
        assert!(matches!(err, HarnessError::Check { name: "second", .. }));

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(!out.contains("\"third\""));
        assert!(out.contains("\"not_run\":1"));
    }

    #[test]
    fn test_empty_sequence_succeeds() {
        let module = FakeModule::new();
        let mut reporter = JsonReporter::new(Vec::new());
        let summary = run_checks(&module, &[], &mut reporter).unwrap();
        assert_eq!(summary.total, 0);
        assert!(summary.is_success());
    }
}
