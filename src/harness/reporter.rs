//! Check reporting.
//!
//! ## CheckReporter Trait
//!
//! The runner reports through the `CheckReporter` trait so output format is independent of execution.
//! Two implementations ship: a pytest-style console reporter and a line-oriented JSON reporter.

use std::io::Write;
use std::time::Duration;

use serde_json::json;

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Passed(Duration),
    Failed(Duration, String),
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Checks skipped because an earlier one failed.
    pub not_run: usize,
    pub duration: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.not_run == 0
    }
}

/// Trait for reporting check execution.
pub trait CheckReporter {
    /// Called once the module is loaded, before the first check
    fn on_run_start(&mut self, _artifact: &str, _check_count: usize) {}

    /// Called when a check begins
    fn on_check_start(&mut self, name: &str);

    /// Called when a check completes
    fn on_check_complete(&mut self, name: &str, outcome: &CheckOutcome);

    /// Called after the last check that ran
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Default console reporter (pytest-style)
pub struct ConsoleReporter<W: Write> {
    out: W,
    verbose: bool,
}

impl ConsoleReporter<std::io::Stderr> {
    pub fn stderr(verbose: bool) -> Self {
        Self::new(std::io::stderr(), verbose)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W, verbose: bool) -> Self {
        Self { out, verbose }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CheckReporter for ConsoleReporter<W> {
    fn on_run_start(&mut self, artifact: &str, check_count: usize) {
        let _ = writeln!(self.out, "\x1b[1m=================== smoke checks ===================\x1b[0m");
        let _ = writeln!(self.out, "module: {}", artifact);
        let _ = writeln!(self.out, "collected {} check(s)", check_count);
        let _ = writeln!(self.out);
    }

    fn on_check_start(&mut self, name: &str) {
        if self.verbose {
            let _ = write!(self.out, "{} ... ", name);
        }
    }

    fn on_check_complete(&mut self, name: &str, outcome: &CheckOutcome) {
        let status = match outcome {
            CheckOutcome::Passed(d) => {
                if self.verbose {
                    format!("\x1b[32mPASSED\x1b[0m ({:.0}ms)", d.as_millis())
                } else {
                    "\x1b[32m.\x1b[0m".to_string()
                }
            }
            CheckOutcome::Failed(d, _) => {
                if self.verbose {
                    format!("\x1b[31mFAILED\x1b[0m ({:.0}ms)", d.as_millis())
                } else {
                    "\x1b[31mF\x1b[0m".to_string()
                }
            }
        };

        if self.verbose {
            let _ = writeln!(self.out, "{}", status);
        } else {
            let _ = write!(self.out, "{}", status);
        }

        if let CheckOutcome::Failed(_, error) = outcome {
            let _ = writeln!(self.out, "\n\x1b[31m{}\x1b[0m", name);
            let _ = writeln!(self.out, "    {}", error);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if !self.verbose {
            let _ = writeln!(self.out);
        }
        let _ = writeln!(self.out);

        let mut parts = Vec::new();
        if summary.passed > 0 {
            parts.push(format!("\x1b[32m{} passed\x1b[0m", summary.passed));
        }
        if summary.failed > 0 {
            parts.push(format!("\x1b[31m{} failed\x1b[0m", summary.failed));
        }
        if summary.not_run > 0 {
            parts.push(format!("\x1b[33m{} not run\x1b[0m", summary.not_run));
        }

        let _ = writeln!(
            self.out,
            "====== {} in {:.2}s ======",
            parts.join(", "),
            summary.duration.as_secs_f64()
        );
    }
}

/// Line-oriented JSON reporter, one event object per line.
///
/// Timings are left out so output is reproducible.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl JsonReporter<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, event: serde_json::Value) {
        let _ = writeln!(self.out, "{}", event);
    }
}

impl<W: Write> CheckReporter for JsonReporter<W> {
    fn on_run_start(&mut self, artifact: &str, check_count: usize) {
        self.emit(json!({ "event": "run_started", "artifact": artifact, "checks": check_count }));
    }

    fn on_check_start(&mut self, _name: &str) {}

    fn on_check_complete(&mut self, name: &str, outcome: &CheckOutcome) {
        let event = match outcome {
            CheckOutcome::Passed(_) => json!({ "event": "check_passed", "name": name }),
            CheckOutcome::Failed(_, error) => json!({ "event": "check_failed", "name": name, "error": error }),
        };
        self.emit(event);
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.emit(json!({
            "event": "run_finished",
            "passed": summary.passed,
            "failed": summary.failed,
            "not_run": summary.not_run,
        }));
    }
}
