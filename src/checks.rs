//! The `checks` target.
//!
//! Runs every configured static check and aggregates the results. Unlike the
//! other targets, a failing check does not abort the run: the remaining checks
//! still execute, matching how a pre-commit framework reports all findings at
//! once. The command as a whole exits non-zero if any check failed.

use crate::errors::TaskError;
use crate::manifest::Manifest;
use crate::task::{StepRunner, Task};
use std::time::Duration;
use tracing::info;

/// Result of one check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Check name from the manifest
    pub name: String,
    /// The command that ran
    pub command: String,
    /// Exit code (0 = passed)
    pub exit_code: i32,
    /// Wall-clock duration
    pub duration: Duration,
    /// Combined output, shown for failing checks
    pub output: String,
}

impl CheckResult {
    /// Whether the check passed.
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Aggregate report for a `checks` run.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Per-check results, in manifest order
    pub results: Vec<CheckResult>,
}

impl CheckReport {
    /// Whether every check passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(CheckResult::passed)
    }

    /// Number of failing checks.
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }
}

/// Run all configured checks in manifest order.
///
/// Individual check failures are collected into the report; only spawn-level
/// problems (missing shell, timeout) surface as errors.
pub async fn run_checks(runner: &StepRunner, manifest: &Manifest) -> Result<CheckReport, TaskError> {
    let task = Task::new("checks", vec![]);
    let mut report = CheckReport::default();

    for check in &manifest.checks {
        let captured = runner.run_captured(&task, &check.command).await?;
        info!(
            check = %check.name,
            exit_code = captured.outcome.exit_code,
            "check finished"
        );

        let mut output = captured.stdout;
        if !captured.stderr.is_empty() {
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&captured.stderr);
        }

        report.results.push(CheckResult {
            name: check.name.clone(),
            command: check.command.clone(),
            exit_code: captured.outcome.exit_code,
            duration: captured.outcome.duration,
            output,
        });
    }

    Ok(report)
}
