//! Terminal output for loom targets, rendered via `indicatif` and `console`.

use crate::checks::CheckReport;
use crate::clean::CleanPlan;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;

/// Progress display for the compile pipeline.
///
/// One bar at a time; each stage replaces the previous bar. `hidden()` gives
/// a no-op variant for tests and `--quiet`-style contexts.
pub struct CompileUi {
    bar: Mutex<ProgressBar>,
    hidden: bool,
}

impl CompileUi {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(ProgressBar::hidden()),
            hidden: false,
        }
    }

    pub fn hidden() -> Self {
        Self {
            bar: Mutex::new(ProgressBar::hidden()),
            hidden: true,
        }
    }

    /// Start a stage bar sized to `total` files.
    pub fn begin_stage(&self, stage: &str, total: u64) {
        let mut guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        guard.finish_and_clear();
        if self.hidden {
            return;
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:.bold.dim} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("progress bar template is a valid static string")
                .progress_chars("█▓▒░"),
        );
        bar.set_prefix(format!("{stage:>9}"));
        *guard = bar;
    }

    /// Advance the current stage bar past `path`.
    pub fn file_done(&self, path: &Path) {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        guard.inc(1);
        if let Some(name) = path.file_name() {
            guard.set_message(name.to_string_lossy().to_string());
        }
    }

    pub fn finish(&self) {
        let guard = self.bar.lock().unwrap_or_else(|e| e.into_inner());
        guard.finish_and_clear();
    }
}

impl Default for CompileUi {
    fn default() -> Self {
        Self::new()
    }
}

/// Print a header line before a task starts.
pub fn print_task_header(task: &str, steps: usize) {
    println!(
        "{} {} {}",
        style("▶").green().bold(),
        style(task).yellow().bold(),
        style(format!(
            "({} step{})",
            steps,
            if steps == 1 { "" } else { "s" }
        ))
        .dim()
    );
}

/// Print the per-check results and a pass/fail summary line.
pub fn print_check_report(report: &CheckReport, verbose: bool) {
    for result in &report.results {
        let mark = if result.passed() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "  {} {} {}",
            mark,
            result.name,
            style(format!("({:.1}s)", result.duration.as_secs_f64())).dim()
        );
        if !result.passed() || verbose {
            for line in result.output.lines() {
                println!("      {}", style(line).dim());
            }
        }
    }

    if report.all_passed() {
        println!("{}", style("All checks passed").green().bold());
    } else {
        println!(
            "{}",
            style(format!(
                "{} of {} checks failed",
                report.failed(),
                report.results.len()
            ))
            .red()
            .bold()
        );
    }
}

/// Print what `loom clean` is about to remove.
pub fn print_clean_plan(plan: &CleanPlan) {
    for entry in &plan.entries {
        let kind = if entry.is_dir {
            style("dir ").cyan()
        } else {
            style("file").dim()
        };
        println!("  {} {}", kind, entry.relative.display());
    }
    println!(
        "{} entries, {}",
        plan.entries.len(),
        style(human_bytes(plan.total_bytes())).bold()
    );
}

/// Render a byte count as a short human-readable string.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(human_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn test_hidden_ui_is_inert() {
        let ui = CompileUi::hidden();
        ui.begin_stage("transpile", 10);
        ui.file_done(Path::new("loom/utils.py"));
        ui.finish();
    }
}
