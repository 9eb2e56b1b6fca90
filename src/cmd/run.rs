//! Step-running commands: `install`, `update`, `checks`, `tests`, `run`.

use anyhow::{Result, bail};
use console::style;
use loom::errors::HookError;
use loom::history::{RunHistory, RunOutcome, StepRecord};
use loom::hooks::{self, HookInstall};
use loom::task::{self, StepRunner, Task};
use loom::ui;
use loom::workspace::Workspace;
use tracing::warn;

fn step_runner(workspace: &Workspace) -> StepRunner {
    StepRunner::new(
        &workspace.project_dir,
        &workspace.manifest.defaults.shell,
        workspace.manifest.defaults.step_timeout_secs,
        workspace.verbose,
    )
}

/// Run a sequence of tasks under the project lock, journaling each step.
async fn run_tasks(workspace: &Workspace, label: &str, tasks: &[Task]) -> Result<()> {
    let _lock = workspace.acquire_lock()?;
    let mut history = RunHistory::new(&workspace.loom_dir);
    history.start(label)?;

    let runner = step_runner(workspace);
    for task in tasks {
        ui::print_task_header(&task.name, task.steps.len());
        match runner.run_task(task).await {
            Ok(outcomes) => {
                for outcome in &outcomes {
                    history.record_step(StepRecord::from(outcome))?;
                }
            }
            Err(err) => {
                history.finish(RunOutcome::Failed {
                    message: err.to_string(),
                })?;
                return Err(err.into());
            }
        }
    }

    history.finish(RunOutcome::Succeeded)?;
    println!("{} {} complete", style("✓").green().bold(), label);
    Ok(())
}

fn report_hook(result: Result<HookInstall, HookError>) -> Result<()> {
    match result {
        Ok(install) => {
            if let Some(backup) = &install.backed_up {
                println!(
                    "  {} existing pre-commit hook moved to {}",
                    style("!").yellow(),
                    backup.display()
                );
            }
            let verb = if install.refreshed {
                "refreshed"
            } else {
                "installed"
            };
            println!(
                "  {} pre-commit hook {} at {}",
                style("✓").green(),
                verb,
                install.path.display()
            );
            Ok(())
        }
        // Not being in a git repository is fine; everything else is not
        Err(HookError::RepositoryNotFound { path }) => {
            warn!(path = %path.display(), "no git repository, skipping hook install");
            println!(
                "  {} no git repository found, pre-commit hook skipped",
                style("-").dim()
            );
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// `loom install`: sync dependencies, then activate the pre-commit hook.
pub async fn cmd_install(workspace: &Workspace) -> Result<()> {
    run_tasks(
        workspace,
        "install",
        &[task::install_task(&workspace.manifest)],
    )
    .await?;
    report_hook(hooks::install_hook(&workspace.project_dir))
}

/// `loom update`: upgrade dependencies, then refresh the pre-commit hook.
pub async fn cmd_update(workspace: &Workspace) -> Result<()> {
    run_tasks(
        workspace,
        "update",
        &[task::update_task(&workspace.manifest)],
    )
    .await?;
    report_hook(hooks::refresh_hook(&workspace.project_dir))
}

/// `loom checks` (alias `pre-commit`): run all static checks, report, and
/// exit non-zero if any failed.
pub async fn cmd_checks(workspace: &Workspace) -> Result<()> {
    let _lock = workspace.acquire_lock()?;
    let mut history = RunHistory::new(&workspace.loom_dir);
    history.start("checks")?;

    let runner = step_runner(workspace);
    let report = loom::checks::run_checks(&runner, &workspace.manifest).await?;
    for result in &report.results {
        history.record_step(StepRecord {
            step: result.command.clone(),
            exit_code: result.exit_code,
            duration_ms: result.duration.as_millis() as u64,
        })?;
    }

    ui::print_check_report(&report, workspace.verbose);
    if report.all_passed() {
        history.finish(RunOutcome::Succeeded)?;
        Ok(())
    } else {
        let message = format!(
            "{} of {} checks failed",
            report.failed(),
            report.results.len()
        );
        history.finish(RunOutcome::Failed {
            message: message.clone(),
        })?;
        bail!(message)
    }
}

/// `loom tests`: run the test command, with coverage when requested via the
/// flag or the manifest default.
pub async fn cmd_tests(workspace: &Workspace, coverage: bool) -> Result<()> {
    let coverage = coverage || workspace.manifest.tests.coverage;
    run_tasks(
        workspace,
        "tests",
        &[task::tests_task(&workspace.manifest, coverage)],
    )
    .await
}

/// `loom run <task>`: run a custom task and its dependencies in order.
pub async fn cmd_run(workspace: &Workspace, target: &str) -> Result<()> {
    let tasks = task::custom_tasks(&workspace.manifest, target)?;
    run_tasks(workspace, target, &tasks).await
}
