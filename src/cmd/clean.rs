//! The `clean` command.

use anyhow::Result;
use console::style;
use dialoguer::Confirm;
use loom::clean::{execute_clean, plan_clean};
use loom::history::{RunHistory, RunOutcome};
use loom::ui;
use loom::workspace::Workspace;

/// `loom clean`: plan, confirm, and remove build artifacts and caches.
pub async fn cmd_clean(workspace: &Workspace, dry_run: bool) -> Result<()> {
    let plan = plan_clean(&workspace.project_dir, &workspace.manifest.clean.patterns)?;
    if plan.is_empty() {
        println!("{}", style("Nothing to clean").dim());
        return Ok(());
    }

    ui::print_clean_plan(&plan);
    if dry_run {
        println!("{}", style("Dry run, nothing removed").dim());
        return Ok(());
    }

    if !workspace.yes {
        let confirmed = Confirm::new()
            .with_prompt("Remove these paths?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Aborted").yellow());
            return Ok(());
        }
    }

    let _lock = workspace.acquire_lock()?;
    let mut history = RunHistory::new(&workspace.loom_dir);
    history.start("clean")?;
    let summary = execute_clean(&plan)?;
    history.finish(RunOutcome::Succeeded)?;

    println!(
        "{} removed {} entries, reclaimed {}",
        style("✓").green().bold(),
        summary.removed,
        ui::human_bytes(summary.bytes)
    );
    Ok(())
}
