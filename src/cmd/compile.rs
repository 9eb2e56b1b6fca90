//! The `compile` command.

use anyhow::{Context, Result};
use console::style;
use loom::history::{RunHistory, RunOutcome};
use loom::ui::CompileUi;
use loom::workspace::Workspace;

/// `loom compile`: clear prior bundles, then run the build pipeline.
pub async fn cmd_compile(workspace: &Workspace, force: bool) -> Result<()> {
    let _lock = workspace.acquire_lock()?;
    let mut history = RunHistory::new(&workspace.loom_dir);
    history.start("compile")?;

    // Stale bundles from earlier versions are not kept around
    let dist_dir = workspace.dist_dir();
    if dist_dir.exists() {
        std::fs::remove_dir_all(&dist_dir)
            .with_context(|| format!("Failed to remove {}", dist_dir.display()))?;
    }

    let ui = CompileUi::new();
    let result = loom::compile::run(workspace, force, &ui).await;
    ui.finish();

    match result {
        Ok(outcome) => {
            history.finish(RunOutcome::Succeeded)?;
            println!(
                "{} compiled {} module{}, {} unchanged",
                style("✓").green().bold(),
                outcome.compiled,
                if outcome.compiled == 1 { "" } else { "s" },
                outcome.skipped
            );
            println!("  {} {}", style("wheel:").dim(), outcome.wheel.display());
            Ok(())
        }
        Err(err) => {
            history.finish(RunOutcome::Failed {
                message: err.to_string(),
            })?;
            Err(err.into())
        }
    }
}
