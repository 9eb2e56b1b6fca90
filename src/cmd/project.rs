//! Project housekeeping commands: `init`, `list`, `status`, `config`.

use super::super::ConfigCommands;
use anyhow::{Context, Result};
use console::style;
use loom::history::{RunHistory, RunOutcome, RunRecord};
use loom::manifest::{MANIFEST_FILE, Manifest};
use loom::workspace::{self, Workspace};
use std::path::Path;

/// `loom init`: write a starter manifest and the `.loom/` state directory.
pub fn cmd_init(project_dir: &Path) -> Result<()> {
    let result = workspace::init_project(project_dir)?;
    if result.manifest_created {
        println!(
            "{} wrote starter {}",
            style("✓").green().bold(),
            MANIFEST_FILE
        );
    } else {
        println!(
            "{} {} already exists, left unchanged",
            style("-").dim(),
            MANIFEST_FILE
        );
    }
    println!(
        "{} state directory ready at {}",
        style("✓").green().bold(),
        result.loom_dir.display()
    );
    Ok(())
}

/// `loom list`: show built-in targets and the manifest's custom tasks.
pub fn cmd_list(workspace: &Workspace) -> Result<()> {
    const BUILTINS: &[(&str, &str)] = &[
        ("install", "Sync dependencies and activate the pre-commit hook"),
        ("update", "Upgrade dependencies and refresh the pre-commit hook"),
        ("checks", "Run all configured static checks (alias: pre-commit)"),
        ("tests", "Run the test suite, optionally with coverage"),
        ("clean", "Remove the venv, build artifacts, caches and modules"),
        ("compile", "Build native extension modules into a wheel bundle"),
    ];

    println!("{}", style("Built-in targets:").bold());
    for (name, description) in BUILTINS {
        println!("  {:<10} {}", style(name).cyan(), description);
    }

    if !workspace.manifest.tasks.is_empty() {
        println!();
        println!("{}", style("Custom tasks:").bold());
        for (name, def) in &workspace.manifest.tasks {
            let description = def.description.as_deref().unwrap_or("");
            print!("  {:<10} {}", style(name).cyan(), description);
            if !def.needs.is_empty() {
                print!(
                    " {}",
                    style(format!("(needs: {})", def.needs.join(", "))).dim()
                );
            }
            println!();
        }
    }
    Ok(())
}

fn outcome_mark(record: &RunRecord) -> console::StyledObject<&'static str> {
    match &record.outcome {
        Some(RunOutcome::Succeeded) => style("✓").green(),
        Some(RunOutcome::Failed { .. }) => style("✗").red(),
        None => style("…").yellow(),
    }
}

/// `loom status`: show the in-flight run (if any) and recent run history.
pub fn cmd_status(workspace: &Workspace) -> Result<()> {
    let history = RunHistory::new(&workspace.loom_dir);

    if let Some(current) = history.load_current()? {
        println!(
            "{} {} started {} ({} step{} so far)",
            style("Running:").yellow().bold(),
            style(&current.target).cyan(),
            current.started_at.format("%Y-%m-%d %H:%M:%S"),
            current.steps.len(),
            if current.steps.len() == 1 { "" } else { "s" }
        );
        println!();
    }

    let recent = history.recent(10)?;
    if recent.is_empty() {
        println!("{}", style("No recorded runs yet").dim());
        return Ok(());
    }

    println!("{}", style("Recent runs:").bold());
    for record in &recent {
        let duration = match record.ended_at {
            Some(ended) => {
                let secs = (ended - record.started_at).num_milliseconds() as f64 / 1000.0;
                format!("{secs:.1}s")
            }
            None => "-".to_string(),
        };
        print!(
            "  {} {:<10} {}  {:>7}  {} step{}",
            outcome_mark(record),
            record.target,
            record.started_at.format("%Y-%m-%d %H:%M:%S"),
            duration,
            record.steps.len(),
            if record.steps.len() == 1 { "" } else { "s" }
        );
        if let Some(RunOutcome::Failed { message }) = &record.outcome {
            print!("  {}", style(message).red());
        }
        println!();
    }
    Ok(())
}

/// `loom config`: show, validate, or initialize the manifest.
pub fn cmd_config(workspace: &Workspace, command: Option<ConfigCommands>) -> Result<()> {
    match command.unwrap_or(ConfigCommands::Show) {
        ConfigCommands::Show => {
            let rendered =
                toml::to_string_pretty(&workspace.manifest).context("Failed to render manifest")?;
            println!("{} {}", style("#").dim(), workspace.manifest_file().display());
            print!("{rendered}");
        }
        ConfigCommands::Validate => {
            let warnings = workspace.manifest.validate();
            if warnings.is_empty() {
                println!("{} manifest is valid", style("✓").green().bold());
            } else {
                for warning in &warnings {
                    println!("  {} {}", style("!").yellow(), warning);
                }
                println!(
                    "{}",
                    style(format!("{} warning(s)", warnings.len())).yellow()
                );
            }
        }
        ConfigCommands::Init => {
            let path = workspace.manifest_file();
            if path.exists() {
                println!(
                    "{} {} already exists, left unchanged",
                    style("-").dim(),
                    MANIFEST_FILE
                );
            } else {
                let name = workspace.manifest.project_name(&workspace.project_dir);
                Manifest::starter(&name).save(&path)?;
                println!("{} wrote {}", style("✓").green().bold(), path.display());
            }
        }
    }
    Ok(())
}
