use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loom::manifest::Manifest;
use loom::workspace::{LOOM_DIR, Workspace};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "loom")]
#[command(version, about = "Project task runner for Python packages")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(long, global = true)]
    pub yes: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Path to the manifest. Defaults to loom.toml in the project directory
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a loom project in the current directory
    Init,
    /// Sync dependencies and activate the pre-commit hook
    Install,
    /// Upgrade dependencies and refresh the pre-commit hook
    Update,
    /// Run all configured static checks
    #[command(alias = "pre-commit")]
    Checks,
    /// Run the test suite
    Tests {
        /// Collect coverage for the package
        #[arg(long)]
        coverage: bool,
    },
    /// Remove the venv, build artifacts, caches and compiled modules
    Clean {
        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Build native extension modules and bundle them into a wheel
    Compile {
        /// Rebuild every source, ignoring fingerprints
        #[arg(long)]
        force: bool,
    },
    /// Run a custom task from the manifest
    Run { task: String },
    /// List built-in targets and custom tasks
    List,
    /// Show the current and recent runs
    Status,
    /// View or validate the manifest
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate the manifest and show any warnings
    Validate,
    /// Write a starter loom.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let _log_guard = loom::logging::init(&project_dir.join(LOOM_DIR).join("logs"), cli.verbose)?;

    if let Commands::Init = cli.command {
        return cmd::cmd_init(&project_dir);
    }

    let mut workspace = Workspace::with_cli_args(project_dir, cli.verbose, cli.yes)?;
    if let Some(manifest_path) = &cli.manifest {
        workspace.manifest = Manifest::load(manifest_path)?;
    }

    match &cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Install => cmd::cmd_install(&workspace).await?,
        Commands::Update => cmd::cmd_update(&workspace).await?,
        Commands::Checks => cmd::cmd_checks(&workspace).await?,
        Commands::Tests { coverage } => cmd::cmd_tests(&workspace, *coverage).await?,
        Commands::Clean { dry_run } => cmd::cmd_clean(&workspace, *dry_run).await?,
        Commands::Compile { force } => cmd::cmd_compile(&workspace, *force).await?,
        Commands::Run { task } => cmd::cmd_run(&workspace, task).await?,
        Commands::List => cmd::cmd_list(&workspace)?,
        Commands::Status => cmd::cmd_status(&workspace)?,
        Commands::Config { command } => cmd::cmd_config(&workspace, command.clone())?,
    }

    Ok(())
}
