//! Task model and resolution.
//!
//! A task is a named, ordered list of shell steps run in the project
//! directory. Built-in targets (`install`, `update`, `tests`) are assembled
//! from their manifest sections; custom targets come from `[tasks.<name>]`
//! and are expanded into a dependency-ordered plan before execution.

pub mod plan;
pub mod runner;

pub use runner::{StepOutcome, StepRunner};

use crate::errors::TaskError;
use crate::manifest::Manifest;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A resolved, runnable task.
#[derive(Debug, Clone)]
pub struct Task {
    /// Task name, also exported as `LOOM_TASK` to every step
    pub name: String,
    /// Shell steps run in order
    pub steps: Vec<String>,
    /// Working directory relative to the project root (project root if `None`)
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for every step
    pub env: BTreeMap<String, String>,
}

impl Task {
    /// A task with just a name and steps, running at the project root.
    pub fn new(name: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            name: name.into(),
            steps,
            working_dir: None,
            env: BTreeMap::new(),
        }
    }
}

/// Resolve the `install` target: the configured dependency-sync steps.
pub fn install_task(manifest: &Manifest) -> Task {
    Task::new("install", manifest.install.sync.clone())
}

/// Resolve the `update` target: the configured upgrade steps.
pub fn update_task(manifest: &Manifest) -> Task {
    Task::new("update", manifest.install.upgrade_steps().to_vec())
}

/// Resolve the `tests` target, optionally with coverage arguments appended.
pub fn tests_task(manifest: &Manifest, coverage: bool) -> Task {
    let mut command = manifest.tests.command.clone();
    if coverage {
        for arg in &manifest.tests.coverage_args {
            command.push(' ');
            command.push_str(arg);
        }
    }
    Task::new("tests", vec![command])
}

/// Resolve a custom target into its dependency-ordered list of tasks.
pub fn custom_tasks(manifest: &Manifest, target: &str) -> Result<Vec<Task>, TaskError> {
    let order = plan::execution_order(&manifest.tasks, target)?;
    Ok(order
        .into_iter()
        .map(|name| {
            let def = &manifest.tasks[&name];
            Task {
                name,
                steps: def.steps.clone(),
                working_dir: def.working_dir.as_ref().map(PathBuf::from),
                env: def.env.clone(),
            }
        })
        .collect())
}
