//! Manifest handling for loom.
//!
//! This module provides the configuration foundation that reads from `loom.toml`
//! at the project root. It supports:
//! - Project-level settings with sensible defaults
//! - Built-in target configuration (`install`, `checks`, `tests`, `clean`, `compile`)
//! - Custom tasks with dependency ordering
//!
//! # Manifest Format
//!
//! ```toml
//! [project]
//! name = "loom"
//! version = "0.1.0"
//!
//! [defaults]
//! step_timeout_secs = 600
//!
//! [install]
//! sync = ["uv sync"]
//! upgrade = ["uv sync --upgrade"]
//!
//! [[checks]]
//! name = "ruff"
//! command = "ruff check ."
//!
//! [tests]
//! command = "pytest"
//! coverage_args = ["--cov=loom", "--cov-report=term-missing"]
//!
//! [clean]
//! patterns = [".venv", "build", "dist", "**/__pycache__"]
//!
//! [compile]
//! transpiler = "cython"
//! cc = "gcc"
//!
//! [tasks.docs]
//! description = "Build the documentation"
//! steps = ["mkdocs build"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The manifest file name looked up at the project root.
pub const MANIFEST_FILE: &str = "loom.toml";

/// Project-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Project name (defaults to the directory name when omitted)
    #[serde(default)]
    pub name: Option<String>,
    /// Package version used for bundle metadata
    #[serde(default = "default_version")]
    pub version: String,
    /// Package directory containing the sources to compile (defaults to `name`)
    #[serde(default)]
    pub package: Option<String>,
    /// One-line description used for bundle metadata
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Default settings applied to every step execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsSection {
    /// Per-step timeout in seconds
    #[serde(default = "default_step_timeout_secs")]
    pub step_timeout_secs: u64,
    /// Shell used to run steps
    #[serde(default = "default_shell")]
    pub shell: String,
}

fn default_step_timeout_secs() -> u64 {
    600
}

fn default_shell() -> String {
    "sh".to_string()
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            step_timeout_secs: default_step_timeout_secs(),
            shell: default_shell(),
        }
    }
}

/// Dependency sync commands for `install` and `update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallSection {
    /// Steps run by `loom install`
    #[serde(default = "default_sync_steps")]
    pub sync: Vec<String>,
    /// Steps run by `loom update` (falls back to `sync` when empty)
    #[serde(default)]
    pub upgrade: Vec<String>,
}

fn default_sync_steps() -> Vec<String> {
    vec!["uv sync".to_string()]
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            sync: default_sync_steps(),
            upgrade: Vec::new(),
        }
    }
}

impl InstallSection {
    /// Steps for `loom update`: explicit upgrade steps, or the sync steps.
    pub fn upgrade_steps(&self) -> &[String] {
        if self.upgrade.is_empty() {
            &self.sync
        } else {
            &self.upgrade
        }
    }
}

/// A single static check run by `loom checks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckDefinition {
    /// Short name shown in the summary
    pub name: String,
    /// Shell command to run
    pub command: String,
}

/// Test runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestsSection {
    /// Test command run by `loom tests`
    #[serde(default = "default_test_command")]
    pub command: String,
    /// Whether coverage is collected by default
    #[serde(default)]
    pub coverage: bool,
    /// Arguments appended when coverage is requested
    #[serde(default)]
    pub coverage_args: Vec<String>,
}

fn default_test_command() -> String {
    "pytest".to_string()
}

impl Default for TestsSection {
    fn default() -> Self {
        Self {
            command: default_test_command(),
            coverage: false,
            coverage_args: Vec::new(),
        }
    }
}

/// Cleanup rules for `loom clean`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanSection {
    /// Glob patterns, relative to the project root, of paths to remove
    #[serde(default = "default_clean_patterns")]
    pub patterns: Vec<String>,
}

fn default_clean_patterns() -> Vec<String> {
    [
        ".venv",
        "build",
        "dist",
        "**/__pycache__",
        ".pytest_cache",
        ".ruff_cache",
        ".mypy_cache",
        "**/*.so",
        "**/*.c",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for CleanSection {
    fn default() -> Self {
        Self {
            patterns: default_clean_patterns(),
        }
    }
}

/// Native-extension build configuration for `loom compile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileSection {
    /// Transpiler command producing C sources
    #[serde(default = "default_transpiler")]
    pub transpiler: String,
    /// Arguments passed before the input file
    #[serde(default = "default_transpiler_args")]
    pub transpiler_args: Vec<String>,
    /// Transpiler directives, each passed as `--directive key=value`
    #[serde(default = "default_directives")]
    pub directives: Vec<String>,
    /// C compiler command
    #[serde(default = "default_cc")]
    pub cc: String,
    /// C compiler flags
    #[serde(default = "default_cc_flags")]
    pub cc_flags: Vec<String>,
    /// Include directory for the interpreter headers, appended as `-I<dir>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_dir: Option<String>,
    /// Extension module suffix (e.g. `.cpython-312-x86_64-linux-gnu.so`)
    #[serde(default = "default_ext_suffix")]
    pub ext_suffix: String,
    /// File names excluded from compilation and preserved as-is in the bundle
    #[serde(default = "default_excluded_files")]
    pub exclude: Vec<String>,
    /// Parallel compile jobs; 0 means the available CPU count
    #[serde(default)]
    pub jobs: usize,
    /// Wheel compatibility tag used for the bundle file name
    #[serde(default = "default_wheel_tag")]
    pub tag: String,
}

fn default_transpiler() -> String {
    "cython".to_string()
}

fn default_transpiler_args() -> Vec<String> {
    vec!["--fast-fail".to_string(), "-3".to_string()]
}

fn default_directives() -> Vec<String> {
    [
        "cdivision=True",
        "boundscheck=True",
        "wraparound=True",
        "infer_types=True",
        "embedsignature=True",
        "binding=True",
        "linetrace=False",
        "profile=False",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_cc() -> String {
    "gcc".to_string()
}

fn default_cc_flags() -> Vec<String> {
    [
        "-shared",
        "-fPIC",
        "-march=native",
        "-mtune=native",
        "-ffast-math",
        "-funroll-loops",
        "-flto",
        "-O3",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ext_suffix() -> String {
    ".so".to_string()
}

fn default_excluded_files() -> Vec<String> {
    vec!["__init__.py".to_string(), "__version__.py".to_string()]
}

fn default_wheel_tag() -> String {
    "py3-none-any".to_string()
}

impl Default for CompileSection {
    fn default() -> Self {
        Self {
            transpiler: default_transpiler(),
            transpiler_args: default_transpiler_args(),
            directives: default_directives(),
            cc: default_cc(),
            cc_flags: default_cc_flags(),
            include_dir: None,
            ext_suffix: default_ext_suffix(),
            exclude: default_excluded_files(),
            jobs: 0,
            tag: default_wheel_tag(),
        }
    }
}

/// A custom task defined under `[tasks.<name>]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Short description shown by `loom list`
    #[serde(default)]
    pub description: Option<String>,
    /// Shell steps run in order
    #[serde(default)]
    pub steps: Vec<String>,
    /// Names of custom tasks that must run first
    #[serde(default)]
    pub needs: Vec<String>,
    /// Working directory relative to the project root
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Extra environment variables for every step
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// The complete loom.toml manifest structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Project-level settings
    #[serde(default)]
    pub project: ProjectSection,
    /// Step execution defaults
    #[serde(default)]
    pub defaults: DefaultsSection,
    /// Dependency sync configuration
    #[serde(default)]
    pub install: InstallSection,
    /// Static checks, run in order by `loom checks`
    #[serde(default)]
    pub checks: Vec<CheckDefinition>,
    /// Test runner configuration
    #[serde(default)]
    pub tests: TestsSection,
    /// Cleanup rules
    #[serde(default)]
    pub clean: CleanSection,
    /// Native-extension build configuration
    #[serde(default)]
    pub compile: CompileSection,
    /// Custom tasks (BTreeMap keeps `loom list` output stable)
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDefinition>,
}

impl Manifest {
    /// Load the manifest from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Parse the manifest from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse loom.toml")
    }

    /// Load the manifest from the project root, or defaults if absent.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(MANIFEST_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the manifest to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize loom.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;
        Ok(())
    }

    /// The effective project name (manifest value or directory name).
    pub fn project_name(&self, project_dir: &Path) -> String {
        self.project
            .name
            .clone()
            .or_else(|| {
                project_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "project".to_string())
    }

    /// The package directory holding compilable sources.
    pub fn package_dir(&self, project_dir: &Path) -> std::path::PathBuf {
        let package = self
            .project
            .package
            .clone()
            .unwrap_or_else(|| self.project_name(project_dir));
        project_dir.join(package)
    }

    /// Names reserved for built-in targets; custom tasks cannot shadow them.
    pub fn builtin_names() -> &'static [&'static str] {
        &[
            "install",
            "update",
            "checks",
            "pre-commit",
            "tests",
            "clean",
            "compile",
        ]
    }

    /// Validate the manifest and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.defaults.step_timeout_secs == 0 {
            warnings.push("defaults.step_timeout_secs is 0; every step will time out".to_string());
        }

        for check in &self.checks {
            if check.command.trim().is_empty() {
                warnings.push(format!("Check '{}' has an empty command", check.name));
            }
        }

        for pattern in &self.clean.patterns {
            if glob::Pattern::new(pattern).is_err() {
                warnings.push(format!("Invalid clean pattern '{}'", pattern));
            }
        }

        for (name, task) in &self.tasks {
            if Self::builtin_names().contains(&name.as_str()) {
                warnings.push(format!(
                    "Task '{}' shadows a built-in target and will be ignored",
                    name
                ));
            }
            if task.steps.is_empty() && task.needs.is_empty() {
                warnings.push(format!("Task '{}' has no steps and no needs", name));
            }
            for dep in &task.needs {
                if !self.tasks.contains_key(dep) {
                    warnings.push(format!("Task '{}' needs unknown task '{}'", name, dep));
                }
            }
        }

        warnings
    }

    /// A starter manifest written by `loom init`.
    pub fn starter(name: &str) -> Self {
        let mut manifest = Self::default();
        manifest.project.name = Some(name.to_string());
        manifest.checks = vec![
            CheckDefinition {
                name: "ruff".to_string(),
                command: "ruff check .".to_string(),
            },
            CheckDefinition {
                name: "format".to_string(),
                command: "ruff format --check .".to_string(),
            },
        ];
        manifest.tests.coverage_args = vec![
            format!("--cov={}", name),
            "--cov-report=term-missing".to_string(),
        ];
        manifest
    }
}
