//! Project workspace handling.
//!
//! Every loom project keeps its state under a `.loom/` directory next to
//! `loom.toml`:
//!
//! ```text
//! .loom/
//! ├── lock             # advisory lock held for the duration of a run
//! ├── fingerprints.json # source hashes for incremental compiles
//! ├── logs/            # rotating tracing output
//! └── runs/            # JSON run records
//! ```

use crate::manifest::{MANIFEST_FILE, Manifest};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the loom state directory.
pub const LOOM_DIR: &str = ".loom";

/// Result of initializing a loom project.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created .loom directory
    pub loom_dir: PathBuf,
    /// Whether the manifest was newly written (false if it already existed)
    pub manifest_created: bool,
}

/// A resolved project: directory, state paths and parsed manifest.
#[derive(Debug)]
pub struct Workspace {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .loom state directory
    pub loom_dir: PathBuf,
    /// Parsed loom.toml
    pub manifest: Manifest,
    /// CLI override: verbose mode
    pub verbose: bool,
    /// CLI override: skip confirmation prompts
    pub yes: bool,
}

impl Workspace {
    /// Open a workspace, loading the manifest (or defaults when absent).
    pub fn open(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let loom_dir = project_dir.join(LOOM_DIR);
        let manifest = Manifest::load_or_default(&project_dir)?;

        Ok(Self {
            project_dir,
            loom_dir,
            manifest,
            verbose: false,
            yes: false,
        })
    }

    /// Open a workspace with CLI overrides applied.
    pub fn with_cli_args(project_dir: PathBuf, verbose: bool, yes: bool) -> Result<Self> {
        let mut workspace = Self::open(project_dir)?;
        workspace.verbose = verbose;
        workspace.yes = yes;
        Ok(workspace)
    }

    /// Path to the manifest file.
    pub fn manifest_file(&self) -> PathBuf {
        self.project_dir.join(MANIFEST_FILE)
    }

    /// Path to the lock file.
    pub fn lock_file(&self) -> PathBuf {
        self.loom_dir.join("lock")
    }

    /// Path to the source fingerprint store.
    pub fn fingerprints_file(&self) -> PathBuf {
        self.loom_dir.join("fingerprints.json")
    }

    /// Path to the log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.loom_dir.join("logs")
    }

    /// Path to the run record directory.
    pub fn runs_dir(&self) -> PathBuf {
        self.loom_dir.join("runs")
    }

    /// Path to the bundle output directory.
    pub fn dist_dir(&self) -> PathBuf {
        self.project_dir.join("dist")
    }

    /// Ensure the .loom directory structure exists.
    pub fn ensure_state_dirs(&self) -> Result<()> {
        for dir in [&self.loom_dir, &self.log_dir(), &self.runs_dir()] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Acquire the per-project run lock.
    ///
    /// Returns a guard that releases the lock when dropped. Fails immediately
    /// when another loom invocation holds it.
    pub fn acquire_lock(&self) -> Result<RunLock, crate::errors::TaskError> {
        self.ensure_state_dirs()
            .map_err(crate::errors::TaskError::Other)?;
        let file = File::create(self.lock_file())
            .with_context(|| format!("Failed to create lock file: {}", self.lock_file().display()))
            .map_err(crate::errors::TaskError::Other)?;
        file.try_lock_exclusive()
            .map_err(|_| crate::errors::TaskError::AlreadyRunning)?;
        Ok(RunLock { _file: file })
    }
}

/// Guard holding the exclusive run lock; released on drop.
pub struct RunLock {
    _file: File,
}

/// Initialize a loom project in the given directory.
///
/// Writes a starter `loom.toml` (unless one exists) and creates the `.loom/`
/// state directory structure. Idempotent.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let manifest_path = project_dir.join(MANIFEST_FILE);
    let manifest_created = if manifest_path.exists() {
        false
    } else {
        let name = project_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());
        Manifest::starter(&name).save(&manifest_path)?;
        true
    };

    let loom_dir = project_dir.join(LOOM_DIR);
    for dir in [
        loom_dir.clone(),
        loom_dir.join("logs"),
        loom_dir.join("runs"),
    ] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    }

    let gitignore = loom_dir.join(".gitignore");
    if !gitignore.exists() {
        std::fs::write(&gitignore, "lock\nlogs/\nruns/\nfingerprints.json\n")
            .with_context(|| format!("Failed to write {}", gitignore.display()))?;
    }

    Ok(InitResult {
        loom_dir,
        manifest_created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_project_creates_structure() {
        let dir = tempdir().unwrap();
        let result = init_project(dir.path()).unwrap();

        assert!(result.manifest_created);
        assert!(dir.path().join(MANIFEST_FILE).exists());
        assert!(dir.path().join(".loom/logs").exists());
        assert!(dir.path().join(".loom/runs").exists());
        assert!(dir.path().join(".loom/.gitignore").exists());
    }

    #[test]
    fn test_init_project_idempotent() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let second = init_project(dir.path()).unwrap();
        assert!(!second.manifest_created);
    }

    #[test]
    fn test_init_project_preserves_existing_manifest() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[project]\nname = \"keep\"\n").unwrap();

        let result = init_project(dir.path()).unwrap();
        assert!(!result.manifest_created);

        let manifest = Manifest::load(&dir.path().join(MANIFEST_FILE)).unwrap();
        assert_eq!(manifest.project.name.as_deref(), Some("keep"));
    }

    #[test]
    fn test_workspace_paths() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let workspace = Workspace::open(dir.path().to_path_buf()).unwrap();

        // Use ends_with to handle symlink resolution differences on macOS
        // (e.g., /var vs /private/var)
        assert!(workspace.lock_file().ends_with(".loom/lock"));
        assert!(workspace.log_dir().ends_with(".loom/logs"));
        assert!(workspace.runs_dir().ends_with(".loom/runs"));
        assert!(
            workspace
                .fingerprints_file()
                .ends_with(".loom/fingerprints.json")
        );
        assert!(workspace.dist_dir().ends_with("dist"));
    }

    #[test]
    fn test_lock_excludes_second_holder() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let workspace = Workspace::open(dir.path().to_path_buf()).unwrap();

        let _guard = workspace.acquire_lock().unwrap();
        let second = workspace.acquire_lock();
        assert!(matches!(
            second,
            Err(crate::errors::TaskError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let dir = tempdir().unwrap();
        init_project(dir.path()).unwrap();
        let workspace = Workspace::open(dir.path().to_path_buf()).unwrap();

        drop(workspace.acquire_lock().unwrap());
        assert!(workspace.acquire_lock().is_ok());
    }
}
