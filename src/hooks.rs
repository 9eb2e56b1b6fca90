//! Git pre-commit hook activation.
//!
//! `loom install` writes a `.git/hooks/pre-commit` script that delegates to
//! `loom checks`; `loom update` rewrites it. A pre-existing hook that loom
//! does not own is backed up to `pre-commit.pre-loom` instead of being
//! overwritten.

use crate::errors::HookError;
use git2::Repository;
use std::path::{Path, PathBuf};
use tracing::info;

/// Marker identifying a hook script written by loom.
const MANAGED_MARKER: &str = "# managed by loom";

/// Name the foreign hook is moved to before loom writes its own.
const BACKUP_NAME: &str = "pre-commit.pre-loom";

/// Result of installing or refreshing the hook.
#[derive(Debug)]
pub struct HookInstall {
    /// Path of the written hook script
    pub path: PathBuf,
    /// Where a pre-existing foreign hook was moved, if any
    pub backed_up: Option<PathBuf>,
    /// Whether an existing loom hook was overwritten
    pub refreshed: bool,
}

fn hook_script() -> String {
    format!(
        "#!/bin/sh\n{MANAGED_MARKER}\n# Runs the project's configured static checks before each commit.\nexec loom checks\n"
    )
}

fn discover_hooks_dir(project_dir: &Path) -> Result<PathBuf, HookError> {
    let repo = Repository::discover(project_dir).map_err(|_| HookError::RepositoryNotFound {
        path: project_dir.to_path_buf(),
    })?;
    Ok(repo.path().join("hooks"))
}

/// Whether the given hook file is one loom wrote.
fn is_managed(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.contains(MANAGED_MARKER))
        .unwrap_or(false)
}

/// Install the pre-commit hook, backing up any foreign hook.
///
/// Idempotent: an existing loom-managed hook is rewritten in place.
pub fn install_hook(project_dir: &Path) -> Result<HookInstall, HookError> {
    write_hook(project_dir)
}

/// Refresh the pre-commit hook (used by `loom update`).
///
/// Same as [`install_hook`]; the separate entry point keeps the call sites
/// honest about intent and leaves room for version-gated rewrites later.
pub fn refresh_hook(project_dir: &Path) -> Result<HookInstall, HookError> {
    write_hook(project_dir)
}

fn write_hook(project_dir: &Path) -> Result<HookInstall, HookError> {
    let hooks_dir = discover_hooks_dir(project_dir)?;
    std::fs::create_dir_all(&hooks_dir).map_err(|source| HookError::WriteFailed {
        path: hooks_dir.clone(),
        source,
    })?;

    let hook_path = hooks_dir.join("pre-commit");
    let mut backed_up = None;
    let mut refreshed = false;

    if hook_path.exists() {
        if is_managed(&hook_path) {
            refreshed = true;
        } else {
            let backup = hooks_dir.join(BACKUP_NAME);
            std::fs::rename(&hook_path, &backup).map_err(|source| HookError::WriteFailed {
                path: backup.clone(),
                source,
            })?;
            info!(backup = %backup.display(), "backed up existing pre-commit hook");
            backed_up = Some(backup);
        }
    }

    std::fs::write(&hook_path, hook_script()).map_err(|source| HookError::WriteFailed {
        path: hook_path.clone(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        std::fs::set_permissions(&hook_path, perms).map_err(|source| HookError::WriteFailed {
            path: hook_path.clone(),
            source,
        })?;
    }

    info!(path = %hook_path.display(), "pre-commit hook written");
    Ok(HookInstall {
        path: hook_path,
        backed_up,
        refreshed,
    })
}
