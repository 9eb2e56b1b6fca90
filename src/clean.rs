//! The `clean` target.
//!
//! Removes the virtual environment, build artifacts, caches, compiled
//! extension modules and generated C sources, driven by the glob patterns in
//! `[clean]`. Cleanup is planned first (so it can be shown for confirmation
//! or `--dry-run`) and executed second.
//!
//! The `.git` and `.loom` directories are never touched, regardless of
//! patterns, and symlinks are removed without being followed.

use anyhow::{Context, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// One path scheduled for removal.
#[derive(Debug, Clone)]
pub struct CleanEntry {
    /// Absolute path to remove
    pub path: PathBuf,
    /// Path relative to the project root, for display
    pub relative: PathBuf,
    /// Whether this is a directory (removed recursively)
    pub is_dir: bool,
    /// Size in bytes (recursive for directories)
    pub bytes: u64,
}

/// The set of paths a clean run would remove.
#[derive(Debug, Default)]
pub struct CleanPlan {
    /// Entries in traversal order; nested matches are folded into their parent
    pub entries: Vec<CleanEntry>,
}

impl CleanPlan {
    /// Whether there is nothing to remove.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total bytes that would be reclaimed.
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.bytes).sum()
    }
}

/// Summary of an executed clean run.
#[derive(Debug, Default)]
pub struct CleanSummary {
    /// Number of top-level entries removed
    pub removed: usize,
    /// Bytes reclaimed
    pub bytes: u64,
}

/// Directories whose contents loom must never delete.
const PROTECTED: &[&str] = &[".git", ".loom"];

/// Build the removal plan for the given patterns.
///
/// Patterns are matched against paths relative to the project root. A matched
/// directory is scheduled whole and not descended into, so nested matches do
/// not produce duplicate entries.
pub fn plan_clean(project_dir: &Path, patterns: &[String]) -> Result<CleanPlan> {
    let compiled: Vec<Pattern> = patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid clean pattern '{}'", p)))
        .collect::<Result<_>>()?;

    let mut plan = CleanPlan::default();
    let mut walker = WalkDir::new(project_dir).min_depth(1).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry.context("Failed to walk project directory")?;
        let relative = entry
            .path()
            .strip_prefix(project_dir)
            .expect("walked path is under the project directory")
            .to_path_buf();

        if let Some(first) = relative.components().next()
            && PROTECTED.contains(&first.as_os_str().to_string_lossy().as_ref())
        {
            if entry.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        if compiled.iter().any(|p| p.matches_path(&relative)) {
            let is_dir = entry.file_type().is_dir();
            let bytes = if is_dir {
                dir_size(entry.path())
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            };
            plan.entries.push(CleanEntry {
                path: entry.path().to_path_buf(),
                relative,
                is_dir,
                bytes,
            });
            if is_dir {
                walker.skip_current_dir();
            }
        }
    }

    Ok(plan)
}

/// Recursive size of a directory, ignoring unreadable entries.
fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Remove every path in the plan.
pub fn execute_clean(plan: &CleanPlan) -> Result<CleanSummary> {
    let mut summary = CleanSummary::default();
    for entry in &plan.entries {
        if entry.is_dir {
            std::fs::remove_dir_all(&entry.path)
                .with_context(|| format!("Failed to remove {}", entry.path.display()))?;
        } else {
            std::fs::remove_file(&entry.path)
                .with_context(|| format!("Failed to remove {}", entry.path.display()))?;
        }
        info!(path = %entry.relative.display(), "removed");
        summary.removed += 1;
        summary.bytes += entry.bytes;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path, bytes: usize) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_matches_top_level_directory() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join(".venv/bin/python"), 10);
        touch(&dir.path().join("loom/utils.py"), 10);

        let plan = plan_clean(dir.path(), &patterns(&[".venv"])).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert!(plan.entries[0].is_dir);
        assert_eq!(plan.entries[0].relative, PathBuf::from(".venv"));
        assert_eq!(plan.total_bytes(), 10);
    }

    #[test]
    fn test_plan_matches_nested_caches_and_extensions() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("loom/__pycache__/utils.pyc"), 5);
        touch(&dir.path().join("loom/sub/__pycache__/mod.pyc"), 5);
        touch(&dir.path().join("loom/utils.c"), 7);
        touch(&dir.path().join("loom/utils.so"), 9);
        touch(&dir.path().join("loom/utils.py"), 3);

        let plan = plan_clean(
            dir.path(),
            &patterns(&["**/__pycache__", "**/*.c", "**/*.so"]),
        )
        .unwrap();

        let rels: Vec<String> = plan
            .entries
            .iter()
            .map(|e| e.relative.display().to_string())
            .collect();
        assert!(rels.contains(&"loom/__pycache__".to_string()));
        assert!(rels.contains(&"loom/sub/__pycache__".to_string()));
        assert!(rels.contains(&"loom/utils.c".to_string()));
        assert!(rels.contains(&"loom/utils.so".to_string()));
        assert!(!rels.contains(&"loom/utils.py".to_string()));
    }

    #[test]
    fn test_plan_never_touches_git_or_loom_state() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join(".git/objects/pack/data.c"), 5);
        touch(&dir.path().join(".loom/runs/run.json"), 5);
        touch(&dir.path().join("build/lib.c"), 5);

        let plan = plan_clean(dir.path(), &patterns(&["**/*.c", "**/*.json", "build"])).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].relative, PathBuf::from("build"));
    }

    #[test]
    fn test_matched_directory_is_not_descended() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("build/inner/deep.c"), 5);

        // "build" matches and "**/*.c" would match the nested file, but the
        // nested file is already covered by its parent
        let plan = plan_clean(dir.path(), &patterns(&["build", "**/*.c"])).unwrap();
        assert_eq!(plan.entries.len(), 1);
    }

    #[test]
    fn test_execute_clean_removes_and_reports() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("dist/pkg.whl"), 100);
        touch(&dir.path().join("loom/utils.so"), 50);
        touch(&dir.path().join("loom/utils.py"), 10);

        let plan = plan_clean(dir.path(), &patterns(&["dist", "**/*.so"])).unwrap();
        let summary = execute_clean(&plan).unwrap();

        assert_eq!(summary.removed, 2);
        assert_eq!(summary.bytes, 150);
        assert!(!dir.path().join("dist").exists());
        assert!(!dir.path().join("loom/utils.so").exists());
        assert!(dir.path().join("loom/utils.py").exists());
    }

    #[test]
    fn test_empty_plan() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("loom/utils.py"), 10);

        let plan = plan_clean(dir.path(), &patterns(&["**/*.so"])).unwrap();
        assert!(plan.is_empty());
        let summary = execute_clean(&plan).unwrap();
        assert_eq!(summary.removed, 0);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(plan_clean(dir.path(), &patterns(&["[broken"])).is_err());
    }
}
