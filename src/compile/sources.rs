//! Source collection and change tracking for the compile pipeline.

use crate::errors::CompileError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collect the compilable `.py` sources under `package_dir`, excluding the
/// configured file names (those are preserved as-is in the bundle).
pub fn collect_sources(
    package_dir: &Path,
    exclude: &[String],
) -> Result<Vec<PathBuf>, CompileError> {
    if !package_dir.is_dir() {
        return Err(CompileError::PackageMissing {
            path: package_dir.to_path_buf(),
        });
    }

    let mut sources: Vec<PathBuf> = WalkDir::new(package_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
        .filter(|p| {
            p.file_name()
                .map(|name| !exclude.iter().any(|ex| ex.as_str() == name))
                .unwrap_or(false)
        })
        .collect();
    sources.sort();
    Ok(sources)
}

/// Collect the excluded file names that exist under `package_dir`; these are
/// shipped in the bundle unmodified.
pub fn collect_preserved(package_dir: &Path, exclude: &[String]) -> Vec<PathBuf> {
    let mut preserved: Vec<PathBuf> = WalkDir::new(package_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .map(|name| exclude.iter().any(|ex| ex.as_str() == name))
                .unwrap_or(false)
        })
        .collect();
    preserved.sort();
    preserved
}

/// The generated C file path for a source file.
pub fn c_path(source: &Path) -> PathBuf {
    source.with_extension("c")
}

/// The extension-module path for a source file, e.g.
/// `loom/utils.py` -> `loom/utils.cpython-312-x86_64-linux-gnu.so`.
pub fn extension_path(source: &Path, ext_suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{ext_suffix}"))
}

/// SHA-256 hex digest of a file's contents.
pub fn fingerprint(path: &Path) -> Result<String> {
    let content = std::fs::read(path)
        .with_context(|| format!("Failed to read source: {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Persistent map of source fingerprints, keyed by project-relative path.
///
/// Lets `loom compile` skip the transpile+compile stages for sources whose
/// contents have not changed since the last successful build.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FingerprintStore {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Load the store, or an empty one when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fingerprint store: {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse fingerprint store")
    }

    /// Save the store as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize fingerprints")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write fingerprint store: {}", path.display()))?;
        Ok(())
    }

    /// Whether the stored fingerprint for `key` matches `hash`.
    pub fn is_unchanged(&self, key: &str, hash: &str) -> bool {
        self.entries.get(key).is_some_and(|stored| stored == hash)
    }

    /// Record the fingerprint for `key`.
    pub fn record(&mut self, key: impl Into<String>, hash: impl Into<String>) {
        self.entries.insert(key.into(), hash.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn default_exclude() -> Vec<String> {
        vec!["__init__.py".to_string(), "__version__.py".to_string()]
    }

    #[test]
    fn test_collect_sources_skips_excluded_and_non_python() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("loom");
        std::fs::create_dir_all(pkg.join("sub")).unwrap();
        std::fs::write(pkg.join("__init__.py"), "").unwrap();
        std::fs::write(pkg.join("__version__.py"), "").unwrap();
        std::fs::write(pkg.join("utils.py"), "x = 1").unwrap();
        std::fs::write(pkg.join("sub/logger.py"), "y = 2").unwrap();
        std::fs::write(pkg.join("README.md"), "docs").unwrap();

        let sources = collect_sources(&pkg, &default_exclude()).unwrap();
        assert_eq!(sources.len(), 2);
        assert!(sources[0].ends_with("sub/logger.py"));
        assert!(sources[1].ends_with("utils.py"));
    }

    #[test]
    fn test_collect_sources_missing_package() {
        let dir = tempdir().unwrap();
        let err = collect_sources(&dir.path().join("ghost"), &default_exclude()).unwrap_err();
        assert!(matches!(err, CompileError::PackageMissing { .. }));
    }

    #[test]
    fn test_collect_preserved_finds_excluded_files() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("loom");
        std::fs::create_dir_all(pkg.join("sub")).unwrap();
        std::fs::write(pkg.join("__init__.py"), "").unwrap();
        std::fs::write(pkg.join("sub/__init__.py"), "").unwrap();
        std::fs::write(pkg.join("utils.py"), "x = 1").unwrap();

        let preserved = collect_preserved(&pkg, &default_exclude());
        assert_eq!(preserved.len(), 2);
        assert!(preserved.iter().all(|p| p.ends_with("__init__.py")));
    }

    #[test]
    fn test_derived_paths() {
        let source = Path::new("loom/utils.py");
        assert_eq!(c_path(source), Path::new("loom/utils.c"));
        assert_eq!(
            extension_path(source, ".cpython-312-x86_64-linux-gnu.so"),
            Path::new("loom/utils.cpython-312-x86_64-linux-gnu.so")
        );
        assert_eq!(extension_path(source, ".so"), Path::new("loom/utils.so"));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("utils.py");

        std::fs::write(&file, "x = 1").unwrap();
        let first = fingerprint(&file).unwrap();

        std::fs::write(&file, "x = 2").unwrap();
        let second = fingerprint(&file).unwrap();

        assert_ne!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_fingerprint_store_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fingerprints.json");

        let mut store = FingerprintStore::default();
        store.record("loom/utils.py", "abc123");
        store.save(&path).unwrap();

        let loaded = FingerprintStore::load(&path).unwrap();
        assert!(loaded.is_unchanged("loom/utils.py", "abc123"));
        assert!(!loaded.is_unchanged("loom/utils.py", "def456"));
        assert!(!loaded.is_unchanged("loom/other.py", "abc123"));
    }

    #[test]
    fn test_fingerprint_store_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = FingerprintStore::load(&dir.path().join("ghost.json")).unwrap();
        assert!(!store.is_unchanged("anything", "hash"));
    }
}
