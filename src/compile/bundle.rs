//! Wheel-style bundle assembly.
//!
//! The final stage of `loom compile` packs the built extension modules, the
//! preserved package files and a `dist-info` metadata directory into a single
//! `.whl` zip under `dist/`.

use crate::errors::CompileError;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::{ZipWriter, write::SimpleFileOptions};

/// Metadata stamped into the bundle.
#[derive(Debug, Clone)]
pub struct BundleSpec {
    /// Distribution name
    pub name: String,
    /// Distribution version
    pub version: String,
    /// Wheel compatibility tag (e.g. `cp312-cp312-linux_x86_64`)
    pub tag: String,
    /// One-line summary for METADATA
    pub description: String,
    /// Top-level package name recorded in top_level.txt
    pub package: String,
}

impl BundleSpec {
    /// The wheel file name, `<name>-<version>-<tag>.whl`.
    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.whl", self.name, self.version, self.tag)
    }

    fn dist_info(&self) -> String {
        format!("{}-{}.dist-info", self.name, self.version)
    }

    fn metadata(&self) -> String {
        [
            "Metadata-Version: 2.3".to_string(),
            format!("Name: {}", self.name),
            format!("Version: {}", self.version),
            format!("Summary: {}", self.description),
        ]
        .join("\n")
    }

    fn wheel_metadata(&self) -> String {
        [
            "Wheel-Version: 1.0".to_string(),
            "Generator: loom".to_string(),
            "Root-Is-Purelib: false".to_string(),
            format!("Tag: {}", self.tag),
        ]
        .join("\n")
    }
}

/// Assemble the bundle in `dist_dir`.
///
/// `files` are packed with archive names relative to `project_dir`, so an
/// extension module at `loom/utils.so` unpacks back to the same layout.
pub fn assemble(
    project_dir: &Path,
    dist_dir: &Path,
    spec: &BundleSpec,
    files: &[PathBuf],
) -> Result<PathBuf, CompileError> {
    std::fs::create_dir_all(dist_dir).map_err(|err| CompileError::BundleFailed {
        path: dist_dir.to_path_buf(),
        message: err.to_string(),
    })?;

    let wheel_path = dist_dir.join(spec.file_name());
    let fail = |message: String| CompileError::BundleFailed {
        path: wheel_path.clone(),
        message,
    };

    let file = File::create(&wheel_path).map_err(|e| fail(e.to_string()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    for path in files {
        let arcname = path
            .strip_prefix(project_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string();
        writer
            .start_file(&arcname, options)
            .map_err(|e| fail(e.to_string()))?;
        let mut content = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut content))
            .map_err(|e| fail(format!("{}: {e}", path.display())))?;
        writer.write_all(&content).map_err(|e| fail(e.to_string()))?;
    }

    let dist_info = spec.dist_info();
    for (name, content) in [
        ("METADATA", spec.metadata()),
        ("WHEEL", spec.wheel_metadata()),
        ("top_level.txt", format!("{}\n", spec.package)),
    ] {
        writer
            .start_file(format!("{dist_info}/{name}"), options)
            .map_err(|e| fail(e.to_string()))?;
        writer
            .write_all(content.as_bytes())
            .map_err(|e| fail(e.to_string()))?;
    }

    writer.finish().map_err(|e| fail(e.to_string()))?;
    info!(wheel = %wheel_path.display(), "bundle assembled");
    Ok(wheel_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn spec() -> BundleSpec {
        BundleSpec {
            name: "loom".to_string(),
            version: "0.3.0".to_string(),
            tag: "cp312-cp312-linux_x86_64".to_string(),
            description: "Weaving utilities".to_string(),
            package: "loom".to_string(),
        }
    }

    #[test]
    fn test_wheel_file_name() {
        assert_eq!(
            spec().file_name(),
            "loom-0.3.0-cp312-cp312-linux_x86_64.whl"
        );
    }

    #[test]
    fn test_assemble_packs_files_and_metadata() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("loom");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("utils.so"), b"binary").unwrap();
        std::fs::write(pkg.join("__init__.py"), b"").unwrap();

        let wheel = assemble(
            dir.path(),
            &dir.path().join("dist"),
            &spec(),
            &[pkg.join("utils.so"), pkg.join("__init__.py")],
        )
        .unwrap();

        assert!(wheel.exists());
        let mut archive = ZipArchive::new(File::open(&wheel).unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"loom/utils.so".to_string()));
        assert!(names.contains(&"loom/__init__.py".to_string()));
        assert!(names.contains(&"loom-0.3.0.dist-info/METADATA".to_string()));
        assert!(names.contains(&"loom-0.3.0.dist-info/WHEEL".to_string()));
        assert!(names.contains(&"loom-0.3.0.dist-info/top_level.txt".to_string()));
    }

    #[test]
    fn test_metadata_contents() {
        let dir = tempdir().unwrap();
        let wheel = assemble(dir.path(), &dir.path().join("dist"), &spec(), &[]).unwrap();

        let mut archive = ZipArchive::new(File::open(&wheel).unwrap()).unwrap();
        let mut metadata = String::new();
        archive
            .by_name("loom-0.3.0.dist-info/METADATA")
            .unwrap()
            .read_to_string(&mut metadata)
            .unwrap();
        assert!(metadata.contains("Name: loom"));
        assert!(metadata.contains("Version: 0.3.0"));
        assert!(metadata.contains("Summary: Weaving utilities"));

        let mut wheel_meta = String::new();
        archive
            .by_name("loom-0.3.0.dist-info/WHEEL")
            .unwrap()
            .read_to_string(&mut wheel_meta)
            .unwrap();
        assert!(wheel_meta.contains("Root-Is-Purelib: false"));
        assert!(wheel_meta.contains("Tag: cp312-cp312-linux_x86_64"));
    }

    #[test]
    fn test_assemble_missing_input_fails() {
        let dir = tempdir().unwrap();
        let err = assemble(
            dir.path(),
            &dir.path().join("dist"),
            &spec(),
            &[dir.path().join("loom/ghost.so")],
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::BundleFailed { .. }));
    }
}
