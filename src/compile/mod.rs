//! The `compile` target: native-extension build pipeline.
//!
//! Collects the package sources, transpiles them to C, compiles the C files
//! to extension modules in parallel, and packs everything into a wheel-style
//! bundle under `dist/`. Unchanged sources (by content fingerprint, with the
//! built module still present) skip the build stages.

pub mod bundle;
pub mod pipeline;
pub mod sources;

use crate::errors::CompileError;
use crate::ui::CompileUi;
use crate::workspace::Workspace;
use anyhow::Context;
use bundle::BundleSpec;
use pipeline::BuildStages;
use sources::FingerprintStore;
use std::path::PathBuf;
use tracing::info;

/// Result of a pipeline run.
#[derive(Debug)]
pub struct CompileOutcome {
    /// Path of the assembled bundle
    pub wheel: PathBuf,
    /// Sources that went through the build stages
    pub compiled: usize,
    /// Sources skipped as unchanged
    pub skipped: usize,
}

/// Run the full pipeline for the workspace's package.
pub async fn run(
    workspace: &Workspace,
    force: bool,
    ui: &CompileUi,
) -> Result<CompileOutcome, CompileError> {
    let manifest = &workspace.manifest;
    let package_dir = manifest.package_dir(&workspace.project_dir);
    let config = &manifest.compile;

    let all_sources = sources::collect_sources(&package_dir, &config.exclude)?;
    if all_sources.is_empty() {
        return Err(CompileError::NoSources { path: package_dir });
    }

    let mut store = if force {
        FingerprintStore::default()
    } else {
        FingerprintStore::load(&workspace.fingerprints_file()).map_err(CompileError::Other)?
    };

    // Partition sources into changed (rebuild) and unchanged (reuse module)
    let mut to_build = Vec::new();
    let mut reused = Vec::new();
    let mut hashes = Vec::new();
    for source in &all_sources {
        let key = source
            .strip_prefix(&workspace.project_dir)
            .unwrap_or(source)
            .to_string_lossy()
            .to_string();
        let hash = sources::fingerprint(source).map_err(CompileError::Other)?;
        let ext_file = sources::extension_path(source, &config.ext_suffix);
        if !force && store.is_unchanged(&key, &hash) && ext_file.exists() {
            reused.push(ext_file);
        } else {
            to_build.push(source.clone());
        }
        hashes.push((key, hash));
    }
    info!(
        total = all_sources.len(),
        rebuilding = to_build.len(),
        "compile pipeline starting"
    );

    let stages = BuildStages::new(config);
    let mut ext_files = reused;

    let c_files = if to_build.is_empty() {
        Vec::new()
    } else {
        ui.begin_stage("transpile", to_build.len() as u64);
        let c_files = stages
            .transpile(&to_build, |path| ui.file_done(path))
            .await?;

        ui.begin_stage("compile", c_files.len() as u64);
        let built = stages.compile(&c_files, |path| ui.file_done(path)).await?;
        ext_files.extend(built);
        c_files
    };
    ext_files.sort();

    // Bundle the modules plus the preserved package files
    ui.begin_stage("bundle", 1);
    let mut files = ext_files;
    files.extend(sources::collect_preserved(&package_dir, &config.exclude));
    let spec = BundleSpec {
        name: manifest.project_name(&workspace.project_dir),
        version: manifest.project.version.clone(),
        tag: config.tag.clone(),
        description: manifest.project.description.clone().unwrap_or_default(),
        package: package_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    let wheel = bundle::assemble(&workspace.project_dir, &workspace.dist_dir(), &spec, &files)?;
    ui.file_done(&wheel);

    pipeline::remove_intermediates(&c_files);

    for (key, hash) in hashes {
        store.record(key, hash);
    }
    store
        .save(&workspace.fingerprints_file())
        .context("Failed to persist source fingerprints")
        .map_err(CompileError::Other)?;

    Ok(CompileOutcome {
        wheel,
        compiled: to_build.len(),
        skipped: all_sources.len() - to_build.len(),
    })
}
