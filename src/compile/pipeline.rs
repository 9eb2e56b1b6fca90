//! The two build stages: transpile `.py` -> `.c`, compile `.c` -> extension
//! module.
//!
//! Transpilation runs sequentially and fails fast, matching the transpiler's
//! own `--fast-fail` behavior. Compilation is embarrassingly parallel and
//! runs bounded by the configured job count (default: available CPUs).

use super::sources::{c_path, extension_path};
use crate::errors::CompileError;
use crate::manifest::CompileSection;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs the external transpiler and C compiler over a set of sources.
pub struct BuildStages<'a> {
    config: &'a CompileSection,
    jobs: usize,
}

impl<'a> BuildStages<'a> {
    /// Create the stages with the effective job count resolved.
    pub fn new(config: &'a CompileSection) -> Self {
        let jobs = if config.jobs == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            config.jobs
        };
        Self { config, jobs }
    }

    /// Effective parallel job count for the compile stage.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Transpile each source to a C file next to it. Sequential, fail-fast.
    ///
    /// `on_file` is invoked after each file completes, for progress reporting.
    pub async fn transpile(
        &self,
        sources: &[PathBuf],
        mut on_file: impl FnMut(&Path),
    ) -> Result<Vec<PathBuf>, CompileError> {
        let mut c_files = Vec::with_capacity(sources.len());
        for source in sources {
            let c_file = c_path(source);
            self.run_transpiler(source, &c_file).await?;
            on_file(source);
            c_files.push(c_file);
        }
        Ok(c_files)
    }

    async fn run_transpiler(&self, source: &Path, c_file: &Path) -> Result<(), CompileError> {
        debug!(source = %source.display(), "transpiling");
        let mut cmd = Command::new(&self.config.transpiler);
        cmd.args(&self.config.transpiler_args);
        for directive in &self.config.directives {
            cmd.arg("--directive").arg(directive);
        }
        cmd.arg(source).arg("-o").arg(c_file);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CompileError::ToolSpawnFailed {
                command: self.config.transpiler.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                warn!(source = %source.display(), "transpiler: {}", stderr.trim());
            }
            return Err(CompileError::TranspileFailed {
                path: source.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }

    /// Compile each C file to an extension module, in parallel.
    ///
    /// `on_file` is invoked as each file completes (completion order, not
    /// input order). The returned paths preserve input order.
    pub async fn compile(
        &self,
        c_files: &[PathBuf],
        on_file: impl Fn(&Path) + Send + Sync,
    ) -> Result<Vec<PathBuf>, CompileError> {
        let results: Vec<Result<PathBuf, CompileError>> = futures::stream::iter(
            c_files.iter().map(|c_file| {
                let ext_file = extension_path(c_file, &self.config.ext_suffix);
                let on_file = &on_file;
                async move {
                    self.run_cc(c_file, &ext_file).await?;
                    on_file(c_file);
                    Ok(ext_file)
                }
            }),
        )
        .buffered(self.jobs)
        .collect()
        .await;

        results.into_iter().collect()
    }

    async fn run_cc(&self, c_file: &Path, ext_file: &Path) -> Result<(), CompileError> {
        debug!(c_file = %c_file.display(), "compiling");
        let mut cmd = Command::new(&self.config.cc);
        cmd.args(&self.config.cc_flags);
        if let Some(include) = &self.config.include_dir {
            cmd.arg(format!("-I{include}"));
        }
        cmd.arg(c_file).arg("-o").arg(ext_file);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CompileError::ToolSpawnFailed {
                command: self.config.cc.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                warn!(c_file = %c_file.display(), "cc: {}", stderr.trim());
            }
            return Err(CompileError::CompileFailed {
                path: c_file.to_path_buf(),
                exit_code: output.status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

/// Delete the intermediate C files produced by the transpile stage.
pub fn remove_intermediates(c_files: &[PathBuf]) {
    for c_file in c_files {
        if c_file.exists()
            && let Err(err) = std::fs::remove_file(c_file)
        {
            warn!(path = %c_file.display(), "failed to remove intermediate: {err}");
        }
    }
}
