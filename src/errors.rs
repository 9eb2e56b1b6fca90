//! Typed error hierarchy for the loom task runner.
//!
//! Three top-level enums cover the three subsystems:
//! - `TaskError` — task resolution and step execution failures
//! - `HookError` — git pre-commit hook activation failures
//! - `CompileError` — native-extension pipeline failures

use thiserror::Error;

/// Errors from task resolution and step execution.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Failed to spawn step '{step}': {source}")]
    SpawnFailed {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' exited with code {exit_code}")]
    StepFailed { step: String, exit_code: i32 },

    #[error("Step '{step}' timed out after {timeout_secs}s")]
    StepTimedOut { step: String, timeout_secs: u64 },

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Task '{task}' needs unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Dependency cycle involving task '{0}'")]
    DependencyCycle(String),

    #[error("Another loom invocation is already running in this project")]
    AlreadyRunning,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors from git hook activation.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("No git repository found at or above {path}")]
    RepositoryNotFound { path: std::path::PathBuf },

    #[error("Failed to write hook at {path}: {source}")]
    WriteFailed {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// Errors from the native-extension compile pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Package directory {path} does not exist")]
    PackageMissing { path: std::path::PathBuf },

    #[error("No sources to compile under {path}")]
    NoSources { path: std::path::PathBuf },

    #[error("Transpile of {path} failed with exit code {exit_code}")]
    TranspileFailed {
        path: std::path::PathBuf,
        exit_code: i32,
    },

    #[error("Compile of {path} failed with exit code {exit_code}")]
    CompileFailed {
        path: std::path::PathBuf,
        exit_code: i32,
    },

    #[error("Failed to spawn '{command}': {source}")]
    ToolSpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to assemble bundle at {path}: {message}")]
    BundleFailed {
        path: std::path::PathBuf,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_error_spawn_failed_is_matchable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "sh not found");
        let err = TaskError::SpawnFailed {
            step: "uv sync".to_string(),
            source: io_err,
        };
        match &err {
            TaskError::SpawnFailed { step, source } => {
                assert_eq!(step, "uv sync");
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected SpawnFailed variant"),
        }
    }

    #[test]
    fn task_error_step_failed_carries_exit_code() {
        let err = TaskError::StepFailed {
            step: "pytest".to_string(),
            exit_code: 2,
        };
        assert!(err.to_string().contains("pytest"));
        assert!(err.to_string().contains('2'));
    }

    #[test]
    fn task_error_unknown_dependency_names_both_tasks() {
        let err = TaskError::UnknownDependency {
            task: "release".to_string(),
            dependency: "bench".to_string(),
        };
        assert!(err.to_string().contains("release"));
        assert!(err.to_string().contains("bench"));
    }

    #[test]
    fn hook_error_repository_not_found_carries_path() {
        use std::path::PathBuf;
        let err = HookError::RepositoryNotFound {
            path: PathBuf::from("/tmp/project"),
        };
        match &err {
            HookError::RepositoryNotFound { path } => {
                assert_eq!(path, &PathBuf::from("/tmp/project"));
            }
            _ => panic!("Expected RepositoryNotFound"),
        }
    }

    #[test]
    fn compile_error_variants_are_distinct() {
        use std::path::PathBuf;
        let transpile = CompileError::TranspileFailed {
            path: PathBuf::from("loom/utils.py"),
            exit_code: 1,
        };
        let compile = CompileError::CompileFailed {
            path: PathBuf::from("loom/utils.c"),
            exit_code: 1,
        };
        assert!(matches!(transpile, CompileError::TranspileFailed { .. }));
        assert!(matches!(compile, CompileError::CompileFailed { .. }));
        assert!(!matches!(transpile, CompileError::CompileFailed { .. }));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        let task_err = TaskError::UnknownTask("x".into());
        assert_std_error(&task_err);
        let hook_err = HookError::RepositoryNotFound {
            path: std::path::PathBuf::from("/x"),
        };
        assert_std_error(&hook_err);
        let compile_err = CompileError::NoSources {
            path: std::path::PathBuf::from("/x"),
        };
        assert_std_error(&compile_err);
    }
}
