//! Step execution engine.
//!
//! Each step runs as a `sh -c` subprocess in the task's working directory
//! with `LOOM_TASK` / `LOOM_STEP` exported. Steps run sequentially and the
//! first non-zero exit aborts the task with that step's exit code.

use super::Task;
use crate::errors::TaskError;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Outcome of a single completed step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The shell command that ran
    pub step: String,
    /// Exit code (0 on success)
    pub exit_code: i32,
    /// Wall-clock duration of the step
    pub duration: Duration,
}

/// Output captured from a step run with piped stdio.
#[derive(Debug, Clone)]
pub struct CapturedStep {
    /// Outcome of the step
    pub outcome: StepOutcome,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl CapturedStep {
    /// Whether the step exited zero.
    pub fn success(&self) -> bool {
        self.outcome.exit_code == 0
    }
}

/// Runs task steps as shell subprocesses.
pub struct StepRunner {
    /// Project directory (default working directory for steps)
    project_dir: PathBuf,
    /// Shell used for `-c` invocations
    shell: String,
    /// Per-step timeout
    timeout_secs: u64,
    /// Whether to echo each step before running it
    verbose: bool,
}

impl StepRunner {
    /// Create a runner for the given project directory.
    pub fn new(
        project_dir: impl AsRef<Path>,
        shell: impl Into<String>,
        timeout_secs: u64,
        verbose: bool,
    ) -> Self {
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
            shell: shell.into(),
            timeout_secs,
            verbose,
        }
    }

    fn working_dir(&self, task: &Task) -> PathBuf {
        match &task.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.project_dir.join(dir),
            None => self.project_dir.clone(),
        }
    }

    fn command(&self, task: &Task, step: &str, step_index: usize) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(step)
            .current_dir(self.working_dir(task))
            .env("LOOM_TASK", &task.name)
            .env("LOOM_STEP", (step_index + 1).to_string());
        for (key, value) in &task.env {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run every step of a task in order, streaming output to the terminal.
    ///
    /// Aborts at the first failing step per standard task-runner semantics.
    pub async fn run_task(&self, task: &Task) -> Result<Vec<StepOutcome>, TaskError> {
        let mut outcomes = Vec::with_capacity(task.steps.len());
        for (index, step) in task.steps.iter().enumerate() {
            outcomes.push(self.run_step(task, step, index).await?);
        }
        Ok(outcomes)
    }

    /// Run a single step with inherited stdio.
    async fn run_step(
        &self,
        task: &Task,
        step: &str,
        index: usize,
    ) -> Result<StepOutcome, TaskError> {
        if self.verbose {
            eprintln!("[{}] $ {}", task.name, step);
        }
        debug!(task = %task.name, step, "running step");

        let started = Instant::now();
        let mut child = self
            .command(task, step, index)
            .spawn()
            .map_err(|source| TaskError::SpawnFailed {
                step: step.to_string(),
                source,
            })?;

        let status = match timeout(Duration::from_secs(self.timeout_secs), child.wait()).await {
            Ok(result) => result.map_err(|source| TaskError::SpawnFailed {
                step: step.to_string(),
                source,
            })?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(TaskError::StepTimedOut {
                    step: step.to_string(),
                    timeout_secs: self.timeout_secs,
                });
            }
        };

        let exit_code = status.code().unwrap_or(-1);
        if exit_code != 0 {
            return Err(TaskError::StepFailed {
                step: step.to_string(),
                exit_code,
            });
        }

        Ok(StepOutcome {
            step: step.to_string(),
            exit_code,
            duration: started.elapsed(),
        })
    }

    /// Run a single command with piped stdio, capturing its output.
    ///
    /// A non-zero exit is *not* an error here; callers that aggregate results
    /// (the `checks` target) inspect [`CapturedStep::success`] themselves.
    pub async fn run_captured(&self, task: &Task, step: &str) -> Result<CapturedStep, TaskError> {
        debug!(task = %task.name, step, "running captured step");

        let started = Instant::now();
        let child = self
            .command(task, step, 0)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| TaskError::SpawnFailed {
                step: step.to_string(),
                source,
            })?;

        let output = match timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(result) => result
                .with_context(|| format!("Failed to wait for step '{}'", step))
                .map_err(TaskError::Other)?,
            Err(_) => {
                return Err(TaskError::StepTimedOut {
                    step: step.to_string(),
                    timeout_secs: self.timeout_secs,
                });
            }
        };

        Ok(CapturedStep {
            outcome: StepOutcome {
                step: step.to_string(),
                exit_code: output.status.code().unwrap_or(-1),
                duration: started.elapsed(),
            },
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn runner(dir: &Path) -> StepRunner {
        StepRunner::new(dir, "sh", 10, false)
    }

    #[tokio::test]
    async fn test_run_task_success() {
        let dir = tempdir().unwrap();
        let task = Task::new("demo", vec!["true".to_string(), "true".to_string()]);

        let outcomes = runner(dir.path()).run_task(&task).await.unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.exit_code == 0));
    }

    #[tokio::test]
    async fn test_run_task_fails_fast() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("after");
        let task = Task::new(
            "demo",
            vec![
                "exit 3".to_string(),
                format!("touch {}", marker.display()),
            ],
        );

        let err = runner(dir.path()).run_task(&task).await.unwrap_err();
        match err {
            TaskError::StepFailed { step, exit_code } => {
                assert_eq!(step, "exit 3");
                assert_eq!(exit_code, 3);
            }
            other => panic!("Expected StepFailed, got {other:?}"),
        }
        // The failing step aborted the task before the second step ran
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_run_task_exports_environment() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("env.txt");
        let task = Task::new(
            "demo",
            vec![format!("echo \"$LOOM_TASK:$LOOM_STEP\" > {}", out.display())],
        );

        runner(dir.path()).run_task(&task).await.unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        assert_eq!(content.trim(), "demo:1");
    }

    #[tokio::test]
    async fn test_run_task_custom_env() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("env.txt");
        let mut task = Task::new("demo", vec![format!("echo \"$GREETING\" > {}", out.display())]);
        task.env.insert("GREETING".to_string(), "hello".to_string());

        runner(dir.path()).run_task(&task).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_task_working_dir() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let mut task = Task::new("demo", vec!["pwd > where.txt".to_string()]);
        task.working_dir = Some(PathBuf::from("sub"));

        runner(dir.path()).run_task(&task).await.unwrap();
        let content = std::fs::read_to_string(dir.path().join("sub/where.txt")).unwrap();
        assert!(content.trim().ends_with("sub"));
    }

    #[tokio::test]
    async fn test_run_task_timeout() {
        let dir = tempdir().unwrap();
        let runner = StepRunner::new(dir.path(), "sh", 1, false);
        let task = Task::new("demo", vec!["sleep 10".to_string()]);

        let err = runner.run_task(&task).await.unwrap_err();
        assert!(matches!(err, TaskError::StepTimedOut { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn test_run_captured_collects_output() {
        let dir = tempdir().unwrap();
        let task = Task::new("checks", vec![]);

        let captured = runner(dir.path())
            .run_captured(&task, "echo out; echo err >&2")
            .await
            .unwrap();
        assert!(captured.success());
        assert_eq!(captured.stdout.trim(), "out");
        assert_eq!(captured.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn test_run_captured_nonzero_is_not_an_error() {
        let dir = tempdir().unwrap();
        let task = Task::new("checks", vec![]);

        let captured = runner(dir.path())
            .run_captured(&task, "echo broken >&2; exit 1")
            .await
            .unwrap();
        assert!(!captured.success());
        assert_eq!(captured.outcome.exit_code, 1);
        assert!(captured.stderr.contains("broken"));
    }
}
