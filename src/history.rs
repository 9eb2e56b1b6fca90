//! Run records.
//!
//! Every target invocation is journaled under `.loom/runs/` as a JSON file,
//! with the in-flight record kept at `.loom/current-run.json` so a crashed
//! run is still visible to `loom status`.

use crate::task::StepOutcome;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutcome {
    Succeeded,
    Failed { message: String },
}

/// A completed (or in-flight) step within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl From<&StepOutcome> for StepRecord {
    fn from(outcome: &StepOutcome) -> Self {
        Self {
            step: outcome.step.clone(),
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration.as_millis() as u64,
        }
    }
}

/// One target invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub target: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub outcome: Option<RunOutcome>,
    pub steps: Vec<StepRecord>,
}

impl RunRecord {
    fn new(target: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            target: target.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            outcome: None,
            steps: Vec::new(),
        }
    }

    /// Whether the run ended, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Journal of run records under a `.loom/` directory.
pub struct RunHistory {
    runs_dir: PathBuf,
    current_run_file: PathBuf,
    current: Option<RunRecord>,
}

impl RunHistory {
    pub fn new(loom_dir: &Path) -> Self {
        Self {
            runs_dir: loom_dir.join("runs"),
            current_run_file: loom_dir.join("current-run.json"),
            current: None,
        }
    }

    /// Begin a run for `target` and persist the in-flight record.
    pub fn start(&mut self, target: &str) -> Result<()> {
        self.current = Some(RunRecord::new(target));
        self.save_current()
    }

    /// Append a step record to the current run and persist.
    pub fn record_step(&mut self, step: StepRecord) -> Result<()> {
        let run = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("record_step called with no active run"))?;
        run.steps.push(step);
        self.save_current()
    }

    /// Finish the current run and move its record into `runs/`.
    pub fn finish(&mut self, outcome: RunOutcome) -> Result<PathBuf> {
        let run = self
            .current
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No current run to finish"))?;
        run.ended_at = Some(Utc::now());
        run.outcome = Some(outcome);

        let filename = format!(
            "{}_{}.json",
            run.started_at.format("%Y-%m-%dT%H-%M-%S"),
            &run.run_id.to_string()[..8]
        );
        let run_file = self.runs_dir.join(&filename);
        let json = serde_json::to_string_pretty(&run).context("Failed to serialize run record")?;
        fs::create_dir_all(&self.runs_dir).context("Failed to create runs directory")?;
        fs::write(&run_file, json).context("Failed to write run record")?;

        if self.current_run_file.exists() {
            fs::remove_file(&self.current_run_file)
                .context("Failed to remove current-run.json after finishing run")?;
        }
        self.current = None;
        Ok(run_file)
    }

    fn save_current(&self) -> Result<()> {
        if let Some(ref run) = self.current {
            let json =
                serde_json::to_string_pretty(run).context("Failed to serialize current run")?;
            fs::write(&self.current_run_file, json).context("Failed to write current run file")?;
        }
        Ok(())
    }

    /// The in-flight record left behind by an interrupted run, if any.
    pub fn load_current(&self) -> Result<Option<RunRecord>> {
        if !self.current_run_file.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&self.current_run_file).context("Failed to read current run file")?;
        let run = serde_json::from_str(&content).context("Failed to parse current run file")?;
        Ok(Some(run))
    }

    /// All persisted run files, most recent first.
    pub fn list_runs(&self) -> Result<Vec<PathBuf>> {
        if !self.runs_dir.exists() {
            return Ok(Vec::new());
        }
        let mut runs: Vec<PathBuf> = fs::read_dir(&self.runs_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        runs.sort();
        runs.reverse();
        Ok(runs)
    }

    pub fn load_run(&self, path: &Path) -> Result<RunRecord> {
        let content = fs::read_to_string(path).context("Failed to read run record")?;
        serde_json::from_str(&content).context("Failed to parse run record")
    }

    /// The most recent `limit` runs, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RunRecord>> {
        self.list_runs()?
            .into_iter()
            .take(limit)
            .map(|path| self.load_run(&path))
            .collect()
    }
}
