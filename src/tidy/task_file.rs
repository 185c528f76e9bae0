//! JSON handoff between planning and execution.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::tidy::types::{Conflict, InvalidTask, MoveTask};
use crate::tidy::validate::Validator;

/// Maximum number of tasks listed in the summary.
pub const SUMMARY_PREVIEW_LIMIT: usize = 10;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Planned tasks with everything rejected on the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFile {
    pub tasks: Vec<MoveTask>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub invalid_tasks: Vec<InvalidTask>,
    #[serde(default)]
    pub summary: Summary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_tasks: usize,
    pub conflicts: usize,
    pub invalid_tasks: usize,
    pub estimated_size_mb: f64,
    pub task_details: Vec<TaskDetail>,
}

/// One preview entry, or a final note about the tasks left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskDetail {
    Task { source: PathBuf, target: PathBuf, size_mb: f64 },
    Note { note: String },
}

impl TaskFile {
    #[must_use]
    pub fn new(tasks: Vec<MoveTask>, conflicts: Vec<Conflict>, invalid_tasks: Vec<InvalidTask>) -> Self {
        let summary = Summary::new(&tasks, conflicts.len(), invalid_tasks.len());
        Self {
            tasks,
            conflicts,
            invalid_tasks,
            summary,
        }
    }

    /// Write as pretty JSON, creating the parent directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize task file")?;
        fs::write(path, json).with_context(|| format!("Failed to write task file {}", path.display()))
    }

    /// Read a task file. The summary is recomputed from the tasks.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read task file {}", path.display()))?;
        let file: Self =
            serde_json::from_str(&content).with_context(|| format!("Invalid task file {}", path.display()))?;
        Ok(Self::new(file.tasks, file.conflicts, file.invalid_tasks))
    }

    /// Check the tasks again before execution.
    /// Tasks that can no longer run, or that repeat an earlier target, become invalid tasks.
    #[must_use]
    pub fn revalidate(&self, validator: &Validator) -> Self {
        let (tasks, invalid_tasks) = validator.validate(&self.tasks);
        Self::new(tasks, Vec::new(), invalid_tasks)
    }

    /// No tasks, conflicts or invalid tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.conflicts.is_empty() && self.invalid_tasks.is_empty()
    }
}

impl Summary {
    #[must_use]
    pub fn new(tasks: &[MoveTask], conflicts: usize, invalid_tasks: usize) -> Self {
        let total_bytes: u64 = tasks.iter().map(|task| task.size).sum();
        let mut task_details: Vec<TaskDetail> = tasks
            .iter()
            .take(SUMMARY_PREVIEW_LIMIT)
            .map(|task| TaskDetail::Task {
                source: task.source.clone(),
                target: task.target.clone(),
                size_mb: round_mb(task.size),
            })
            .collect();
        if tasks.len() > SUMMARY_PREVIEW_LIMIT {
            task_details.push(TaskDetail::Note {
                note: format!("... and {} more tasks", tasks.len() - SUMMARY_PREVIEW_LIMIT),
            });
        }

        Self {
            total_tasks: tasks.len(),
            conflicts,
            invalid_tasks,
            estimated_size_mb: round_mb(total_bytes),
            task_details,
        }
    }
}

/// Megabytes rounded to two decimals.
fn round_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}
