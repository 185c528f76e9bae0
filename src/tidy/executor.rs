//! Run move tasks in parallel.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use indicatif::ParallelProgressIterator;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::tidy::types::MoveTask;

/// Upper limit for the default worker count.
const MAX_DEFAULT_WORKERS: usize = 32;

/// Result of a single task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Copied to the target. Holds the backup path if an older target was moved aside.
    Moved { backup: Option<PathBuf> },
    /// Target already existed with the same size.
    AlreadyPresent,
    Failed(String),
    /// Not started because execution was aborted.
    NotStarted,
}

/// A task that failed with its error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub source: PathBuf,
    pub target: PathBuf,
    pub error: String,
}

/// Totals and details of one execution run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    pub total: usize,
    /// Source and target of every copied file.
    pub moved: Vec<(PathBuf, PathBuf)>,
    pub backups: Vec<PathBuf>,
    pub already_present: usize,
    pub failures: Vec<TaskFailure>,
    pub not_started: usize,
    pub aborted: bool,
    pub elapsed: Duration,
}

/// Default number of parallel workers: four per CPU, at most 32.
#[must_use]
pub fn default_workers() -> usize {
    (num_cpus::get() * 4).clamp(1, MAX_DEFAULT_WORKERS)
}

/// Execute tasks with the given number of workers.
///
/// Tasks that have not started when `abort` is set are skipped.
/// Failed tasks are reported, never returned as an error.
///
/// # Errors
/// Returns an error if the thread pool cannot be created.
pub fn execute_tasks(tasks: &[MoveTask], workers: usize, abort: &AtomicBool) -> anyhow::Result<ExecutionReport> {
    let start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("Failed to create worker pool")?;

    let outcomes: Vec<TaskOutcome> = pool.install(|| {
        tasks
            .par_iter()
            .progress_with(crate::progress_bar(tasks.len() as u64))
            .map(|task| {
                if abort.load(Ordering::SeqCst) {
                    TaskOutcome::NotStarted
                } else {
                    execute_task(task).unwrap_or_else(|error| TaskOutcome::Failed(format!("{error:#}")))
                }
            })
            .collect()
    });

    let mut report = ExecutionReport {
        total: tasks.len(),
        aborted: abort.load(Ordering::SeqCst),
        ..ExecutionReport::default()
    };
    for (task, outcome) in tasks.iter().zip(outcomes) {
        match outcome {
            TaskOutcome::Moved { backup } => {
                report.moved.push((task.source.clone(), task.target.clone()));
                report.backups.extend(backup);
            }
            TaskOutcome::AlreadyPresent => report.already_present += 1,
            TaskOutcome::Failed(error) => report.failures.push(TaskFailure {
                source: task.source.clone(),
                target: task.target.clone(),
                error,
            }),
            TaskOutcome::NotStarted => report.not_started += 1,
        }
    }
    report.elapsed = start.elapsed();
    Ok(report)
}

/// Copy one file to its target, moving a different existing target aside first.
///
/// The copy goes to a temporary file next to the target and replaces it only once complete,
/// so a failed copy leaves an existing target untouched.
///
/// # Errors
/// Returns an error if the source is missing or any file operation fails.
pub fn execute_task(task: &MoveTask) -> anyhow::Result<TaskOutcome> {
    if !task.source.is_file() {
        anyhow::bail!("Source does not exist: {}", task.source.display());
    }
    let parent = task
        .target
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let existing = fs::metadata(&task.target).ok();
    if existing.as_ref().is_some_and(|metadata| metadata.len() == task.size) {
        return Ok(TaskOutcome::AlreadyPresent);
    }

    let partial = tempfile::Builder::new()
        .prefix(".tidy_video_")
        .suffix(".part")
        .tempfile_in(parent)
        .with_context(|| format!("Failed to create temporary file in {}", parent.display()))?;
    fs::copy(&task.source, partial.path()).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            task.source.display(),
            task.target.display()
        )
    })?;
    preserve_modified_time(&task.source, partial.path());

    let backup = if existing.is_some() {
        let backup_path = backup_path(&task.target);
        fs::rename(&task.target, &backup_path)
            .with_context(|| format!("Failed to back up {}", task.target.display()))?;
        Some(backup_path)
    } else {
        None
    };

    if let Err(error) = partial.persist(&task.target) {
        if let Some(backup_path) = &backup {
            let _ = fs::rename(backup_path, &task.target);
        }
        return Err(error.error).with_context(|| format!("Failed to replace {}", task.target.display()));
    }

    if task.delete_source {
        fs::remove_file(&task.source)
            .with_context(|| format!("Failed to delete source {}", task.source.display()))?;
    }

    Ok(TaskOutcome::Moved { backup })
}

/// Free path next to the target: `<stem>_backup.<ext>`, then `<stem>_backup_1.<ext>` and so on.
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    let stem = crate::path_to_file_stem_string(target);
    let extension = target
        .extension()
        .map(|ext| format!(".{}", crate::os_str_to_string(ext)))
        .unwrap_or_default();
    let parent = target.parent().unwrap_or_else(|| Path::new(""));

    let mut candidate = parent.join(format!("{stem}_backup{extension}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{stem}_backup_{counter}{extension}"));
        counter += 1;
    }
    candidate
}

fn preserve_modified_time(source: &Path, target: &Path) {
    let Ok(modified) = fs::metadata(source).and_then(|metadata| metadata.modified()) else {
        return;
    };
    if let Ok(file) = fs::File::options().write(true).open(target) {
        let _ = file.set_modified(modified);
    }
}

impl ExecutionReport {
    /// Tasks that ended with the target in place.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.moved.len() + self.already_present
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(source: PathBuf, target: PathBuf, delete_source: bool) -> MoveTask {
        let size = fs::metadata(&source).map(|m| m.len()).unwrap_or_default();
        MoveTask {
            source,
            target,
            size,
            group_index: 0,
            file_index: 1,
            delete_source,
        }
    }

    #[test]
    fn copies_and_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"video").unwrap();
        let target = dir.path().join("out").join("group").join("a.mp4");

        let report = execute_tasks(&[task(source.clone(), target.clone(), false)], 2, &AtomicBool::new(false)).unwrap();
        assert!(report.is_success());
        assert_eq!(report.moved, vec![(source.clone(), target.clone())]);
        assert_eq!(fs::read(&target).unwrap(), b"video");
        assert!(source.exists());
    }

    #[test]
    fn deletes_source_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"video").unwrap();
        let target = dir.path().join("out").join("a.mp4");

        let outcome = execute_task(&task(source.clone(), target.clone(), true)).unwrap();
        assert_eq!(outcome, TaskOutcome::Moved { backup: None });
        assert!(!source.exists());
        assert!(target.exists());
    }

    #[test]
    fn same_size_target_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"abc").unwrap();
        let target = dir.path().join("out").join("a.mp4");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"xyz").unwrap();

        let outcome = execute_task(&task(source.clone(), target.clone(), true)).unwrap();
        assert_eq!(outcome, TaskOutcome::AlreadyPresent);
        assert_eq!(fs::read(&target).unwrap(), b"xyz");
        assert!(source.exists());
    }

    #[test]
    fn different_size_target_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"new video").unwrap();
        let target = dir.path().join("out").join("a.mp4");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, b"old").unwrap();
        fs::write(dir.path().join("out").join("a_backup.mp4"), b"older").unwrap();

        let outcome = execute_task(&task(source, target.clone(), false)).unwrap();
        let backup = dir.path().join("out").join("a_backup_1.mp4");
        assert_eq!(outcome, TaskOutcome::Moved {
            backup: Some(backup.clone())
        });
        assert_eq!(fs::read(&target).unwrap(), b"new video");
        assert_eq!(fs::read(&backup).unwrap(), b"old");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn failed_copy_keeps_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let target = out.join("a.mp4");
        fs::create_dir_all(&out).unwrap();
        fs::write(&target, b"existing").unwrap();

        // A regular file by metadata that cannot be read from offset zero
        let unreadable = MoveTask {
            source: PathBuf::from("/proc/self/mem"),
            target: target.clone(),
            size: 1,
            group_index: 0,
            file_index: 1,
            delete_source: false,
        };
        let error = execute_task(&unreadable).unwrap_err();
        assert!(format!("{error:#}").contains("Failed to copy"));

        assert_eq!(fs::read(&target).unwrap(), b"existing");
        let leftovers: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(leftovers, vec!["a.mp4".to_string()]);
    }

    #[test]
    fn replaced_target_leaves_no_temporary_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"new video").unwrap();
        let out = dir.path().join("out");
        let target = out.join("a.mp4");
        fs::create_dir_all(&out).unwrap();
        fs::write(&target, b"old").unwrap();

        execute_task(&task(source, target.clone(), false)).unwrap();
        let mut names: Vec<String> = fs::read_dir(&out)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.mp4".to_string(), "a_backup.mp4".to_string()]);
    }

    #[test]
    fn missing_source_is_reported_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let missing = MoveTask {
            source: dir.path().join("missing.mp4"),
            target: dir.path().join("out").join("missing.mp4"),
            size: 1,
            group_index: 0,
            file_index: 1,
            delete_source: false,
        };
        let report = execute_tasks(&[missing], 1, &AtomicBool::new(false)).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.contains("Source does not exist"));
        assert!(!report.is_success());
    }

    #[test]
    fn aborted_run_starts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"video").unwrap();
        let target = dir.path().join("out").join("a.mp4");

        let report = execute_tasks(&[task(source, target.clone(), false)], 1, &AtomicBool::new(true)).unwrap();
        assert!(report.aborted);
        assert_eq!(report.not_started, 1);
        assert!(!target.exists());
    }

    #[test]
    fn backup_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(backup_path(&dir.path().join("movie")), dir.path().join("movie_backup"));
    }

    #[test]
    fn default_workers_is_bounded() {
        let workers = default_workers();
        assert!((1..=MAX_DEFAULT_WORKERS).contains(&workers));
    }
}
