use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use tidy_video::tidy::{ExecutionReport, ScanOutcome, SimilarGroup, TaskFile};

use crate::config::Config;

/// Run log with buffered writes.
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger.
    ///
    /// Writes to the given file, or to `~/logs/tidy-video/tidy_video_<timestamp>.log`.
    pub(crate) fn new(log_file: Option<&Path>) -> Result<Self> {
        let log_path = if let Some(path) = log_file {
            path.to_path_buf()
        } else {
            let log_dir = tidy_video::config::LOG_DIR
                .as_deref()
                .context("Failed to get home directory")?;
            log_dir.join(format!("tidy_video_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")))
        };

        if let Some(parent) = log_path.parent().filter(|parent| !parent.as_os_str().is_empty())
            && !parent.exists()
        {
            fs::create_dir_all(parent).context("Failed to create log directory")?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: log_path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the program
    pub(crate) fn log_init(&mut self, config: &Config) {
        if let Some(task_file) = &config.execute {
            let _ = writeln!(
                self.writer,
                "[{}] INIT execute \"{}\"",
                Self::timestamp(),
                task_file.display()
            );
        } else {
            let roots = config
                .roots
                .iter()
                .map(|path| format!("\"{}\"", path.display()))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(self.writer, "[{}] INIT scan {roots}", Self::timestamp());
            let _ = writeln!(self.writer, "  output: {}", config.output.display());
            let _ = writeln!(self.writer, "  tasks_file: {}", config.tasks_file.display());
            let _ = writeln!(self.writer, "  extensions: {:?}", config.plan.extensions);
            let _ = writeln!(self.writer, "  strategy: {}", config.plan.strategy);
            let _ = writeln!(self.writer, "  grouping: {}", config.plan.grouping.anchoring);
            let _ = writeln!(self.writer, "  exhaustive: {}", config.plan.grouping.exhaustive);
            let _ = writeln!(self.writer, "  threshold: {}", config.plan.similarity.threshold);
            let _ = writeln!(
                self.writer,
                "  size_threshold: {}",
                tidy_video::format_size(config.plan.similarity.size_threshold)
            );
            let _ = writeln!(self.writer, "  max_path_length: {}", config.plan.max_path_length);
            let _ = writeln!(self.writer, "  chinese: {}", config.segmenters.chinese);
            let _ = writeln!(self.writer, "  japanese: {}", config.segmenters.japanese);
            let _ = writeln!(self.writer, "  dryrun: {}", config.dryrun);
            let _ = writeln!(self.writer, "  run: {}", config.run);
        }
        let _ = writeln!(self.writer, "  delete_source: {}", config.plan.delete_source);
        let _ = writeln!(self.writer, "  workers: {}", config.workers);
        let _ = self.writer.flush();
    }

    pub(crate) fn log_scan(&mut self, scan: &ScanOutcome, engines: &[&str]) {
        let _ = writeln!(
            self.writer,
            "[{}] SCAN    {} files, {} skipped | engines: {}",
            Self::timestamp(),
            scan.files.len(),
            scan.skipped.len(),
            engines.join(", ")
        );
        for path in &scan.skipped {
            let _ = writeln!(self.writer, "  skipped: \"{}\"", path.display());
        }
        let _ = self.writer.flush();
    }

    pub(crate) fn log_groups(&mut self, groups: &[SimilarGroup]) {
        let _ = writeln!(self.writer, "[{}] GROUPS  {}", Self::timestamp(), groups.len());
        for (number, group) in groups.iter().enumerate() {
            let _ = writeln!(
                self.writer,
                "  #{} {} files, {}",
                number + 1,
                group.len(),
                tidy_video::format_size(group.total_size())
            );
            for file in &group.files {
                let _ = writeln!(self.writer, "    \"{}\"", file.path.display());
            }
        }
        let _ = self.writer.flush();
    }

    pub(crate) fn log_plan(&mut self, task_file: &TaskFile) {
        let summary = &task_file.summary;
        let _ = writeln!(
            self.writer,
            "[{}] PLAN    {} tasks, {} conflicts, {} invalid | {:.2} MB",
            Self::timestamp(),
            summary.total_tasks,
            summary.conflicts,
            summary.invalid_tasks,
            summary.estimated_size_mb
        );
        for conflict in &task_file.conflicts {
            let _ = writeln!(self.writer, "  conflict: {conflict}");
        }
        for invalid in &task_file.invalid_tasks {
            let _ = writeln!(self.writer, "  invalid: {invalid}");
        }
        let _ = self.writer.flush();
    }

    /// Log final execution statistics
    pub(crate) fn log_execution(&mut self, report: &ExecutionReport) {
        let _ = writeln!(self.writer, "[{}] EXECUTE", Self::timestamp());
        let _ = writeln!(self.writer, "  Total tasks:     {}", report.total);
        let _ = writeln!(self.writer, "  Moved:           {}", report.moved.len());
        let _ = writeln!(self.writer, "  Already present: {}", report.already_present);
        let _ = writeln!(self.writer, "  Backups:         {}", report.backups.len());
        let _ = writeln!(self.writer, "  Failed:          {}", report.failures.len());
        if report.not_started > 0 {
            let _ = writeln!(self.writer, "  Not started:     {}", report.not_started);
        }
        for failure in &report.failures {
            let _ = writeln!(
                self.writer,
                "  ERROR \"{}\" | {}",
                failure.source.display(),
                failure.error
            );
        }
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            tidy_video::format_duration(report.elapsed)
        );
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
