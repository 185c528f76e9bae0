use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use colored::Colorize;

use tidy_video::tidy::{
    ExecutionReport, KeywordBlacklist, PlanOptions, PlanReport, SimilarGroup, TaskDetail, TaskFile, Tokenizer,
    Validator, export_report, plan_directories,
};
use tidy_video::{print_bold, print_error, print_warning};

use crate::Args;
use crate::config::Config;
use crate::logger::FileLogger;

/// Maximum number of groups printed in non-verbose mode.
const GROUP_PREVIEW_LIMIT: usize = 20;

pub struct Organizer {
    config: Config,
    logger: Option<RefCell<FileLogger>>,
}

impl Organizer {
    /// Create a new organizer from command line arguments.
    pub fn new(args: Args) -> Result<Self> {
        let config = Config::from_args(args)?;
        let logger = match FileLogger::new(config.log_file.as_deref()) {
            Ok(logger) => Some(RefCell::new(logger)),
            Err(error) => {
                print_warning!("Logging disabled: {error:#}");
                None
            }
        };
        Ok(Self { config, logger })
    }

    pub fn run(&self) -> Result<()> {
        self.log(|logger| logger.log_init(&self.config));
        if self.config.verbose
            && let Some(logger) = &self.logger
        {
            println!("Log file: {}", logger.borrow().path().display());
        }

        if let Some(task_path) = &self.config.execute {
            let task_file = self.load_tasks(task_path)?;
            return self.execute(&task_file);
        }

        let task_file = self.plan()?;
        if self.config.run && !self.config.dryrun {
            self.execute(&task_file)?;
        }
        Ok(())
    }

    /// Scan the roots, print the groups and write the task file.
    fn plan(&self) -> Result<TaskFile> {
        let tokenizer = Tokenizer::detect(self.config.segmenters);
        let blacklist = self.load_blacklist();

        if self.config.verbose {
            let paths_display = self
                .config
                .roots
                .iter()
                .map(|path| tidy_video::path_to_string(path))
                .collect::<Vec<_>>()
                .join(", ");
            println!("Scanning paths: {}", paths_display.magenta());
            println!("Output: {}", tidy_video::path_to_string(&self.config.output).magenta());
            println!("Extensions: {:?}", self.config.plan.extensions);
            println!("Segmentation: {}", tokenizer.engine_names().join(", "));
            println!("Blacklisted keywords: {}", blacklist.len());
        }

        let options = self.plan_options();
        let report = plan_directories(&self.config.roots, &self.config.output, &tokenizer, &blacklist, &options);

        self.log(|logger| {
            logger.log_scan(&report.scan, &tokenizer.engine_names());
            logger.log_groups(&report.groups);
            logger.log_plan(&report.task_file);
        });

        self.print_plan(&report);

        if self.config.dryrun {
            println!("{}", "Dryrun: task file not written".yellow());
        } else if !report.task_file.is_empty() {
            report.task_file.save(&self.config.tasks_file)?;
            println!("Task file: {}", tidy_video::path_to_string(&self.config.tasks_file).cyan());
        }

        Ok(report.task_file)
    }

    /// Read a task file and drop the tasks that can no longer run safely.
    fn load_tasks(&self, path: &Path) -> Result<TaskFile> {
        let loaded = TaskFile::load(path)?;
        print_bold!("Loaded {} tasks from {}", loaded.tasks.len(), path.display());

        let task_file = loaded.revalidate(&Validator::new(self.config.plan.max_path_length));
        self.log(|logger| logger.log_plan(&task_file));
        if !task_file.invalid_tasks.is_empty() {
            print_warning!("{} tasks rejected:", task_file.invalid_tasks.len());
            for invalid in &task_file.invalid_tasks {
                println!("  {invalid}");
            }
        }
        Ok(task_file)
    }

    /// Run the tasks in parallel until done or aborted.
    fn execute(&self, task_file: &TaskFile) -> Result<()> {
        if task_file.tasks.is_empty() {
            println!("No tasks to execute");
            return Ok(());
        }

        // Set up Ctrl+C handler for graceful abort
        let abort_flag = Arc::new(AtomicBool::new(false));
        let abort_flag_handler = Arc::clone(&abort_flag);

        ctrlc::set_handler(move || {
            if abort_flag_handler.load(Ordering::SeqCst) {
                // Second Ctrl+C - force exit
                std::process::exit(130);
            }
            println!("\n{}", "Received Ctrl+C, finishing running tasks...".yellow().bold());
            abort_flag_handler.store(true, Ordering::SeqCst);
        })
        .expect("Failed to set Ctrl+C handler");

        println!(
            "Executing {} tasks with {} workers",
            task_file.tasks.len(),
            self.config.workers
        );
        let report = tidy_video::tidy::execute_tasks(&task_file.tasks, self.config.workers, &abort_flag)?;
        self.log(|logger| logger.log_execution(&report));

        if report.aborted {
            println!("\n{}", "Aborted by user".bold().red());
        }
        print_execution_summary(&report);

        if let Some(path) = &self.config.report {
            export_report(&report, path)?;
            println!("Report: {}", tidy_video::path_to_string(path).cyan());
        }

        if !report.failures.is_empty() {
            anyhow::bail!("{} of {} tasks failed", report.failures.len(), report.total);
        }
        Ok(())
    }

    fn load_blacklist(&self) -> KeywordBlacklist {
        if let Some(path) = &self.config.blacklist {
            return KeywordBlacklist::load(path);
        }
        match tidy_video::config::BLACKLIST_PATH.as_deref() {
            Some(path) if path.exists() => KeywordBlacklist::load(path),
            _ => {
                if self.config.verbose {
                    print_warning!("No keyword blacklist found, keywords are not filtered");
                }
                KeywordBlacklist::default()
            }
        }
    }

    fn plan_options(&self) -> PlanOptions {
        let mut options = self.config.plan.clone();
        if self.config.dump_index {
            options.dump_index = Some(index_dump_dir(&self.config.output));
        }
        options
    }

    fn print_plan(&self, report: &PlanReport) {
        println!(
            "Found {} video files in {} directories",
            report.scan.files.len(),
            self.config.roots.len()
        );
        for path in &report.scan.skipped {
            print_warning!("Skipped: {}", path.display());
        }
        if let Some(path) = &report.index_dump {
            println!("Keyword index: {}", path.display());
        }

        if report.groups.is_empty() {
            println!("{}", "No similar videos found".green());
            return;
        }

        println!(
            "{}",
            format!("Found {} groups of similar videos:", report.groups.len())
                .yellow()
                .bold()
        );
        let limit = if self.config.verbose {
            report.groups.len()
        } else {
            GROUP_PREVIEW_LIMIT
        };
        for (number, group) in report.groups.iter().take(limit).enumerate() {
            print_group(number + 1, group);
        }
        if report.groups.len() > limit {
            println!("\n... and {} more groups", report.groups.len() - limit);
        }

        print_task_summary(&report.task_file);
    }

    fn log(&self, action: impl FnOnce(&mut FileLogger)) {
        if let Some(logger) = &self.logger {
            action(&mut logger.borrow_mut());
        }
    }
}

/// Output directory when it exists, otherwise the system temp directory.
fn index_dump_dir(output: &Path) -> PathBuf {
    if output.is_dir() {
        output.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

fn print_group(number: usize, group: &SimilarGroup) {
    println!(
        "\n{} {}",
        format!("#{number}").cyan(),
        format!("{} files, {}", group.len(), tidy_video::format_size(group.total_size())).dimmed()
    );
    for (index, file) in group.files.iter().enumerate() {
        let size = tidy_video::format_size(file.size);
        if index == 0 {
            println!("  {} ({size})", tidy_video::path_to_string(&file.path).green());
        } else {
            println!("  {} ({size})", tidy_video::path_to_string(&file.path));
        }
    }
}

fn print_task_summary(task_file: &TaskFile) {
    let summary = &task_file.summary;
    print_bold!(
        "\nPlanned {} tasks ({:.1} MB)",
        summary.total_tasks,
        summary.estimated_size_mb
    );
    for detail in &summary.task_details {
        match detail {
            TaskDetail::Task {
                source,
                target,
                size_mb,
            } => println!("  {} -> {} ({size_mb:.1} MB)", source.display(), target.display()),
            TaskDetail::Note { note } => println!("  {note}"),
        }
    }
    if !task_file.conflicts.is_empty() {
        print_warning!("{} conflicts:", task_file.conflicts.len());
        for conflict in &task_file.conflicts {
            println!("  {conflict}");
        }
    }
    if !task_file.invalid_tasks.is_empty() {
        print_warning!("{} invalid tasks:", task_file.invalid_tasks.len());
        for invalid in &task_file.invalid_tasks {
            println!("  {invalid}");
        }
    }
}

fn print_execution_summary(report: &ExecutionReport) {
    print_bold!("Execution finished in {}", tidy_video::format_duration(report.elapsed));
    println!("  Total:           {}", report.total);
    println!("  Moved:           {}", report.moved.len().to_string().green());
    println!("  Already present: {}", report.already_present);
    if !report.backups.is_empty() {
        println!("  Backed up:       {}", report.backups.len().to_string().yellow());
    }
    if report.not_started > 0 {
        println!("  Not started:     {}", report.not_started.to_string().yellow());
    }
    if !report.failures.is_empty() {
        println!("  Failed:          {}", report.failures.len().to_string().red());
        for failure in &report.failures {
            print_error!("{}: {}", failure.source.display(), failure.error);
        }
    }
}
