mod config;
mod logger;
mod organize;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use tidy_video::tidy::{Anchoring, Strategy};

use crate::organize::Organizer;

#[derive(Parser)]
#[command(
    author,
    version,
    name = env!("CARGO_BIN_NAME"),
    about = "Find near-duplicate videos across directories and gather each title into its own folder"
)]
struct Args {
    /// Input directories to scan
    #[arg(value_hint = clap::ValueHint::DirPath)]
    paths: Vec<PathBuf>,

    /// Output directory for the grouped files
    #[arg(short = 'o', long, value_hint = clap::ValueHint::DirPath)]
    output: Option<PathBuf>,

    /// Task file to write when planning
    #[arg(short = 't', long = "tasks", value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    tasks_file: Option<PathBuf>,

    /// Execute an existing task file instead of scanning
    #[arg(short = 'e', long, value_name = "FILE", conflicts_with_all = ["paths", "run", "default"])]
    execute: Option<PathBuf>,

    /// Execute the tasks right after planning
    #[arg(short = 'x', long)]
    run: bool,

    /// Only print the plan without writing anything
    #[arg(short = 'p', long)]
    print: bool,

    /// Which files of a group to move
    #[arg(short = 's', long, value_enum)]
    strategy: Option<Strategy>,

    /// Which group members recruit further files
    #[arg(short = 'g', long, value_enum)]
    grouping: Option<Anchoring>,

    /// Compare every file pair instead of keyword candidates only
    #[arg(short = 'a', long)]
    exhaustive: bool,

    /// Keyword blacklist JSON file
    #[arg(short = 'b', long, value_hint = clap::ValueHint::FilePath)]
    blacklist: Option<PathBuf>,

    /// File extensions to include
    #[arg(short = 'E', long = "extension", num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extension: Vec<String>,

    /// Base similarity threshold between 0 and 1
    #[arg(short = 'm', long, value_name = "RATIO")]
    threshold: Option<f64>,

    /// Average size in MB above which matching is relaxed
    #[arg(long, value_name = "MB")]
    size_threshold: Option<u64>,

    /// Maximum path length for targets
    #[arg(long, value_name = "CHARS")]
    max_path_length: Option<usize>,

    /// Delete source files after copying
    #[arg(short = 'D', long)]
    delete_source: bool,

    /// Number of parallel workers for execution
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Disable dictionary-based Chinese segmentation
    #[arg(long)]
    no_chinese: bool,

    /// Disable Japanese segmentation
    #[arg(long)]
    no_japanese: bool,

    /// Write the keyword index to a JSON file for inspection
    #[arg(long)]
    dump_index: bool,

    /// Log file path instead of the default log directory
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    log_file: Option<PathBuf>,

    /// Write a text report after execution
    #[arg(short = 'r', long, value_hint = clap::ValueHint::FilePath)]
    report: Option<PathBuf>,

    /// Use default paths from config file
    #[arg(short = 'd', long)]
    default: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(ref shell) = args.completion {
        tidy_video::generate_shell_completion(*shell, Args::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        Organizer::new(args)?.run()
    }
}
