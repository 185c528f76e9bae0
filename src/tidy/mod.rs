//! Near-duplicate video detection and reorganization planning.
//!
//! Files from several directories are tokenized into keywords, grouped by a pairwise
//! similarity cascade, and planned into move tasks that gather each group in its own
//! folder under an output root. The task file is the handoff to the parallel executor.

mod blacklist;
mod executor;
mod grouping;
mod index;
mod pipeline;
mod planner;
mod report;
mod scan;
mod segment;
mod similarity;
mod task_file;
mod text;
mod types;
mod validate;

pub use blacklist::KeywordBlacklist;
pub use executor::{ExecutionReport, TaskFailure, TaskOutcome, backup_path, default_workers, execute_task, execute_tasks};
pub use grouping::{Anchoring, GroupingEngine, GroupingOptions};
pub use index::{InvertedIndex, NameProfile};
pub use pipeline::{PlanOptions, PlanReport, plan_directories};
pub use planner::{DEFAULT_MAX_PATH_LENGTH, PlanOutcome, TaskPlanner, folder_name, sanitize_folder_name};
pub use report::{export_report, render_report};
pub use scan::{ScanOutcome, VIDEO_EXTENSIONS, normalize_extensions, scan_directories};
pub use segment::{Segmenter, SegmenterOptions, Token, Tokenizer};
pub use similarity::{SimilarityParams, SimilarityScorer, Verdict};
pub use task_file::{SUMMARY_PREVIEW_LIMIT, Summary, TaskDetail, TaskFile};
pub use text::{clean_name, is_year_like};
pub use types::{Conflict, ConflictType, FileRecord, InvalidTask, MoveTask, SimilarGroup, Strategy};
pub use validate::Validator;
