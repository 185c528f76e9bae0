//! Scan, group, plan and validate in one call.

use std::path::{Path, PathBuf};

use crate::print_warning;
use crate::tidy::blacklist::KeywordBlacklist;
use crate::tidy::grouping::{GroupingEngine, GroupingOptions};
use crate::tidy::index::{InvertedIndex, NameProfile};
use crate::tidy::planner::{DEFAULT_MAX_PATH_LENGTH, TaskPlanner};
use crate::tidy::scan::{ScanOutcome, VIDEO_EXTENSIONS, normalize_extensions, scan_directories};
use crate::tidy::segment::Tokenizer;
use crate::tidy::similarity::{SimilarityParams, SimilarityScorer};
use crate::tidy::task_file::TaskFile;
use crate::tidy::types::{SimilarGroup, Strategy};
use crate::tidy::validate::Validator;

/// Everything that shapes a plan apart from the inputs.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub extensions: Vec<String>,
    pub strategy: Strategy,
    pub similarity: SimilarityParams,
    pub grouping: GroupingOptions,
    pub max_path_length: usize,
    pub delete_source: bool,
    /// Write the inverted index to a temporary JSON file in this directory.
    pub dump_index: Option<PathBuf>,
}

/// Intermediate results and the final task file.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub scan: ScanOutcome,
    pub groups: Vec<SimilarGroup>,
    pub index_dump: Option<PathBuf>,
    pub task_file: TaskFile,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            extensions: normalize_extensions(VIDEO_EXTENSIONS),
            strategy: Strategy::default(),
            similarity: SimilarityParams::default(),
            grouping: GroupingOptions::default(),
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            delete_source: false,
            dump_index: None,
        }
    }
}

/// Produce the task file for the given scan roots and output root.
///
/// Nothing is created or moved; the only optional side effect is the index dump.
#[must_use]
pub fn plan_directories(
    roots: &[PathBuf],
    output_root: &Path,
    tokenizer: &Tokenizer,
    blacklist: &KeywordBlacklist,
    options: &PlanOptions,
) -> PlanReport {
    let scan = scan_directories(roots, &options.extensions);
    let files = &scan.files;

    let profiles = NameProfile::for_files(files, tokenizer);
    let index = InvertedIndex::from_profiles(&profiles, blacklist);
    let index_dump = options
        .dump_index
        .as_deref()
        .and_then(|dir| match index.dump(files, dir) {
            Ok(path) => Some(path),
            Err(error) => {
                print_warning!("Failed to dump inverted index: {error:#}");
                None
            }
        });

    let scorer = SimilarityScorer::new(tokenizer, blacklist, options.similarity);
    let groups = GroupingEngine::new(&scorer, options.grouping).group_indexed(files, &profiles, &index);

    let outcome = TaskPlanner::new(output_root, options.strategy)
        .with_max_path_length(options.max_path_length)
        .with_delete_source(options.delete_source)
        .plan(&groups);
    let (valid, invalid) = Validator::new(options.max_path_length).validate(&outcome.tasks);

    PlanReport {
        scan,
        groups,
        index_dump,
        task_file: TaskFile::new(valid, outcome.conflicts, invalid),
    }
}
