//! Configuration for `tidyvideo`.
//!
//! Handles reading configuration from CLI arguments and the user config file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use itertools::Itertools;
use serde::Deserialize;

use tidy_video::tidy::{
    Anchoring, DEFAULT_MAX_PATH_LENGTH, GroupingOptions, PlanOptions, SegmenterOptions, SimilarityParams, Strategy,
    VIDEO_EXTENSIONS, default_workers, normalize_extensions,
};

use crate::Args;

const DEFAULT_OUTPUT_DIR: &str = "organized_videos";
const DEFAULT_TASKS_FILE: &str = "move_tasks.json";
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Config from the user config file.
#[derive(Debug, Default, Deserialize)]
pub struct TidyConfig {
    #[serde(default)]
    pub(crate) default_paths: Vec<PathBuf>,
    #[serde(default)]
    pub(crate) paths: Vec<PathBuf>,
    output: Option<PathBuf>,
    tasks_file: Option<PathBuf>,
    blacklist: Option<PathBuf>,
    #[serde(default)]
    extensions: Vec<String>,
    strategy: Option<Strategy>,
    similarity_threshold: Option<f64>,
    size_threshold_mb: Option<u64>,
    max_path_length: Option<usize>,
    grouping: Option<Anchoring>,
    #[serde(default)]
    exhaustive: bool,
    chinese_segmentation: Option<bool>,
    japanese_segmentation: Option<bool>,
    #[serde(default)]
    dump_index: bool,
    #[serde(default)]
    delete_source: bool,
    workers: Option<usize>,
    #[serde(default)]
    dryrun: bool,
    #[serde(default)]
    verbose: bool,
}

/// Wrapper needed for parsing the config file section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    tidyvideo: TidyConfig,
}

/// Final config created from CLI arguments and user config file.
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) output: PathBuf,
    pub(crate) tasks_file: PathBuf,
    pub(crate) execute: Option<PathBuf>,
    pub(crate) blacklist: Option<PathBuf>,
    pub(crate) plan: PlanOptions,
    pub(crate) segmenters: SegmenterOptions,
    pub(crate) dump_index: bool,
    pub(crate) workers: usize,
    pub(crate) run: bool,
    pub(crate) dryrun: bool,
    pub(crate) log_file: Option<PathBuf>,
    pub(crate) report: Option<PathBuf>,
    pub(crate) verbose: bool,
}

impl TidyConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub(crate) fn get_user_config() -> Result<Self> {
        let Some(path) = tidy_video::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.tidyvideo)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {e}"))
    }
}

impl Config {
    /// Create config from given command line args and user config file.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed,
    /// or a value is out of range.
    pub fn from_args(args: Args) -> Result<Self> {
        let user_config = TidyConfig::get_user_config()?;
        Self::from_parts(args, user_config)
    }

    /// Merge CLI arguments over the user config. CLI values take priority.
    ///
    /// # Errors
    /// Returns an error if a value is out of range.
    pub fn from_parts(args: Args, user_config: TidyConfig) -> Result<Self> {
        // CLI paths take priority, then config file, then current directory
        let root_args = if args.default && !user_config.default_paths.is_empty() {
            &user_config.default_paths
        } else if !args.paths.is_empty() {
            &args.paths
        } else {
            &user_config.paths
        };
        let roots = if root_args.is_empty() {
            vec![tidy_video::resolve_path(Path::new(""))?]
        } else {
            root_args
                .iter()
                .map(|path| tidy_video::resolve_path(path))
                .collect::<Result<Vec<_>>>()?
        };

        let threshold = args
            .threshold
            .or(user_config.similarity_threshold)
            .unwrap_or(SimilarityParams::default().threshold);
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("Similarity threshold must be between 0 and 1, got {threshold}");
        }
        let size_threshold = args
            .size_threshold
            .or(user_config.size_threshold_mb)
            .map_or(SimilarityParams::default().size_threshold, |mb| mb.saturating_mul(BYTES_PER_MB));

        let max_path_length = args
            .max_path_length
            .or(user_config.max_path_length)
            .unwrap_or(DEFAULT_MAX_PATH_LENGTH);
        if max_path_length == 0 {
            anyhow::bail!("Maximum path length must be positive");
        }

        let workers = args.workers.or(user_config.workers).unwrap_or_else(default_workers);
        if workers == 0 {
            anyhow::bail!("Worker count must be positive");
        }

        // Combine extensions from config and CLI, with defaults if none specified
        let mut extensions: Vec<String> =
            normalize_extensions(user_config.extensions.into_iter().chain(args.extension)).into_iter().unique().collect();
        if extensions.is_empty() {
            extensions = normalize_extensions(VIDEO_EXTENSIONS);
        }

        let plan = PlanOptions {
            extensions,
            strategy: args.strategy.or(user_config.strategy).unwrap_or_default(),
            similarity: SimilarityParams {
                threshold,
                size_threshold,
            },
            grouping: GroupingOptions {
                anchoring: args.grouping.or(user_config.grouping).unwrap_or_default(),
                exhaustive: args.exhaustive || user_config.exhaustive,
                verbose: args.verbose || user_config.verbose,
            },
            max_path_length,
            delete_source: args.delete_source || user_config.delete_source,
            dump_index: None,
        };

        let segmenters = SegmenterOptions {
            chinese: !args.no_chinese && user_config.chinese_segmentation.unwrap_or(true),
            japanese: !args.no_japanese && user_config.japanese_segmentation.unwrap_or(true),
        };

        let output = tidy_video::resolve_path(
            &args
                .output
                .or(user_config.output)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        )?;

        Ok(Self {
            roots,
            output,
            tasks_file: args
                .tasks_file
                .or(user_config.tasks_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TASKS_FILE)),
            execute: args.execute,
            blacklist: args.blacklist.or(user_config.blacklist),
            plan,
            segmenters,
            dump_index: args.dump_index || user_config.dump_index,
            workers,
            run: args.run,
            dryrun: args.print || user_config.dryrun,
            log_file: args.log_file,
            report: args.report,
            verbose: args.verbose || user_config.verbose,
        })
    }
}
