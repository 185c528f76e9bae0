//! Turn similar groups into move tasks under an output root.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tidy::text::clean_name;
use crate::tidy::types::{Conflict, ConflictType, MoveTask, SimilarGroup, Strategy};

/// Windows `MAX_PATH`, applied on every platform so plans stay portable.
pub const DEFAULT_MAX_PATH_LENGTH: usize = 260;

/// Common prefixes must be longer than this to name a folder.
const MIN_PREFIX_LEN: usize = 3;
const FALLBACK_NAME_LEN: usize = 50;
const PLACEHOLDER_FOLDER_NAME: &str = "unnamed_folder";
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Planned moves and the candidates rejected while planning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    pub tasks: Vec<MoveTask>,
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone)]
pub struct TaskPlanner {
    output_root: PathBuf,
    strategy: Strategy,
    max_path_length: usize,
    delete_source: bool,
}

impl TaskPlanner {
    #[must_use]
    pub fn new(output_root: impl Into<PathBuf>, strategy: Strategy) -> Self {
        Self {
            output_root: output_root.into(),
            strategy,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            delete_source: false,
        }
    }

    #[must_use]
    pub const fn with_max_path_length(mut self, max_path_length: usize) -> Self {
        self.max_path_length = max_path_length;
        self
    }

    /// Mark every task to remove its source after copying.
    #[must_use]
    pub const fn with_delete_source(mut self, delete_source: bool) -> Self {
        self.delete_source = delete_source;
        self
    }

    /// Plan moves for all groups.
    ///
    /// Accepted tasks have pairwise distinct targets.
    #[must_use]
    pub fn plan(&self, groups: &[SimilarGroup]) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();
        let mut claimed_folders: HashSet<PathBuf> = HashSet::new();
        let mut planned_targets: HashSet<PathBuf> = HashSet::new();

        for (group_index, group) in groups.iter().enumerate() {
            let folder = self.unique_folder(&folder_name(group), &claimed_folders);
            claimed_folders.insert(folder.clone());

            let skip = match self.strategy {
                Strategy::KeepBest => 1,
                Strategy::MoveAll => 0,
            };
            for (file_index, file) in group.files.iter().enumerate().skip(skip) {
                let task = MoveTask {
                    source: file.path.clone(),
                    target: folder.join(&file.name),
                    size: file.size,
                    group_index,
                    file_index,
                    delete_source: self.delete_source,
                };
                match self.detect_conflict(&task, &planned_targets) {
                    Some(kind) => outcome.conflicts.push(Conflict::new(&task, kind)),
                    None => {
                        planned_targets.insert(task.target.clone());
                        outcome.tasks.push(task);
                    }
                }
            }
        }

        outcome
    }

    /// Check a candidate task against the filesystem and the tasks accepted so far.
    #[must_use]
    pub fn detect_conflict(&self, task: &MoveTask, planned_targets: &HashSet<PathBuf>) -> Option<ConflictType> {
        if let Ok(metadata) = fs::metadata(&task.target) {
            return Some(if metadata.len() == task.size {
                ConflictType::FileExistsSameSize
            } else {
                ConflictType::FileExistsDifferentSize
            });
        }
        if planned_targets.contains(&task.target) {
            return Some(ConflictType::TaskConflict);
        }
        if crate::path_char_count(&task.target) > self.max_path_length {
            return Some(ConflictType::PathTooLong);
        }
        None
    }

    /// Folder under the output root, suffixed with `_N` while taken.
    fn unique_folder(&self, name: &str, claimed: &HashSet<PathBuf>) -> PathBuf {
        let is_taken = |path: &Path| claimed.contains(path) || crate::is_non_empty_directory(path);

        let mut folder = self.output_root.join(name);
        let mut counter = 1;
        while is_taken(&folder) {
            folder = self.output_root.join(format!("{name}_{counter}"));
            counter += 1;
        }
        folder
    }
}

/// Folder name for a group.
///
/// Uses the common prefix of the cleaned stems when it is long enough,
/// otherwise the start of the first file's cleaned stem.
#[must_use]
pub fn folder_name(group: &SimilarGroup) -> String {
    let cleaned: Vec<String> = group.files.iter().map(|file| clean_name(file.stem())).collect();
    let prefix = common_prefix(&cleaned);
    let prefix = prefix.trim_end_matches(['-', '_', ' ']);

    let name = if prefix.chars().count() > MIN_PREFIX_LEN {
        prefix.to_string()
    } else {
        cleaned
            .first()
            .map(|name| name.chars().take(FALLBACK_NAME_LEN).collect())
            .unwrap_or_default()
    };
    sanitize_folder_name(&name)
}

/// Make a name safe to use as a directory on all major filesystems.
///
/// ```rust
/// use tidy_video::tidy::sanitize_folder_name;
///
/// assert_eq!(sanitize_folder_name("What If?: Part 1"), "What If__ Part 1");
/// assert_eq!(sanitize_folder_name("Movie.Title. "), "Movie.Title");
/// assert_eq!(sanitize_folder_name("..."), "unnamed_folder");
/// ```
#[must_use]
pub fn sanitize_folder_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '_' } else { c })
        .collect();
    let sanitized = sanitized.trim_end_matches(['.', ' ']);
    if sanitized.is_empty() {
        PLACEHOLDER_FOLDER_NAME.to_string()
    } else {
        sanitized.to_string()
    }
}

/// Longest common character prefix.
fn common_prefix(names: &[String]) -> String {
    let Some((first, rest)) = names.split_first() else {
        return String::new();
    };
    let mut length = first.chars().count();
    for name in rest {
        length = first
            .chars()
            .zip(name.chars())
            .take(length)
            .take_while(|(a, b)| a == b)
            .count();
    }
    first.chars().take(length).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tidy::types::FileRecord;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size)
    }

    fn group(files: &[(&str, u64)]) -> SimilarGroup {
        SimilarGroup::new(files.iter().map(|(path, size)| record(path, *size)).collect())
    }

    fn movie_group() -> SimilarGroup {
        group(&[
            ("/a/Movie.Title.2020.1080p.mp4", 500),
            ("/b/Movie.Title.2020.720p.mkv", 300),
        ])
    }

    #[test]
    fn folder_name_from_common_prefix() {
        assert_eq!(folder_name(&movie_group()), "Movie.Title.2020");
    }

    #[test]
    fn folder_name_strips_trailing_separators() {
        let group = group(&[("/a/Show - S01 - A.mp4", 2), ("/b/Show - S01 - B.mp4", 1)]);
        assert_eq!(folder_name(&group), "Show - S01");
    }

    #[test]
    fn short_prefix_falls_back_to_first_stem() {
        let group = group(&[("/a/Upgrade.2018.mp4", 2), ("/b/Up.mp4", 1)]);
        assert_eq!(folder_name(&group), "Upgrade.2018");

        let long_name = format!("/a/{}.mp4", "x".repeat(80));
        let group = SimilarGroup::new(vec![record(&long_name, 2), record("/b/y.mp4", 1)]);
        assert_eq!(folder_name(&group).chars().count(), FALLBACK_NAME_LEN);
    }

    #[test]
    fn fallback_uses_cleaned_stem() {
        let group = group(&[("/a/Upgrade: Reloaded?.mp4", 2), ("/b/Up.mp4", 1)]);
        assert_eq!(folder_name(&group), "Upgrade Reloaded");
    }

    #[test]
    fn sanitize_replaces_illegal_and_control_characters() {
        assert_eq!(sanitize_folder_name("a<b>c:d\"e/f\\g|h?i*j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_folder_name("tab\there\u{7}"), "tabhere");
        assert_eq!(sanitize_folder_name(" . "), "unnamed_folder");
        assert_eq!(sanitize_folder_name(""), "unnamed_folder");
    }

    #[test]
    fn keep_best_skips_largest_file() {
        let output = tempfile::tempdir().unwrap();
        let planner = TaskPlanner::new(output.path(), Strategy::KeepBest);
        let outcome = planner.plan(&[movie_group()]);

        assert!(outcome.conflicts.is_empty());
        assert_eq!(outcome.tasks.len(), 1);
        let task = &outcome.tasks[0];
        assert_eq!(task.source, PathBuf::from("/b/Movie.Title.2020.720p.mkv"));
        assert_eq!(
            task.target,
            output.path().join("Movie.Title.2020").join("Movie.Title.2020.720p.mkv")
        );
        assert_eq!((task.group_index, task.file_index, task.size), (0, 1, 300));
        assert!(!task.delete_source);
    }

    #[test]
    fn move_all_moves_every_file() {
        let output = tempfile::tempdir().unwrap();
        let planner = TaskPlanner::new(output.path(), Strategy::MoveAll).with_delete_source(true);
        let outcome = planner.plan(&[movie_group()]);
        assert_eq!(outcome.tasks.len(), 2);
        assert!(outcome.tasks.iter().all(|task| task.delete_source));
        assert_eq!(outcome.tasks[0].file_index, 0);
    }

    #[test]
    fn identical_names_keep_best_has_one_task() {
        let output = tempfile::tempdir().unwrap();
        let group = group(&[("/a/Same.Name.mp4", 100), ("/b/Same.Name.mp4", 100)]);
        let outcome = TaskPlanner::new(output.path(), Strategy::KeepBest).plan(&[group]);
        assert_eq!(outcome.tasks.len(), 1);
        assert_eq!(outcome.tasks[0].source, PathBuf::from("/b/Same.Name.mp4"));
        assert!(outcome.conflicts.is_empty());
    }

    #[test]
    fn identical_names_move_all_is_task_conflict() {
        let output = tempfile::tempdir().unwrap();
        let group = group(&[("/a/Same.Name.mp4", 100), ("/b/Same.Name.mp4", 100)]);
        let outcome = TaskPlanner::new(output.path(), Strategy::MoveAll).plan(&[group]);
        assert_eq!(outcome.tasks.len(), 1);
        assert_eq!(outcome.conflicts.len(), 1);
        assert_eq!(outcome.conflicts[0].kind, ConflictType::TaskConflict);
    }

    #[test]
    fn existing_target_with_different_size_is_conflict() {
        let output = tempfile::tempdir().unwrap();
        let folder = output.path().join("Movie.Title.2020");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("Movie.Title.2020.720p.mkv"), b"short").unwrap();

        let planner = TaskPlanner::new(output.path(), Strategy::KeepBest);
        let task = MoveTask {
            source: PathBuf::from("/b/Movie.Title.2020.720p.mkv"),
            target: folder.join("Movie.Title.2020.720p.mkv"),
            size: 300,
            group_index: 0,
            file_index: 1,
            delete_source: false,
        };
        assert_eq!(
            planner.detect_conflict(&task, &HashSet::new()),
            Some(ConflictType::FileExistsDifferentSize)
        );

        let same_size = MoveTask { size: 5, ..task };
        assert_eq!(
            planner.detect_conflict(&same_size, &HashSet::new()),
            Some(ConflictType::FileExistsSameSize)
        );
    }

    #[test]
    fn non_empty_folder_gets_suffix() {
        let output = tempfile::tempdir().unwrap();
        let taken = output.path().join("Movie.Title.2020");
        fs::create_dir_all(&taken).unwrap();
        fs::write(taken.join("other.mkv"), b"x").unwrap();
        fs::create_dir_all(output.path().join("Movie.Title.2020_1")).unwrap();

        let outcome = TaskPlanner::new(output.path(), Strategy::KeepBest).plan(&[movie_group()]);
        assert_eq!(outcome.tasks.len(), 1);
        assert!(outcome.tasks[0].target.starts_with(output.path().join("Movie.Title.2020_1")));
    }

    #[test]
    fn groups_with_same_name_get_distinct_folders() {
        let output = tempfile::tempdir().unwrap();
        let groups = [movie_group(), movie_group()];
        let outcome = TaskPlanner::new(output.path(), Strategy::MoveAll).plan(&groups);

        assert_eq!(outcome.tasks.len(), 4);
        let targets: HashSet<&PathBuf> = outcome.tasks.iter().map(|task| &task.target).collect();
        assert_eq!(targets.len(), outcome.tasks.len());
        assert!(outcome.tasks[2].target.starts_with(output.path().join("Movie.Title.2020_1")));
    }

    #[test]
    fn long_target_path_is_conflict() {
        let output = tempfile::tempdir().unwrap();
        let outcome = TaskPlanner::new(output.path(), Strategy::KeepBest)
            .with_max_path_length(20)
            .plan(&[movie_group()]);
        assert!(outcome.tasks.is_empty());
        assert_eq!(outcome.conflicts[0].kind, ConflictType::PathTooLong);
    }

    #[test]
    fn common_prefix_of_chars() {
        let names = ["流浪地球2".to_string(), "流浪地球".to_string()];
        assert_eq!(common_prefix(&names), "流浪地球");
        assert_eq!(common_prefix(&[]), "");
    }
}
