//! Last check of planned tasks against the filesystem before execution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::tidy::planner::DEFAULT_MAX_PATH_LENGTH;
use crate::tidy::types::{InvalidTask, MoveTask};

#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_path_length: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PATH_LENGTH)
    }
}

impl Validator {
    #[must_use]
    pub const fn new(max_path_length: usize) -> Self {
        Self { max_path_length }
    }

    /// Split tasks into those that can run and those that cannot.
    ///
    /// Only the first valid task for a target is kept; later ones are rejected as duplicates.
    /// Nothing is left behind on disk.
    #[must_use]
    pub fn validate(&self, tasks: &[MoveTask]) -> (Vec<MoveTask>, Vec<InvalidTask>) {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut targets: HashSet<PathBuf> = HashSet::new();
        for task in tasks {
            match self.check(task) {
                Ok(()) if !targets.insert(task.target.clone()) => {
                    invalid.push(InvalidTask::new(task, "duplicate target"));
                }
                Ok(()) => valid.push(task.clone()),
                Err(reason) => invalid.push(InvalidTask::new(task, reason)),
            }
        }
        (valid, invalid)
    }

    /// Reason why the task cannot run, if any.
    ///
    /// # Errors
    /// Returns a human-readable reason for the first failed check.
    pub fn check(&self, task: &MoveTask) -> Result<(), String> {
        if !task.source.exists() {
            return Err("source does not exist".to_string());
        }
        if !task.source.is_file() {
            return Err("source is not a regular file".to_string());
        }
        if let Some(parent) = task.target.parent() {
            check_creatable(parent)?;
        }

        let source_length = crate::path_char_count(&task.source);
        if source_length > self.max_path_length {
            return Err(format!(
                "source path too long ({source_length} > {})",
                self.max_path_length
            ));
        }
        let target_length = crate::path_char_count(&task.target);
        if target_length > self.max_path_length {
            return Err(format!(
                "target path too long ({target_length} > {})",
                self.max_path_length
            ));
        }
        Ok(())
    }
}

/// The directory exists, or a file can be created in its nearest existing ancestor.
///
/// Writability is tested by creating a temporary file there, which is removed right away.
fn check_creatable(dir: &Path) -> Result<(), String> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    if dir.exists() {
        return if dir.is_dir() {
            Ok(())
        } else {
            Err(format!("target directory is a file: {}", dir.display()))
        };
    }

    let Some(ancestor) = dir.ancestors().skip(1).find(|path| path.exists()) else {
        return Err(format!("cannot create target directory: {}", dir.display()));
    };
    if !ancestor.is_dir() {
        return Err(format!(
            "cannot create target directory {} under {}",
            dir.display(),
            ancestor.display()
        ));
    }
    tempfile::tempfile_in(ancestor)
        .map(drop)
        .map_err(|error| format!("cannot create target directory {}: {error}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn task(source: PathBuf, target: PathBuf) -> MoveTask {
        MoveTask {
            source,
            target,
            size: 1,
            group_index: 0,
            file_index: 1,
            delete_source: false,
        }
    }

    #[test]
    fn valid_task_passes() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"x").unwrap();
        let target = dir.path().join("out").join("group").join("a.mp4");

        let (valid, invalid) = Validator::default().validate(&[task(source, target.clone())]);
        assert_eq!(valid.len(), 1);
        assert!(invalid.is_empty());
        assert!(!target.parent().unwrap().exists());
    }

    #[test]
    fn missing_source_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let (valid, invalid) =
            Validator::default().validate(&[task(dir.path().join("missing.mp4"), dir.path().join("out/missing.mp4"))]);
        assert!(valid.is_empty());
        assert_eq!(invalid[0].reason, "source does not exist");
    }

    #[test]
    fn directory_source_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let result = Validator::default().check(&task(dir.path().to_path_buf(), dir.path().join("out/x.mp4")));
        assert_eq!(result, Err("source is not a regular file".to_string()));
    }

    #[test]
    fn file_in_place_of_target_directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"x").unwrap();
        let blocker = dir.path().join("group");
        fs::write(&blocker, b"not a directory").unwrap();

        let result = Validator::default().check(&task(source, blocker.join("a.mp4")));
        assert!(result.unwrap_err().starts_with("target directory is a file"));
    }

    #[test]
    fn long_target_path_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"x").unwrap();
        let target = dir.path().join("x".repeat(40)).join("a.mp4");
        let limit = crate::path_char_count(&source) + 5;

        let result = Validator::new(limit).check(&task(source, target));
        assert!(result.unwrap_err().starts_with("target path too long"));
    }

    #[test]
    fn file_as_ancestor_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"x").unwrap();
        let blocker = dir.path().join("group");
        fs::write(&blocker, b"not a directory").unwrap();

        let result = Validator::default().check(&task(source, blocker.join("nested").join("a.mp4")));
        assert!(result.unwrap_err().starts_with("cannot create target directory"));
    }

    #[test]
    fn writability_check_leaves_ancestor_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.mp4");
        fs::write(&source, b"x").unwrap();

        let result = Validator::default().check(&task(source, dir.path().join("out").join("group").join("a.mp4")));
        assert_eq!(result, Ok(()));
        let names: Vec<PathBuf> = fs::read_dir(dir.path()).unwrap().map(|entry| entry.unwrap().path()).collect();
        assert_eq!(names, vec![dir.path().join("a.mp4")]);
    }

    #[test]
    fn duplicate_target_keeps_first_task() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.mp4");
        let second = dir.path().join("b.mp4");
        fs::write(&first, b"aaa").unwrap();
        fs::write(&second, b"bbbbbb").unwrap();
        let target = dir.path().join("out").join("x.mp4");

        let (valid, invalid) =
            Validator::default().validate(&[task(first.clone(), target.clone()), task(second.clone(), target)]);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].source, first);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].source, second);
        assert_eq!(invalid[0].reason, "duplicate target");
    }
}
