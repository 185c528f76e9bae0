//! Records passed between scanning, grouping, planning and execution.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A scanned video file.
///
/// Created once by the scanner and read-only afterwards.
/// The path is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// File name including extension.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Directory that directly contains the file.
    pub directory: PathBuf,
}

/// Files believed to be the same title, largest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarGroup {
    pub files: Vec<FileRecord>,
}

/// How files of a group are distributed to the group folder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Leave the largest file in place and move the rest
    #[default]
    KeepBest,
    /// Move every file of the group
    MoveAll,
}

/// A single planned file move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveTask {
    pub source: PathBuf,
    pub target: PathBuf,
    pub size: u64,
    pub group_index: usize,
    pub file_index: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delete_source: bool,
}

/// Why a planned move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    FileExistsSameSize,
    FileExistsDifferentSize,
    TaskConflict,
    PathTooLong,
}

/// A move task rejected during planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(rename = "type")]
    pub kind: ConflictType,
}

/// A move task rejected by validation, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidTask {
    pub source: PathBuf,
    pub target: PathBuf,
    pub reason: String,
}

impl FileRecord {
    /// Create a record with the name and directory derived from the path.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        let name = crate::path_to_filename_string(&path);
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path,
            name,
            size,
            directory,
        }
    }

    /// File name without the final extension.
    #[must_use]
    pub fn stem(&self) -> &str {
        match self.name.rfind('.') {
            Some(index) if index > 0 => &self.name[..index],
            _ => &self.name,
        }
    }
}

impl SimilarGroup {
    /// Create a group, ordering the files by descending size.
    ///
    /// Files with equal size keep their relative scan order.
    #[must_use]
    pub fn new(mut files: Vec<FileRecord>) -> Self {
        files.sort_by(|a, b| b.size.cmp(&a.size));
        Self { files }
    }

    /// The canonical file of the group.
    #[must_use]
    pub fn best(&self) -> Option<&FileRecord> {
        self.files.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|file| file.size).sum()
    }
}

impl Conflict {
    #[must_use]
    pub fn new(task: &MoveTask, kind: ConflictType) -> Self {
        Self {
            source: task.source.clone(),
            target: task.target.clone(),
            kind,
        }
    }
}

impl InvalidTask {
    #[must_use]
    pub fn new(task: &MoveTask, reason: impl Into<String>) -> Self {
        Self {
            source: task.source.clone(),
            target: task.target.clone(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepBest => write!(f, "keep_best"),
            Self::MoveAll => write!(f, "move_all"),
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileExistsSameSize => "file_exists_same_size",
            Self::FileExistsDifferentSize => "file_exists_different_size",
            Self::TaskConflict => "task_conflict",
            Self::PathTooLong => "path_too_long",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for MoveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.source.display(),
            self.target.display(),
            crate::format_size(self.size)
        )
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.source.display(), self.target.display(), self.kind)
    }
}

impl fmt::Display for InvalidTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.source.display(), self.target.display(), self.reason)
    }
}
