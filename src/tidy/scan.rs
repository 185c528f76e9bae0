//! Collect video files from the scan roots.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::print_warning;
use crate::tidy::types::FileRecord;

/// Default video file extensions
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv", "flv", "webm", "m4v", "ts", "mpg"];

/// Scanned files and the roots that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub files: Vec<FileRecord>,
    pub skipped: Vec<PathBuf>,
}

/// Lower-case extensions without leading dots.
///
/// ```rust
/// use tidy_video::tidy::normalize_extensions;
///
/// assert_eq!(normalize_extensions([".MP4", "mkv", " "]), vec!["mp4", "mkv"]);
/// ```
pub fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

/// Recursively collect video files from all roots in a stable order.
///
/// Hidden files and directories are skipped. A path reachable from several roots is only listed once.
/// Missing or unreadable roots are reported in `skipped` with a warning.
#[must_use]
pub fn scan_directories(roots: &[PathBuf], extensions: &[String]) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for root in roots {
        if !root.is_dir() {
            print_warning!("Skipping missing directory: {}", root.display());
            outcome.skipped.push(root.clone());
            continue;
        }
        for file in collect_video_files(root, extensions) {
            if seen.insert(file.path.clone()) {
                outcome.files.push(file);
            }
        }
    }

    outcome
}

fn collect_video_files(root: &Path, extensions: &[String]) -> Vec<FileRecord> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !crate::is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(error) => {
                print_warning!("Skipping unreadable entry: {error}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| extensions.contains(&crate::path_to_file_extension_string(entry.path())))
        .filter_map(|entry| {
            let size = entry.metadata().ok()?.len();
            Some(FileRecord::new(entry.into_path(), size))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn video_extensions() -> Vec<String> {
        normalize_extensions(VIDEO_EXTENSIONS)
    }

    #[test]
    fn collects_only_video_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.mkv"), b"12345").unwrap();
        fs::write(dir.path().join("a.MP4"), b"1").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("sub").join("c.avi"), b"xy").unwrap();

        let outcome = scan_directories(&[dir.path().to_path_buf()], &video_extensions());
        let names: Vec<&str> = outcome.files.iter().map(|file| file.name.as_str()).collect();
        assert_eq!(names, vec!["a.MP4", "b.mkv", "c.avi"]);
        assert_eq!(outcome.files[1].size, 5);
        assert_eq!(outcome.files[2].directory, dir.path().join("sub"));
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn hidden_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join(".cache").join("a.mp4"), b"x").unwrap();
        fs::write(dir.path().join(".hidden.mp4"), b"x").unwrap();
        fs::write(dir.path().join("visible.mp4"), b"x").unwrap();

        let outcome = scan_directories(&[dir.path().to_path_buf()], &video_extensions());
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].name, "visible.mp4");
    }

    #[test]
    fn missing_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        let missing = dir.path().join("missing");

        let outcome = scan_directories(&[missing.clone(), dir.path().to_path_buf()], &video_extensions());
        assert_eq!(outcome.skipped, vec![missing]);
        assert_eq!(outcome.files.len(), 1);
    }

    #[test]
    fn overlapping_roots_list_files_once() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("a.mp4"), b"x").unwrap();

        let roots = vec![dir.path().to_path_buf(), dir.path().join("sub")];
        let outcome = scan_directories(&roots, &video_extensions());
        assert_eq!(outcome.files.len(), 1);
    }

    #[test]
    fn custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        fs::write(dir.path().join("b.rmvb"), b"x").unwrap();

        let outcome = scan_directories(&[dir.path().to_path_buf()], &normalize_extensions(["RMVB"]));
        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.files[0].name, "b.rmvb");
    }
}
