//! Keyword to file lookup used to limit pairwise comparison to plausible candidates.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::ProgressIterator;

use crate::tidy::blacklist::KeywordBlacklist;
use crate::tidy::segment::Tokenizer;
use crate::tidy::text::{char_len, clean_name};
use crate::tidy::types::FileRecord;

/// Cleaned name and keywords of one file, computed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameProfile {
    /// Stem after cleaning.
    pub cleaned: String,
    /// Tokenizer output for the cleaned stem, unfiltered.
    pub keywords: Vec<String>,
}

/// Mapping from lower-cased keyword to the indices of the files that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    buckets: BTreeMap<String, Vec<usize>>,
}

impl NameProfile {
    #[must_use]
    pub fn new(file: &FileRecord, tokenizer: &Tokenizer) -> Self {
        let cleaned = clean_name(file.stem());
        let keywords = tokenizer.segment(&cleaned);
        Self { cleaned, keywords }
    }

    /// Profiles for all files in order.
    #[must_use]
    pub fn for_files(files: &[FileRecord], tokenizer: &Tokenizer) -> Vec<Self> {
        files
            .iter()
            .progress_with(crate::progress_bar(files.len() as u64))
            .map(|file| Self::new(file, tokenizer))
            .collect()
    }
}

impl InvertedIndex {
    /// Tokenize every file and index the surviving keywords.
    #[must_use]
    pub fn build(files: &[FileRecord], tokenizer: &Tokenizer, blacklist: &KeywordBlacklist) -> Self {
        Self::from_profiles(&NameProfile::for_files(files, tokenizer), blacklist)
    }

    /// Index precomputed profiles. Profile `i` belongs to file index `i`.
    #[must_use]
    pub fn from_profiles(profiles: &[NameProfile], blacklist: &KeywordBlacklist) -> Self {
        let mut buckets: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, profile) in profiles.iter().enumerate() {
            for keyword in &profile.keywords {
                if char_len(keyword) <= 1 || blacklist.is_blacklisted(keyword) {
                    continue;
                }
                let bucket = buckets.entry(keyword.to_lowercase()).or_default();
                if bucket.last() != Some(&index) {
                    bucket.push(index);
                }
            }
        }
        Self { buckets }
    }

    /// Indices of files that produced the keyword.
    #[must_use]
    pub fn files_for(&self, keyword: &str) -> &[usize] {
        self.buckets
            .get(&keyword.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Indices of all files sharing at least one indexed keyword, in ascending order.
    #[must_use]
    pub fn candidates_for(&self, keywords: &[String]) -> BTreeSet<usize> {
        keywords
            .iter()
            .flat_map(|keyword| self.files_for(keyword).iter().copied())
            .collect()
    }

    /// Number of distinct keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Iterate keywords with their file indices in keyword order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.buckets
            .iter()
            .map(|(keyword, indices)| (keyword.as_str(), indices.as_slice()))
    }

    /// Write the index as JSON with file paths to a new temporary file in `dir`.
    ///
    /// The file is kept after returning. Returns its path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn dump(&self, files: &[FileRecord], dir: &Path) -> anyhow::Result<PathBuf> {
        let snapshot: BTreeMap<&str, Vec<&Path>> = self
            .iter()
            .map(|(keyword, indices)| {
                let paths = indices
                    .iter()
                    .filter_map(|&index| files.get(index))
                    .map(|file| file.path.as_path())
                    .collect();
                (keyword, paths)
            })
            .collect();

        let mut file = tempfile::Builder::new()
            .prefix("inverted_index_")
            .suffix(".json")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create index dump in {}", dir.display()))?;
        serde_json::to_writer_pretty(&mut file, &snapshot).context("Failed to serialize inverted index")?;
        file.flush()?;

        let (_, path) = file.keep().context("Failed to keep index dump")?;
        Ok(path)
    }
}
