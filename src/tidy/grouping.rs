//! Cluster scanned files into groups of the same title.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::tidy::index::{InvertedIndex, NameProfile};
use crate::tidy::similarity::SimilarityScorer;
use crate::tidy::types::{FileRecord, SimilarGroup};

/// Which group members are compared against the remaining files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchoring {
    /// Only the first file of the group
    #[default]
    Seed,
    /// Every file that joins the group
    Transitive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingOptions {
    pub anchoring: Anchoring,
    /// Compare against all unprocessed files instead of index candidates only.
    pub exhaustive: bool,
    /// Print every match with the rule that decided it.
    pub verbose: bool,
}

pub struct GroupingEngine<'a> {
    scorer: &'a SimilarityScorer<'a>,
    options: GroupingOptions,
}

impl<'a> GroupingEngine<'a> {
    #[must_use]
    pub const fn new(scorer: &'a SimilarityScorer<'a>, options: GroupingOptions) -> Self {
        Self { scorer, options }
    }

    /// Tokenize, index and group the files.
    #[must_use]
    pub fn group(&self, files: &[FileRecord]) -> Vec<SimilarGroup> {
        let profiles = NameProfile::for_files(files, self.scorer.tokenizer());
        let index = InvertedIndex::from_profiles(&profiles, self.scorer.blacklist());
        self.group_indexed(files, &profiles, &index)
    }

    /// Group files with precomputed profiles and index.
    ///
    /// Files are visited in the given order and each unprocessed file seeds a new group.
    /// Groups with a single file are dropped, and no file is in more than one group.
    #[must_use]
    pub fn group_indexed(
        &self,
        files: &[FileRecord],
        profiles: &[NameProfile],
        index: &InvertedIndex,
    ) -> Vec<SimilarGroup> {
        let mut processed = vec![false; files.len()];
        let mut groups = Vec::new();

        for seed in 0..files.len() {
            if processed[seed] {
                continue;
            }
            processed[seed] = true;

            let mut members = vec![seed];
            let mut next_anchor = 0;
            while let Some(&anchor) = members.get(next_anchor) {
                next_anchor += 1;
                for candidate in self.candidates(anchor, files.len(), profiles, index) {
                    if processed[candidate] {
                        continue;
                    }
                    let verdict = self.scorer.explain_profiles(
                        &files[anchor],
                        &profiles[anchor],
                        &files[candidate],
                        &profiles[candidate],
                    );
                    if verdict.is_match() {
                        if self.options.verbose {
                            println!("  {} ~ {}: {verdict}", files[anchor].name, files[candidate].name);
                        }
                        processed[candidate] = true;
                        members.push(candidate);
                    }
                }
                if self.options.anchoring == Anchoring::Seed {
                    break;
                }
            }

            if members.len() > 1 {
                groups.push(SimilarGroup::new(members.iter().map(|&i| files[i].clone()).collect()));
            }
        }

        groups
    }

    fn candidates(&self, anchor: usize, total: usize, profiles: &[NameProfile], index: &InvertedIndex) -> Vec<usize> {
        if self.options.exhaustive {
            (0..total).collect()
        } else {
            index
                .candidates_for(&profiles[anchor].keywords)
                .into_iter()
                .filter(|&candidate| candidate < total)
                .collect()
        }
    }
}

impl fmt::Display for Anchoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seed => write!(f, "seed"),
            Self::Transitive => write!(f, "transitive"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::path::PathBuf;

    use crate::tidy::blacklist::KeywordBlacklist;
    use crate::tidy::segment::Tokenizer;
    use crate::tidy::similarity::SimilarityParams;

    const MB: u64 = 1024 * 1024;

    fn record(path: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size)
    }

    fn run(files: &[FileRecord], options: GroupingOptions) -> Vec<SimilarGroup> {
        let tokenizer = Tokenizer::regex_only();
        let blacklist = KeywordBlacklist::new(["1080p", "720p", "480p"]);
        let scorer = SimilarityScorer::new(&tokenizer, &blacklist, SimilarityParams::default());
        GroupingEngine::new(&scorer, options).group(files)
    }

    fn names(group: &SimilarGroup) -> Vec<&str> {
        group.files.iter().map(|file| file.name.as_str()).collect()
    }

    fn chain() -> Vec<FileRecord> {
        vec![
            record("/a/abc def.mp4", 10),
            record("/b/abc def ghi.mp4", 30),
            record("/c/def ghi.mp4", 20),
        ]
    }

    #[test]
    fn resolution_variants_form_one_group_largest_first() {
        let files = vec![
            record("/b/Movie.Title.2020.720p.mkv", 300 * MB),
            record("/a/Movie.Title.2020.1080p.mp4", 500 * MB),
        ];
        let groups = run(&files, GroupingOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(
            names(&groups[0]),
            vec!["Movie.Title.2020.1080p.mp4", "Movie.Title.2020.720p.mkv"]
        );
    }

    #[test]
    fn singletons_are_dropped() {
        let files = vec![record("/a/Alpha.mp4", 1), record("/b/Omega.mp4", 1)];
        assert!(run(&files, GroupingOptions::default()).is_empty());
    }

    #[test]
    fn same_directory_files_are_not_grouped() {
        let files = vec![
            record("/a/Movie.Title.2020.1080p.mp4", 2),
            record("/a/Movie.Title.2020.720p.mp4", 1),
        ];
        assert!(run(&files, GroupingOptions::default()).is_empty());
    }

    #[test]
    fn groups_partition_files() {
        let files = vec![
            record("/a/Movie.Title.2020.1080p.mp4", 5),
            record("/b/Movie.Title.2020.720p.mkv", 3),
            record("/c/Movie.Title.2020.480p.avi", 1),
            record("/a/Other.Show.S01E01.mp4", 4),
            record("/b/Other.Show.S01E01.mkv", 2),
            record("/c/Unrelated.mp4", 9),
        ];
        for anchoring in [Anchoring::Seed, Anchoring::Transitive] {
            let groups = run(
                &files,
                GroupingOptions {
                    anchoring,
                    ..GroupingOptions::default()
                },
            );
            assert_eq!(groups.len(), 2);
            let mut seen = HashSet::new();
            for group in &groups {
                assert!(group.len() >= 2);
                for file in &group.files {
                    assert!(seen.insert(file.path.clone()), "{} in two groups", file.name);
                }
            }
        }
    }

    #[test]
    fn seed_anchoring_only_compares_with_seed() {
        let groups = run(&chain(), GroupingOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["abc def ghi.mp4", "abc def.mp4"]);
    }

    #[test]
    fn transitive_anchoring_follows_chains() {
        let groups = run(
            &chain(),
            GroupingOptions {
                anchoring: Anchoring::Transitive,
                ..GroupingOptions::default()
            },
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["abc def ghi.mp4", "def ghi.mp4", "abc def.mp4"]);
    }

    #[test]
    fn exhaustive_finds_matches_without_shared_keywords() {
        let files = vec![record("/a/abcdefg.mp4", 1), record("/b/abcdefh.mp4", 1)];
        assert!(run(&files, GroupingOptions::default()).is_empty());

        let groups = run(
            &files,
            GroupingOptions {
                exhaustive: true,
                ..GroupingOptions::default()
            },
        );
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn empty_input_has_no_groups() {
        assert!(run(&[], GroupingOptions::default()).is_empty());
    }
}
