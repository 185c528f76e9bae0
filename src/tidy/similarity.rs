//! Pairwise "same title" decision between two video files.
//!
//! The decision is a cascade where the first matching rule wins:
//! same directory, name containment, shared long keywords,
//! keyword Jaccard for long names, and finally character Jaccard
//! with a threshold adjusted by file size and East Asian character overlap.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::tidy::blacklist::KeywordBlacklist;
use crate::tidy::index::NameProfile;
use crate::tidy::segment::Tokenizer;
use crate::tidy::text::{char_len, contains_cjk, is_cjk, is_year_like, strip_for_char_compare};
use crate::tidy::types::FileRecord;

/// Names whose lengths differ by less than this are compared for containment.
const CONTAINMENT_MAX_LENGTH_DIFF: usize = 5;
/// Minimum keyword length for the long keyword rule.
const LONG_KEYWORD_MIN_LEN: usize = 4;
/// A single shared keyword at least this long is enough.
const DECISIVE_KEYWORD_MIN_LEN: usize = 8;
/// Names longer than this are compared by keyword Jaccard.
const LONG_NAME_MIN_LEN: usize = 30;
const MIN_THRESHOLD: f64 = 0.35;
const MIN_CJK_THRESHOLD: f64 = 0.4;
const MAX_CJK_THRESHOLD: f64 = 0.8;

/// Tunable thresholds for the scorer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityParams {
    /// Base Jaccard threshold.
    pub threshold: f64,
    /// Average file size in bytes above which the threshold is relaxed.
    pub size_threshold: u64,
}

/// Outcome of comparing two files, naming the rule that decided it.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    SameDirectory,
    NameContained,
    LongKeyword(String),
    SharedKeywords { shared: usize, ratio: f64 },
    KeywordJaccard { ratio: f64, threshold: f64 },
    CharacterJaccard { ratio: f64, threshold: f64 },
    NoMatch { ratio: f64, threshold: f64 },
}

/// Decides whether two files are the same title.
pub struct SimilarityScorer<'a> {
    tokenizer: &'a Tokenizer,
    blacklist: &'a KeywordBlacklist,
    params: SimilarityParams,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            threshold: 0.55,
            size_threshold: 500 * 1024 * 1024,
        }
    }
}

impl Verdict {
    #[must_use]
    pub const fn is_match(&self) -> bool {
        !matches!(self, Self::SameDirectory | Self::NoMatch { .. })
    }
}

impl<'a> SimilarityScorer<'a> {
    #[must_use]
    pub const fn new(tokenizer: &'a Tokenizer, blacklist: &'a KeywordBlacklist, params: SimilarityParams) -> Self {
        Self {
            tokenizer,
            blacklist,
            params,
        }
    }

    #[must_use]
    pub const fn params(&self) -> SimilarityParams {
        self.params
    }

    #[must_use]
    pub const fn tokenizer(&self) -> &'a Tokenizer {
        self.tokenizer
    }

    #[must_use]
    pub const fn blacklist(&self) -> &'a KeywordBlacklist {
        self.blacklist
    }

    #[must_use]
    pub fn similar(&self, a: &FileRecord, b: &FileRecord) -> bool {
        self.explain(a, b).is_match()
    }

    /// Compare two files and report which rule decided.
    #[must_use]
    pub fn explain(&self, a: &FileRecord, b: &FileRecord) -> Verdict {
        if a.directory == b.directory {
            return Verdict::SameDirectory;
        }
        let profile_a = NameProfile::new(a, self.tokenizer);
        let profile_b = NameProfile::new(b, self.tokenizer);
        self.explain_profiles(a, &profile_a, b, &profile_b)
    }

    /// Compare two files using precomputed name profiles.
    #[must_use]
    pub fn explain_profiles(
        &self,
        a: &FileRecord,
        profile_a: &NameProfile,
        b: &FileRecord,
        profile_b: &NameProfile,
    ) -> Verdict {
        if a.directory == b.directory {
            return Verdict::SameDirectory;
        }

        if names_contained(&profile_a.cleaned, &profile_b.cleaned) {
            return Verdict::NameContained;
        }

        if let Some(verdict) = self.long_keyword_match(&profile_a.keywords, &profile_b.keywords) {
            return verdict;
        }

        if char_len(&profile_a.cleaned) > LONG_NAME_MIN_LEN || char_len(&profile_b.cleaned) > LONG_NAME_MIN_LEN {
            let ratio = jaccard(
                &self.title_keywords(&profile_a.keywords),
                &self.title_keywords(&profile_b.keywords),
            );
            let threshold = MIN_THRESHOLD.max(self.params.threshold - 0.1);
            if ratio >= threshold {
                return Verdict::KeywordJaccard { ratio, threshold };
            }
        }

        self.character_match(a.size, &profile_a.cleaned, b.size, &profile_b.cleaned)
    }

    /// Lower-cased keywords of at least four characters, without blacklisted or year-like ones.
    fn long_keywords(&self, keywords: &[String]) -> HashSet<String> {
        keywords
            .iter()
            .filter(|keyword| char_len(keyword) >= LONG_KEYWORD_MIN_LEN)
            .filter(|keyword| !self.blacklist.is_blacklisted(keyword) && !is_year_like(keyword))
            .map(|keyword| keyword.to_lowercase())
            .collect()
    }

    /// Lower-cased keywords without blacklisted or year-like ones.
    fn title_keywords(&self, keywords: &[String]) -> HashSet<String> {
        keywords
            .iter()
            .filter(|keyword| !self.blacklist.is_blacklisted(keyword) && !is_year_like(keyword))
            .map(|keyword| keyword.to_lowercase())
            .collect()
    }

    fn long_keyword_match(&self, keywords_a: &[String], keywords_b: &[String]) -> Option<Verdict> {
        let long_a = self.long_keywords(keywords_a);
        let long_b = self.long_keywords(keywords_b);
        if long_a.is_empty() || long_b.is_empty() {
            return None;
        }

        let mut shared: Vec<&String> = long_a.intersection(&long_b).collect();
        if shared.is_empty() {
            return None;
        }
        shared.sort_by(|x, y| char_len(y).cmp(&char_len(x)).then_with(|| x.cmp(y)));
        if let Some(keyword) = shared.first().filter(|keyword| char_len(keyword) >= DECISIVE_KEYWORD_MIN_LEN) {
            return Some(Verdict::LongKeyword((*keyword).clone()));
        }

        let ratio = jaccard(&long_a, &long_b);
        (shared.len() >= 2 || ratio >= 0.5).then_some(Verdict::SharedKeywords {
            shared: shared.len(),
            ratio,
        })
    }

    fn character_match(&self, size_a: u64, cleaned_a: &str, size_b: u64, cleaned_b: &str) -> Verdict {
        let stripped_a = strip_for_char_compare(cleaned_a);
        let stripped_b = strip_for_char_compare(cleaned_b);
        let chars_a: HashSet<char> = stripped_a.chars().collect();
        let chars_b: HashSet<char> = stripped_b.chars().collect();

        let mut threshold = self.params.threshold;
        if chars_a.union(&chars_b).next().is_none() {
            return Verdict::NoMatch { ratio: 0.0, threshold };
        }
        let ratio = jaccard(&chars_a, &chars_b);

        let average_size = size_a / 2 + size_b / 2 + (size_a % 2 + size_b % 2) / 2;
        if average_size > self.params.size_threshold {
            threshold = MIN_THRESHOLD.max(threshold - 0.15);
        }

        if contains_cjk(&stripped_a) && contains_cjk(&stripped_b) {
            let cjk_a: HashSet<char> = chars_a.iter().copied().filter(|&c| is_cjk(c)).collect();
            let cjk_b: HashSet<char> = chars_b.iter().copied().filter(|&c| is_cjk(c)).collect();
            let cjk_ratio = jaccard(&cjk_a, &cjk_b);
            let shared = cjk_a.intersection(&cjk_b).count();
            let union = cjk_a.union(&cjk_b).count();
            if cjk_ratio > 0.8 && shared >= 2 && threshold > MIN_CJK_THRESHOLD {
                threshold = MIN_CJK_THRESHOLD.max(threshold - 0.1);
            } else if cjk_ratio < 0.3 && union > 3 && threshold < MAX_CJK_THRESHOLD {
                threshold = MAX_CJK_THRESHOLD.min(threshold + 0.1);
            }
        }

        if ratio >= threshold {
            Verdict::CharacterJaccard { ratio, threshold }
        } else {
            Verdict::NoMatch { ratio, threshold }
        }
    }
}

/// Both names non-empty, close in length, and one contains the other.
fn names_contained(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    char_len(a).abs_diff(char_len(b)) < CONTAINMENT_MAX_LENGTH_DIFF && (a.contains(b) || b.contains(a))
}

/// Size of intersection divided by size of union, zero for two empty sets.
fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameDirectory => write!(f, "same directory"),
            Self::NameContained => write!(f, "name contained"),
            Self::LongKeyword(keyword) => write!(f, "long keyword \"{keyword}\""),
            Self::SharedKeywords { shared, ratio } => write!(f, "{shared} shared keywords ({ratio:.2})"),
            Self::KeywordJaccard { ratio, threshold } => write!(f, "keyword similarity {ratio:.2} >= {threshold:.2}"),
            Self::CharacterJaccard { ratio, threshold } => {
                write!(f, "character similarity {ratio:.2} >= {threshold:.2}")
            }
            Self::NoMatch { ratio, threshold } => write!(f, "no match ({ratio:.2} < {threshold:.2})"),
        }
    }
}
