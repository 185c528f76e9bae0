//! Low-information keywords excluded from indexing and comparison.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::print_warning;

/// Case-insensitive set of ignored keywords.
///
/// Loaded once by the caller and passed by reference to the components that filter keywords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordBlacklist {
    keywords: HashSet<String>,
}

/// On-disk format: `{"keywords": ["mp4", "1080p", ...]}`
#[derive(Debug, Default, Deserialize)]
struct BlacklistFile {
    #[serde(default)]
    keywords: Vec<String>,
}

impl KeywordBlacklist {
    /// Create a blacklist from the given keywords.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().trim().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    /// Read the blacklist from a JSON file.
    ///
    /// Any failure degrades to an empty blacklist with a warning.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(blacklist) => blacklist,
            Err(error) => {
                print_warning!("Using an empty keyword blacklist: {error:#}");
                Self::default()
            }
        }
    }

    /// Read the blacklist from a JSON file, returning an error on failure.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn try_load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read keyword blacklist {}", path.display()))?;
        Self::from_json_str(&content).with_context(|| format!("Invalid keyword blacklist {}", path.display()))
    }

    /// Parse a blacklist from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let file: BlacklistFile = serde_json::from_str(json)?;
        Ok(Self::new(file.keywords))
    }

    /// Check if the keyword is ignored, regardless of case.
    #[must_use]
    pub fn is_blacklisted(&self, keyword: &str) -> bool {
        if self.keywords.is_empty() {
            return false;
        }
        self.keywords.contains(&keyword.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
