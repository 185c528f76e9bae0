//! Multi-script keyword extraction from cleaned filename stems.
//!
//! Latin words are taken first, then East Asian text is split by the first applicable
//! segmentation engine, falling back to longest-span extraction when no engine applies
//! or the engine fails. Whatever is left over becomes keywords as well.
//! Longer keywords win, and no character ends up in more than one keyword.

use std::panic::{self, AssertUnwindSafe};
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::print_warning;
use crate::tidy::text::{contains_han, contains_kana_or_hangul, is_cjk, is_han, is_pure_latin};

/// Maximal runs of ASCII letters
static RE_LATIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z]+").expect("Invalid latin regex"));

/// Characters that never belong to a keyword
const BOUNDARY_CHARS: &[char] = &['.', '_', '-', '[', ']', '(', ')', '{', '}'];

/// A keyword and the character span it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Start character index (inclusive).
    pub start: usize,
    /// End character index (exclusive).
    pub end: usize,
}

/// A word segmentation engine for one script family.
pub enum Segmenter {
    /// No dictionary engine, only pattern-based extraction.
    Regex,
    /// Dictionary-based Chinese segmentation.
    #[cfg(feature = "jieba")]
    Chinese(Box<jieba_rs::Jieba>),
    /// Japanese and Korean segmentation by script runs.
    Japanese,
}

/// Which segmentation engines to enable when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterOptions {
    pub chinese: bool,
    pub japanese: bool,
}

/// Splits text into keywords with the engines selected at startup.
pub struct Tokenizer {
    engines: Vec<Segmenter>,
}

/// Mutable state of a single segmentation call.
struct Claims {
    chars: Vec<char>,
    claimed: Vec<bool>,
    tokens: Vec<Token>,
}

/// Coarse script class used by the Japanese engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Han,
    Hiragana,
    Katakana,
    Hangul,
    Other,
}

impl Default for SegmenterOptions {
    fn default() -> Self {
        Self {
            chinese: true,
            japanese: true,
        }
    }
}

impl Segmenter {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            #[cfg(feature = "jieba")]
            Self::Chinese(_) => "chinese",
            Self::Japanese => "japanese",
        }
    }

    /// Whether this engine handles the given text.
    fn applies_to(&self, text: &str) -> bool {
        match self {
            Self::Regex => false,
            #[cfg(feature = "jieba")]
            Self::Chinese(_) => contains_han(text),
            Self::Japanese => contains_kana_or_hangul(text),
        }
    }

    /// Candidate words for the text in engine order.
    ///
    /// # Errors
    /// Returns an error if the engine fails on this input.
    fn candidates(&self, text: &str) -> anyhow::Result<Vec<String>> {
        match self {
            Self::Regex => Ok(Vec::new()),
            #[cfg(feature = "jieba")]
            Self::Chinese(jieba) => panic::catch_unwind(AssertUnwindSafe(|| {
                jieba
                    .cut_for_search(text, true)
                    .into_iter()
                    .chain(jieba.cut_all(text))
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            }))
            .map_err(|_| anyhow::anyhow!("Chinese segmentation panicked")),
            Self::Japanese => panic::catch_unwind(AssertUnwindSafe(|| script_runs(text)))
                .map_err(|_| anyhow::anyhow!("Japanese segmentation panicked")),
        }
    }
}

impl Tokenizer {
    /// Select the available engines.
    ///
    /// The Chinese engine is only available when built with the `jieba` feature.
    #[must_use]
    pub fn detect(options: SegmenterOptions) -> Self {
        let mut engines = Vec::new();
        #[cfg(feature = "jieba")]
        if options.chinese {
            engines.push(Segmenter::Chinese(Box::new(jieba_rs::Jieba::new())));
        }
        if options.japanese {
            engines.push(Segmenter::Japanese);
        }
        Self { engines }
    }

    /// Tokenizer without any segmentation engine.
    #[must_use]
    pub const fn regex_only() -> Self {
        Self { engines: Vec::new() }
    }

    /// Names of the enabled engines, always ending with the regex fallback.
    #[must_use]
    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines
            .iter()
            .map(Segmenter::name)
            .chain(std::iter::once(Segmenter::Regex.name()))
            .collect()
    }

    /// Split text into unique keywords in discovery order.
    ///
    /// ```rust
    /// use tidy_video::tidy::Tokenizer;
    ///
    /// let tokenizer = Tokenizer::regex_only();
    /// assert_eq!(
    ///     tokenizer.segment("Movie.Title.2020.1080p"),
    ///     vec!["Movie", "Title", "2020", "1080p"]
    /// );
    /// ```
    #[must_use]
    pub fn segment(&self, text: &str) -> Vec<String> {
        self.segment_spans(text)
            .into_iter()
            .map(|token| token.text)
            .unique()
            .collect()
    }

    /// Split text into keywords with their character spans.
    ///
    /// Spans never overlap. Repeated keywords are kept here so every span is visible.
    #[must_use]
    pub fn segment_spans(&self, text: &str) -> Vec<Token> {
        let mut claims = Claims::new(text);
        claims.claim_latin_words(text);

        match self.engines.iter().find(|engine| engine.applies_to(text)) {
            Some(engine) => match engine.candidates(text) {
                Ok(candidates) => claims.claim_candidates(candidates),
                Err(error) => {
                    print_warning!("{error}, using pattern extraction for: {text}");
                    claims.claim_longest_cjk_spans();
                }
            },
            None => claims.claim_longest_cjk_spans(),
        }

        claims.claim_remaining();
        claims.tokens
    }
}

impl Claims {
    fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let claimed = vec![false; chars.len()];
        Self {
            chars,
            claimed,
            tokens: Vec::new(),
        }
    }

    fn claim(&mut self, start: usize, end: usize) {
        for flag in &mut self.claimed[start..end] {
            *flag = true;
        }
        self.tokens.push(Token {
            text: self.chars[start..end].iter().collect(),
            start,
            end,
        });
    }

    fn is_free(&self, start: usize, end: usize) -> bool {
        (start..end).all(|index| !self.claimed[index] && !is_boundary(self.chars[index]))
    }

    /// Latin words of two or more letters.
    fn claim_latin_words(&mut self, text: &str) {
        let spans: Vec<(usize, usize)> = RE_LATIN
            .find_iter(text)
            .map(|m| {
                let start = text[..m.start()].chars().count();
                (start, start + m.as_str().chars().count())
            })
            .filter(|(start, end)| end - start > 1)
            .collect();

        for (start, end) in spans {
            self.claim(start, end);
        }
    }

    /// Accept engine candidates longest first where they fit without overlap.
    fn claim_candidates(&mut self, candidates: Vec<String>) {
        let candidates = candidates
            .into_iter()
            .unique()
            .filter(|word| word.chars().count() > 1 && !is_pure_latin(word))
            .sorted_by_key(|word| std::cmp::Reverse(word.chars().count()));

        for word in candidates {
            let word: Vec<char> = word.chars().collect();
            if let Some(start) = self.find_free_occurrence(&word) {
                self.claim(start, start + word.len());
            }
        }
    }

    fn find_free_occurrence(&self, word: &[char]) -> Option<usize> {
        if word.len() > self.chars.len() {
            return None;
        }
        (0..=self.chars.len() - word.len())
            .find(|&start| self.chars[start..start + word.len()] == *word && self.is_free(start, start + word.len()))
    }

    /// Longest free spans that contain at least one East Asian character.
    fn claim_longest_cjk_spans(&mut self) {
        let total = self.chars.len();
        for length in (2..=total).rev() {
            for start in 0..=total - length {
                let end = start + length;
                if self.claimed[start] || !self.chars[start..end].iter().any(|&c| is_cjk(c)) {
                    continue;
                }
                if self.is_free(start, end) {
                    self.claim(start, end);
                }
            }
        }
    }

    /// Everything not yet claimed, split at separators and whitespace.
    fn claim_remaining(&mut self) {
        let total = self.chars.len();
        let mut index = 0;
        while index < total {
            if self.claimed[index] || is_boundary(self.chars[index]) {
                index += 1;
                continue;
            }
            let start = index;
            while index < total && !self.claimed[index] && !is_boundary(self.chars[index]) {
                index += 1;
            }
            if index - start > 1 {
                self.claim(start, index);
            }
        }
    }
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || BOUNDARY_CHARS.contains(&c)
}

fn script_of(c: char) -> Script {
    match c {
        _ if is_han(c) => Script::Han,
        '\u{3040}'..='\u{309F}' => Script::Hiragana,
        '\u{30A0}'..='\u{30FF}' => Script::Katakana,
        '\u{3130}'..='\u{318F}' | '\u{AC00}'..='\u{D7AF}' => Script::Hangul,
        _ => Script::Other,
    }
}

/// Split Japanese or Korean text into runs of the same script.
///
/// A kanji run followed by two or more hiragana is also offered with up to two of them
/// attached, so inflected words like "戸締まり" stay whole while single particles do not.
fn script_runs(text: &str) -> Vec<String> {
    let runs: Vec<(Script, String)> = text
        .chars()
        .chunk_by(|&c| script_of(c))
        .into_iter()
        .map(|(script, chars)| (script, chars.collect::<String>()))
        .filter(|(script, _)| *script != Script::Other)
        .collect();

    let mut words = Vec::new();
    for (index, (script, run)) in runs.iter().enumerate() {
        words.push(run.clone());
        if *script == Script::Han
            && let Some((Script::Hiragana, next)) = runs.get(index + 1)
        {
            if next.chars().count() >= 2 {
                let okurigana: String = next.chars().take(2).collect();
                words.push(format!("{run}{okurigana}"));
            }
        }
    }
    words
}
