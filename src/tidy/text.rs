//! Filename cleaning and character script helpers shared by the tokenizer and scorer.

use std::sync::LazyLock;

use regex::Regex;

/// Characters outside the retained set: CJK ideographs, kana, Hangul, ASCII letters and digits,
/// a few separators and brackets, and whitespace.
static RE_DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Han}\u{3040}-\u{30FF}\u{3130}-\u{318F}\u{AC00}-\u{D7AF}a-zA-Z0-9\-_\[\](){}\s.]")
        .expect("Invalid disallowed characters regex")
});

/// Regex to match runs of whitespace
static RE_MULTI_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("Invalid spaces regex"));

/// Four digit numbers that look like a release year
static RE_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").expect("Invalid year regex"));

/// Separators removed before comparing character sets
const NAME_SEPARATORS: &[char] = &['.', '_', '-'];

/// Clean a filename stem for tokenizing and comparison.
///
/// ```rust
/// use tidy_video::tidy::clean_name;
///
/// assert_eq!(clean_name("  Movie.Title!!  2020 "), "Movie.Title 2020");
/// assert_eq!(clean_name("复仇者联盟4：终局之战"), "复仇者联盟4终局之战");
/// assert_eq!(clean_name("..hidden.name.."), "hidden.name");
/// ```
#[must_use]
pub fn clean_name(stem: &str) -> String {
    let cleaned = RE_DISALLOWED.replace_all(stem, "");
    let cleaned = RE_MULTI_SPACES.replace_all(&cleaned, " ");
    cleaned.trim().trim_matches('.').to_string()
}

/// CJK unified ideograph (Chinese characters, also used in Japanese kanji).
#[must_use]
pub const fn is_han(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{F900}'..='\u{FAFF}'
    )
}

/// Hiragana, katakana or Hangul.
#[must_use]
pub const fn is_kana_or_hangul(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}' |
        '\u{3130}'..='\u{318F}' |
        '\u{AC00}'..='\u{D7AF}'
    )
}

/// Any East Asian character the tokenizer treats as title material.
#[must_use]
pub const fn is_cjk(c: char) -> bool {
    is_han(c) || is_kana_or_hangul(c)
}

#[must_use]
pub fn contains_han(text: &str) -> bool {
    text.chars().any(is_han)
}

#[must_use]
pub fn contains_kana_or_hangul(text: &str) -> bool {
    text.chars().any(is_kana_or_hangul)
}

#[must_use]
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// True for a non-empty string of only ASCII letters.
#[must_use]
pub fn is_pure_latin(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphabetic())
}

/// A four digit token in the range 1900..=2100.
///
/// ```rust
/// use tidy_video::tidy::is_year_like;
///
/// assert!(is_year_like("2019"));
/// assert!(!is_year_like("1080"));
/// assert!(!is_year_like("20190"));
/// ```
#[must_use]
pub fn is_year_like(token: &str) -> bool {
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && token.parse::<u16>().is_ok_and(|year| (1900..=2100).contains(&year))
}

/// Remove year-like substrings, separators and whitespace, leaving the characters to compare.
#[must_use]
pub fn strip_for_char_compare(cleaned: &str) -> String {
    RE_YEAR
        .replace_all(cleaned, "")
        .chars()
        .filter(|c| !NAME_SEPARATORS.contains(c) && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Number of characters, which is what all length rules count.
#[must_use]
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_removes_special_characters() {
        assert_eq!(clean_name("Movie: The Title?"), "Movie The Title");
        assert_eq!(clean_name("Another.Movie.(2022)[1080p][WebRip]"), "Another.Movie.(2022)[1080p][WebRip]");
        assert_eq!(clean_name("Series.S01E05.720p.HDTV.x265"), "Series.S01E05.720p.HDTV.x265");
    }

    #[test]
    fn clean_name_collapses_whitespace() {
        assert_eq!(clean_name("a    b \t c"), "a b c");
        assert_eq!(clean_name("   padded   "), "padded");
    }

    #[test]
    fn clean_name_trims_dots() {
        assert_eq!(clean_name(".leading"), "leading");
        assert_eq!(clean_name("trailing..."), "trailing");
        assert_eq!(clean_name("..."), "");
    }

    #[test]
    fn clean_name_keeps_japanese_and_korean() {
        assert_eq!(clean_name("鬼滅の刃 第一話"), "鬼滅の刃 第一話");
        assert_eq!(clean_name("기생충.2019"), "기생충.2019");
    }

    #[test]
    fn script_detection() {
        assert!(contains_han("流浪地球"));
        assert!(!contains_han("すずめ"));
        assert!(contains_kana_or_hangul("すずめ"));
        assert!(contains_kana_or_hangul("기생충"));
        assert!(!contains_cjk("Movie.Title"));
    }

    #[test]
    fn pure_latin_detection() {
        assert!(is_pure_latin("Avengers"));
        assert!(!is_pure_latin("x264"));
        assert!(!is_pure_latin("流浪"));
        assert!(!is_pure_latin(""));
    }

    #[test]
    fn year_like_bounds() {
        assert!(is_year_like("1900"));
        assert!(is_year_like("2100"));
        assert!(!is_year_like("1899"));
        assert!(!is_year_like("2101"));
        assert!(!is_year_like("720p"));
    }

    #[test]
    fn strip_for_char_compare_removes_years_and_separators() {
        assert_eq!(strip_for_char_compare("Movie.Title.2020.1080p"), "movietitle1080p");
        assert_eq!(strip_for_char_compare("流浪地球 2019-HD"), "流浪地球hd");
    }
}
