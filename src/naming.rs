//! Filename parsing for the `NN-name` wiki page convention.
//!
//! Wiki pages impose document order with a two-digit prefix, optionally
//! followed by a lowercase letter for insertions between existing pages:
//!
//! - `01-Introduction.md` → order (1, ""), title "Introduction"
//! - `02a-Advanced-Setup.md` → order (2, "a"), title "Advanced Setup"
//! - `FAQ.md` → unordered, title "FAQ"
//!
//! ## Display Titles
//!
//! Hyphens and underscores in the name portion become spaces, matching how
//! GitHub renders wiki page names:
//! - `03-Getting_Started` → "Getting Started"
//! - `release-notes` → "release notes"
//!
//! Unordered pages are not an error. They sort after every numbered page.

use serde::Serialize;
use std::cmp::Ordering;

/// Characters accepted between a numeric prefix and the page name.
///
/// Includes U+2010 HYPHEN, which shows up in wiki filenames pasted from
/// word processors.
const SEPARATORS: &[char] = &['-', '_', ' ', '\u{2010}'];

/// A leading `NN` or `NNa` ordering token.
#[derive(Debug, Clone, PartialEq)]
pub struct Prefix<'a> {
    pub number: u32,
    pub letter: Option<char>,
    /// Text after the token, separators not yet consumed.
    pub rest: &'a str,
}

/// Parse a two-digit prefix with an optional letter.
///
/// The token must end at a word boundary: end of input or a
/// non-alphanumeric character. `"001-x"` and `"01abc"` have no prefix.
pub fn parse_prefix(s: &str) -> Option<Prefix<'_>> {
    let s = s.trim_start();
    let mut chars = s.char_indices();
    let (_, d1) = chars.next()?;
    let (_, d2) = chars.next()?;
    if !d1.is_ascii_digit() || !d2.is_ascii_digit() {
        return None;
    }
    let number = d1.to_digit(10)? * 10 + d2.to_digit(10)?;

    let mut end = 2;
    let mut letter = None;
    if let Some((_, c)) = chars.next() {
        if c.is_ascii_alphabetic() {
            letter = Some(c.to_ascii_lowercase());
            end = 3;
            if let Some((_, after)) = chars.next()
                && after.is_alphanumeric()
            {
                return None;
            }
        } else if c.is_alphanumeric() {
            return None;
        }
    }

    Some(Prefix {
        number,
        letter,
        rest: &s[end..],
    })
}

/// Ordering key for a page: `(number, letter)`, or unordered.
///
/// Unordered keys compare greater than every numbered key. Callers break
/// remaining ties on the case-insensitive filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub number: Option<u32>,
    pub letter: String,
}

impl SortKey {
    pub fn unordered() -> Self {
        Self {
            number: None,
            letter: String::new(),
        }
    }

    /// Short display form: `02a`, or `--` for unordered pages.
    pub fn label(&self) -> String {
        match self.number {
            Some(n) => format!("{:02}{}", n, self.letter),
            None => "--".to_string(),
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.number, other.number) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.letter.cmp(&other.letter)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort key parsed from the original filename stem.
pub fn sort_key(stem: &str) -> SortKey {
    match parse_prefix(stem) {
        Some(p) => SortKey {
            number: Some(p.number),
            letter: p.letter.map(String::from).unwrap_or_default(),
        },
        None => SortKey::unordered(),
    }
}

/// Replace hyphens, underscores and U+2010 with spaces and trim.
pub fn separators_to_spaces(s: &str) -> String {
    s.chars()
        .map(|c| if SEPARATORS.contains(&c) { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Title derived from a filename stem alone.
///
/// A prefix is only stripped when a separator follows it, so a bare `"02"`
/// keeps its digits as the title.
pub fn fallback_title(stem: &str) -> String {
    match parse_prefix(stem) {
        Some(p) if p.rest.starts_with(SEPARATORS) => separators_to_spaces(p.rest),
        _ => separators_to_spaces(stem),
    }
}

/// Remove a leading ordering token from a page name or title.
///
/// - `"02 Setup Guide"` → `"Setup Guide"`
/// - `"02a-Advanced-Setup"` → `"Advanced-Setup"`
/// - `"001-Legacy"` → `"Legacy"` (digit-led names cut at the first hyphen)
/// - `"Setup"` → `"Setup"`
pub fn strip_numeric_prefix(s: &str) -> &str {
    let trimmed = s.trim_start();
    if let Some(p) = parse_prefix(trimmed)
        && p.rest.starts_with(SEPARATORS)
    {
        return p.rest.trim_start_matches(SEPARATORS);
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit())
        && let Some((_, after)) = trimmed.split_once('-')
    {
        return after.trim_start_matches([' ', '-', '\u{2010}']);
    }
    s
}
