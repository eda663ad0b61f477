//! # Syllable Estimation
//!
//! Heuristic word → syllable counts used to balance a bar across its four beats.
//! The numbers only need to be proportionally sensible, not linguistically exact.
//!
//! ## Pipeline for one word
//! 1. Author override: `hello(3)` always counts as 3 (clamped to `1..=MAX_OVERRIDE`)
//! 2. Normalize: lowercase, keep only `a-z` and apostrophes ([`NormalizedWord`])
//! 3. Irregular table: contractions and slang (`wanna` → 2, `ain't` → 1)
//! 4. Numbers and words of three letters or fewer count as 1
//! 5. Vowel-group heuristic with silent-e, `-tion`/`-ious` and consonant + `le` corrections
//!
//! Any non-empty input counts at least 1; only the empty string counts 0.

use serde::Serialize;

/// Manual beat separator. A bar containing it is split literally.
pub const SEPARATOR: char = '/';

/// Ceiling for an author override, so line sums stay far from `u32::MAX`.
pub const MAX_OVERRIDE: u32 = 99;

/// Irregular counts that the vowel heuristic gets wrong.
const IRREGULAR: &[(&str, u32)] = &[
    ("im", 1),
    ("i'm", 1),
    ("ive", 1),
    ("i've", 1),
    ("ill", 1),
    ("i'll", 1),
    ("id", 1),
    ("i'd", 1),
    ("dont", 1),
    ("don't", 1),
    ("cant", 1),
    ("can't", 1),
    ("wont", 1),
    ("won't", 1),
    ("aint", 1),
    ("ain't", 1),
    ("yeah", 1),
    ("ya", 1),
    ("yup", 1),
    ("nah", 1),
    ("yall", 1),
    ("y'all", 1),
    ("bruh", 1),
    ("bro", 1),
    ("wanna", 2),
    ("gonna", 2),
    ("tryna", 2),
    ("lemme", 2),
    ("gotta", 2),
    ("kinda", 2),
    ("outta", 2),
    ("toyota", 3),
    ("hiphop", 2),
    ("gfunk", 2),
    ("gangsta", 2),
    ("birthday", 2),
];

/// A word reduced to lowercase ASCII letters and apostrophes.
///
/// All heuristics run over this form so they never see punctuation, digits
/// or case differences.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedWord(String);

impl NormalizedWord {
    pub fn new(raw: &str) -> Self {
        let normalized = raw
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_ascii_lowercase() || *c == '\'')
            .collect();
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Vowels for the silent-e and `le` checks. `y` is deliberately excluded here.
fn is_strict_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Vowels for counting syllable nuclei, `y` included.
pub(crate) fn is_nucleus_vowel(c: char) -> bool {
    matches!(
        c.to_ascii_lowercase(),
        'a' | 'e' | 'i' | 'o' | 'u' | 'y'
    )
}

/// Count maximal runs of nucleus vowels.
pub(crate) fn vowel_groups(text: &str) -> u32 {
    let mut groups = 0;
    let mut in_group = false;
    for c in text.chars() {
        let vowel = is_nucleus_vowel(c);
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }
    groups
}

/// Parse a trailing `(<digits>)` author override, e.g. `hello(3)`.
fn syllable_override(raw: &str) -> Option<u32> {
    let body = raw.trim_end().strip_suffix(')')?;
    let open = body.rfind('(')?;
    let digits = &body[open + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // An absurdly long digit run still means "many syllables".
    let forced = digits.parse::<u32>().unwrap_or(MAX_OVERRIDE);
    Some(forced.clamp(1, MAX_OVERRIDE))
}

fn lookup_irregular(word: &NormalizedWord) -> Option<u32> {
    IRREGULAR
        .iter()
        .find(|(w, _)| *w == word.as_str())
        .map(|(_, n)| *n)
}

/// `true` when `w` ends with a non-vowel followed by `le` ("table", "little").
fn ends_with_consonant_le(w: &[u8]) -> bool {
    w.len() >= 3 && w.ends_with(b"le") && !is_strict_vowel(w[w.len() - 3])
}

fn heuristic_count(word: &NormalizedWord) -> u32 {
    let mut w: Vec<u8> = word.as_str().bytes().filter(|b| *b != b'\'').collect();

    // Silent trailing e ("make" → "mak"), except for consonant + "le".
    if w.len() >= 2
        && w[w.len() - 1] == b'e'
        && !is_strict_vowel(w[w.len() - 2])
        && !ends_with_consonant_le(&w)
    {
        w.pop();
    }

    // Normalized words are pure ASCII.
    let text = String::from_utf8_lossy(&w);
    let mut count = vowel_groups(&text) as i64;

    if w.ends_with(b"tion") || w.ends_with(b"sion") || w.ends_with(b"cion") {
        count -= 1;
    }
    if w.ends_with(b"ious") || w.ends_with(b"eous") {
        count -= 1;
    }
    if ends_with_consonant_le(&w) {
        count += 1;
    }

    count.max(1) as u32
}

/// Estimate the syllable count of a single word.
///
/// # Example
/// ```
/// use beatsheet::syllables::estimate;
///
/// assert_eq!(estimate("hello(3)"), 3);
/// assert_eq!(estimate("wanna"), 2);
/// assert_eq!(estimate("beautiful"), 3);
/// assert_eq!(estimate(""), 0);
/// ```
pub fn estimate(word: &str) -> u32 {
    let raw = word.trim();
    if raw.is_empty() {
        return 0;
    }
    if let Some(forced) = syllable_override(raw) {
        return forced;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return 1;
    }

    let normalized = NormalizedWord::new(raw);
    if normalized.is_empty() {
        return 1;
    }
    if let Some(known) = lookup_irregular(&normalized) {
        return known;
    }
    if normalized.len() <= 3 {
        return 1;
    }
    heuristic_count(&normalized)
}

/// `true` for tokens that carry lyric content: at least one letter, digit or apostrophe.
///
/// Tokens like `-` or `...` are kept in the text but weigh nothing.
pub fn is_lyric_token(token: &str) -> bool {
    token.chars().any(|c| c.is_alphanumeric() || c == '\'')
}

/// Syllable weight of a whitespace-delimited token inside a line.
pub fn token_weight(token: &str) -> u32 {
    if is_lyric_token(token) {
        estimate(token)
    } else {
        0
    }
}

/// Split a line into whitespace tokens, treating manual separators as whitespace.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == SEPARATOR)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Total syllables in a line. Empty or symbol-only lines count 0.
pub fn count_line(line: &str) -> u32 {
    tokenize(line)
        .into_iter()
        .map(token_weight)
        .fold(0, u32::saturating_add)
}

/// How full a bar is, by syllable count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDensity {
    Empty,
    Sparse,
    Light,
    Balanced,
    Dense,
    Overloaded,
}

impl LineDensity {
    pub fn classify(count: u32) -> Self {
        match count {
            0 => LineDensity::Empty,
            1..=6 => LineDensity::Sparse,
            7..=9 => LineDensity::Light,
            10..=13 => LineDensity::Balanced,
            14..=16 => LineDensity::Dense,
            _ => LineDensity::Overloaded,
        }
    }

    pub fn of_line(line: &str) -> Self {
        Self::classify(count_line(line))
    }
}
