//! Rhyme seed selection.
//!
//! Picks the word a rhyme lookup should start from, given the bar being
//! edited and the caret position. The lookup itself lives outside this crate.

use crate::beats::{compute_beats, partition};
use crate::project::SECTION_TABLE;
use crate::syllables::SEPARATOR;

/// Last word of `text`, lowercased, with surrounding hyphens trimmed.
///
/// # Example
/// ```
/// use beatsheet::rhyme::last_word;
///
/// assert_eq!(last_word("Right NOW!"), "now");
/// assert_eq!(last_word("keep it -real-"), "real");
/// assert_eq!(last_word("?!"), "");
/// ```
pub fn last_word(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '\'' || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned
        .split_whitespace()
        .last()
        .map(|w| w.trim_matches('-').to_string())
        .unwrap_or_default()
}

/// Beat slot the caret sits in, counted by separators before it (0..=3).
///
/// `caret` is a character offset; offsets past the end clamp to the end.
pub fn caret_beat_index(text: &str, caret: usize) -> usize {
    text.chars()
        .take(caret)
        .filter(|c| *c == SEPARATOR)
        .count()
        .min(3)
}

/// Seed word for rhyme suggestions while editing `bars[index]` at `caret`.
///
/// Inside beat 2–4 this is the last word of the previous beat of the same bar.
/// In beat 1 it is the last word of the previous bar's last filled beat.
pub fn rhyme_seed<S: AsRef<str>>(bars: &[S], index: usize, caret: usize) -> String {
    let Some(text) = bars.get(index).map(AsRef::as_ref) else {
        return String::new();
    };

    let beat = caret_beat_index(text, caret);
    if beat > 0 {
        let beats = compute_beats(text);
        return last_word(&beats[beat - 1]);
    }

    index
        .checked_sub(1)
        .and_then(|prev| bars.get(prev))
        .map(|prev| partition(prev.as_ref()))
        .and_then(|groups| groups.last_filled().map(last_word))
        .unwrap_or_default()
}

/// Seed word while editing the full-text view.
///
/// Uses the last word of the nearest non-blank line above the caret's line,
/// skipping section headings.
pub fn full_text_seed(text: &str, caret: usize) -> String {
    let before: String = text.chars().take(caret).filter(|c| *c != '\r').collect();
    let mut lines: Vec<&str> = before.split('\n').collect();
    // the line holding the caret is still being typed
    lines.pop();

    lines
        .iter()
        .rev()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .find(|line| !is_heading(line))
        .map(last_word)
        .unwrap_or_default()
}

fn is_heading(line: &str) -> bool {
    SECTION_TABLE
        .iter()
        .any(|def| def.title.to_uppercase() == line.to_uppercase())
}
