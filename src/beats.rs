//! # Beat Partitioning
//!
//! Splits one bar of lyric text into four beat groups.
//!
//! ## Manual mode
//! If the text contains [`SEPARATOR`] (`/`), it is split literally and the first
//! four trimmed parts are kept, padded with empty strings. Anything after a
//! fourth separator is not part of any beat, so no group ever holds a `/`.
//! Syllables are not consulted.
//!
//! ## Automatic mode
//! 1. Tokenize on whitespace and weigh each token with [`token_weight`]
//! 2. Build four targets summing to the total ([`build_targets`])
//! 3. Walk tokens left to right, filling the current group up to its target
//! 4. A word that overruns a group with two or more syllables of room is cut
//!    into phonetic chunks; the head stays, the tail opens the next group
//!
//! ### Capacity of one
//! When a word does not fit and the current group has exactly one syllable of
//! room left, the word is placed whole and the group overflows. The next word
//! then moves on to the following group. Splitting never produces a
//! one-syllable head from a longer word.
//!
//! ## Guarantees
//! - Concatenating the groups (ignoring whitespace) reproduces the input characters
//! - The per-group syllable sums add up to [`count_line`] of the input
//!
//! Both hold for automatic mode; manual mode drops the separators themselves.
//!
//! [`count_line`]: crate::syllables::count_line

use crate::syllables::{
    count_line, is_lyric_token, is_nucleus_vowel, token_weight, tokenize, vowel_groups,
    SEPARATOR,
};
use serde::{Deserialize, Serialize};

/// Number of beat slots in a bar.
pub const BEATS_PER_BAR: usize = 4;

/// A bar partitioned into four beat groups.
///
/// # Fields
/// - `beats`: The four text fragments, left to right
/// - `syllables`: Syllables credited to each fragment
/// - `manual`: Whether the split came from `/` separators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatGroups {
    pub beats: [String; BEATS_PER_BAR],
    pub syllables: [u32; BEATS_PER_BAR],
    pub manual: bool,
}

impl BeatGroups {
    pub fn total_syllables(&self) -> u32 {
        self.syllables.iter().fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    /// Non-empty groups joined with ` | `, as used by the split export.
    pub fn to_split_line(&self) -> String {
        self.beats
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// The last non-empty beat, scanning from beat 4 backwards.
    pub fn last_filled(&self) -> Option<&str> {
        self.beats.iter().rev().map(String::as_str).find(|b| !b.is_empty())
    }
}

/// Compute the four beat groups for a bar of text.
///
/// # Example
/// ```
/// use beatsheet::beats::compute_beats;
///
/// assert_eq!(
///     compute_beats("i wanna go home right now"),
///     ["i wanna", "go home", "right now", ""]
/// );
/// assert_eq!(compute_beats("one / two"), ["one", "two", "", ""]);
/// ```
pub fn compute_beats(text: &str) -> [String; BEATS_PER_BAR] {
    partition(text).beats
}

/// Partition a bar and report per-group syllable credit.
pub fn partition(text: &str) -> BeatGroups {
    if text.contains(SEPARATOR) {
        split_by_separator(text)
    } else {
        auto_split(text)
    }
}

/// Literal split on `/`, keeping the first four parts.
pub fn split_by_separator(text: &str) -> BeatGroups {
    let mut groups = BeatGroups {
        manual: true,
        ..Default::default()
    };
    for (slot, part) in text.split(SEPARATOR).take(BEATS_PER_BAR).enumerate() {
        let part = part.trim();
        groups.syllables[slot] = count_line(part);
        groups.beats[slot] = part.to_string();
    }
    groups
}

/// Per-group syllable targets for a bar with `total` syllables.
///
/// Evenly spread with the remainder going to the leftmost groups. Lines
/// under four syllables get one syllable per group so short bars do not
/// cluster in beat one.
pub fn build_targets(total: u32) -> [u32; BEATS_PER_BAR] {
    let mut targets = [0; BEATS_PER_BAR];
    if total < BEATS_PER_BAR as u32 {
        for target in targets.iter_mut().take(total as usize) {
            *target = 1;
        }
        return targets;
    }
    let base = total / BEATS_PER_BAR as u32;
    let rem = (total % BEATS_PER_BAR as u32) as usize;
    for (i, target) in targets.iter_mut().enumerate() {
        *target = base + u32::from(i < rem);
    }
    targets
}

/// Cut a word into phonetic chunks of alternating vowel and consonant runs.
///
/// Consonant runs of one or two characters join the chunk before them, and a
/// leading consonant run joins the first vowel chunk. Every character of the
/// input lands in exactly one chunk, punctuation included.
///
/// # Example
/// ```
/// use beatsheet::beats::phonetic_chunks;
///
/// assert_eq!(phonetic_chunks("everybody"), vec!["ev", "er", "yb", "od", "y"]);
/// assert_eq!(phonetic_chunks("fantastic"), vec!["fant", "ast", "ic"]);
/// ```
pub fn phonetic_chunks(word: &str) -> Vec<String> {
    let mut runs: Vec<(bool, String)> = Vec::new();
    for c in word.chars() {
        let vowel = is_nucleus_vowel(c);
        match runs.last_mut() {
            Some((is_vowel, run)) if *is_vowel == vowel => run.push(c),
            _ => runs.push((vowel, c.to_string())),
        }
    }

    let mut chunks: Vec<(bool, String)> = Vec::new();
    for (vowel, run) in runs {
        match chunks.last_mut() {
            Some((_, prev)) if !vowel && run.chars().count() <= 2 => prev.push_str(&run),
            _ => chunks.push((vowel, run)),
        }
    }

    if chunks.len() > 1 && !chunks[0].0 {
        let (_, lead) = chunks.remove(0);
        chunks[0].1.insert_str(0, &lead);
    }

    chunks.into_iter().map(|(_, chunk)| chunk).collect()
}

fn auto_split(text: &str) -> BeatGroups {
    let tokens = tokenize(text);
    if !tokens.iter().any(|t| is_lyric_token(t)) {
        return BeatGroups::default();
    }

    let weights: Vec<u32> = tokens.iter().map(|t| token_weight(t)).collect();
    let total = weights.iter().fold(0, |acc: u32, w| acc.saturating_add(*w));
    let targets = build_targets(total);

    let mut parts: [Vec<String>; BEATS_PER_BAR] = Default::default();
    let mut filled = [0u32; BEATS_PER_BAR];
    let mut g = 0;

    for (token, &weight) in tokens.iter().zip(&weights) {
        if weight == 0 {
            parts[g].push(token.to_string());
            continue;
        }

        while g < BEATS_PER_BAR - 1 && filled[g] >= targets[g] {
            g += 1;
        }
        let room = targets[g].saturating_sub(filled[g]);

        if weight <= room || g == BEATS_PER_BAR - 1 || room <= 1 {
            parts[g].push(token.to_string());
            filled[g] = filled[g].saturating_add(weight);
            continue;
        }

        let chunks = phonetic_chunks(token);
        let (head_len, head_vowels) = take_chunks(&chunks, room);
        if head_len == chunks.len() {
            parts[g].push(token.to_string());
            filled[g] = filled[g].saturating_add(weight);
            continue;
        }

        let head_credit = head_vowels.clamp(1, weight - 1);
        parts[g].push(chunks[..head_len].concat());
        filled[g] = filled[g].saturating_add(head_credit);

        g += 1;
        parts[g].push(chunks[head_len..].concat());
        filled[g] = filled[g].saturating_add(weight - head_credit);
    }

    BeatGroups {
        beats: parts.map(|p| p.join(" ").trim().to_string()),
        syllables: filled,
        manual: false,
    }
}

/// Greedily take leading chunks up to `room` vowel groups, at least one chunk.
fn take_chunks(chunks: &[String], room: u32) -> (usize, u32) {
    let mut taken = 0;
    let mut vowels = 0;
    for chunk in chunks {
        let c = vowel_groups(chunk);
        if taken > 0 && vowels + c > room {
            break;
        }
        taken += 1;
        vowels += c;
        if vowels >= room {
            break;
        }
    }
    (taken, vowels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syllables::MAX_OVERRIDE;

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn assert_lossless(text: &str) {
        let groups = partition(text);
        let joined: String = groups.beats.concat();
        assert_eq!(squash(&joined), squash(text), "characters lost for {text:?}");
        assert_eq!(groups.total_syllables(), count_line(text), "syllables drift for {text:?}");
    }

    #[test]
    fn test_manual_split_is_literal() {
        assert_eq!(
            compute_beats("everybody wanna / go / home"),
            ["everybody wanna", "go", "home", ""]
        );
        assert_eq!(compute_beats("/ / /"), ["", "", "", ""]);
        assert!(partition("a/b").manual);
    }

    #[test]
    fn test_manual_split_drops_parts_past_the_fourth() {
        assert_eq!(compute_beats("a/b/c/d/e"), ["a", "b", "c", "d"]);
        assert!(partition("a / b / c / d / e / f").beats.iter().all(|b| !b.contains('/')));
    }

    #[test]
    fn test_manual_split_counts_syllables() {
        let groups = partition("hello / i wanna");
        assert_eq!(groups.syllables, [2, 3, 0, 0]);
    }

    #[test]
    fn test_empty_and_symbol_only_lines() {
        assert_eq!(compute_beats(""), ["", "", "", ""]);
        assert_eq!(compute_beats("   "), ["", "", "", ""]);
        assert_eq!(compute_beats("... !!"), ["", "", "", ""]);
    }

    #[test]
    fn test_build_targets() {
        assert_eq!(build_targets(0), [0, 0, 0, 0]);
        assert_eq!(build_targets(2), [1, 1, 0, 0]);
        assert_eq!(build_targets(4), [1, 1, 1, 1]);
        assert_eq!(build_targets(7), [2, 2, 2, 1]);
        assert_eq!(build_targets(13), [4, 3, 3, 3]);
    }

    #[test]
    fn test_reference_line() {
        let groups = partition("i wanna go home right now");
        assert_eq!(groups.beats, ["i wanna", "go home", "right now", ""]);
        assert_eq!(groups.syllables, [3, 2, 2, 0]);
        assert!(!groups.manual);
    }

    #[test]
    fn test_short_line_spreads_one_per_group() {
        assert_eq!(compute_beats("go go go"), ["go", "go", "go", ""]);
    }

    #[test]
    fn test_capacity_of_one_places_whole_word() {
        // "my" fills 1 of 2; "celebration" (3) does not fit the single syllable left
        // and lands whole in beat one instead of being cut
        let groups = partition("my celebration starts right now");
        assert_eq!(groups.beats[0], "my celebration");
        assert_eq!(groups.syllables[0], 4);
        assert_lossless("my celebration starts right now");
    }

    #[test]
    fn test_long_word_is_split_across_groups() {
        let groups = partition("everybody knows");
        assert_eq!(groups.beats, ["ever", "ybody", "knows", ""]);
        assert_eq!(groups.syllables, [2, 3, 1, 0]);
    }

    #[test]
    fn test_even_line_fills_every_group() {
        let groups = partition("go go go go go go go go");
        assert_eq!(groups.beats, ["go go", "go go", "go go", "go go"]);
    }

    #[test]
    fn test_split_tail_can_open_last_group() {
        let groups = partition("hello hello hello beautiful");
        assert_eq!(groups.beats, ["hello hello", "hello", "beautif", "ul"]);
        assert_eq!(groups.syllables, [4, 2, 2, 1]);
    }

    #[test]
    fn test_punctuation_stays_attached() {
        let groups = partition("hey - you there");
        assert_eq!(groups.beats, ["hey -", "you", "there", ""]);
    }

    #[test]
    fn test_lossless_and_balanced() {
        for text in [
            "i wanna go home right now",
            "everybody knows",
            "unbelievable conversation in the kitchen tonight",
            "hello(3) world",
            "it's a beautiful morning and the radio is playing",
            "rhythm strengths 1999 y'all",
            "supercalifragilistic",
        ] {
            assert_lossless(text);
        }
    }

    #[test]
    fn test_huge_override_keeps_sums_consistent() {
        for text in ["hello(4294967295) world", "yeah(99999999999) go"] {
            let groups = partition(text);
            assert_eq!(groups.total_syllables(), MAX_OVERRIDE + 1);
            assert_lossless(text);
        }
    }

    #[test]
    fn test_phonetic_chunks_cover_word() {
        for word in ["strengths", "hello(3)", "a", "rhythm", "don't", "x"] {
            assert_eq!(phonetic_chunks(word).concat(), word);
        }
        assert_eq!(phonetic_chunks("hello(3)"), vec!["hell", "o", "(3)"]);
    }

    #[test]
    fn test_split_line_and_last_filled() {
        let groups = partition("i wanna go home right now");
        assert_eq!(groups.to_split_line(), "i wanna | go home | right now");
        assert_eq!(groups.last_filled(), Some("right now"));
        assert_eq!(BeatGroups::default().last_filled(), None);
    }
}
