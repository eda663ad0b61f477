//! # Beat Sheet Documents
//!
//! Plain-text song files and the two text exports.
//!
//! ## Format
//! ```text
//! ---
//! title: Late Train
//! bpm: 92
//! highlight-mode: cycle
//! beat-one-offset: 1.5
//! drum-pattern: 3
//! section: chorus1
//! ---
//! VERSE 1
//! i wanna go home right now
//!
//! CHORUS 1
//! one / two / three / four
//! ```
//!
//! The front matter is optional. The body is the full-text view: a section
//! title on its own line (any case) starts that section, and each non-blank
//! line after it fills the next bar. Lines before the first heading and lines
//! past a section's capacity are dropped.
//!
//! ## Exports
//! - [`to_full_text`]: the body format above, headings upper-cased
//! - [`to_split_text`]: `[Title]` per section and one ` | `-joined line per bar

use crate::drums::DrumPattern;
use crate::error::BeatSheetError;
use crate::project::{HighlightMode, Project, SectionKey, Tempo, SECTION_TABLE};
use log::{info, warn};
use serde::Deserialize;

/// Front matter for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct RawMetadata {
    title: Option<String>,
    bpm: Option<serde_yaml::Value>, // number or free text, see Tempo::parse
    highlight_mode: Option<String>,
    beat_one_offset: Option<f64>,
    drum_pattern: Option<u8>,
    section: Option<String>,
}

/// Split leading `---` front matter from the body.
///
/// Returns (front matter, body, 1-indexed line the body starts on).
fn split_front_matter(source: &str) -> Result<(Option<String>, String, usize), BeatSheetError> {
    let lines: Vec<&str> = source.lines().collect();
    let Some(first) = lines.iter().position(|l| !l.trim().is_empty()) else {
        return Ok((None, String::new(), 1));
    };
    if lines[first].trim() != "---" {
        return Ok((None, source.to_string(), 1));
    }

    let close = lines[first + 1..]
        .iter()
        .position(|l| l.trim() == "---")
        .map(|i| first + 1 + i)
        .ok_or_else(|| BeatSheetError::ParseError {
            line: first + 1,
            message: "Front matter opened with '---' is never closed".to_string(),
        })?;

    let meta = lines[first + 1..close].join("\n");
    let body = lines[close + 1..].join("\n");
    Ok((Some(meta), body, close + 2))
}

fn tempo_from_yaml(value: &serde_yaml::Value) -> Tempo {
    match value {
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(bpm) => Tempo::new(bpm),
            None => Tempo::parse(&n.to_string()),
        },
        serde_yaml::Value::String(s) => Tempo::parse(s),
        _ => Tempo::parse(""),
    }
}

fn apply_metadata(project: &mut Project, raw: RawMetadata) -> Result<(), BeatSheetError> {
    if let Some(title) = raw.title {
        project.name = title;
    }
    if let Some(bpm) = &raw.bpm {
        project.tempo = tempo_from_yaml(bpm);
    }
    if let Some(mode) = &raw.highlight_mode {
        project.highlight_mode = mode.parse::<HighlightMode>()?;
    }
    if let Some(offset) = raw.beat_one_offset {
        project.set_beat_one_offset(offset);
    }
    if let Some(pattern) = raw.drum_pattern {
        project.drum_pattern = DrumPattern::try_from(pattern)?;
    }
    if let Some(section) = &raw.section {
        project.active_section = section.parse::<SectionKey>()?;
    }
    Ok(())
}

/// Parse a beat sheet document into a project.
///
/// # Example
/// ```
/// use beatsheet::project::{HighlightMode, SectionKey};
///
/// let source = "---\ntitle: Demo\nbpm: 300\nhighlight-mode: cycle\n---\nVERSE 1\ni wanna go home right now\n";
/// let project = beatsheet::sheet::parse(source).unwrap();
///
/// assert_eq!(project.name, "Demo");
/// assert_eq!(project.tempo.bpm(), 240);
/// assert_eq!(project.highlight_mode, HighlightMode::Cycle);
/// assert_eq!(project.bar(SectionKey::Verse1, 0).unwrap().syllables(), 7);
/// ```
pub fn parse(source: &str) -> Result<Project, BeatSheetError> {
    let source = source.replace('\r', "");
    let (meta, body, body_line) = split_front_matter(&source)?;

    let mut project = Project::new("");
    if let Some(meta) = meta.filter(|m| !m.trim().is_empty()) {
        let raw: RawMetadata = serde_yaml::from_str(&meta)
            .map_err(|e| BeatSheetError::MetadataError(e.to_string()))?;
        apply_metadata(&mut project, raw)?;
    }

    let dropped = fill_bars(&mut project, &body, body_line);
    let bars: usize = project.sections.iter().map(|s| s.filled_bars().count()).sum();
    info!(
        "Loaded sheet '{}': {} bars at {} bpm ({} lines dropped)",
        project.name,
        bars,
        project.tempo.bpm(),
        dropped
    );
    Ok(project)
}

/// The whole song as editable text: upper-case headings, one bar per line,
/// each bar followed by a blank line.
pub fn to_full_text(project: &Project) -> String {
    let mut out: Vec<String> = Vec::new();
    for def in &SECTION_TABLE {
        out.push(def.title.to_uppercase());
        if let Some(section) = project.section(def.key) {
            for bar in section.filled_bars() {
                out.push(bar.text().trim_end().to_string());
                out.push(String::new());
            }
        }
        out.push(String::new());
    }
    out.join("\n")
}

/// Replace every bar with the contents of a full-text view.
///
/// Returns the number of non-blank lines that had nowhere to go.
pub fn apply_full_text(project: &mut Project, text: &str) -> usize {
    fill_bars(project, &text.replace('\r', ""), 1)
}

fn heading_key(line: &str) -> Option<SectionKey> {
    let wanted = line.trim();
    SECTION_TABLE
        .iter()
        .find(|def| def.title.eq_ignore_ascii_case(wanted))
        .map(|def| def.key)
}

fn fill_bars(project: &mut Project, body: &str, first_line: usize) -> usize {
    project.clear_bars();

    let mut current: Option<SectionKey> = None;
    let mut write_index = 0;
    let mut dropped = 0;

    for (offset, line) in body.lines().enumerate() {
        let line_no = first_line + offset;
        if let Some(key) = heading_key(line) {
            current = Some(key);
            write_index = 0;
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let Some(key) = current else {
            warn!("Line {} comes before any section heading, dropping it", line_no);
            dropped += 1;
            continue;
        };
        match project.set_bar_text(key, write_index, line.trim_end()) {
            Ok(()) => write_index += 1,
            Err(e) => {
                warn!("Line {}: {}, dropping it", line_no, e);
                dropped += 1;
            }
        }
    }
    dropped
}

/// Beat-split export: `[Title]`, then each bar's non-empty beats joined with ` | `.
pub fn to_split_text(project: &Project) -> String {
    let mut out: Vec<String> = Vec::new();
    for def in &SECTION_TABLE {
        out.push(format!("[{}]", def.title));
        if let Some(section) = project.section(def.key) {
            for bar in section.filled_bars() {
                out.push(bar.beats().to_split_line());
            }
        }
        out.push(String::new());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults_without_front_matter() {
        let project = parse("VERSE 1\nhello\n").unwrap();
        assert_eq!(project.tempo.bpm(), 95);
        assert_eq!(project.highlight_mode, HighlightMode::All);
        assert_eq!(project.drum_pattern, DrumPattern::One);
        assert_eq!(project.active_section, SectionKey::Verse1);
        assert_eq!(project.bar(SectionKey::Verse1, 0).unwrap().text(), "hello");
    }

    #[test]
    fn test_parse_front_matter() {
        let source = "---\ntitle: Night Drive\nbpm: \"fast\"\nbeat-one-offset: 1.5\ndrum-pattern: 3\nsection: Bridge\n---\n";
        let project = parse(source).unwrap();
        assert_eq!(project.name, "Night Drive");
        assert_eq!(project.tempo.bpm(), 40);
        assert_eq!(project.beat_one_offset, 1.5);
        assert_eq!(project.drum_pattern, DrumPattern::Three);
        assert_eq!(project.active_section, SectionKey::Bridge);
    }

    #[test]
    fn test_parse_numeric_bpm_forms() {
        assert_eq!(parse("---\nbpm: 20\n---\n").unwrap().tempo.bpm(), 40);
        assert_eq!(parse("---\nbpm: 128.9\n---\n").unwrap().tempo.bpm(), 128);
        assert_eq!(parse("---\nbpm: '100'\n---\n").unwrap().tempo.bpm(), 100);
    }

    #[test]
    fn test_unterminated_front_matter() {
        let err = parse("---\ntitle: x\nVERSE 1\n").unwrap_err();
        assert!(matches!(err, BeatSheetError::ParseError { line: 1, .. }));
    }

    #[test]
    fn test_bad_metadata() {
        assert!(matches!(
            parse("---\nhighlight-mode: sparkle\n---\n"),
            Err(BeatSheetError::MetadataError(_))
        ));
        assert!(matches!(
            parse("---\ndrum-pattern: 9\n---\n"),
            Err(BeatSheetError::MetadataError(_))
        ));
        assert!(matches!(
            parse("---\nsection: outro\n---\n"),
            Err(BeatSheetError::UnknownSection(_))
        ));
        assert!(matches!(
            parse("---\nbpm: [1, 2\n---\n"),
            Err(BeatSheetError::MetadataError(_))
        ));
    }

    #[test]
    fn test_empty_front_matter() {
        let project = parse("---\n---\nBRIDGE\nlast line\n").unwrap();
        assert_eq!(project.bar(SectionKey::Bridge, 0).unwrap().text(), "last line");
    }

    #[test]
    fn test_full_text_layout() {
        let mut project = Project::new("p");
        project.set_bar_text(SectionKey::Verse1, 0, "first line  ").unwrap();
        project.set_bar_text(SectionKey::Verse1, 2, "third slot").unwrap();
        let text = to_full_text(&project);
        assert!(text.starts_with("VERSE 1\nfirst line\n\nthird slot\n\n\nCHORUS 1\n\n"));
        assert!(text.ends_with("CHORUS 3\n"));
    }

    #[test]
    fn test_apply_full_text_compacts_and_drops() {
        let mut project = Project::new("p");
        project.set_bar_text(SectionKey::Chorus2, 0, "stale").unwrap();

        let mut text = String::from("orphan line\nverse 1\na\n\nb\nBridge\n");
        for i in 0..13 {
            text.push_str(&format!("bridge line {}\n", i));
        }
        let dropped = apply_full_text(&mut project, &text);

        assert_eq!(dropped, 2);
        assert_eq!(project.bar(SectionKey::Verse1, 1).unwrap().text(), "b");
        assert!(project.bar(SectionKey::Chorus2, 0).unwrap().is_blank());
        assert_eq!(project.bar(SectionKey::Bridge, 11).unwrap().text(), "bridge line 11");
    }

    #[test]
    fn test_full_text_survives_reload() {
        let mut project = Project::new("p");
        project.set_bar_text(SectionKey::Chorus1, 0, "hold on / hold on").unwrap();
        project.set_bar_text(SectionKey::Verse3, 0, "running through the night").unwrap();

        let reloaded = parse(&to_full_text(&project)).unwrap();
        assert_eq!(reloaded.sections, project.sections);
    }

    #[test]
    fn test_split_text() {
        let mut project = Project::new("p");
        project.set_bar_text(SectionKey::Verse1, 0, "i wanna go home right now").unwrap();
        project.set_bar_text(SectionKey::Verse1, 1, "a / / b").unwrap();
        let text = to_split_text(&project);
        assert!(text.starts_with("[Verse 1]\ni wanna | go home | right now\na | b\n\n[Chorus 1]\n\n"));
    }
}
