//! # Project Model
//!
//! A project is a song: a tempo, a highlight preference and seven rhythmic
//! sections of bars.
//!
//! ## Type Hierarchy
//! ```text
//! Project
//!   ├── tempo: Tempo (clamped 40..=240 on every write)
//!   ├── highlight_mode: HighlightMode (Cycle | All)
//!   ├── active_section: SectionKey
//!   ├── beat_one_offset: seconds of backing-track lead-in
//!   ├── drum_pattern: DrumPattern (metronome pad 1-4)
//!   └── Vec<Section> (fixed order, see SECTION_TABLE)
//!         └── Vec<Bar>
//!               ├── text: String
//!               └── beats: BeatGroups (recomputed on every text write)
//! ```
//!
//! `SectionKey::Full` names the whole-song text view. It owns no bars and is
//! never a clock or playback target.

use crate::beats::{partition, BeatGroups};
use crate::drums::DrumPattern;
use crate::error::BeatSheetError;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Tempo in quarter-note beats per minute, always within `MIN..=MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u16")]
pub struct Tempo(u16);

impl Tempo {
    pub const MIN: u16 = 40;
    pub const MAX: u16 = 240;
    pub const DEFAULT: Tempo = Tempo(95);

    /// Clamp any integer into range.
    pub fn new(bpm: i64) -> Self {
        Tempo(bpm.clamp(Self::MIN as i64, Self::MAX as i64) as u16)
    }

    /// Parse user input from its leading integer, so `"120bpm"` reads as 120.
    /// Input that does not start with a number falls back to the minimum.
    ///
    /// # Example
    /// ```
    /// use beatsheet::project::Tempo;
    ///
    /// assert_eq!(Tempo::parse("120").bpm(), 120);
    /// assert_eq!(Tempo::parse("96 bpm").bpm(), 96);
    /// assert_eq!(Tempo::parse("999").bpm(), 240);
    /// assert_eq!(Tempo::parse("fast").bpm(), 40);
    /// ```
    pub fn parse(input: &str) -> Self {
        let input = input.trim_start();
        let (negative, rest) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            _ => (false, input),
        };
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Tempo(Self::MIN);
        }
        // Too many digits to fit still means far out of range.
        let magnitude = rest[..digits].parse::<i64>().unwrap_or(i64::MAX);
        Tempo::new(if negative { -magnitude } else { magnitude })
    }

    pub fn bpm(self) -> u16 {
        self.0
    }

    /// Time between two 16th-note steps: 60000 / bpm / 4 ms.
    pub fn sixteenth_interval(self) -> Duration {
        Duration::from_nanos(15_000_000_000 / self.0 as u64)
    }

    /// Time between two quarter-note beats.
    pub fn beat_interval(self) -> Duration {
        Duration::from_nanos(60_000_000_000 / self.0 as u64)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo::DEFAULT
    }
}

impl From<i64> for Tempo {
    fn from(bpm: i64) -> Self {
        Tempo::new(bpm)
    }
}

impl From<Tempo> for u16 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

/// Source of the current tempo, read fresh on every clock firing and sync poll.
pub trait TempoSource {
    fn tempo(&self) -> Tempo;
}

impl TempoSource for Tempo {
    fn tempo(&self) -> Tempo {
        *self
    }
}

/// How beat highlights are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightMode {
    /// One active bar at a time, advancing with the beat, with autoscroll.
    Cycle,
    /// Every bar of the section flashes the current beat slot.
    #[default]
    All,
}

impl FromStr for HighlightMode {
    type Err = BeatSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cycle" => Ok(HighlightMode::Cycle),
            "all" => Ok(HighlightMode::All),
            other => Err(BeatSheetError::MetadataError(format!(
                "Unknown highlight mode: {}",
                other
            ))),
        }
    }
}

/// Section identifiers, in song order, plus the full-text view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Verse1,
    Chorus1,
    Verse2,
    Chorus2,
    Verse3,
    Bridge,
    Chorus3,
    Full,
}

impl SectionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKey::Verse1 => "verse1",
            SectionKey::Chorus1 => "chorus1",
            SectionKey::Verse2 => "verse2",
            SectionKey::Chorus2 => "chorus2",
            SectionKey::Verse3 => "verse3",
            SectionKey::Bridge => "bridge",
            SectionKey::Chorus3 => "chorus3",
            SectionKey::Full => "full",
        }
    }

    /// `false` only for the full-text view.
    pub fn is_rhythmic(self) -> bool {
        self != SectionKey::Full
    }

    pub fn def(self) -> Option<&'static SectionDef> {
        SECTION_TABLE.iter().find(|d| d.key == self)
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = BeatSheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "full" {
            return Ok(SectionKey::Full);
        }
        SECTION_TABLE
            .iter()
            .find(|d| d.key.as_str() == wanted)
            .map(|d| d.key)
            .ok_or_else(|| BeatSheetError::UnknownSection(s.to_string()))
    }
}

/// Static description of a rhythmic section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDef {
    pub key: SectionKey,
    pub title: &'static str,
    /// Bars a finished section is expected to hold.
    pub bars: usize,
    /// Spare bars offered past `bars`.
    pub extra: usize,
}

impl SectionDef {
    pub fn capacity(&self) -> usize {
        self.bars + self.extra
    }
}

/// The rhythmic sections, in song order.
pub static SECTION_TABLE: [SectionDef; 7] = [
    SectionDef { key: SectionKey::Verse1, title: "Verse 1", bars: 16, extra: 4 },
    SectionDef { key: SectionKey::Chorus1, title: "Chorus 1", bars: 12, extra: 4 },
    SectionDef { key: SectionKey::Verse2, title: "Verse 2", bars: 16, extra: 4 },
    SectionDef { key: SectionKey::Chorus2, title: "Chorus 2", bars: 12, extra: 4 },
    SectionDef { key: SectionKey::Verse3, title: "Verse 3", bars: 16, extra: 4 },
    SectionDef { key: SectionKey::Bridge, title: "Bridge", bars: 8, extra: 4 },
    SectionDef { key: SectionKey::Chorus3, title: "Chorus 3", bars: 12, extra: 4 },
];

/// One line of lyrics and its cached beat partition.
///
/// The text is private so the cache can only change together with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BarText", into = "BarText")]
pub struct Bar {
    text: String,
    beats: BeatGroups,
}

/// Serialized form of a bar: only the text survives, the partition is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BarText {
    text: String,
}

impl From<BarText> for Bar {
    fn from(raw: BarText) -> Self {
        Bar::new(raw.text)
    }
}

impl From<Bar> for BarText {
    fn from(bar: Bar) -> Self {
        BarText { text: bar.text }
    }
}

impl Bar {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let beats = partition(&text);
        Self { text, beats }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn beats(&self) -> &BeatGroups {
        &self.beats
    }

    pub fn syllables(&self) -> u32 {
        self.beats.total_syllables()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Replace the text and recompute the partition.
    pub fn set_text(&mut self, text: impl Into<String>) {
        *self = Bar::new(text);
    }
}

/// An ordered run of bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub key: SectionKey,
    pub title: String,
    pub bars: Vec<Bar>,
}

impl Section {
    /// A section with every bar slot empty.
    pub fn blank(def: &SectionDef) -> Self {
        Self {
            key: def.key,
            title: def.title.to_string(),
            bars: vec![Bar::default(); def.capacity()],
        }
    }

    pub fn filled_bars(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter().filter(|b| !b.is_blank())
    }
}

/// Number of bars in a section, used to wrap bar indices.
pub trait SectionLookup {
    /// `None` when the section is unknown or has no bars.
    fn bar_count(&self, key: SectionKey) -> Option<usize>;
}

/// A song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub tempo: Tempo,
    pub highlight_mode: HighlightMode,
    pub active_section: SectionKey,
    /// Seconds before beat 1 in a backing track.
    pub beat_one_offset: f64,
    #[serde(default)]
    pub drum_pattern: DrumPattern,
    pub sections: Vec<Section>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new("")
    }
}

impl Project {
    pub const MAX_BEAT_ONE_OFFSET: f64 = 9999.0;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tempo: Tempo::DEFAULT,
            highlight_mode: HighlightMode::default(),
            active_section: SectionKey::Verse1,
            beat_one_offset: 0.0,
            drum_pattern: DrumPattern::default(),
            sections: SECTION_TABLE.iter().map(Section::blank).collect(),
        }
    }

    pub fn section(&self, key: SectionKey) -> Option<&Section> {
        self.sections.iter().find(|s| s.key == key)
    }

    pub fn section_mut(&mut self, key: SectionKey) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.key == key)
    }

    pub fn set_tempo(&mut self, bpm: i64) {
        self.tempo = Tempo::new(bpm);
    }

    /// Store a backing-track lead-in, clamped to `0..=MAX_BEAT_ONE_OFFSET`.
    pub fn set_beat_one_offset(&mut self, seconds: f64) {
        self.beat_one_offset = if seconds.is_finite() {
            seconds.clamp(0.0, Self::MAX_BEAT_ONE_OFFSET)
        } else {
            0.0
        };
    }

    pub fn bar(&self, key: SectionKey, index: usize) -> Option<&Bar> {
        self.section(key)?.bars.get(index)
    }

    /// Write a bar's text, recomputing its beats.
    pub fn set_bar_text(
        &mut self,
        key: SectionKey,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), BeatSheetError> {
        let section = self
            .section_mut(key)
            .ok_or_else(|| BeatSheetError::UnknownSection(key.to_string()))?;
        let len = section.bars.len();
        let bar = section
            .bars
            .get_mut(index)
            .ok_or_else(|| BeatSheetError::BarOutOfRange {
                section: key.to_string(),
                index,
                len,
            })?;
        bar.set_text(text);
        Ok(())
    }

    /// Empty every bar of every section.
    pub fn clear_bars(&mut self) {
        for section in &mut self.sections {
            for bar in &mut section.bars {
                bar.set_text("");
            }
        }
    }

    /// Load a project saved with [`Project::to_json`], repairing whatever is
    /// missing or out of range.
    pub fn from_json(json: &str) -> Result<Self, BeatSheetError> {
        let mut project: Project = serde_json::from_str(json)
            .map_err(|e| BeatSheetError::MetadataError(e.to_string()))?;
        project.repair();
        Ok(project)
    }

    pub fn to_json(&self) -> Result<String, BeatSheetError> {
        serde_json::to_string_pretty(self).map_err(|e| BeatSheetError::MetadataError(e.to_string()))
    }

    /// Restore missing sections and out-of-range values after loading.
    pub fn repair(&mut self) {
        for def in &SECTION_TABLE {
            if self.section(def.key).is_none() {
                warn!("Project '{}' was missing section {}, restoring it", self.name, def.key);
                self.sections.push(Section::blank(def));
            }
        }
        self.sections.retain(|s| s.key.is_rhythmic());
        self.sections.sort_by_key(|s| {
            SECTION_TABLE
                .iter()
                .position(|d| d.key == s.key)
                .unwrap_or(usize::MAX)
        });
        self.sections.dedup_by_key(|s| s.key);
        self.set_beat_one_offset(self.beat_one_offset);
    }
}

impl TempoSource for Project {
    fn tempo(&self) -> Tempo {
        self.tempo
    }
}

impl SectionLookup for Project {
    fn bar_count(&self, key: SectionKey) -> Option<usize> {
        if !key.is_rhythmic() {
            return None;
        }
        self.section(key).map(|s| s.bars.len()).filter(|n| *n > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_clamps_on_every_write() {
        assert_eq!(Tempo::new(10).bpm(), 40);
        assert_eq!(Tempo::new(500).bpm(), 240);
        assert_eq!(Tempo::new(120).bpm(), 120);
        let mut project = Project::new("t");
        project.set_tempo(-5);
        assert_eq!(project.tempo.bpm(), 40);
    }

    #[test]
    fn test_tempo_parse_falls_back_to_minimum() {
        assert_eq!(Tempo::parse("").bpm(), 40);
        assert_eq!(Tempo::parse("abc").bpm(), 40);
        assert_eq!(Tempo::parse(" 95 ").bpm(), 95);
        assert_eq!(Tempo::parse("100.7").bpm(), 100);
        assert_eq!(Tempo::parse("NaN").bpm(), 40);
        assert_eq!(Tempo::parse("bpm 120").bpm(), 40);
    }

    #[test]
    fn test_tempo_parse_reads_leading_integer() {
        assert_eq!(Tempo::parse("120bpm").bpm(), 120);
        assert_eq!(Tempo::parse("  96 bpm").bpm(), 96);
        assert_eq!(Tempo::parse("-20").bpm(), 40);
        assert_eq!(Tempo::parse("+150").bpm(), 150);
        assert_eq!(Tempo::parse("99999999999999999999999").bpm(), 240);
    }

    #[test]
    fn test_sixteenth_interval() {
        assert_eq!(Tempo::new(120).sixteenth_interval(), Duration::from_millis(125));
        assert_eq!(Tempo::new(60).sixteenth_interval(), Duration::from_millis(250));
        assert_eq!(Tempo::new(120).beat_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_tempo_deserialize_clamps() {
        let tempo: Tempo = serde_json::from_str("1000").unwrap();
        assert_eq!(tempo.bpm(), 240);
        assert_eq!(serde_json::to_string(&Tempo::new(95)).unwrap(), "95");
    }

    #[test]
    fn test_section_keys() {
        assert_eq!("Chorus2".parse::<SectionKey>().unwrap(), SectionKey::Chorus2);
        assert_eq!("full".parse::<SectionKey>().unwrap(), SectionKey::Full);
        assert!("outro".parse::<SectionKey>().is_err());
        assert!(!SectionKey::Full.is_rhythmic());
        assert_eq!(SectionKey::Bridge.def().unwrap().capacity(), 12);
        assert!(SectionKey::Full.def().is_none());
    }

    #[test]
    fn test_new_project_layout() {
        let project = Project::new("demo");
        assert_eq!(project.sections.len(), 7);
        assert_eq!(project.bar_count(SectionKey::Verse1), Some(20));
        assert_eq!(project.bar_count(SectionKey::Chorus1), Some(16));
        assert_eq!(project.bar_count(SectionKey::Full), None);
        assert_eq!(project.tempo.bpm(), 95);
        assert_eq!(project.highlight_mode, HighlightMode::All);
    }

    #[test]
    fn test_bar_text_recomputes_beats() {
        let mut project = Project::new("demo");
        project
            .set_bar_text(SectionKey::Verse1, 0, "i wanna go home right now")
            .unwrap();
        let bar = project.bar(SectionKey::Verse1, 0).unwrap();
        assert_eq!(bar.syllables(), 7);
        assert_eq!(bar.beats().beats[0], "i wanna");

        project.set_bar_text(SectionKey::Verse1, 0, "a / b").unwrap();
        let bar = project.bar(SectionKey::Verse1, 0).unwrap();
        assert!(bar.beats().manual);
        assert_eq!(bar.beats().beats[1], "b");
    }

    #[test]
    fn test_bar_write_out_of_range() {
        let mut project = Project::new("demo");
        let err = project.set_bar_text(SectionKey::Bridge, 12, "x").unwrap_err();
        assert!(matches!(err, BeatSheetError::BarOutOfRange { index: 12, len: 12, .. }));
        assert!(matches!(
            project.set_bar_text(SectionKey::Full, 0, "x"),
            Err(BeatSheetError::UnknownSection(_))
        ));
    }

    #[test]
    fn test_bar_serializes_text_only() {
        let bar = Bar::new("i wanna go home right now");
        let json = serde_json::to_string(&bar).unwrap();
        assert_eq!(json, r#"{"text":"i wanna go home right now"}"#);
        let back: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bar);
    }

    #[test]
    fn test_repair_restores_sections() {
        let mut project = Project::new("demo");
        project.sections.retain(|s| s.key != SectionKey::Bridge);
        project.beat_one_offset = -3.0;
        project.repair();
        assert_eq!(project.sections.len(), 7);
        assert_eq!(project.sections[5].key, SectionKey::Bridge);
        assert_eq!(project.beat_one_offset, 0.0);
    }

    #[test]
    fn test_json_load_repairs_project() {
        let mut project = Project::new("demo");
        project.set_bar_text(SectionKey::Chorus1, 2, "hold on").unwrap();
        let json = project.to_json().unwrap();
        assert_eq!(Project::from_json(&json).unwrap(), project);

        let json = r#"{
            "name": "old",
            "tempo": 300,
            "highlight_mode": "cycle",
            "active_section": "bridge",
            "beat_one_offset": -1.5,
            "sections": [
                {"key": "bridge", "title": "Bridge", "bars": [{"text": "hold on"}]},
                {"key": "verse1", "title": "Verse 1", "bars": []}
            ]
        }"#;
        let loaded = Project::from_json(json).unwrap();
        assert_eq!(loaded.tempo.bpm(), 240);
        assert_eq!(loaded.beat_one_offset, 0.0);
        assert_eq!(loaded.drum_pattern, DrumPattern::One);
        assert_eq!(loaded.sections.len(), 7);
        assert_eq!(loaded.sections[0].key, SectionKey::Verse1);
        assert_eq!(loaded.bar(SectionKey::Bridge, 0).unwrap().syllables(), 2);

        assert!(matches!(
            Project::from_json("not json"),
            Err(BeatSheetError::MetadataError(_))
        ));
    }
}
