//! Drum patterns for the metronome.
//!
//! Each pattern is a set of 16-step masks, one per voice. Bit 15 is step 0,
//! bit 0 is step 15, so the literals read left to right like a step sequencer.
//! Only the trigger plan lives here; the audio side decides how a hit sounds.

use crate::error::BeatSheetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Test one step of a 16-step mask.
fn on_step(mask: u16, step16: u8) -> bool {
    let shift = 15 - (step16 % 16);
    (mask >> shift) & 1 == 1
}

/// Drum pad selector, 1 through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DrumPattern {
    /// Straight: hats on every 16th, kick on 1 and 3, snare on 2 and 4.
    #[default]
    One,
    /// Eighth hats with a syncopated kick and rim.
    Two,
    /// Busy kick with doubled off-beat hats.
    Three,
    /// Late kicks with rim pickups.
    Four,
}

struct Masks {
    kick: u16,
    snare: u16,
    hat: u16,
    rim: u16,
    /// Extra hat half a step after the main hit.
    offbeat_hat: u16,
}

impl DrumPattern {
    pub const ALL: [DrumPattern; 4] = [
        DrumPattern::One,
        DrumPattern::Two,
        DrumPattern::Three,
        DrumPattern::Four,
    ];

    pub fn index(self) -> u8 {
        match self {
            DrumPattern::One => 1,
            DrumPattern::Two => 2,
            DrumPattern::Three => 3,
            DrumPattern::Four => 4,
        }
    }

    fn masks(self) -> Masks {
        match self {
            DrumPattern::One => Masks {
                kick: 0b1000_0000_1000_0000,
                snare: 0b0000_1000_0000_1000,
                hat: 0b1111_1111_1111_1111,
                rim: 0,
                offbeat_hat: 0,
            },
            DrumPattern::Two => Masks {
                kick: 0b1000_0010_0010_0010,
                snare: 0b0000_1000_0000_1000,
                hat: 0b1010_1010_1010_1010,
                rim: 0b0010_0000_0010_0000,
                offbeat_hat: 0,
            },
            DrumPattern::Three => Masks {
                kick: 0b1000_0001_0010_0100,
                snare: 0b0000_1000_0000_1000,
                hat: 0b1111_1111_1111_1111,
                rim: 0b0000_0000_0000_0010,
                offbeat_hat: 0b0001_0001_0001_0001,
            },
            DrumPattern::Four => Masks {
                kick: 0b1000_0000_1001_0001,
                snare: 0b0000_1000_0000_1000,
                hat: 0b1111_1111_1111_1111,
                rim: 0b0010_0000_0000_0010,
                offbeat_hat: 0,
            },
        }
    }

    /// Voices that sound on `step16`.
    ///
    /// # Example
    /// ```
    /// use beatsheet::drums::DrumPattern;
    ///
    /// let downbeat = DrumPattern::One.hits(0);
    /// assert!(downbeat.kick && downbeat.hat && !downbeat.snare);
    /// assert!(DrumPattern::One.hits(4).snare);
    /// ```
    pub fn hits(self, step16: u8) -> DrumHits {
        let m = self.masks();
        DrumHits {
            kick: on_step(m.kick, step16),
            snare: on_step(m.snare, step16),
            hat: on_step(m.hat, step16),
            rim: on_step(m.rim, step16),
            offbeat_hat: on_step(m.offbeat_hat, step16),
        }
    }
}

impl TryFrom<u8> for DrumPattern {
    type Error = BeatSheetError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(DrumPattern::One),
            2 => Ok(DrumPattern::Two),
            3 => Ok(DrumPattern::Three),
            4 => Ok(DrumPattern::Four),
            other => Err(BeatSheetError::MetadataError(format!(
                "drum-pattern must be 1-4, got {}",
                other
            ))),
        }
    }
}

impl From<DrumPattern> for u8 {
    fn from(pattern: DrumPattern) -> Self {
        pattern.index()
    }
}

impl fmt::Display for DrumPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Drum {}", self.index())
    }
}

/// Voices to trigger on one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrumHits {
    pub kick: bool,
    pub snare: bool,
    pub hat: bool,
    pub rim: bool,
    pub offbeat_hat: bool,
}

impl DrumHits {
    pub fn is_silent(&self) -> bool {
        !(self.kick || self.snare || self.hat || self.rim || self.offbeat_hat)
    }
}

/// Everything the audio side needs to schedule one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercussionCue {
    pub pattern: DrumPattern,
    pub step16: u8,
    pub hits: DrumHits,
    /// Length of this step at the tempo read for it.
    pub interval: Duration,
}

impl PercussionCue {
    pub fn new(pattern: DrumPattern, step16: u8, interval: Duration) -> Self {
        Self {
            pattern,
            step16,
            hits: pattern.hits(step16),
            interval,
        }
    }

    /// Delay of the off-beat hat relative to the step, half a step.
    pub fn offbeat_delay(&self) -> Option<Duration> {
        self.hits.offbeat_hat.then(|| self.interval / 2)
    }
}

/// Audio output for metronome steps.
///
/// Implementations schedule on their own audio clock. An `Err` means the
/// output is unavailable right now; the metronome keeps running regardless.
pub trait PercussionSink {
    fn trigger(&mut self, cue: &PercussionCue) -> Result<(), BeatSheetError>;
}

impl PercussionSink for Vec<PercussionCue> {
    fn trigger(&mut self, cue: &PercussionCue) -> Result<(), BeatSheetError> {
        self.push(*cue);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(pattern: DrumPattern, voice: impl Fn(&DrumHits) -> bool) -> Vec<u8> {
        (0..16).filter(|s| voice(&pattern.hits(*s))).collect()
    }

    #[test]
    fn test_pattern_one() {
        assert_eq!(steps(DrumPattern::One, |h| h.kick), vec![0, 8]);
        assert_eq!(steps(DrumPattern::One, |h| h.snare), vec![4, 12]);
        assert_eq!(steps(DrumPattern::One, |h| h.hat).len(), 16);
        assert!(steps(DrumPattern::One, |h| h.rim).is_empty());
    }

    #[test]
    fn test_pattern_two() {
        assert_eq!(steps(DrumPattern::Two, |h| h.kick), vec![0, 6, 10, 14]);
        assert_eq!(steps(DrumPattern::Two, |h| h.rim), vec![2, 10]);
        assert_eq!(steps(DrumPattern::Two, |h| h.hat), vec![0, 2, 4, 6, 8, 10, 12, 14]);
        assert!(DrumPattern::Two.hits(1).is_silent());
        assert!(!DrumPattern::Two.hits(2).is_silent());
    }

    #[test]
    fn test_pattern_three() {
        assert_eq!(steps(DrumPattern::Three, |h| h.kick), vec![0, 7, 10, 13]);
        assert_eq!(steps(DrumPattern::Three, |h| h.rim), vec![14]);
        assert_eq!(steps(DrumPattern::Three, |h| h.offbeat_hat), vec![3, 7, 11, 15]);
    }

    #[test]
    fn test_pattern_four() {
        assert_eq!(steps(DrumPattern::Four, |h| h.kick), vec![0, 8, 11, 15]);
        assert_eq!(steps(DrumPattern::Four, |h| h.rim), vec![2, 14]);
    }

    #[test]
    fn test_every_pattern_backbeat() {
        for pattern in DrumPattern::ALL {
            assert_eq!(steps(pattern, |h| h.snare), vec![4, 12], "{pattern}");
        }
    }

    #[test]
    fn test_selector_range() {
        assert_eq!(DrumPattern::try_from(3).unwrap(), DrumPattern::Three);
        assert!(DrumPattern::try_from(0).is_err());
        assert!(DrumPattern::try_from(5).is_err());
        assert_eq!(u8::from(DrumPattern::Four), 4);
    }

    #[test]
    fn test_offbeat_delay() {
        let cue = PercussionCue::new(DrumPattern::Three, 3, Duration::from_millis(125));
        assert_eq!(cue.offbeat_delay(), Some(Duration::from_micros(62_500)));
        let cue = PercussionCue::new(DrumPattern::Three, 2, Duration::from_millis(125));
        assert_eq!(cue.offbeat_delay(), None);
    }
}
