//! Playback position synchronizer.
//!
//! Derives bar/beat coordinates from elapsed playback time instead of clock
//! steps. Polled once per display refresh through a [`FrameLoop`]; each poll
//! re-posts the next request until [`PlaybackSync::end`].

use crate::project::{Tempo, TempoSource};
use crate::scheduler::{FrameId, FrameLoop};
use log::{debug, trace};
use serde::Serialize;

/// Bar/beat coordinate of a playback instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPosition {
    pub beat_in_bar: u8,
    /// Unbounded; wrapped against a section's bar count when applied.
    pub bar_index: u64,
}

/// Position `elapsed_secs` into playback at `tempo`.
///
/// Negative or non-finite elapsed time maps to the start.
///
/// # Example
/// ```
/// use beatsheet::project::Tempo;
/// use beatsheet::sync::position_at;
///
/// let pos = position_at(2.526316, Tempo::new(95));
/// assert_eq!((pos.bar_index, pos.beat_in_bar), (1, 0));
/// ```
pub fn position_at(elapsed_secs: f64, tempo: Tempo) -> PlaybackPosition {
    let beat_position = elapsed_secs * tempo.bpm() as f64 / 60.0;
    let beats = if beat_position.is_finite() && beat_position > 0.0 {
        beat_position.floor() as u64
    } else {
        0
    };
    PlaybackPosition {
        beat_in_bar: (beats % 4) as u8,
        bar_index: beats / 4,
    }
}

#[derive(Debug, Default)]
pub struct PlaybackSync {
    /// Clock time at `begin`, in seconds.
    start: Option<f64>,
    seek_offset: f64,
    last_beat: Option<u8>,
    frame: Option<FrameId>,
}

impl PlaybackSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.start.is_some()
    }

    /// Record the start reference and request the first frame.
    ///
    /// `seek_offset` is where in the take playback starts, in seconds.
    pub fn begin(&mut self, clock_now: f64, seek_offset: f64, frames: &mut FrameLoop) {
        self.end(frames);
        self.start = Some(clock_now);
        self.seek_offset = if seek_offset.is_finite() { seek_offset.max(0.0) } else { 0.0 };
        self.frame = Some(frames.request());
        debug!("Playback sync started at {:.3}s, seek {:.3}s", clock_now, self.seek_offset);
    }

    /// Elapsed playback seconds at `clock_now`, lead-in removed.
    pub fn elapsed(&self, clock_now: f64, beat_one_offset: f64) -> Option<f64> {
        let start = self.start?;
        Some((clock_now - start + self.seek_offset - beat_one_offset).max(0.0))
    }

    /// Handle one display refresh.
    ///
    /// Returns a position only when the beat slot changed since the last one
    /// returned. Frames not requested by this synchronizer are ignored.
    pub fn poll(
        &mut self,
        frame: FrameId,
        clock_now: f64,
        tempo: &dyn TempoSource,
        beat_one_offset: f64,
        frames: &mut FrameLoop,
    ) -> Option<PlaybackPosition> {
        if self.frame != Some(frame) {
            return None;
        }
        let elapsed = self.elapsed(clock_now, beat_one_offset)?;
        self.frame = Some(frames.request());

        let position = position_at(elapsed, tempo.tempo());
        if self.last_beat == Some(position.beat_in_bar) {
            return None;
        }
        trace!(
            "Playback at {:.3}s: bar {}, beat {}",
            elapsed,
            position.bar_index,
            position.beat_in_bar
        );
        self.last_beat = Some(position.beat_in_bar);
        Some(position)
    }

    /// Cancel polling and forget the start reference.
    pub fn end(&mut self, frames: &mut FrameLoop) {
        if let Some(frame) = self.frame.take() {
            frames.cancel(frame);
        }
        if self.start.take().is_some() {
            debug!("Playback sync ended");
        }
        self.seek_offset = 0.0;
        self.last_beat = None;
    }
}
