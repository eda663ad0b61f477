//! # Session
//!
//! Owns one project together with both time sources and the broadcaster, and
//! drives them on a single thread.
//!
//! ## Transport rules
//! - Metronome and playback are mutually exclusive: starting one stops the other.
//! - When the metronome, playback and recording are all off, every highlight is cleared.
//! - Audio failures are logged, shown once per metronome start as a
//!   [`DisplayEvent::Notice`], and never stop the clock.
//!
//! ## Driving time
//! The host advances the session explicitly: [`Session::advance_to`] fires due
//! clock steps on the virtual timeline, [`Session::animation_frame`] serves the
//! playback poll on each display refresh.

use crate::clock::{ClockFiring, ClockListener, ClockState, RhythmClock, TickEvent};
use crate::drums::{DrumPattern, PercussionCue, PercussionSink};
use crate::highlight::{ActivePosition, ActivePositionBroadcaster, DisplayEvent, DisplaySink};
use crate::project::{HighlightMode, Project, SectionKey, Tempo};
use crate::scheduler::{FrameLoop, TimerQueue};
use crate::sync::PlaybackSync;
use log::{debug, warn};
use std::time::Duration;

pub struct Session<D: DisplaySink, P: PercussionSink> {
    project: Project,
    display: D,
    percussion: P,
    timers: TimerQueue<ClockFiring>,
    frames: FrameLoop,
    clock: RhythmClock,
    sync: PlaybackSync,
    broadcaster: ActivePositionBroadcaster,
    recording: bool,
    audio_notice_shown: bool,
}

/// Clock output routed to percussion, then to the broadcaster.
struct Transport<'a> {
    project: &'a Project,
    display: &'a mut dyn DisplaySink,
    percussion: &'a mut dyn PercussionSink,
    broadcaster: &'a mut ActivePositionBroadcaster,
    audio_notice_shown: &'a mut bool,
}

impl ClockListener for Transport<'_> {
    fn on_sixteenth(&mut self, tick: &TickEvent, interval: Duration) {
        let cue = PercussionCue::new(self.project.drum_pattern, tick.step16, interval);
        if let Err(e) = self.percussion.trigger(&cue) {
            warn!("Skipping percussion for step {}: {}", tick.step16, e);
            if !*self.audio_notice_shown {
                *self.audio_notice_shown = true;
                self.display.notify(DisplayEvent::Notice {
                    message: e.to_string(),
                });
            }
        }
    }

    fn on_beat(&mut self, tick: &TickEvent) {
        self.broadcaster.on_position(
            self.project.active_section,
            tick.bar_index,
            tick.beat_in_bar,
            self.project,
            &mut *self.display,
        );
    }
}

impl<D: DisplaySink, P: PercussionSink> Session<D, P> {
    pub fn new(project: Project, display: D, percussion: P) -> Self {
        let broadcaster = ActivePositionBroadcaster::new(project.highlight_mode);
        Self {
            project,
            display,
            percussion,
            timers: TimerQueue::new(),
            frames: FrameLoop::new(),
            clock: RhythmClock::new(),
            sync: PlaybackSync::new(),
            broadcaster,
            recording: false,
            audio_notice_shown: false,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Bar text and section edits go through here; tempo and mode have
    /// dedicated setters.
    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn percussion(&self) -> &P {
        &self.percussion
    }

    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    pub fn is_playing(&self) -> bool {
        self.sync.is_active()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn active_position(&self) -> Option<&ActivePosition> {
        self.broadcaster.position()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn into_parts(self) -> (Project, D, P) {
        (self.project, self.display, self.percussion)
    }

    /// Start (or restart) the metronome. The first step fires immediately.
    pub fn start_metronome(&mut self) {
        self.sync.end(&mut self.frames);
        self.audio_notice_shown = false;
        self.clock.start(&mut self.timers);
        debug!(
            "Metronome on {} at {} bpm",
            self.project.drum_pattern,
            self.project.tempo.bpm()
        );
        self.advance_to(self.timers.now());
    }

    pub fn stop_metronome(&mut self) {
        self.clock.stop(&mut self.timers);
        self.clear_if_idle();
    }

    /// Drum pad press: start with `pattern`, stop when pressing the running
    /// pattern again, or switch patterns without restarting.
    pub fn press_drum(&mut self, pattern: DrumPattern) {
        if !self.clock.is_running() {
            self.project.drum_pattern = pattern;
            self.start_metronome();
        } else if self.project.drum_pattern == pattern {
            self.stop_metronome();
        } else {
            debug!("Drum pattern {} -> {}", self.project.drum_pattern, pattern);
            self.project.drum_pattern = pattern;
        }
    }

    /// Begin following a take that started playing at `clock_now` seconds,
    /// `seek_offset` seconds into it.
    pub fn start_playback(&mut self, clock_now: f64, seek_offset: f64) {
        self.clock.stop(&mut self.timers);
        self.sync.begin(clock_now, seek_offset, &mut self.frames);
    }

    pub fn stop_playback(&mut self) {
        self.sync.end(&mut self.frames);
        self.clear_if_idle();
    }

    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
        if !recording {
            self.clear_if_idle();
        }
    }

    pub fn set_highlight_mode(&mut self, mode: HighlightMode) {
        self.project.highlight_mode = mode;
        self.broadcaster.set_mode(mode, &mut self.display);
    }

    /// Takes effect on the next clock step or playback poll.
    pub fn set_tempo(&mut self, tempo: Tempo) {
        self.project.tempo = tempo;
    }

    pub fn set_active_section(&mut self, key: SectionKey) {
        self.project.active_section = key;
    }

    /// Fire every clock step due up to `until` and move time there.
    pub fn advance_to(&mut self, until: Duration) {
        while let Some((id, _)) = self.timers.pop_due(until) {
            let mut transport = Transport {
                project: &self.project,
                display: &mut self.display,
                percussion: &mut self.percussion,
                broadcaster: &mut self.broadcaster,
                audio_notice_shown: &mut self.audio_notice_shown,
            };
            self.clock
                .fire(id, &mut self.timers, &self.project, &mut transport);
        }
        self.timers.advance_to(until);
    }

    /// Serve a display refresh at `clock_now` seconds.
    pub fn animation_frame(&mut self, clock_now: f64) {
        let Some(frame) = self.frames.take() else {
            return;
        };
        let position = self.sync.poll(
            frame,
            clock_now,
            &self.project,
            self.project.beat_one_offset,
            &mut self.frames,
        );
        if let Some(position) = position {
            self.broadcaster.on_position(
                self.project.active_section,
                position.bar_index,
                position.beat_in_bar,
                &self.project,
                &mut self.display,
            );
        }
    }

    fn clear_if_idle(&mut self) {
        if !self.clock.is_running() && !self.sync.is_active() && !self.recording {
            self.broadcaster.clear_all(&mut self.display);
        }
    }
}
