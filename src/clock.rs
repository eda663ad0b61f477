//! # Rhythm Clock
//!
//! A self-rescheduling 16th-note clock.
//!
//! ## Tempo policy
//! The tempo is read fresh from the [`TempoSource`] on every firing and the next
//! firing is scheduled with the interval computed from it. A tempo change takes
//! effect on the next step without a restart.
//!
//! ## Per firing
//! 1. Read the tempo, compute `60000 / bpm / 4` ms
//! 2. [`ClockListener::on_sixteenth`] (percussion)
//! 3. [`ClockListener::on_beat`] when the step starts a quarter beat (0, 4, 8, 12)
//! 4. Re-arm the timer
//!
//! Percussion always runs before the beat notification of the same step.

use crate::project::TempoSource;
use crate::scheduler::{TimerId, TimerQueue};
use log::{debug, trace};
use serde::Serialize;
use std::time::Duration;

pub const STEPS_PER_BAR: u64 = 16;
pub const STEPS_PER_BEAT: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockState {
    #[default]
    Stopped,
    Running,
}

/// One 16th-note step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickEvent {
    /// 0..=15 within the bar.
    pub step16: u8,
    /// 0..=3, `step16 / 4`.
    pub beat_in_bar: u8,
    /// Bars completed since start.
    pub bar_index: u64,
}

impl TickEvent {
    /// Position of the `count`-th step since the clock started.
    pub fn at(count: u64) -> Self {
        let step16 = (count % STEPS_PER_BAR) as u8;
        Self {
            step16,
            beat_in_bar: step16 / STEPS_PER_BEAT as u8,
            bar_index: count / STEPS_PER_BAR,
        }
    }

    pub fn is_beat(&self) -> bool {
        self.step16 as u64 % STEPS_PER_BEAT == 0
    }
}

/// Timer payload for a clock firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockFiring;

/// Receives clock output.
pub trait ClockListener {
    /// Every step, with the interval computed for it.
    fn on_sixteenth(&mut self, tick: &TickEvent, interval: Duration);
    /// Once per quarter beat, after `on_sixteenth` for the same step.
    fn on_beat(&mut self, tick: &TickEvent);
}

#[derive(Debug, Default)]
pub struct RhythmClock {
    state: ClockState,
    /// Steps fired since the last start.
    count: u64,
    pending: Option<TimerId>,
}

impl RhythmClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// Steps fired since the last start.
    pub fn steps_fired(&self) -> u64 {
        self.count
    }

    /// Start from step 0, restarting if already running. The first step is
    /// due immediately.
    pub fn start(&mut self, timers: &mut TimerQueue<ClockFiring>) {
        if self.is_running() {
            self.stop(timers);
        }
        self.count = 0;
        self.state = ClockState::Running;
        self.pending = Some(timers.schedule_after(Duration::ZERO, ClockFiring));
        debug!("Rhythm clock started");
    }

    /// Cancel the pending step. Stopping a stopped clock does nothing.
    pub fn stop(&mut self, timers: &mut TimerQueue<ClockFiring>) {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
        if self.state == ClockState::Running {
            debug!("Rhythm clock stopped after {} steps", self.count);
        }
        self.state = ClockState::Stopped;
    }

    /// Handle a due timer. Timers that do not belong to the current run are ignored.
    pub fn fire(
        &mut self,
        id: TimerId,
        timers: &mut TimerQueue<ClockFiring>,
        tempo: &dyn TempoSource,
        listener: &mut dyn ClockListener,
    ) {
        if !self.is_running() || self.pending != Some(id) {
            trace!("Ignoring stale clock timer {:?}", id);
            return;
        }

        let tempo = tempo.tempo();
        let interval = tempo.sixteenth_interval();
        let tick = TickEvent::at(self.count);
        trace!(
            "Step {} (bar {}, beat {}) at {} bpm",
            tick.step16,
            tick.bar_index,
            tick.beat_in_bar,
            tempo.bpm()
        );

        listener.on_sixteenth(&tick, interval);
        if tick.is_beat() {
            listener.on_beat(&tick);
        }

        self.count += 1;
        self.pending = Some(timers.schedule_after(interval, ClockFiring));
    }
}
