//! # Active Position Broadcaster
//!
//! Turns (section, bar, beat) coordinates from either time source into display
//! notifications. The engine never touches presentation state; a
//! [`DisplaySink`] receives [`DisplayEvent`]s and paints them however it likes.
//!
//! ## Modes
//! - **All**: every bar of the section flashes the current beat slot. No active
//!   bar, no autoscroll.
//! - **Cycle**: one active bar, wrapped to the section length, flashes its beat
//!   slot. The first beat of a newly reached bar asks for one scroll.

use crate::project::{HighlightMode, SectionKey, SectionLookup};
use log::{debug, warn};
use serde::Serialize;

/// Notification for the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DisplayEvent {
    /// Flash `beat_in_bar`. `bar_index` is the sole active bar, or `None` for every bar.
    #[serde(rename_all = "camelCase")]
    Highlight {
        section: SectionKey,
        bar_index: Option<usize>,
        beat_in_bar: u8,
        mode: HighlightMode,
    },
    #[serde(rename_all = "camelCase")]
    ScrollToBar { section: SectionKey, bar_index: usize },
    /// Remove every flash and active-bar marker.
    Clear,
    /// Non-fatal problem worth showing the user.
    Notice { message: String },
}

pub trait DisplaySink {
    fn notify(&mut self, event: DisplayEvent);
}

impl DisplaySink for Vec<DisplayEvent> {
    fn notify(&mut self, event: DisplayEvent) {
        self.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePosition {
    pub section: SectionKey,
    /// `None` in All mode.
    pub bar_index: Option<usize>,
    pub beat_in_bar: u8,
    pub mode: HighlightMode,
}

#[derive(Debug, Default)]
pub struct ActivePositionBroadcaster {
    mode: HighlightMode,
    position: Option<ActivePosition>,
    last_scrolled: Option<(SectionKey, usize)>,
}

impl ActivePositionBroadcaster {
    pub fn new(mode: HighlightMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> HighlightMode {
        self.mode
    }

    pub fn position(&self) -> Option<&ActivePosition> {
        self.position.as_ref()
    }

    pub fn on_position(
        &mut self,
        section: SectionKey,
        bar_index: u64,
        beat_in_bar: u8,
        sections: &dyn SectionLookup,
        display: &mut dyn DisplaySink,
    ) {
        if !section.is_rhythmic() {
            return;
        }
        let Some(bar_count) = sections.bar_count(section) else {
            warn!("No bars for section {}, skipping highlight", section);
            return;
        };
        let safe_bar = (bar_index % bar_count as u64) as usize;
        let beat_in_bar = beat_in_bar % 4;

        match self.mode {
            HighlightMode::All => {
                self.last_scrolled = None;
                self.position = Some(ActivePosition {
                    section,
                    bar_index: None,
                    beat_in_bar,
                    mode: HighlightMode::All,
                });
                display.notify(DisplayEvent::Highlight {
                    section,
                    bar_index: None,
                    beat_in_bar,
                    mode: HighlightMode::All,
                });
            }
            HighlightMode::Cycle => {
                self.position = Some(ActivePosition {
                    section,
                    bar_index: Some(safe_bar),
                    beat_in_bar,
                    mode: HighlightMode::Cycle,
                });
                display.notify(DisplayEvent::Highlight {
                    section,
                    bar_index: Some(safe_bar),
                    beat_in_bar,
                    mode: HighlightMode::Cycle,
                });
                if beat_in_bar == 0 && self.last_scrolled != Some((section, safe_bar)) {
                    self.last_scrolled = Some((section, safe_bar));
                    display.notify(DisplayEvent::ScrollToBar {
                        section,
                        bar_index: safe_bar,
                    });
                }
            }
        }
    }

    /// Switch modes. A real change clears every highlight immediately.
    pub fn set_mode(&mut self, mode: HighlightMode, display: &mut dyn DisplaySink) {
        if mode == self.mode {
            return;
        }
        debug!("Highlight mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.reset();
        display.notify(DisplayEvent::Clear);
    }

    /// Forget the active position and remove all indicators.
    pub fn clear_all(&mut self, display: &mut dyn DisplaySink) {
        self.reset();
        display.notify(DisplayEvent::Clear);
    }

    fn reset(&mut self) {
        self.position = None;
        self.last_scrolled = None;
    }
}
