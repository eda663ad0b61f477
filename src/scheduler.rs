//! Cooperative, single-threaded scheduling primitives.
//!
//! Two mechanisms drive the engine:
//! - [`TimerQueue`]: one-shot timers on a virtual timeline. The owner advances
//!   time explicitly and fires whatever is due, so a periodic source re-arms
//!   itself after each firing.
//! - [`FrameLoop`]: a one-shot "next display refresh" request that a poller
//!   re-posts every frame.
//!
//! Both hand out ids. Cancelling an id guarantees its payload is never
//! delivered, even if its deadline has already passed.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct Scheduled<T> {
    deadline: Duration,
    id: TimerId,
    payload: T,
}

// Min-heap on (deadline, id): earliest first, then in scheduling order.
impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.id == other.id
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// One-shot timers on a virtual timeline starting at zero.
pub struct TimerQueue<T> {
    now: Duration,
    heap: BinaryHeap<Scheduled<T>>,
    /// Ids scheduled and neither fired nor cancelled.
    live: HashSet<TimerId>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `payload` to fire `delay` after the current time.
    pub fn schedule_after(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        self.heap.push(Scheduled {
            deadline: self.now + delay,
            id,
            payload,
        });
        id
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.live.contains(&id)
    }

    /// Number of timers still waiting to fire.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Deadline of the next live timer.
    pub fn next_deadline(&mut self) -> Option<Duration> {
        self.discard_cancelled();
        self.heap.peek().map(|s| s.deadline)
    }

    /// Pop the earliest live timer due at or before `until`, moving the
    /// clock to its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        self.discard_cancelled();
        if !self.heap.peek().is_some_and(|s| s.deadline <= until) {
            return None;
        }
        let due = self.heap.pop()?;
        self.live.remove(&due.id);
        self.now = self.now.max(due.deadline);
        Some((due.id, due.payload))
    }

    /// Move the clock forward without firing anything. Time never runs backwards.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    fn discard_cancelled(&mut self) {
        while self.heap.peek().is_some_and(|s| !self.live.contains(&s.id)) {
            self.heap.pop();
        }
    }
}

/// Handle to a requested animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(u64);

/// At most one outstanding display-refresh request.
#[derive(Debug, Default)]
pub struct FrameLoop {
    pending: Option<FrameId>,
    next_id: u64,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a callback on the next frame, replacing any earlier request.
    pub fn request(&mut self) -> FrameId {
        let id = FrameId(self.next_id);
        self.next_id += 1;
        self.pending = Some(id);
        id
    }

    pub fn cancel(&mut self, id: FrameId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Consume the pending request as the display refreshes.
    pub fn take(&mut self) -> Option<FrameId> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let mut timers = TimerQueue::new();
        timers.schedule_after(ms(30), "c");
        timers.schedule_after(ms(10), "a");
        timers.schedule_after(ms(20), "b");

        let mut fired = Vec::new();
        while let Some((_, name)) = timers.pop_due(ms(100)) {
            fired.push((name, timers.now()));
        }
        assert_eq!(fired, vec![("a", ms(10)), ("b", ms(20)), ("c", ms(30))]);
    }

    #[test]
    fn test_same_deadline_keeps_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule_after(ms(5), 1);
        timers.schedule_after(ms(5), 2);
        assert_eq!(timers.pop_due(ms(5)).map(|(_, n)| n), Some(1));
        assert_eq!(timers.pop_due(ms(5)).map(|(_, n)| n), Some(2));
    }

    #[test]
    fn test_not_due_yet() {
        let mut timers = TimerQueue::new();
        timers.schedule_after(ms(50), ());
        assert!(timers.pop_due(ms(49)).is_none());
        timers.advance_to(ms(49));
        assert_eq!(timers.now(), ms(49));
        assert!(timers.pop_due(ms(50)).is_some());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_after(ms(10), "gone");
        timers.schedule_after(ms(20), "kept");
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert!(!timers.is_pending(id));
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(ms(20)));
        assert_eq!(timers.pop_due(ms(100)).map(|(_, n)| n), Some("kept"));
        assert!(timers.is_empty());
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut timers = TimerQueue::new();
        timers.advance_to(ms(100));
        timers.schedule_after(ms(25), ());
        assert_eq!(timers.next_deadline(), Some(ms(125)));
        timers.advance_to(ms(50));
        assert_eq!(timers.now(), ms(100));
    }

    #[test]
    fn test_frame_loop_is_one_shot() {
        let mut frames = FrameLoop::new();
        let first = frames.request();
        let second = frames.request();
        assert_ne!(first, second);
        frames.cancel(first);
        assert!(frames.is_pending());
        assert_eq!(frames.take(), Some(second));
        assert_eq!(frames.take(), None);
    }
}
