//! Injectable time source and cancellable scheduled tasks.
//!
//! The room never sleeps or spawns timers. A gesture that needs a delay
//! schedules a task with a deadline; the host calls `Room::tick` and the
//! room also polls before every input event, so elapsed deadlines fire in
//! order with the events around them.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Milliseconds on a monotonic clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock. Clones share the same time, so a test can
/// keep one handle and give another to the room.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// A single pending deadline carrying a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTask<T> {
    pub due_ms: u64,
    pub payload: T,
}

/// Slot for at most one scheduled task. Scheduling replaces any pending
/// task.
#[derive(Debug, Clone)]
pub struct Timer<T> {
    pending: Option<ScheduledTask<T>>,
}

impl<T> Default for Timer<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> Timer<T> {
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, payload: T) {
        self.pending = Some(ScheduledTask {
            due_ms: now_ms.saturating_add(delay_ms),
            payload,
        });
    }

    /// Drop the pending task. Returns `true` if there was one.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&ScheduledTask<T>> {
        self.pending.as_ref()
    }

    /// Take the payload if its deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<T> {
        match &self.pending {
            Some(task) if task.due_ms <= now_ms => self.pending.take().map(|t| t.payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(150);
        assert_eq!(other.now_ms(), 150);
        other.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn timer_fires_once_after_deadline() {
        let mut t = Timer::default();
        t.schedule(100, 200, "hold");
        assert_eq!(t.poll(299), None);
        assert_eq!(t.poll(300), Some("hold"));
        assert_eq!(t.poll(400), None);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut t = Timer::default();
        t.schedule(0, 200, 1u8);
        assert!(t.cancel());
        assert!(!t.cancel());
        assert_eq!(t.poll(1_000), None);
    }

    #[test]
    fn rescheduling_replaces_pending_task() {
        let mut t = Timer::default();
        t.schedule(0, 50, 'a');
        t.schedule(0, 500, 'b');
        assert_eq!(t.poll(100), None);
        assert_eq!(t.poll(500), Some('b'));
    }
}
