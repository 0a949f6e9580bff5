//! Single-slot cancellable deferred timer
//!
//! Scheduling hands back a [`TimerHandle`]; that handle is the only way to
//! cancel, and the slot holds at most one armed deadline. Time is never read
//! here: callers pass `now`, so the timer fires on whatever thread drives
//! the ticks.

use std::time::Instant;

/// Proof that a deadline was scheduled. Not `Clone`: one handle per arm.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping the handle makes the timer impossible to cancel"]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct DeferredTimer {
    next_id: u64,
    armed: Option<(u64, Instant)>,
}

impl DeferredTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot. Panics if a deadline is already armed: that means a
    /// transition forgot to cancel.
    pub fn schedule(&mut self, deadline: Instant) -> TimerHandle {
        assert!(
            self.armed.is_none(),
            "dwell timer scheduled while another is outstanding"
        );
        self.next_id += 1;
        self.armed = Some((self.next_id, deadline));
        TimerHandle(self.next_id)
    }

    /// Cancel `previous` (if any) and arm a new deadline in one step.
    pub fn reschedule(&mut self, previous: Option<TimerHandle>, deadline: Instant) -> TimerHandle {
        if let Some(handle) = previous {
            self.cancel(handle);
        }
        self.schedule(deadline)
    }

    /// Returns false if the handle had already fired or been replaced.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.armed {
            Some((id, _)) if id == handle.0 => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|(_, at)| at)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Disarm and return the id of the timer if its deadline is at or
    /// before `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<u64> {
        match self.armed {
            Some((id, at)) if at <= now => {
                self.armed = None;
                Some(id)
            }
            _ => None,
        }
    }
}
