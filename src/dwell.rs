//! Dwell state machine
//!
//! `Idle` or `Hovering(session)`. The dwell clock starts on first entry and
//! is not reset by repeated hits on the same target, so the required dwell
//! does not depend on tick rate. Any tick without a hit drops straight back
//! to `Idle`: there is no grace period across a lost gaze, which keeps
//! "look away to cancel" reliable at the cost of blink robustness.

use crate::target::InteractiveTarget;
use crate::timer::{DeferredTimer, TimerHandle};
use log::debug;
use std::time::{Duration, Instant};

/// Default dwell before a hovered target commits.
pub const DEFAULT_DWELL_TIME: Duration = Duration::from_millis(2000);

#[derive(Debug)]
pub struct DwellSession {
    pub target: InteractiveTarget,
    pub started_at: Instant,
    timer: TimerHandle,
}

#[derive(Debug, Default)]
pub enum DwellState {
    #[default]
    Idle,
    Hovering(DwellSession),
}

/// Observable outcome of a step, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum DwellTransition {
    Entered(InteractiveTarget),
    Left(InteractiveTarget),
    /// The dwell completed; the session is gone.
    Committed(InteractiveTarget),
}

#[derive(Debug)]
pub struct DwellMachine {
    dwell_time: Duration,
    state: DwellState,
    timer: DeferredTimer,
}

impl DwellMachine {
    pub fn new(dwell_time: Duration) -> Self {
        Self {
            dwell_time,
            state: DwellState::Idle,
            timer: DeferredTimer::new(),
        }
    }

    pub fn dwell_time(&self) -> Duration {
        self.dwell_time
    }

    pub fn session(&self) -> Option<&DwellSession> {
        match &self.state {
            DwellState::Hovering(session) => Some(session),
            DwellState::Idle => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DwellState::Idle)
    }

    /// When the outstanding dwell will commit, if one is running.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Fraction of the dwell elapsed for the current session (0.0-1.0).
    pub fn progress(&self, now: Instant) -> Option<f32> {
        let session = self.session()?;
        if self.dwell_time.is_zero() {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(session.started_at);
        Some((elapsed.as_secs_f32() / self.dwell_time.as_secs_f32()).min(1.0))
    }

    /// Fire the dwell timer if its deadline has passed. Returns the
    /// committed target and leaves the machine `Idle`.
    pub fn poll(&mut self, now: Instant) -> Option<InteractiveTarget> {
        let fired = self.timer.take_due(now)?;
        match std::mem::take(&mut self.state) {
            DwellState::Hovering(session) => {
                assert_eq!(
                    session.timer.id(),
                    fired,
                    "dwell timer fired for a session that was already replaced"
                );
                debug!(
                    "dwell complete on {} after {:?}",
                    session.target.id,
                    now.saturating_duration_since(session.started_at)
                );
                Some(session.target)
            }
            DwellState::Idle => panic!("dwell timer fired with no active session"),
        }
    }

    /// Apply one tick's hit-test result.
    pub fn observe(
        &mut self,
        hit: Option<&InteractiveTarget>,
        now: Instant,
    ) -> Vec<DwellTransition> {
        let mut transitions = Vec::new();

        let Some(target) = hit else {
            if let Some(left) = self.cancel() {
                transitions.push(DwellTransition::Left(left));
            }
            return transitions;
        };

        if let DwellState::Hovering(session) = &mut self.state {
            if session.target.id == target.id {
                // Same target: the clock keeps running, only refresh the snapshot
                session.target = target.clone();
                return transitions;
            }
        }

        let previous = match std::mem::take(&mut self.state) {
            DwellState::Hovering(DwellSession { target: old, timer, .. }) => {
                debug!("dwell moved {} -> {}", old.id, target.id);
                transitions.push(DwellTransition::Left(old));
                Some(timer)
            }
            DwellState::Idle => None,
        };

        let timer = self.timer.reschedule(previous, now + self.dwell_time);
        self.state = DwellState::Hovering(DwellSession {
            target: target.clone(),
            started_at: now,
            timer,
        });
        debug!("dwell started on {}", target.id);
        transitions.push(DwellTransition::Entered(target.clone()));
        transitions
    }

    /// Fire a due timer, then apply the tick's hit. A commit that was due
    /// before this tick always lands before the tick's own event.
    pub fn tick(&mut self, hit: Option<&InteractiveTarget>, now: Instant) -> Vec<DwellTransition> {
        let mut transitions = Vec::new();
        if let Some(committed) = self.poll(now) {
            transitions.push(DwellTransition::Committed(committed));
        }
        transitions.extend(self.observe(hit, now));
        transitions
    }

    /// Drop any session without committing. Returns the abandoned target.
    pub fn cancel(&mut self) -> Option<InteractiveTarget> {
        match std::mem::take(&mut self.state) {
            DwellState::Hovering(DwellSession { target, timer, .. }) => {
                let cancelled = self.timer.cancel(timer);
                assert!(cancelled, "active dwell session had no armed timer");
                debug!("dwell cancelled on {}", target.id);
                Some(target)
            }
            DwellState::Idle => None,
        }
    }
}

impl Default for DwellMachine {
    fn default() -> Self {
        Self::new(DEFAULT_DWELL_TIME)
    }
}
