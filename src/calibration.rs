//! Calibration gate run once before live gaze typing starts
//!
//! `NotStarted -> AwaitingManualTrigger -> Dwelling -> Succeeded`, forward
//! only. The dwell runs against one fixed anchor target, so no hit testing
//! is involved. Waiting for the operator's trigger has no timeout.

use crate::commit::CommitHandler;
use crate::dwell::{DwellMachine, DwellTransition};
use crate::events::{EventSender, GazeEvent};
use crate::target::{Action, InteractiveTarget};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

const DWELLING_MESSAGE: &str = "Calibrating... keep looking";
const SUCCESS_MESSAGE: &str = "Calibration successful!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibrationPhase {
    NotStarted,
    AwaitingManualTrigger,
    Dwelling,
    Succeeded,
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationPhase::NotStarted => write!(f, "not started"),
            CalibrationPhase::AwaitingManualTrigger => write!(f, "awaiting trigger"),
            CalibrationPhase::Dwelling => write!(f, "dwelling"),
            CalibrationPhase::Succeeded => write!(f, "succeeded"),
        }
    }
}

/// One-shot: a fresh instance is needed to recalibrate.
#[derive(Debug)]
pub struct CalibrationController {
    phase: CalibrationPhase,
    anchor: InteractiveTarget,
    machine: DwellMachine,
    instruction: String,
    events: EventSender,
}

impl CalibrationController {
    /// The anchor's action is forced to `NoOp` so calibration never types.
    pub fn new(
        mut anchor: InteractiveTarget,
        dwell_time: Duration,
        instruction: impl Into<String>,
        events: EventSender,
    ) -> Self {
        anchor.action = Action::NoOp;
        Self {
            phase: CalibrationPhase::NotStarted,
            anchor,
            machine: DwellMachine::new(dwell_time),
            instruction: instruction.into(),
            events,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn anchor(&self) -> &InteractiveTarget {
        &self.anchor
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn is_complete(&self) -> bool {
        self.phase == CalibrationPhase::Succeeded
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.machine.next_deadline()
    }

    /// Show the operator instruction and wait for the trigger.
    pub fn begin(&mut self) -> bool {
        if self.phase != CalibrationPhase::NotStarted {
            return false;
        }
        let message = self.instruction.clone();
        self.enter(CalibrationPhase::AwaitingManualTrigger, message);
        true
    }

    /// Operator confirmation: start dwelling on the anchor.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.phase != CalibrationPhase::AwaitingManualTrigger {
            warn!("calibration trigger ignored in phase: {}", self.phase);
            return false;
        }
        self.machine.observe(Some(&self.anchor), now);
        self.enter(CalibrationPhase::Dwelling, DWELLING_MESSAGE.to_string());
        true
    }

    /// Advance the anchor dwell. Returns true on the tick calibration
    /// succeeds; the anchor commit goes through `commits` like any other.
    pub fn tick(&mut self, now: Instant, commits: &mut CommitHandler) -> bool {
        if self.phase != CalibrationPhase::Dwelling {
            return false;
        }
        for transition in self.machine.tick(Some(&self.anchor), now) {
            if let DwellTransition::Committed(anchor) = transition {
                commits.commit(&anchor);
                self.machine.cancel();
                self.enter(CalibrationPhase::Succeeded, SUCCESS_MESSAGE.to_string());
                return true;
            }
        }
        false
    }

    /// Skip the gate entirely (calibration disabled).
    pub fn bypass(&mut self) {
        if self.phase == CalibrationPhase::NotStarted {
            self.enter(CalibrationPhase::Succeeded, "Calibration skipped".to_string());
        }
    }

    fn enter(&mut self, phase: CalibrationPhase, message: String) {
        info!("calibration: {} -> {} ({})", self.phase, phase, message);
        self.phase = phase;
        self.events.send(GazeEvent::Calibration { phase, message });
    }
}
