//! The gaze typing controller
//!
//! Owns every piece of mutable state (dwell session, timer, output buffer,
//! calibration phase) and runs one aggregate -> map -> hit-test -> dwell pass
//! per tick. Nothing is global, so independent instances can coexist.

use crate::calibration::CalibrationController;
use crate::commit::{Commit, CommitHandler, OutputBuffer};
use crate::config::Config;
use crate::detection::{Aggregator, DetectionBatch};
use crate::dwell::{DwellMachine, DwellTransition};
use crate::events::{EventSender, GazeEvent};
use crate::geometry::{Point, SurfaceGeometry};
use crate::target::{self, HitTester, InteractiveTarget, LinearHitTester};
use log::warn;
use std::time::Instant;

/// What happened during one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Gaze point in target space
    pub gaze: Option<Point>,
    /// Id of the target under the gaze
    pub hit: Option<String>,
    pub commits: Vec<Commit>,
    /// Calibration reached `Succeeded` during this pass
    pub calibrated: bool,
}

pub struct GazeTyper<H: HitTester = LinearHitTester> {
    aggregator: Aggregator,
    model_size: f32,
    hit_tester: H,
    dwell: DwellMachine,
    commits: CommitHandler,
    calibration: CalibrationController,
    events: EventSender,
}

impl GazeTyper<LinearHitTester> {
    /// Build from configuration. `targets` is only used to locate the
    /// calibration anchor; hit testing always uses the per-tick list.
    pub fn from_config(config: &Config, targets: &[InteractiveTarget], events: EventSender) -> Self {
        let dwell_time = config.dwell.dwell_time();
        let anchor = resolve_anchor(&config.calibration.anchor, targets);
        let mut calibration = CalibrationController::new(
            anchor,
            dwell_time,
            config.calibration.instruction(dwell_time),
            events.clone(),
        );
        if !config.calibration.enabled {
            calibration.bypass();
        }

        Self {
            aggregator: Aggregator::new(config.detection.confidence_threshold)
                .with_mode(config.detection.centroid),
            model_size: config.detection.model_size,
            hit_tester: LinearHitTester,
            dwell: DwellMachine::new(dwell_time),
            commits: CommitHandler::new(events.clone()),
            calibration,
            events,
        }
    }
}

impl<H: HitTester> GazeTyper<H> {
    /// Swap the hit tester, e.g. for a spatial index.
    pub fn with_hit_tester<H2: HitTester>(self, hit_tester: H2) -> GazeTyper<H2> {
        GazeTyper {
            aggregator: self.aggregator,
            model_size: self.model_size,
            hit_tester,
            dwell: self.dwell,
            commits: self.commits,
            calibration: self.calibration,
            events: self.events,
        }
    }

    pub fn buffer(&self) -> &OutputBuffer {
        self.commits.buffer()
    }

    pub fn dwell(&self) -> &DwellMachine {
        &self.dwell
    }

    pub fn calibration(&self) -> &CalibrationController {
        &self.calibration
    }

    /// Live gaze input is only processed after calibration.
    pub fn is_ready(&self) -> bool {
        self.calibration.is_complete()
    }

    pub fn begin_calibration(&mut self) -> bool {
        self.calibration.begin()
    }

    pub fn trigger_calibration(&mut self, now: Instant) -> bool {
        self.calibration.trigger(now)
    }

    /// Earliest instant a timer will fire; hosts that sleep between frames
    /// should wake here and call [`poll`](Self::poll).
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_ready() {
            self.dwell.next_deadline()
        } else {
            self.calibration.next_deadline()
        }
    }

    /// One pipeline pass for one detection batch.
    pub fn process_frame(
        &mut self,
        batch: &DetectionBatch,
        surface: &SurfaceGeometry,
        targets: &[InteractiveTarget],
        now: Instant,
    ) -> TickReport {
        if !self.is_ready() {
            return self.poll(now);
        }

        let mut report = TickReport::default();

        let gaze = self
            .aggregator
            .aggregate(batch.detections())
            .and_then(|p| surface.model_to_target(p, self.model_size));
        if let Some(point) = gaze {
            self.events.send(GazeEvent::Cursor { point });
        }
        report.gaze = gaze;

        let hit = gaze.and_then(|p| self.hit_tester.hit(p, targets));
        report.hit = hit.map(|t| t.id.clone());

        let transitions = self.dwell.tick(hit, now);
        self.publish(transitions, &mut report);
        report
    }

    /// Fire any timer that is due without new gaze input.
    pub fn poll(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        if self.is_ready() {
            if let Some(target) = self.dwell.poll(now) {
                self.publish(vec![DwellTransition::Committed(target)], &mut report);
            }
        } else {
            report.calibrated = self.calibration.tick(now, &mut self.commits);
        }
        report
    }

    /// Commit a target directly, bypassing the dwell (manual selection).
    /// The dwell session, if any, is left untouched.
    pub fn press(&mut self, id: &str, targets: &[InteractiveTarget]) -> Option<Commit> {
        match targets.iter().find(|t| t.visible && t.id == id) {
            Some(target) => Some(self.commits.commit(target)),
            None => {
                warn!("manual press on unknown target: {}", id);
                None
            }
        }
    }

    fn publish(&mut self, transitions: Vec<DwellTransition>, report: &mut TickReport) {
        for transition in transitions {
            match transition {
                DwellTransition::Entered(t) => {
                    self.events.send(GazeEvent::HoverEntered {
                        id: t.id,
                        label: t.label,
                    });
                }
                DwellTransition::Left(t) => {
                    self.events.send(GazeEvent::HoverLeft { id: t.id });
                }
                DwellTransition::Committed(t) => {
                    let commit = self.commits.commit(&t);
                    self.events.send(GazeEvent::HoverLeft { id: t.id });
                    report.commits.push(commit);
                }
            }
        }
    }
}

/// The key labelled `label` (case-insensitive), re-tagged as the anchor.
/// Falls back to the keyboard bounds when no such key exists.
fn resolve_anchor(label: &str, targets: &[InteractiveTarget]) -> InteractiveTarget {
    let rect = match targets
        .iter()
        .find(|t| t.label.eq_ignore_ascii_case(label))
    {
        Some(key) => key.rect,
        None => {
            warn!("calibration anchor '{}' not in layout, using keyboard bounds", label);
            target::bounds(targets).unwrap_or_default()
        }
    };
    InteractiveTarget::new("calibration-anchor", label, target::Action::NoOp, rect)
}
