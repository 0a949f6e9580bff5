//! Notifications for the UI collaborator
//!
//! Sent synchronously from inside the tick, in the order they happen.
//! Only `Committed` carries correctness weight; hover and cursor events are
//! cosmetic.

use crate::calibration::CalibrationPhase;
use crate::commit::Commit;
use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum GazeEvent {
    /// Gaze point in target space
    Cursor { point: Point },
    HoverEntered { id: String, label: String },
    HoverLeft { id: String },
    Committed(Commit),
    Calibration {
        phase: CalibrationPhase,
        message: String,
    },
}

/// Optional channel end. Without a subscriber events are dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSender {
    tx: Option<flume::Sender<GazeEvent>>,
}

impl EventSender {
    pub fn new(tx: flume::Sender<GazeEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn send(&self, event: GazeEvent) {
        if let Some(ref tx) = self.tx {
            // A dropped receiver only means nobody is rendering
            let _ = tx.send(event);
        }
    }
}
