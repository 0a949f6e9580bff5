//! Dwell-to-type gaze keyboard core
//!
//! Turns a per-tick stream of raw pupil detections into a stable gaze point,
//! maps it onto on-screen keys, and commits a key once the gaze has dwelled
//! on it long enough. Camera access and model inference stay outside: the
//! host hands in one [`DetectionBatch`] per tick.

pub mod calibration;
pub mod commit;
pub mod config;
pub mod detection;
pub mod dwell;
pub mod engine;
pub mod events;
pub mod feed;
pub mod geometry;
pub mod target;
pub mod timer;
pub mod ui;

pub use calibration::{CalibrationController, CalibrationPhase};
pub use commit::{Commit, CommitHandler, OutputBuffer};
pub use config::Config;
pub use detection::{Aggregator, BatchError, CentroidMode, Detection, DetectionBatch};
pub use dwell::{DwellMachine, DwellState, DwellTransition};
pub use engine::{GazeTyper, TickReport};
pub use events::{EventSender, GazeEvent};
pub use geometry::{Point, Rect, SurfaceGeometry};
pub use target::{Action, HitTester, InteractiveTarget, LinearHitTester};
