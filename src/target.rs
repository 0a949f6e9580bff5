//! Interactive targets and hit testing
//!
//! Targets are owned by the UI collaborator. The core only reads them, and
//! re-reads them every tick since rectangles move on layout reflow.

use crate::geometry::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic effect of committing a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    AppendChar { ch: char },
    AppendSpace,
    DeleteLast,
    /// No buffer mutation; used by the calibration anchor.
    NoOp,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AppendChar { ch } => write!(f, "append '{}'", ch),
            Action::AppendSpace => write!(f, "space"),
            Action::DeleteLast => write!(f, "delete"),
            Action::NoOp => write!(f, "no-op"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveTarget {
    /// Opaque, stable identity
    pub id: String,
    pub label: String,
    pub action: Action,
    pub rect: Rect,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl InteractiveTarget {
    pub fn new(id: impl Into<String>, label: impl Into<String>, action: Action, rect: Rect) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            action,
            rect,
            visible: true,
        }
    }
}

/// Resolves a target-space point to at most one target.
///
/// Implementations must return the first match in slice order so the
/// shared-edge tie-break stays stable when swapping in a spatial index.
pub trait HitTester {
    fn hit<'a>(&self, point: Point, targets: &'a [InteractiveTarget]) -> Option<&'a InteractiveTarget>;
}

/// Linear scan. Bounds are inclusive on all four edges, so a point on the
/// edge shared by two adjacent targets resolves to whichever comes first.
/// Hidden targets never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearHitTester;

impl HitTester for LinearHitTester {
    fn hit<'a>(&self, point: Point, targets: &'a [InteractiveTarget]) -> Option<&'a InteractiveTarget> {
        targets
            .iter()
            .find(|t| t.visible && t.rect.contains(point))
    }
}

/// Bounding box of all visible targets.
pub fn bounds(targets: &[InteractiveTarget]) -> Option<Rect> {
    targets
        .iter()
        .filter(|t| t.visible)
        .map(|t| t.rect)
        .reduce(|acc, r| acc.union(&r))
}
