//! Points, rectangles and the coordinate mapper
//!
//! A gaze point travels through three spaces every tick:
//! - **model space**: the square inference input (e.g. 384x384)
//! - **render space**: the capture surface in its own pixels
//! - **target space**: where interactive targets live (page/screen)
//!
//! Mapping is independent linear scaling per axis. Degenerate sizes yield
//! `None` ("no signal this tick") instead of dividing by zero.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// True when either side is zero, negative or not a number.
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Inclusive on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.right().max(other.right()) - x,
            self.bottom().max(other.bottom()) - y,
        )
    }
}

/// Per-tick geometry reported by the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceGeometry {
    /// Capture/render resolution in its own pixels.
    pub render_width: f32,
    pub render_height: f32,
    /// Where the render surface sits in target space.
    pub placement: Rect,
}

impl SurfaceGeometry {
    /// The render surface's local bounding rectangle.
    pub fn local_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.render_width, self.render_height)
    }

    /// Model space -> render space -> target space in one step.
    pub fn model_to_target(&self, p: Point, model_size: f32) -> Option<Point> {
        let render = to_render_space(p, model_size, self.render_width, self.render_height)?;
        to_target_space(render, &self.local_rect(), &self.placement)
    }
}

/// Scale a model-space point onto the render surface.
pub fn to_render_space(
    p: Point,
    model_size: f32,
    render_width: f32,
    render_height: f32,
) -> Option<Point> {
    if !(model_size > 0.0 && render_width > 0.0 && render_height > 0.0) {
        return None;
    }
    Some(Point::new(
        p.x / model_size * render_width,
        p.y / model_size * render_height,
    ))
}

/// Map a point from the render surface's local rectangle into target space.
pub fn to_target_space(p: Point, render_rect: &Rect, target_rect: &Rect) -> Option<Point> {
    if render_rect.is_degenerate() || target_rect.is_degenerate() {
        return None;
    }
    let sx = target_rect.width / render_rect.width;
    let sy = target_rect.height / render_rect.height;
    Some(Point::new(
        target_rect.x + (p.x - render_rect.x) * sx,
        target_rect.y + (p.y - render_rect.y) * sy,
    ))
}
