//! Plain geometry types shared by the document and the widgets.
//!
//! These stay independent of any UI toolkit so the document crate and its
//! tests never pull one in. Node canvas positions are fractional
//! (`0.0..=1.0` maps onto the canvas, values outside are tolerated).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: 0.0,
        y: 0.0,
        w: 0.0,
        h: 0.0,
    };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Strict overlap; rects that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// A rectangle expressed as fractions of some concrete area.
///
/// Widgets keep a `RelativeRect` in their model so layouts survive the
/// surface being resized; it only becomes pixels via [`resolve`].
///
/// [`resolve`]: RelativeRect::resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl RelativeRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn resolve(&self, area: Rect) -> Rect {
        Rect::new(
            area.x + (self.x * f64::from(area.w)) as f32,
            area.y + (self.y * f64::from(area.h)) as f32,
            (self.w * f64::from(area.w)) as f32,
            (self.h * f64::from(area.h)) as f32,
        )
    }

    /// Re-derives the fractions from a concrete rect. A degenerate area
    /// leaves the corresponding axis untouched.
    pub fn update_from(&mut self, rect: Rect, area: Rect) {
        if area.w > 0.0 {
            self.x = f64::from(rect.x - area.x) / f64::from(area.w);
            self.w = f64::from(rect.w) / f64::from(area.w);
        }
        if area.h > 0.0 {
            self.y = f64::from(rect.y - area.y) / f64::from(area.h);
            self.h = f64::from(rect.h) / f64::from(area.h);
        }
    }
}
