//! Page geometry: points, rectangles, and the interline scale.
//!
//! All coordinates are in pixels. Relation thresholds are expressed in
//! interline fractions; [`Scale`] converts between the two.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// A point in page pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size centered on `center`.
    pub fn centered(center: Point, width: f64, height: f64) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn left(&self) -> f64 { self.x }
    pub fn right(&self) -> f64 { self.x + self.width }
    pub fn top(&self) -> f64 { self.y }
    pub fn bottom(&self) -> f64 { self.y + self.height }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Reject NaN/infinite coordinates and negative extents.
    pub fn validate(&self) -> Result<()> {
        let finite = [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite());
        if !finite {
            return Err(Error::MalformedGeometry(format!("non-finite bounds {self:?}")));
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err(Error::MalformedGeometry(format!("negative extent {self:?}")));
        }
        Ok(())
    }
}

/// What a relation measures on one endpoint: reference point plus bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub center: Point,
    pub bounds: Rectangle,
}

impl Footprint {
    pub const fn new(center: Point, bounds: Rectangle) -> Self {
        Self { center, bounds }
    }
}

/// Interline scale of a sheet: distance in pixels between two staff lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    interline: f64,
}

impl Scale {
    pub fn new(interline: f64) -> Result<Self> {
        if !interline.is_finite() || interline <= 0.0 {
            return Err(Error::MalformedGeometry(format!("interline must be positive, got {interline}")));
        }
        Ok(Self { interline })
    }

    pub fn interline(&self) -> f64 {
        self.interline
    }

    /// Pixels → interline fraction.
    pub fn to_fraction(&self, pixels: f64) -> f64 {
        pixels / self.interline
    }

    /// Interline fraction → pixels.
    pub fn to_pixels(&self, fraction: f64) -> f64 {
        fraction * self.interline
    }
}
