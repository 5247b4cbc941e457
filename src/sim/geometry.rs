//! Screen-space geometry for the runner
//!
//! Coordinates are screen pixels with y growing downward, so "above" means
//! a smaller y and the floor is the largest y the player can reach.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + w, y + h))
    }

    /// Player hitbox: centered on `x`, standing on `feet_y`
    pub fn standing_at(x: f32, feet_y: f32, width: f32, height: f32) -> Self {
        Self::new(
            Vec2::new(x - width / 2.0, feet_y - height),
            Vec2::new(x + width / 2.0, feet_y),
        )
    }

    /// Strict overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Grow by `margin` on every side
    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(self.min - Vec2::splat(margin), self.max + Vec2::splat(margin))
    }

    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// A player-drawn line the runner can stand on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Vec2>,
}

impl Polyline {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Consecutive point pairs
    pub fn segments(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }

    /// Sum of segment lengths
    pub fn length(&self) -> f32 {
        self.segments().map(|(a, b)| a.distance(b)).sum()
    }

    pub fn translate(&mut self, offset: Vec2) {
        for p in &mut self.points {
            *p += offset;
        }
    }

    /// Rightmost x of the line (None when empty)
    pub fn max_x(&self) -> Option<f32> {
        self.points.iter().map(|p| p.x).reduce(f32::max)
    }
}

/// Height of segment `a`-`b` at `x`, if its horizontal span covers `x`
pub fn segment_height_at(a: Vec2, b: Vec2, x: f32) -> Option<f32> {
    let (left, right) = if a.x <= b.x { (a, b) } else { (b, a) };
    if x < left.x || x > right.x {
        return None;
    }
    let span = right.x - left.x;
    if span < f32::EPSILON {
        // Vertical segment: the top is the only standable point
        return Some(left.y.min(right.y));
    }
    let t = (x - left.x) / span;
    Some(left.y + (right.y - left.y) * t)
}
