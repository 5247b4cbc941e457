//! Collision resolution for the runner
//!
//! Two kinds of contact: landing on player-drawn lines (or the implicit
//! floor), and overlapping spawned obstacles.

use serde::{Deserialize, Serialize};

use super::geometry::{Polyline, Rect, segment_height_at};
use super::state::PlayerState;
use crate::collaborators::Obstacle;

/// Closest line height under `x` within `tolerance` of `feet_y`
pub fn landing_height(lines: &[Polyline], x: f32, feet_y: f32, tolerance: f32) -> Option<f32> {
    lines
        .iter()
        .flat_map(|line| line.segments())
        .filter_map(|(a, b)| segment_height_at(a, b, x))
        .filter(|h| (feet_y - h).abs() <= tolerance)
        .min_by(|a, b| {
            (feet_y - a)
                .abs()
                .partial_cmp(&(feet_y - b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Snap a falling player onto a line. Returns true if grounded on one.
pub fn resolve_line_landing(
    player: &mut PlayerState,
    x: f32,
    lines: &[Polyline],
    tolerance: f32,
) -> bool {
    // Rising players pass through lines from below
    if player.y_velocity < 0.0 {
        return false;
    }
    match landing_height(lines, x, player.y, tolerance) {
        Some(h) => {
            player.y = h;
            player.y_velocity = 0.0;
            player.grounded = true;
            true
        }
        None => false,
    }
}

/// Implicit floor. Returns true if the player was clamped onto it.
pub fn resolve_floor(player: &mut PlayerState, ground_y: f32) -> bool {
    if player.y >= ground_y {
        player.y = ground_y;
        player.y_velocity = player.y_velocity.min(0.0);
        player.grounded = true;
        true
    } else {
        false
    }
}

/// First obstacle overlapping the hitbox
pub fn first_overlap<'a>(hitbox: &Rect, obstacles: &'a [Obstacle]) -> Option<&'a Obstacle> {
    obstacles.iter().find(|o| hitbox.overlaps(&o.rect))
}

/// Near-miss bookkeeping carried across ticks.
///
/// An obstacle entering the margin zone becomes a candidate. It is credited
/// once it leaves the zone, or the field, without ever touching the hitbox.
/// Touching disqualifies it for good.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearMissTracker {
    candidates: Vec<u32>,
    touched: Vec<u32>,
}

impl NearMissTracker {
    /// Returns the near misses completed this tick
    pub fn update(&mut self, hitbox: &Rect, margin: f32, obstacles: &[Obstacle]) -> u32 {
        if margin <= 0.0 {
            self.clear();
            return 0;
        }
        let zone = hitbox.expanded(margin);
        for o in obstacles {
            if hitbox.overlaps(&o.rect) {
                self.candidates.retain(|id| *id != o.id);
                if !self.touched.contains(&o.id) {
                    self.touched.push(o.id);
                }
            } else if zone.overlaps(&o.rect)
                && !self.touched.contains(&o.id)
                && !self.candidates.contains(&o.id)
            {
                self.candidates.push(o.id);
            }
        }

        let before = self.candidates.len();
        self.candidates
            .retain(|id| obstacles.iter().any(|o| o.id == *id && zone.overlaps(&o.rect)));
        self.touched.retain(|id| obstacles.iter().any(|o| o.id == *id));
        (before - self.candidates.len()) as u32
    }

    /// Obstacles currently inside the zone and not yet credited
    pub fn pending(&self) -> usize {
        self.candidates.len()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.touched.clear();
    }
}
