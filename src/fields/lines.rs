//! Ink-limited line canvas

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collaborators::{LineGeometry, LineUsage};
use crate::sim::geometry::Polyline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InkConfig {
    /// Full tank, in px of line
    pub capacity: f32,
    pub regen_per_ms: f32,
    /// Oldest line is dropped past this count
    pub max_lines: usize,
    /// Emergency refill target as a share of capacity
    pub emergency_refill: f32,
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            capacity: 600.0,
            regen_per_ms: 0.05,
            max_lines: 4,
            emergency_refill: 0.5,
        }
    }
}

/// Player-drawn lines paid for with ink.
///
/// Ink efficiency is the share of spent ink that was not thrown away by
/// overdrawing (lines evicted by `max_lines` before scrolling off).
#[derive(Debug, Clone)]
pub struct InkCanvas {
    config: InkConfig,
    ink: f32,
    lines: Vec<Polyline>,
    lines_drawn: u32,
    draw_time_ms: f32,
    ink_spent: f32,
    ink_wasted: f32,
}

impl InkCanvas {
    pub fn new(config: InkConfig) -> Self {
        let ink = config.capacity.max(0.0);
        Self {
            config,
            ink,
            lines: Vec::new(),
            lines_drawn: 0,
            draw_time_ms: 0.0,
            ink_spent: 0.0,
            ink_wasted: 0.0,
        }
    }

    pub fn ink(&self) -> f32 {
        self.ink
    }

    /// Remaining ink as a share of capacity
    pub fn ink_fraction(&self) -> f32 {
        if self.config.capacity <= 0.0 {
            0.0
        } else {
            (self.ink / self.config.capacity).clamp(0.0, 1.0)
        }
    }

    /// Commit a stroke. Rejected (false) if it is degenerate or costs more
    /// ink than is left.
    pub fn draw_line(&mut self, points: Vec<Vec2>, draw_time_ms: f32) -> bool {
        let line = Polyline::new(points);
        let cost = line.length();
        if cost <= 0.0 || cost > self.ink {
            return false;
        }
        self.ink -= cost;
        self.ink_spent += cost;
        self.draw_time_ms += draw_time_ms.max(0.0);
        self.lines_drawn += 1;
        self.lines.push(line);

        while self.lines.len() > self.config.max_lines.max(1) {
            let evicted = self.lines.remove(0);
            self.ink_wasted += evicted.length();
        }
        true
    }
}

impl Default for InkCanvas {
    fn default() -> Self {
        Self::new(InkConfig::default())
    }
}

impl LineGeometry for InkCanvas {
    fn lines(&self) -> &[Polyline] {
        &self.lines
    }

    fn update(&mut self, delta_ms: f32, scroll_px: f32, ink_regen_multiplier: f32) {
        let offset = Vec2::new(-scroll_px, 0.0);
        for line in &mut self.lines {
            line.translate(offset);
        }
        self.lines
            .retain(|line| line.max_x().is_some_and(|x| x >= 0.0));

        let regen = self.config.regen_per_ms * delta_ms * ink_regen_multiplier.max(0.0);
        self.ink = (self.ink + regen).min(self.config.capacity);
    }

    fn clear_all_lines(&mut self) {
        self.lines.clear();
    }

    fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }

    fn grant_emergency_ink(&mut self, floor: f32) -> bool {
        if self.ink_fraction() >= floor {
            return false;
        }
        let target = self.config.capacity * self.config.emergency_refill.max(floor);
        self.ink = self.ink.max(target).min(self.config.capacity);
        true
    }

    fn usage(&self) -> LineUsage {
        let ink_efficiency = if self.ink_spent > 0.0 {
            1.0 - self.ink_wasted / self.ink_spent
        } else {
            0.0
        };
        LineUsage {
            used_line: self.lines_drawn > 0,
            draw_time_ms: self.draw_time_ms,
            ink_efficiency,
        }
    }
}
