//! Single-lane hazard spawner

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::collaborators::{Obstacle, ObstacleField};
use crate::consts::{GROUND_Y, SCREEN_WIDTH};
use crate::sim::geometry::Rect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Scroll speed at multiplier 1.0
    pub base_scroll_px_per_ms: f32,
    /// Mean gap between spawns at density 1.0
    pub base_spawn_interval_ms: f32,
    pub min_width: f32,
    pub max_width: f32,
    pub min_height: f32,
    pub max_height: f32,
    /// Density factor while in tutorial mode
    pub tutorial_density: f32,
    pub screen_width: f32,
    pub ground_y: f32,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            base_scroll_px_per_ms: 0.3,
            base_spawn_interval_ms: 1_400.0,
            min_width: 24.0,
            max_width: 48.0,
            min_height: 30.0,
            max_height: 70.0,
            tutorial_density: 0.5,
            screen_width: SCREEN_WIDTH,
            ground_y: GROUND_Y,
        }
    }
}

/// Obstacles enter at the right edge and scroll left at a shared speed.
/// Spawning pauses during the start grace and rest windows.
#[derive(Debug, Clone)]
pub struct ObstacleLane {
    config: LaneConfig,
    rng: Pcg32,
    obstacles: Vec<Obstacle>,
    next_id: u32,
    speed_multiplier: f32,
    density: f32,
    safe_window_px: f32,
    start_grace_ms: f32,
    cooldown_ms: f32,
    running: bool,
    resting: bool,
    tutorial: bool,
}

impl ObstacleLane {
    pub fn new(config: LaneConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Pcg32::seed_from_u64(seed),
            obstacles: Vec::new(),
            next_id: 1,
            speed_multiplier: 1.0,
            density: 1.0,
            safe_window_px: 0.0,
            start_grace_ms: 0.0,
            cooldown_ms: 0.0,
            running: false,
            resting: false,
            tutorial: false,
        }
    }

    pub fn config(&self) -> &LaneConfig {
        &self.config
    }

    fn effective_density(&self) -> f32 {
        let tutorial = if self.tutorial {
            self.config.tutorial_density
        } else {
            1.0
        };
        self.density * tutorial
    }

    /// Delay before the next spawn. Never shorter than the time the
    /// safe window takes to scroll past.
    fn roll_cooldown(&mut self) -> f32 {
        let density = self.effective_density();
        if density <= 0.0 {
            return f32::INFINITY;
        }
        let jitter = self.rng.random_range(0.7..1.3);
        let gap = self.config.base_spawn_interval_ms / density * jitter;
        let speed = self.scroll_speed();
        let safe = if speed > 0.0 {
            (self.safe_window_px + self.config.max_width) / speed
        } else {
            0.0
        };
        gap.max(safe)
    }

    fn spawn(&mut self) {
        let c = &self.config;
        let (w_lo, w_hi) = (c.min_width, c.max_width.max(c.min_width + 1.0));
        let (h_lo, h_hi) = (c.min_height, c.max_height.max(c.min_height + 1.0));
        let w = self.rng.random_range(w_lo..w_hi);
        let h = self.rng.random_range(h_lo..h_hi);
        let rect = Rect::from_xywh(self.config.screen_width, self.config.ground_y - h, w, h);
        self.obstacles.push(Obstacle {
            id: self.next_id,
            rect,
        });
        self.next_id = self.next_id.wrapping_add(1);
    }
}

impl ObstacleField for ObstacleLane {
    fn configure_difficulty(
        &mut self,
        speed_multiplier: f32,
        density_multiplier: f32,
        safe_window_px: f32,
        start_grace_ms: f32,
    ) {
        self.speed_multiplier = speed_multiplier.max(0.0);
        self.density = density_multiplier.max(0.0);
        self.safe_window_px = safe_window_px.max(0.0);
        self.start_grace_ms = start_grace_ms.max(0.0);
    }

    fn reset(&mut self) {
        self.obstacles.clear();
        self.cooldown_ms = 0.0;
        self.running = false;
        self.resting = false;
    }

    fn start(&mut self, tutorial: bool) {
        self.running = true;
        self.tutorial = tutorial;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn update(&mut self, delta_ms: f32, elapsed_ms: f32) {
        if !self.running {
            return;
        }
        let dx = self.scroll_speed() * delta_ms;
        for o in &mut self.obstacles {
            o.rect = o.rect.translated(Vec2::new(-dx, 0.0));
        }
        self.obstacles.retain(|o| o.rect.max.x > 0.0);

        if self.resting || elapsed_ms < self.start_grace_ms {
            return;
        }
        self.cooldown_ms -= delta_ms;
        if self.cooldown_ms <= 0.0 {
            self.spawn();
            self.cooldown_ms = self.roll_cooldown();
        }
    }

    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier.max(0.0);
    }

    fn set_rest_mode(&mut self, resting: bool) {
        self.resting = resting;
    }

    fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    fn scroll_speed(&self) -> f32 {
        if self.running {
            self.config.base_scroll_px_per_ms * self.speed_multiplier
        } else {
            0.0
        }
    }
}
