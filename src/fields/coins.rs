//! Coin spawner and pickup

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::collaborators::CoinField;
use crate::sim::geometry::Rect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinConfig {
    /// Mean gap between coins at multiplier 1.0
    pub base_spawn_interval_ms: f32,
    pub radius: f32,
    /// Spawn height band above the ground
    pub min_lift: f32,
    pub max_lift: f32,
    /// Spawn rate factor during rest windows
    pub rest_spawn_multiplier: f32,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            base_spawn_interval_ms: 2_500.0,
            radius: 10.0,
            min_lift: 20.0,
            max_lift: 120.0,
            rest_spawn_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub id: u32,
    pub pos: Vec2,
}

#[derive(Debug, Clone)]
pub struct CoinLane {
    config: CoinConfig,
    rng: Pcg32,
    coins: Vec<Coin>,
    next_id: u32,
    spawn_multiplier: f32,
    resting: bool,
    next_spawn_ms: f32,
    collected: u32,
}

impl CoinLane {
    pub fn new(config: CoinConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Pcg32::seed_from_u64(seed),
            coins: Vec::new(),
            next_id: 1,
            spawn_multiplier: 1.0,
            resting: false,
            next_spawn_ms: 0.0,
            collected: 0,
        }
    }

    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    pub fn spawn_multiplier(&self) -> f32 {
        self.spawn_multiplier
    }

    fn bounds(&self, coin: &Coin) -> Rect {
        let r = self.config.radius;
        Rect::from_xywh(coin.pos.x - r, coin.pos.y - r, 2.0 * r, 2.0 * r)
    }

    fn roll_gap(&mut self) -> f32 {
        let rest = if self.resting {
            self.config.rest_spawn_multiplier
        } else {
            1.0
        };
        let rate = self.spawn_multiplier * rest;
        if rate <= 0.0 {
            return f32::INFINITY;
        }
        self.config.base_spawn_interval_ms / rate * self.rng.random_range(0.6..1.4)
    }
}

impl CoinField for CoinLane {
    fn reset(&mut self) {
        self.coins.clear();
        self.collected = 0;
        self.next_spawn_ms = 0.0;
        self.resting = false;
    }

    fn configure_spawn(&mut self, multiplier: f32) {
        self.spawn_multiplier = if multiplier.is_finite() {
            multiplier.max(0.0)
        } else {
            1.0
        };
    }

    fn set_rest_window_active(&mut self, active: bool) {
        self.resting = active;
    }

    fn maybe_spawn_coin(&mut self, elapsed_ms: f32, screen_width: f32, ground_y: f32) {
        if elapsed_ms < self.next_spawn_ms {
            return;
        }
        let (lo, hi) = (self.config.min_lift, self.config.max_lift.max(self.config.min_lift + 1.0));
        let lift = self.rng.random_range(lo..hi);
        self.coins.push(Coin {
            id: self.next_id,
            pos: Vec2::new(screen_width + self.config.radius, ground_y - lift),
        });
        self.next_id = self.next_id.wrapping_add(1);
        self.next_spawn_ms = elapsed_ms + self.roll_gap();
    }

    fn update(&mut self, delta_ms: f32, scroll_speed: f32, player_hitbox: &Rect, screen_width: f32) {
        let dx = scroll_speed * delta_ms;
        for coin in &mut self.coins {
            coin.pos.x -= dx;
        }
        let hits: Vec<u32> = self
            .coins
            .iter()
            .filter(|c| self.bounds(c).overlaps(player_hitbox))
            .map(|c| c.id)
            .collect();
        let r = self.config.radius;
        self.coins
            .retain(|c| !hits.contains(&c.id) && c.pos.x > -r && c.pos.x < screen_width * 2.0);
        self.collected += hits.len() as u32;
    }

    fn collected(&self) -> u32 {
        self.collected
    }
}
