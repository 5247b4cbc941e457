//! Capability interfaces the run core talks to
//!
//! The session never reaches into spawners, the drawing canvas, the upgrade
//! store or the analytics transport directly. It reads and commands them
//! through these narrow traits, one concern each.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::{RemoteConfig, UpgradeSnapshot};
use crate::difficulty::DifficultyTuning;
use crate::history::RunStats;
use crate::sim::geometry::{Polyline, Rect};

/// A spawned hazard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Stable for the obstacle's lifetime (used for near-miss bookkeeping)
    pub id: u32,
    pub rect: Rect,
}

/// Hazard spawner and scroller
pub trait ObstacleField {
    fn configure_difficulty(
        &mut self,
        speed_multiplier: f32,
        density_multiplier: f32,
        safe_window_px: f32,
        start_grace_ms: f32,
    );
    /// Remove every obstacle
    fn reset(&mut self);
    fn start(&mut self, tutorial: bool);
    /// Stop spawning (obstacles stay where they are)
    fn stop(&mut self);
    fn update(&mut self, delta_ms: f32, elapsed_ms: f32);
    fn set_speed_multiplier(&mut self, multiplier: f32);
    fn set_rest_mode(&mut self, resting: bool);
    fn obstacles(&self) -> &[Obstacle];
    /// Current scroll speed in px/ms
    fn scroll_speed(&self) -> f32;
}

/// What the player did with the ink this run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LineUsage {
    pub used_line: bool,
    pub draw_time_ms: f32,
    pub ink_efficiency: f32,
}

/// Player-drawn platforms and the ink that pays for them
pub trait LineGeometry {
    fn lines(&self) -> &[Polyline];
    /// Scroll lines left by `scroll_px` and regenerate ink
    fn update(&mut self, delta_ms: f32, scroll_px: f32, ink_regen_multiplier: f32);
    fn clear_all_lines(&mut self);
    /// Clear lines, refill ink and zero the usage counters
    fn reset(&mut self);
    /// Refill if ink is below `floor` (fraction of capacity). True if refilled.
    fn grant_emergency_ink(&mut self, floor: f32) -> bool;
    fn usage(&self) -> LineUsage;
}

/// Coin spawner and pickup tracker
pub trait CoinField {
    fn reset(&mut self);
    fn configure_spawn(&mut self, multiplier: f32);
    fn set_rest_window_active(&mut self, active: bool);
    fn maybe_spawn_coin(&mut self, elapsed_ms: f32, screen_width: f32, ground_y: f32);
    fn update(&mut self, delta_ms: f32, scroll_speed: f32, player_hitbox: &Rect, screen_width: f32);
    /// Coins picked up since the last reset
    fn collected(&self) -> u32;
}

pub trait UpgradeProvider {
    fn upgrades(&self) -> UpgradeSnapshot;
}

impl UpgradeProvider for UpgradeSnapshot {
    fn upgrades(&self) -> UpgradeSnapshot {
        self.clone()
    }
}

pub trait RemoteConfigProvider {
    fn remote_config(&self) -> RemoteConfig;
}

impl RemoteConfigProvider for RemoteConfig {
    fn remote_config(&self) -> RemoteConfig {
        self.clone()
    }
}

/// Payload of the run-start telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStartInfo {
    pub run_number: u64,
    pub tutorial: bool,
    pub tuning: DifficultyTuning,
    pub boost: Option<RunBoost>,
}

/// Fire-and-forget analytics. Implementations swallow their own failures.
pub trait TelemetrySink {
    fn run_started(&mut self, info: &RunStartInfo);
    fn run_ended(&mut self, stats: &RunStats);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn run_started(&mut self, _info: &RunStartInfo) {}
    fn run_ended(&mut self, _stats: &RunStats) {}
}

/// Writes events to the log as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn run_started(&mut self, info: &RunStartInfo) {
        match serde_json::to_string(info) {
            Ok(json) => log::info!(target: "telemetry", "run_start {json}"),
            Err(e) => log::debug!(target: "telemetry", "dropping run_start: {e}"),
        }
    }

    fn run_ended(&mut self, stats: &RunStats) {
        match serde_json::to_string(stats) {
            Ok(json) => log::info!(target: "telemetry", "run_end {json}"),
            Err(e) => log::debug!(target: "telemetry", "dropping run_end: {e}"),
        }
    }
}

/// Time-limited coin/ink multiplier, consumed at run start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunBoost {
    pub duration_ms: f32,
    pub coin_multiplier: f32,
    pub ink_regen_multiplier: f32,
}

/// External queue of purchased boosts
pub trait BoostQueue {
    fn take_boost(&mut self) -> Option<RunBoost>;
}

impl BoostQueue for VecDeque<RunBoost> {
    fn take_boost(&mut self) -> Option<RunBoost> {
        self.pop_front()
    }
}

/// Read-only services bundled for the session
pub struct Services {
    pub upgrades: Box<dyn UpgradeProvider>,
    pub remote: Box<dyn RemoteConfigProvider>,
    pub telemetry: Box<dyn TelemetrySink>,
    pub boosts: Box<dyn BoostQueue>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            upgrades: Box::new(UpgradeSnapshot::default()),
            remote: Box::new(RemoteConfig::default()),
            telemetry: Box::new(NullTelemetry),
            boosts: Box::new(VecDeque::<RunBoost>::new()),
        }
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
