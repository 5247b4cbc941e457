//! Recording collaborators for session tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec2;

use super::geometry::{Polyline, Rect};
use super::session::Session;
use crate::collaborators::{
    CoinField, LineGeometry, LineUsage, Obstacle, ObstacleField, RemoteConfigProvider, RunBoost,
    RunStartInfo, Services, TelemetrySink,
};
use crate::config::{GameConfig, RemoteConfig, UpgradeSnapshot};
use crate::history::RunStats;

pub type TestSession = Session<FakeObstacles, FakeLines, FakeCoins>;

#[derive(Debug, Default)]
pub struct FakeObstacles {
    pub obstacles: Vec<Obstacle>,
    /// (speed, density, safe window, start grace) per configure call
    pub configured: Vec<(f32, f32, f32, f32)>,
    pub speed_multiplier: f32,
    pub resting: bool,
    pub running: bool,
    pub tutorial: Option<bool>,
    pub resets: u32,
}

impl ObstacleField for FakeObstacles {
    fn configure_difficulty(&mut self, speed: f32, density: f32, safe: f32, grace: f32) {
        self.configured.push((speed, density, safe, grace));
    }
    fn reset(&mut self) {
        self.obstacles.clear();
        self.resets += 1;
    }
    fn start(&mut self, tutorial: bool) {
        self.running = true;
        self.tutorial = Some(tutorial);
    }
    fn stop(&mut self) {
        self.running = false;
    }
    fn update(&mut self, _delta_ms: f32, _elapsed_ms: f32) {}
    fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.speed_multiplier = multiplier;
    }
    fn set_rest_mode(&mut self, resting: bool) {
        self.resting = resting;
    }
    fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }
    fn scroll_speed(&self) -> f32 {
        0.0
    }
}

#[derive(Debug, Default)]
pub struct FakeLines {
    pub lines: Vec<Polyline>,
    pub usage: LineUsage,
    /// Next emergency request succeeds
    pub ink_low: bool,
    pub regen_seen: Vec<f32>,
}

impl LineGeometry for FakeLines {
    fn lines(&self) -> &[Polyline] {
        &self.lines
    }
    fn update(&mut self, _delta_ms: f32, _scroll_px: f32, ink_regen_multiplier: f32) {
        self.regen_seen.push(ink_regen_multiplier);
    }
    fn clear_all_lines(&mut self) {
        self.lines.clear();
    }
    fn reset(&mut self) {
        self.lines.clear();
        self.usage = LineUsage::default();
    }
    fn grant_emergency_ink(&mut self, _floor: f32) -> bool {
        std::mem::take(&mut self.ink_low)
    }
    fn usage(&self) -> LineUsage {
        self.usage
    }
}

#[derive(Debug, Default)]
pub struct FakeCoins {
    pub collected: u32,
    pub spawn_multipliers: Vec<f32>,
    pub resting: bool,
}

impl CoinField for FakeCoins {
    fn reset(&mut self) {
        self.collected = 0;
    }
    fn configure_spawn(&mut self, multiplier: f32) {
        self.spawn_multipliers.push(multiplier);
    }
    fn set_rest_window_active(&mut self, active: bool) {
        self.resting = active;
    }
    fn maybe_spawn_coin(&mut self, _elapsed_ms: f32, _screen_width: f32, _ground_y: f32) {}
    fn update(&mut self, _delta_ms: f32, _scroll: f32, _hitbox: &Rect, _screen_width: f32) {}
    fn collected(&self) -> u32 {
        self.collected
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Started(RunStartInfo),
    Ended(RunStats),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    pub events: Rc<RefCell<Vec<Event>>>,
}

impl TelemetrySink for RecordingTelemetry {
    fn run_started(&mut self, info: &RunStartInfo) {
        self.events.borrow_mut().push(Event::Started(info.clone()));
    }
    fn run_ended(&mut self, stats: &RunStats) {
        self.events.borrow_mut().push(Event::Ended(stats.clone()));
    }
}

/// Remote config a test can edit while the session holds the provider
#[derive(Debug, Clone, Default)]
pub struct SharedRemote(pub Rc<RefCell<RemoteConfig>>);

impl RemoteConfigProvider for SharedRemote {
    fn remote_config(&self) -> RemoteConfig {
        self.0.borrow().clone()
    }
}

pub struct Harness {
    pub upgrades: UpgradeSnapshot,
    pub remote: RemoteConfig,
    pub config: GameConfig,
    pub boosts: VecDeque<RunBoost>,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            upgrades: UpgradeSnapshot::default(),
            remote: RemoteConfig::default(),
            config: GameConfig::default(),
            boosts: VecDeque::new(),
        }
    }
}

impl Harness {
    pub fn build(self) -> (TestSession, Rc<RefCell<Vec<Event>>>) {
        let telemetry = RecordingTelemetry::default();
        let events = Rc::clone(&telemetry.events);
        let services = Services {
            upgrades: Box::new(self.upgrades),
            remote: Box::new(self.remote),
            telemetry: Box::new(telemetry),
            boosts: Box::new(self.boosts),
        };
        let session = Session::new(
            self.config,
            services,
            FakeObstacles::default(),
            FakeLines::default(),
            FakeCoins::default(),
        );
        (session, events)
    }
}

pub fn session() -> TestSession {
    Harness::default().build().0
}

/// Obstacle sitting on the player
pub fn obstacle_on_player(session: &TestSession, id: u32) -> Obstacle {
    Obstacle {
        id,
        rect: session.player_hitbox(),
    }
}

/// Horizontal line at height `y` under the player
pub fn ledge_under_player(session: &TestSession, y: f32) -> Polyline {
    let x = session.config().physics.player_x;
    Polyline::new(vec![Vec2::new(x - 100.0, y), Vec2::new(x + 100.0, y)])
}
