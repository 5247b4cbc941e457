//! Session state and run-scoped bookkeeping
//!
//! Everything a run mutates lives here, owned by the [`Session`](super::Session)
//! and rebuilt wholesale between runs.

use serde::{Deserialize, Serialize};

use super::collision::NearMissTracker;
use super::timers::{BoostTimer, Countdown, DutyCycle};
use crate::config::GameConfig;
use crate::history::RunStats;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for `start()`
    Ready,
    /// Active gameplay
    Running,
    /// Player hit an obstacle; revive or reset
    Dead,
}

/// Vertical player state (horizontal position is fixed)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Feet position (y grows downward)
    pub y: f32,
    pub y_velocity: f32,
    pub grounded: bool,
}

impl PlayerState {
    pub fn on_ground(ground_y: f32) -> Self {
        Self {
            y: ground_y,
            y_velocity: 0.0,
            grounded: true,
        }
    }
}

/// Mutable state of the current run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub player: PlayerState,

    pub score: u64,
    /// Fractional score not yet converted to whole points
    pub score_carry: f32,
    pub elapsed_ms: f32,

    pub coyote: Countdown,
    pub jump_buffer: Countdown,
    pub invulnerability: Countdown,
    /// Absorbed-hit warning already shown for the current invulnerability grant
    pub shield_warned: bool,
    pub revives_used: u32,

    pub rest: DutyCycle,
    pub active_speed_multiplier: f32,
    pub next_speed_ramp_score: u64,
    pub boost: BoostTimer,

    pub jumps_performed: u32,
    pub near_misses: u32,
    pub near_miss_tracker: NearMissTracker,
    pub emergency_ink_granted: bool,
    pub tutorial: bool,

    /// Snapshot taken at death
    pub pending_stats: Option<RunStats>,
    /// Set once the run's rewards and history entry were recorded
    pub banked: bool,
}

impl SessionState {
    /// Fresh state for a new run, every timer configured
    pub fn new(config: &GameConfig) -> Self {
        Self {
            phase: SessionPhase::Ready,
            player: PlayerState::on_ground(config.physics.ground_y),
            score: 0,
            score_carry: 0.0,
            elapsed_ms: 0.0,
            coyote: Countdown::default(),
            jump_buffer: Countdown::default(),
            invulnerability: Countdown::default(),
            shield_warned: false,
            revives_used: 0,
            rest: DutyCycle::new(config.timers.rest_interval_ms, config.timers.rest_duration_ms),
            active_speed_multiplier: 1.0,
            next_speed_ramp_score: 0,
            boost: BoostTimer::Idle,
            jumps_performed: 0,
            near_misses: 0,
            near_miss_tracker: NearMissTracker::default(),
            emergency_ink_granted: false,
            tutorial: false,
            pending_stats: None,
            banked: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn is_resting(&self) -> bool {
        self.rest.is_active()
    }
}
