//! Ink Runner - run core of a side-scrolling endless runner
//!
//! The player jumps over obstacles and draws ink lines to stand on.
//!
//! Core modules:
//! - `sim`: Session lifecycle and the per-frame step (physics, timers, hazards)
//! - `difficulty`: Adaptive tuning from recent run history
//! - `finalize`: End-of-run rewards and the accident-streak grace run
//! - `collaborators`: Traits the session drives (obstacles, lines, coins, telemetry)
//! - `fields`: Seeded reference implementations of those traits
//! - `config`: Data-driven game balance

pub mod collaborators;
pub mod config;
pub mod difficulty;
pub mod fields;
pub mod finalize;
pub mod history;
pub mod signals;
pub mod sim;

pub use config::{ConfigError, GameConfig, RemoteConfig, UpgradeSnapshot};
pub use difficulty::{DifficultyTuning, compute_tuning};
pub use finalize::{Progress, RunFinalizer, RunReward};
pub use history::{RunHistory, RunStats};
pub use sim::{Session, SessionPhase, TickInput};

/// Default tuning constants
pub mod consts {
    /// Largest delta a single tick will simulate (a stalled tab never replays its backlog)
    pub const MAX_FRAME_DELTA_MS: f32 = 33.0;
    /// Reference frame that per-frame physics values are expressed in
    pub const FRAME_MS: f32 = 1000.0 / 60.0;

    /// Physics, per reference frame. y grows downward.
    pub const GRAVITY_PER_FRAME: f32 = 0.6;
    pub const JUMP_VELOCITY: f32 = -11.0;

    /// Play field
    pub const SCREEN_WIDTH: f32 = 420.0;
    pub const GROUND_Y: f32 = 320.0;

    /// Player sits at a fixed x; the world scrolls past
    pub const PLAYER_X: f32 = 90.0;
    pub const PLAYER_SIZE: f32 = 34.0;

    /// Vertical tolerance for snapping onto a drawn line
    pub const LINE_SNAP_TOLERANCE_PX: f32 = 14.0;
    pub const COYOTE_MS: f32 = 100.0;
    pub const JUMP_BUFFER_MS: f32 = 120.0;
    pub const NEAR_MISS_MARGIN_PX: f32 = 16.0;

    /// Runs the difficulty controller looks back over
    pub const RUN_HISTORY_SIZE: usize = 5;
}
