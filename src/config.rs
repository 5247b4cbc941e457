//! Game configuration
//!
//! Local tuning (`GameConfig`), remotely delivered balance (`RemoteConfig`)
//! and the player's upgrade snapshot. Every value the simulation or the
//! difficulty controller reads is a named field here, loadable from JSON.
//! Externally supplied values are never trusted: callers either `validate()`
//! them or run them through `sanitized()`, and point-of-use clamping goes
//! through [`Bounds::clamp`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} bounds are inverted (min {min:.3} > max {max:.3})")]
    InvertedBounds {
        field: &'static str,
        min: f32,
        max: f32,
    },
    #[error("{field} must not be negative (got {value:.3})")]
    Negative { field: &'static str, value: f32 },
    #[error("{field} is not a finite number")]
    NotFinite { field: &'static str },
}

/// Inclusive `[min, max]` range for one tuning output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into range. Never panics: inverted bounds are read as
    /// `[max, min]` and NaN collapses to the lower bound.
    pub fn clamp(&self, value: f32) -> f32 {
        let (lo, hi) = if self.min <= self.max {
            (self.min, self.max)
        } else {
            (self.max, self.min)
        };
        if value.is_nan() {
            return lo;
        }
        value.max(lo).min(hi)
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    fn check(&self, field: &'static str) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NotFinite { field });
        }
        if self.min > self.max {
            return Err(ConfigError::InvertedBounds {
                field,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    fn repaired(self, field: &'static str, fallback: Bounds) -> Self {
        match self.check(field) {
            Ok(()) => self,
            Err(ConfigError::InvertedBounds { min, max, .. }) => {
                log::warn!("{field}: swapping inverted bounds {min}..{max}");
                Bounds::new(max, min)
            }
            Err(e) => {
                log::warn!("{e}; using defaults");
                fallback
            }
        }
    }
}

fn check_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NotFinite { field });
    }
    if value < 0.0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

/// Floor at zero, replacing garbage with `fallback`
fn non_negative_or(field: &'static str, value: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        log::warn!("{field} is not finite; using {fallback}");
        fallback
    } else if value < 0.0 {
        log::warn!("{field} was negative ({value}); flooring at 0");
        0.0
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Local configuration
// ---------------------------------------------------------------------------

/// Player physics and collision tolerances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Largest delta a single tick will simulate
    pub max_frame_delta_ms: f32,
    /// Duration of one normalized frame unit
    pub frame_ms: f32,
    /// Downward acceleration per normalized frame (y grows downward)
    pub gravity_per_frame: f32,
    /// Vertical velocity applied on jump (negative = up)
    pub jump_velocity: f32,
    /// Baseline floor height
    pub ground_y: f32,
    /// Fixed horizontal position of the player's center
    pub player_x: f32,
    pub player_width: f32,
    pub player_height: f32,
    /// Vertical band around a line inside which a falling player lands on it
    pub line_snap_tolerance_px: f32,
    pub coyote_ms: f32,
    pub jump_buffer_ms: f32,
    /// Clearance under which a passing obstacle counts as a near miss
    pub near_miss_margin_px: f32,
    pub screen_width: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            max_frame_delta_ms: MAX_FRAME_DELTA_MS,
            frame_ms: FRAME_MS,
            gravity_per_frame: GRAVITY_PER_FRAME,
            jump_velocity: JUMP_VELOCITY,
            ground_y: GROUND_Y,
            player_x: PLAYER_X,
            player_width: PLAYER_SIZE,
            player_height: PLAYER_SIZE,
            line_snap_tolerance_px: LINE_SNAP_TOLERANCE_PX,
            coyote_ms: COYOTE_MS,
            jump_buffer_ms: JUMP_BUFFER_MS,
            near_miss_margin_px: NEAR_MISS_MARGIN_PX,
            screen_width: SCREEN_WIDTH,
        }
    }
}

/// Per-tick timers that are not part of the remote balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Time between rest windows
    pub rest_interval_ms: f32,
    /// Length of each rest window
    pub rest_duration_ms: f32,
    /// Extra ink regen while resting
    pub rest_ink_regen_multiplier: f32,
    pub revive_invulnerability_ms: f32,
    /// Invulnerability left after absorbing a hit
    pub hit_grace_ms: f32,
    /// Display time of transient notifications
    pub notification_ms: f32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            rest_interval_ms: 20_000.0,
            rest_duration_ms: 5_000.0,
            rest_ink_regen_multiplier: 1.5,
            revive_invulnerability_ms: 2_000.0,
            hit_grace_ms: 350.0,
            notification_ms: 1_800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Score per second of survival at speed multiplier 1.0
    pub points_per_second: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            points_per_second: 20.0,
        }
    }
}

/// End-of-run bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Score needed per bonus tier
    pub bonus_step: u64,
    /// Coins paid for tier 1
    pub bonus_base: u64,
    /// Additional coins per tier above 1
    pub bonus_increment: u64,
    /// Consecutive accident deaths before a grace run is granted
    pub accident_streak_threshold: u32,
    /// Start grace of the granted run
    pub grace_period_ms: f32,
    /// Density factor of the granted run
    pub grace_density_multiplier: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            bonus_step: 500,
            bonus_base: 25,
            bonus_increment: 15,
            accident_streak_threshold: 3,
            grace_period_ms: 8_000.0,
            grace_density_multiplier: 0.7,
        }
    }
}

/// Complete local configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub physics: PhysicsConfig,
    pub timers: TimerConfig,
    pub scoring: ScoringConfig,
    pub rewards: RewardConfig,
}

impl GameConfig {
    /// Parse from JSON; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        check_non_negative("physics.max_frame_delta_ms", p.max_frame_delta_ms)?;
        check_non_negative("physics.gravity_per_frame", p.gravity_per_frame)?;
        check_non_negative("physics.line_snap_tolerance_px", p.line_snap_tolerance_px)?;
        check_non_negative("physics.coyote_ms", p.coyote_ms)?;
        check_non_negative("physics.jump_buffer_ms", p.jump_buffer_ms)?;
        check_non_negative("physics.near_miss_margin_px", p.near_miss_margin_px)?;
        if !(p.frame_ms.is_finite() && p.frame_ms > 0.0) {
            return Err(ConfigError::NotFinite {
                field: "physics.frame_ms",
            });
        }
        let t = &self.timers;
        check_non_negative("timers.rest_interval_ms", t.rest_interval_ms)?;
        check_non_negative("timers.rest_duration_ms", t.rest_duration_ms)?;
        check_non_negative("timers.revive_invulnerability_ms", t.revive_invulnerability_ms)?;
        check_non_negative("timers.hit_grace_ms", t.hit_grace_ms)?;
        check_non_negative("scoring.points_per_second", self.scoring.points_per_second)?;
        check_non_negative("rewards.grace_period_ms", self.rewards.grace_period_ms)?;
        Ok(())
    }

    /// Copy with every out-of-range value repaired
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let mut c = self.clone();
        let p = &mut c.physics;
        p.max_frame_delta_ms = non_negative_or(
            "physics.max_frame_delta_ms",
            p.max_frame_delta_ms,
            d.physics.max_frame_delta_ms,
        );
        if !(p.frame_ms.is_finite() && p.frame_ms > 0.0) {
            log::warn!("physics.frame_ms invalid ({}); using default", p.frame_ms);
            p.frame_ms = d.physics.frame_ms;
        }
        p.gravity_per_frame = non_negative_or(
            "physics.gravity_per_frame",
            p.gravity_per_frame,
            d.physics.gravity_per_frame,
        );
        p.line_snap_tolerance_px = non_negative_or(
            "physics.line_snap_tolerance_px",
            p.line_snap_tolerance_px,
            d.physics.line_snap_tolerance_px,
        );
        p.coyote_ms = non_negative_or("physics.coyote_ms", p.coyote_ms, d.physics.coyote_ms);
        p.jump_buffer_ms = non_negative_or(
            "physics.jump_buffer_ms",
            p.jump_buffer_ms,
            d.physics.jump_buffer_ms,
        );
        p.near_miss_margin_px = non_negative_or(
            "physics.near_miss_margin_px",
            p.near_miss_margin_px,
            d.physics.near_miss_margin_px,
        );

        let t = &mut c.timers;
        t.rest_interval_ms = non_negative_or(
            "timers.rest_interval_ms",
            t.rest_interval_ms,
            d.timers.rest_interval_ms,
        );
        t.rest_duration_ms = non_negative_or(
            "timers.rest_duration_ms",
            t.rest_duration_ms,
            d.timers.rest_duration_ms,
        );
        t.revive_invulnerability_ms = non_negative_or(
            "timers.revive_invulnerability_ms",
            t.revive_invulnerability_ms,
            d.timers.revive_invulnerability_ms,
        );
        t.hit_grace_ms = non_negative_or("timers.hit_grace_ms", t.hit_grace_ms, d.timers.hit_grace_ms);
        c.scoring.points_per_second = non_negative_or(
            "scoring.points_per_second",
            c.scoring.points_per_second,
            d.scoring.points_per_second,
        );
        c.rewards.grace_period_ms = non_negative_or(
            "rewards.grace_period_ms",
            c.rewards.grace_period_ms,
            d.rewards.grace_period_ms,
        );
        c
    }
}

// ---------------------------------------------------------------------------
// Remote configuration
// ---------------------------------------------------------------------------

/// Base balance and speed ramp delivered by remote config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteDifficultyConfig {
    pub base_speed_multiplier: f32,
    pub base_density_multiplier: f32,
    /// Score distance between speed ramps
    pub speed_ramp_interval: u64,
    pub speed_ramp_increment: f32,
    /// Cap for the in-run active speed multiplier
    pub speed_ramp_max: f32,
    /// Obstacle-free opening of the tutorial run
    pub tutorial_safe_window_ms: f32,
    /// Ink fraction below which a one-shot refill is granted
    pub emergency_ink_floor: f32,
    /// Deaths earlier than this count as accidents
    pub accident_death_window_ms: f32,
}

impl Default for RemoteDifficultyConfig {
    fn default() -> Self {
        Self {
            base_speed_multiplier: 1.0,
            base_density_multiplier: 1.0,
            speed_ramp_interval: 400,
            speed_ramp_increment: 0.08,
            speed_ramp_max: 1.8,
            tutorial_safe_window_ms: 6_000.0,
            emergency_ink_floor: 0.1,
            accident_death_window_ms: 6_000.0,
        }
    }
}

/// Every threshold, delta and bound the difficulty controller reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteTuningConfig {
    /// Runs kept in the history sample
    pub history_size: usize,
    pub default_safe_window_px: f32,

    // First run
    pub first_run_speed: f32,
    pub first_run_density: f32,
    pub first_run_coin: f32,
    pub first_run_safe_window_px: f32,

    // Thresholds
    pub long_duration_ms: f32,
    pub short_duration_ms: f32,
    pub high_accident_rate: f32,
    pub low_accident_rate: f32,
    pub high_score: f32,
    pub low_score: f32,

    // Long runs: game too easy
    pub long_speed_delta: f32,
    pub long_density_delta: f32,
    pub long_coin_delta: f32,
    // Short runs: compensate frustration
    pub short_speed_delta: f32,
    pub short_density_delta: f32,
    pub short_coin_delta: f32,
    // Many accident deaths
    pub accident_speed_delta: f32,
    pub accident_density_delta: f32,
    pub accident_safe_window_delta: f32,
    pub accident_coin_delta: f32,
    // Few accidents and long runs
    pub comfort_speed_delta: f32,
    pub comfort_density_delta: f32,
    // Score
    pub high_score_density_delta: f32,
    pub high_score_coin_delta: f32,
    pub low_score_density_delta: f32,
    pub low_score_coin_delta: f32,

    pub speed_bounds: Bounds,
    pub density_bounds: Bounds,
    pub coin_bounds: Bounds,
    pub safe_window_bounds: Bounds,
}

impl Default for RemoteTuningConfig {
    fn default() -> Self {
        Self {
            history_size: RUN_HISTORY_SIZE,
            default_safe_window_px: 120.0,

            first_run_speed: 0.85,
            first_run_density: 0.75,
            first_run_coin: 1.2,
            first_run_safe_window_px: 180.0,

            long_duration_ms: 45_000.0,
            short_duration_ms: 15_000.0,
            high_accident_rate: 0.4,
            low_accident_rate: 0.1,
            high_score: 900.0,
            low_score: 250.0,

            long_speed_delta: 0.1,
            long_density_delta: 0.1,
            long_coin_delta: -0.1,
            short_speed_delta: -0.1,
            short_density_delta: -0.1,
            short_coin_delta: 0.15,
            accident_speed_delta: -0.1,
            accident_density_delta: -0.15,
            accident_safe_window_delta: 90.0,
            accident_coin_delta: 0.2,
            comfort_speed_delta: 0.05,
            comfort_density_delta: 0.05,
            high_score_density_delta: 0.1,
            high_score_coin_delta: -0.05,
            low_score_density_delta: -0.1,
            low_score_coin_delta: 0.1,

            speed_bounds: Bounds::new(0.7, 1.5),
            density_bounds: Bounds::new(0.6, 1.6),
            coin_bounds: Bounds::new(0.8, 1.4),
            safe_window_bounds: Bounds::new(80.0, 200.0),
        }
    }
}

/// Remote config as delivered to the core (read-only snapshot)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub difficulty: RemoteDifficultyConfig,
    pub tuning: RemoteTuningConfig,
}

impl RemoteConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tuning;
        t.speed_bounds.check("tuning.speed_bounds")?;
        t.density_bounds.check("tuning.density_bounds")?;
        t.coin_bounds.check("tuning.coin_bounds")?;
        t.safe_window_bounds.check("tuning.safe_window_bounds")?;
        let d = &self.difficulty;
        check_non_negative("difficulty.base_speed_multiplier", d.base_speed_multiplier)?;
        check_non_negative("difficulty.base_density_multiplier", d.base_density_multiplier)?;
        check_non_negative("difficulty.speed_ramp_increment", d.speed_ramp_increment)?;
        check_non_negative("difficulty.speed_ramp_max", d.speed_ramp_max)?;
        check_non_negative("difficulty.tutorial_safe_window_ms", d.tutorial_safe_window_ms)?;
        check_non_negative("difficulty.emergency_ink_floor", d.emergency_ink_floor)?;
        check_non_negative("difficulty.accident_death_window_ms", d.accident_death_window_ms)?;
        Ok(())
    }

    /// Copy with bounds repaired and negative knobs floored
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let mut c = self.clone();
        let t = &mut c.tuning;
        t.speed_bounds = t
            .speed_bounds
            .repaired("tuning.speed_bounds", defaults.tuning.speed_bounds);
        t.density_bounds = t
            .density_bounds
            .repaired("tuning.density_bounds", defaults.tuning.density_bounds);
        t.coin_bounds = t
            .coin_bounds
            .repaired("tuning.coin_bounds", defaults.tuning.coin_bounds);
        t.safe_window_bounds = t
            .safe_window_bounds
            .repaired("tuning.safe_window_bounds", defaults.tuning.safe_window_bounds);
        if t.history_size == 0 {
            log::warn!("tuning.history_size was 0; using {}", defaults.tuning.history_size);
            t.history_size = defaults.tuning.history_size;
        }

        let d = &mut c.difficulty;
        let dd = &defaults.difficulty;
        d.base_speed_multiplier = non_negative_or(
            "difficulty.base_speed_multiplier",
            d.base_speed_multiplier,
            dd.base_speed_multiplier,
        );
        d.base_density_multiplier = non_negative_or(
            "difficulty.base_density_multiplier",
            d.base_density_multiplier,
            dd.base_density_multiplier,
        );
        d.speed_ramp_increment = non_negative_or(
            "difficulty.speed_ramp_increment",
            d.speed_ramp_increment,
            dd.speed_ramp_increment,
        );
        d.speed_ramp_max =
            non_negative_or("difficulty.speed_ramp_max", d.speed_ramp_max, dd.speed_ramp_max);
        d.tutorial_safe_window_ms = non_negative_or(
            "difficulty.tutorial_safe_window_ms",
            d.tutorial_safe_window_ms,
            dd.tutorial_safe_window_ms,
        );
        d.emergency_ink_floor = non_negative_or(
            "difficulty.emergency_ink_floor",
            d.emergency_ink_floor,
            dd.emergency_ink_floor,
        )
        .min(1.0);
        d.accident_death_window_ms = non_negative_or(
            "difficulty.accident_death_window_ms",
            d.accident_death_window_ms,
            dd.accident_death_window_ms,
        );
        if d.speed_ramp_interval == 0 {
            log::warn!("difficulty.speed_ramp_interval was 0; using default");
            d.speed_ramp_interval = dd.speed_ramp_interval;
        }
        c
    }
}

// ---------------------------------------------------------------------------
// Upgrades
// ---------------------------------------------------------------------------

/// Purchased upgrades, read once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeSnapshot {
    pub ink_regen_multiplier: f32,
    pub max_revives: u32,
    pub coyote_bonus_ms: f32,
}

impl Default for UpgradeSnapshot {
    fn default() -> Self {
        Self {
            ink_regen_multiplier: 1.0,
            max_revives: 1,
            coyote_bonus_ms: 0.0,
        }
    }
}

impl UpgradeSnapshot {
    /// Regen multiplier range accepted from the upgrade store
    pub const INK_REGEN_BOUNDS: Bounds = Bounds::new(0.1, 10.0);

    pub fn sanitized(&self) -> Self {
        Self {
            ink_regen_multiplier: Self::INK_REGEN_BOUNDS.clamp(self.ink_regen_multiplier),
            max_revives: self.max_revives,
            coyote_bonus_ms: non_negative_or("upgrades.coyote_bonus_ms", self.coyote_bonus_ms, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_clamp_tolerates_garbage() {
        let b = Bounds::new(0.5, 1.5);
        assert_eq!(b.clamp(2.0), 1.5);
        assert_eq!(b.clamp(0.1), 0.5);
        assert_eq!(b.clamp(f32::NAN), 0.5);

        let inverted = Bounds::new(1.5, 0.5);
        assert_eq!(inverted.clamp(2.0), 1.5);
        assert_eq!(inverted.clamp(0.0), 0.5);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(GameConfig::default().validate().is_ok());
        assert!(RemoteConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let cfg = RemoteConfig::from_json(r#"{ "difficulty": { "speed_ramp_max": 2.5 } }"#)
            .expect("valid json");
        assert_eq!(cfg.difficulty.speed_ramp_max, 2.5);
        assert_eq!(cfg.tuning, RemoteTuningConfig::default());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = GameConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_inverted_bounds_rejected_then_repaired() {
        let mut cfg = RemoteConfig::default();
        cfg.tuning.coin_bounds = Bounds::new(2.0, 1.0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvertedBounds { field: "tuning.coin_bounds", .. })
        ));

        let fixed = cfg.sanitized();
        assert_eq!(fixed.tuning.coin_bounds, Bounds::new(1.0, 2.0));
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_sanitize_floors_negative_timers() {
        let mut cfg = GameConfig::default();
        cfg.physics.coyote_ms = -50.0;
        cfg.timers.hit_grace_ms = f32::INFINITY;
        assert!(cfg.validate().is_err());

        let fixed = cfg.sanitized();
        assert_eq!(fixed.physics.coyote_ms, 0.0);
        assert_eq!(fixed.timers.hit_grace_ms, TimerConfig::default().hit_grace_ms);
    }

    #[test]
    fn test_upgrade_snapshot_sanitized() {
        let raw = UpgradeSnapshot {
            ink_regen_multiplier: 50.0,
            max_revives: 2,
            coyote_bonus_ms: -10.0,
        };
        let s = raw.sanitized();
        assert_eq!(s.ink_regen_multiplier, 10.0);
        assert_eq!(s.max_revives, 2);
        assert_eq!(s.coyote_bonus_ms, 0.0);
    }
}
