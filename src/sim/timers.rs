//! Per-tick timer primitives
//!
//! All timers are accumulators advanced synchronously by the tick, never
//! independent clocks. Countdowns floor at zero.

use serde::{Deserialize, Serialize};

use crate::collaborators::RunBoost;

/// Countdown floored at zero (coyote, jump buffer, invulnerability)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining_ms: f32,
}

impl Countdown {
    pub fn set(&mut self, ms: f32) {
        self.remaining_ms = if ms.is_finite() { ms.max(0.0) } else { 0.0 };
    }

    pub fn advance(&mut self, delta_ms: f32) {
        self.remaining_ms = (self.remaining_ms - delta_ms).max(0.0);
    }

    pub fn clear(&mut self) {
        self.remaining_ms = 0.0;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.remaining_ms > 0.0
    }

    #[inline]
    pub fn remaining_ms(&self) -> f32 {
        self.remaining_ms
    }
}

/// Phase of the rest-window duty cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RestPhase {
    /// Counting toward the next rest window
    Idle { elapsed_ms: f32 },
    /// Inside a rest window
    Active { elapsed_ms: f32 },
}

/// Edge produced by [`DutyCycle::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestTransition {
    Entered,
    Exited,
}

/// Self-sustaining idle/active cycle. The phase is a position within one
/// `interval + duration` period, so overflow past a boundary carries into the
/// next phase and the active share does not depend on frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DutyCycle {
    interval_ms: f32,
    duration_ms: f32,
    phase: RestPhase,
}

impl DutyCycle {
    pub fn new(interval_ms: f32, duration_ms: f32) -> Self {
        let sane = |ms: f32| if ms.is_finite() { ms.max(0.0) } else { 0.0 };
        Self {
            interval_ms: sane(interval_ms),
            duration_ms: sane(duration_ms),
            phase: RestPhase::Idle { elapsed_ms: 0.0 },
        }
    }

    pub fn phase(&self) -> RestPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, RestPhase::Active { .. })
    }

    /// Advance the cycle; reports a net phase change, if any
    pub fn advance(&mut self, delta_ms: f32) -> Option<RestTransition> {
        let period = self.interval_ms + self.duration_ms;
        // A zero-length window disables resting entirely
        if self.duration_ms <= 0.0 || !period.is_finite() {
            return None;
        }
        let was_active = self.is_active();
        let offset = match self.phase {
            RestPhase::Idle { elapsed_ms } => elapsed_ms,
            RestPhase::Active { elapsed_ms } => self.interval_ms + elapsed_ms,
        };
        let delta = if delta_ms.is_finite() { delta_ms.max(0.0) } else { 0.0 };
        let position = (offset + delta).rem_euclid(period);
        self.phase = if position < self.interval_ms {
            RestPhase::Idle {
                elapsed_ms: position,
            }
        } else {
            RestPhase::Active {
                elapsed_ms: position - self.interval_ms,
            }
        };

        match (was_active, self.is_active()) {
            (false, true) => Some(RestTransition::Entered),
            (true, false) => Some(RestTransition::Exited),
            _ => None,
        }
    }
}

/// Run boost lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum BoostTimer {
    #[default]
    Idle,
    Active {
        remaining_ms: f32,
        coin_multiplier: f32,
        ink_regen_multiplier: f32,
    },
}

impl BoostTimer {
    /// Arm with a boost; non-positive durations leave it idle
    pub fn activate(&mut self, boost: &RunBoost) {
        let sane = |m: f32| if m.is_finite() { m.max(0.0) } else { 1.0 };
        *self = if boost.duration_ms.is_finite() && boost.duration_ms > 0.0 {
            BoostTimer::Active {
                remaining_ms: boost.duration_ms,
                coin_multiplier: sane(boost.coin_multiplier),
                ink_regen_multiplier: sane(boost.ink_regen_multiplier),
            }
        } else {
            BoostTimer::Idle
        };
    }

    /// Count down; returns true on the single tick the boost expires
    pub fn advance(&mut self, delta_ms: f32) -> bool {
        if let BoostTimer::Active { remaining_ms, .. } = self {
            *remaining_ms -= delta_ms;
            if *remaining_ms <= 0.0 {
                *self = BoostTimer::Idle;
                return true;
            }
        }
        false
    }

    pub fn is_active(&self) -> bool {
        matches!(self, BoostTimer::Active { .. })
    }

    pub fn remaining_ms(&self) -> f32 {
        match self {
            BoostTimer::Active { remaining_ms, .. } => remaining_ms.max(0.0),
            BoostTimer::Idle => 0.0,
        }
    }

    pub fn coin_multiplier(&self) -> f32 {
        match self {
            BoostTimer::Active { coin_multiplier, .. } => *coin_multiplier,
            BoostTimer::Idle => 1.0,
        }
    }

    pub fn ink_regen_multiplier(&self) -> f32 {
        match self {
            BoostTimer::Active {
                ink_regen_multiplier,
                ..
            } => *ink_regen_multiplier,
            BoostTimer::Idle => 1.0,
        }
    }
}
