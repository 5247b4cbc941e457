//! End-of-run bookkeeping
//!
//! Pays out coins and score-bonus tiers, records the run in the history and
//! tracks the accident streak that earns a lenient follow-up run. The
//! session calls [`RunFinalizer::bank`] at most once per run.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, RewardConfig};
use crate::history::{RunHistory, RunStats};

/// Persistent player progress touched by the finalizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Progress {
    pub total_coins: u64,
    /// Highest score-bonus tier ever paid
    pub highest_bonus_tier: u64,
    /// Consecutive accident deaths
    pub accident_streak: u32,
    /// A grace run is owed to the next `start()`
    pub grace_pending: bool,
    pub runs_completed: u64,
}

impl Progress {
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// What one run paid out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReward {
    pub coins: u64,
    /// Newly reached bonus tier, if any
    pub bonus_tier: Option<u64>,
    pub bonus_coins: u64,
    /// The accident streak just earned a grace run
    pub grace_granted: bool,
}

impl RunReward {
    pub fn total(&self) -> u64 {
        self.coins + self.bonus_coins
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunFinalizer {
    config: RewardConfig,
    progress: Progress,
}

impl RunFinalizer {
    pub fn new(config: RewardConfig, progress: Progress) -> Self {
        Self { config, progress }
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Score-bonus tier reached by `score` (0 = none)
    pub fn tier_for_score(&self, score: u64) -> u64 {
        if self.config.bonus_step == 0 {
            return 0;
        }
        score / self.config.bonus_step
    }

    /// Coins paid for reaching `tier` (tier >= 1)
    pub fn bonus_for_tier(&self, tier: u64) -> u64 {
        if tier == 0 {
            return 0;
        }
        self.config
            .bonus_base
            .saturating_add((tier - 1).saturating_mul(self.config.bonus_increment))
    }

    /// Record a finished run. Not idempotent on its own; callers guard it.
    pub fn bank(&mut self, stats: &RunStats, history: &mut RunHistory) -> RunReward {
        let mut reward = RunReward {
            coins: u64::from(stats.coins),
            ..Default::default()
        };

        let tier = self.tier_for_score(stats.score);
        if tier > self.progress.highest_bonus_tier {
            reward.bonus_tier = Some(tier);
            reward.bonus_coins = self.bonus_for_tier(tier);
            self.progress.highest_bonus_tier = tier;
        }
        self.progress.total_coins = self.progress.total_coins.saturating_add(reward.total());

        history.push(stats.clone());
        self.progress.runs_completed += 1;

        if stats.accident_death {
            self.progress.accident_streak += 1;
            let threshold = self.config.accident_streak_threshold.max(1);
            if self.progress.accident_streak >= threshold {
                self.progress.accident_streak = 0;
                self.progress.grace_pending = true;
                reward.grace_granted = true;
            }
        } else {
            self.progress.accident_streak = 0;
        }

        log::info!(
            "Run banked: score {} coins {} bonus {:?} streak {}",
            stats.score,
            reward.coins,
            reward.bonus_tier,
            self.progress.accident_streak
        );
        reward
    }

    /// Consume a pending grace run
    pub fn take_grace(&mut self) -> bool {
        std::mem::take(&mut self.progress.grace_pending)
    }
}
