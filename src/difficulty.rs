//! Adaptive difficulty controller
//!
//! A pure function from the recent run history to the next run's tuning.
//! Each rule contributes an independent delta; deltas are summed onto a
//! neutral baseline and only then clamped, so rules never compound.

use serde::{Deserialize, Serialize};

use crate::config::RemoteTuningConfig;
use crate::history::RunHistory;

/// Per-run difficulty knobs handed to the hazard and coin fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTuning {
    pub speed_multiplier: f32,
    pub density_multiplier: f32,
    pub coin_multiplier: f32,
    pub safe_window_px: f32,
}

impl DifficultyTuning {
    /// Neutral multipliers with the configured default safe window
    pub fn baseline(cfg: &RemoteTuningConfig) -> Self {
        Self {
            speed_multiplier: 1.0,
            density_multiplier: 1.0,
            coin_multiplier: 1.0,
            safe_window_px: cfg.default_safe_window_px,
        }
        .clamped(cfg)
    }

    /// Tuning for a player with no history yet
    pub fn first_run(cfg: &RemoteTuningConfig) -> Self {
        Self {
            speed_multiplier: cfg.first_run_speed,
            density_multiplier: cfg.first_run_density,
            coin_multiplier: cfg.first_run_coin,
            safe_window_px: cfg.first_run_safe_window_px,
        }
        .clamped(cfg)
    }

    pub fn clamped(self, cfg: &RemoteTuningConfig) -> Self {
        Self {
            speed_multiplier: cfg.speed_bounds.clamp(self.speed_multiplier),
            density_multiplier: cfg.density_bounds.clamp(self.density_multiplier),
            coin_multiplier: cfg.coin_bounds.clamp(self.coin_multiplier),
            safe_window_px: cfg.safe_window_bounds.clamp(self.safe_window_px),
        }
    }

    pub fn within(&self, cfg: &RemoteTuningConfig) -> bool {
        cfg.speed_bounds.contains(self.speed_multiplier)
            && cfg.density_bounds.contains(self.density_multiplier)
            && cfg.coin_bounds.contains(self.coin_multiplier)
            && cfg.safe_window_bounds.contains(self.safe_window_px)
    }
}

/// Aggregates over the history sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySummary {
    pub runs: usize,
    pub mean_duration_ms: f32,
    pub mean_score: f32,
    pub accident_rate: f32,
}

impl HistorySummary {
    /// `None` for an empty history
    pub fn of(history: &RunHistory, sample: usize) -> Option<Self> {
        let runs: Vec<_> = history.iter().take(sample.max(1)).collect();
        if runs.is_empty() {
            return None;
        }
        let n = runs.len() as f32;
        let total_duration: f32 = runs.iter().map(|r| r.duration_ms).sum();
        let total_score: f64 = runs.iter().map(|r| r.score as f64).sum();
        let accidents = runs.iter().filter(|r| r.accident_death).count();
        Some(Self {
            runs: runs.len(),
            mean_duration_ms: total_duration / n,
            mean_score: (total_score / runs.len() as f64) as f32,
            accident_rate: accidents as f32 / n,
        })
    }
}

/// Compute the next run's tuning. Deterministic in `(history, cfg)`.
pub fn compute_tuning(history: &RunHistory, cfg: &RemoteTuningConfig) -> DifficultyTuning {
    let Some(summary) = HistorySummary::of(history, cfg.history_size) else {
        return DifficultyTuning::first_run(cfg);
    };

    let mut speed = 0.0;
    let mut density = 0.0;
    let mut coin = 0.0;
    let mut safe_window = 0.0;

    let long_runs = summary.mean_duration_ms >= cfg.long_duration_ms;
    if long_runs {
        speed += cfg.long_speed_delta;
        density += cfg.long_density_delta;
        coin += cfg.long_coin_delta;
    } else if summary.mean_duration_ms <= cfg.short_duration_ms {
        speed += cfg.short_speed_delta;
        density += cfg.short_density_delta;
        coin += cfg.short_coin_delta;
    }

    if summary.accident_rate >= cfg.high_accident_rate {
        speed += cfg.accident_speed_delta;
        density += cfg.accident_density_delta;
        safe_window += cfg.accident_safe_window_delta;
        coin += cfg.accident_coin_delta;
    } else if summary.accident_rate <= cfg.low_accident_rate && long_runs {
        speed += cfg.comfort_speed_delta;
        density += cfg.comfort_density_delta;
    }

    if summary.mean_score >= cfg.high_score {
        density += cfg.high_score_density_delta;
        coin += cfg.high_score_coin_delta;
    } else if summary.mean_score <= cfg.low_score {
        density += cfg.low_score_density_delta;
        coin += cfg.low_score_coin_delta;
    }

    DifficultyTuning {
        speed_multiplier: 1.0 + speed,
        density_multiplier: 1.0 + density,
        coin_multiplier: 1.0 + coin,
        safe_window_px: cfg.default_safe_window_px + safe_window,
    }
    .clamped(cfg)
}
