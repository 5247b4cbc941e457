//! Session lifecycle
//!
//! `Ready → Running → Dead → {Running via revive, Ready via reset}`.
//! The session exclusively owns run state and drives the collaborators; the
//! per-frame step lives in [`tick`](super::tick).

use super::geometry::Rect;
use super::state::{PlayerState, SessionPhase, SessionState};
use crate::collaborators::{CoinField, LineGeometry, ObstacleField, RunStartInfo, Services};
use crate::config::{GameConfig, RemoteConfig, UpgradeSnapshot};
use crate::difficulty::{DifficultyTuning, compute_tuning};
use crate::finalize::{Progress, RunFinalizer, RunReward};
use crate::history::{RunHistory, RunStats};
use crate::signals::{Notification, NotificationCenter, NotificationKind, SessionSignals};

/// One player's run loop and everything it owns
#[derive(Debug)]
pub struct Session<O, L, C> {
    pub(super) config: GameConfig,
    pub(super) services: Services,
    pub(super) obstacles: O,
    pub(super) lines: L,
    pub(super) coins: C,
    pub(super) state: SessionState,
    pub(super) history: RunHistory,
    pub(super) finalizer: RunFinalizer,
    /// Frozen per run; refreshed by `start()` or `refresh_dependencies()`
    pub(super) upgrades: UpgradeSnapshot,
    pub(super) remote: RemoteConfig,
    pub(super) tuning: DifficultyTuning,
    pub(super) signals: SessionSignals,
    pub(super) notifications: NotificationCenter,
    pub(super) last_reward: Option<RunReward>,
    pub(super) run_number: u64,
}

impl<O, L, C> Session<O, L, C>
where
    O: ObstacleField,
    L: LineGeometry,
    C: CoinField,
{
    pub fn new(config: GameConfig, services: Services, obstacles: O, lines: L, coins: C) -> Self {
        let config = config.sanitized();
        let state = SessionState::new(&config);
        let finalizer = RunFinalizer::new(config.rewards.clone(), Progress::default());
        let mut session = Self {
            config,
            services,
            obstacles,
            lines,
            coins,
            state,
            history: RunHistory::default(),
            finalizer,
            upgrades: UpgradeSnapshot::default(),
            remote: RemoteConfig::default(),
            tuning: DifficultyTuning::baseline(&RemoteConfig::default().tuning),
            signals: SessionSignals::default(),
            notifications: NotificationCenter::default(),
            last_reward: None,
            run_number: 0,
        };
        session.refresh_dependencies();
        session
    }

    /// Restore persisted history and progress (only while Ready)
    pub fn restore(&mut self, history: RunHistory, progress: Progress) -> bool {
        if self.state.phase != SessionPhase::Ready {
            return false;
        }
        self.history = history;
        self.history.set_capacity(self.remote.tuning.history_size);
        self.finalizer = RunFinalizer::new(self.config.rewards.clone(), progress);
        self.signals.hud.bump();
        true
    }

    /// Re-read the upgrade and remote-config snapshots
    pub fn refresh_dependencies(&mut self) {
        self.upgrades = self.services.upgrades.upgrades().sanitized();
        self.remote = self.services.remote.remote_config().sanitized();
        self.history.set_capacity(self.remote.tuning.history_size);
    }

    /// Begin a run. No-op (false) while already running; from `Dead`
    /// the pending run is banked first.
    pub fn start(&mut self) -> bool {
        match self.state.phase {
            SessionPhase::Running => return false,
            SessionPhase::Dead => {
                self.finalize();
            }
            SessionPhase::Ready => {}
        }

        self.refresh_dependencies();
        let tutorial = self.history.is_empty() && self.finalizer.progress().runs_completed == 0;
        self.tuning = compute_tuning(&self.history, &self.remote.tuning);
        let grace = self.finalizer.take_grace();
        let boost = self.services.boosts.take_boost();

        let difficulty = &self.remote.difficulty;
        let rewards = &self.config.rewards;
        let mut state = SessionState::new(&self.config);
        state.phase = SessionPhase::Running;
        state.tutorial = tutorial;
        state.coyote.set(self.coyote_budget_ms());
        state.active_speed_multiplier = (difficulty.base_speed_multiplier
            * self.tuning.speed_multiplier)
            .min(difficulty.speed_ramp_max);
        state.next_speed_ramp_score = difficulty.speed_ramp_interval.max(1);
        if let Some(boost) = &boost {
            state.boost.activate(boost);
        }

        let mut density = difficulty.base_density_multiplier * self.tuning.density_multiplier;
        let mut start_grace_ms = 0.0_f32;
        if tutorial {
            start_grace_ms = difficulty.tutorial_safe_window_ms;
        }
        if grace {
            density *= rewards.grace_density_multiplier.max(0.0);
            start_grace_ms = start_grace_ms.max(rewards.grace_period_ms);
        }

        self.obstacles.reset();
        self.obstacles.configure_difficulty(
            state.active_speed_multiplier,
            density,
            self.tuning.safe_window_px,
            start_grace_ms,
        );
        self.obstacles.set_speed_multiplier(state.active_speed_multiplier);
        self.obstacles.set_rest_mode(false);
        self.obstacles.start(tutorial);
        self.lines.reset();
        self.coins.reset();
        self.coins.set_rest_window_active(false);
        self.state = state;
        let coin_multiplier = self.coin_spawn_multiplier();
        self.coins.configure_spawn(coin_multiplier);

        self.run_number += 1;
        self.last_reward = None;
        self.notifications.clear();
        self.services.telemetry.run_started(&RunStartInfo {
            run_number: self.run_number,
            tutorial,
            tuning: self.tuning,
            boost,
        });
        log::info!(
            "Run {} started: speed {:.2} density {:.2} coin {:.2} safe {:.0}px{}{}",
            self.run_number,
            self.tuning.speed_multiplier,
            self.tuning.density_multiplier,
            self.tuning.coin_multiplier,
            self.tuning.safe_window_px,
            if tutorial { " (tutorial)" } else { "" },
            if grace { " (grace)" } else { "" },
        );
        self.bump_all();
        true
    }

    pub fn can_revive(&self) -> bool {
        self.state.phase == SessionPhase::Dead
            && !self.state.banked
            && self.state.revives_used < self.upgrades.max_revives
    }

    /// Continue a dead run. No-op (false) unless [`can_revive`](Self::can_revive).
    pub fn revive(&mut self) -> bool {
        if !self.can_revive() {
            return false;
        }
        let coyote_ms = self.coyote_budget_ms();
        self.state.revives_used += 1;
        self.state.pending_stats = None;
        self.state.player = PlayerState::on_ground(self.config.physics.ground_y);
        self.state.jump_buffer.clear();
        self.state.coyote.set(coyote_ms);
        self.state
            .invulnerability
            .set(self.config.timers.revive_invulnerability_ms);
        self.state.shield_warned = false;
        self.state.near_miss_tracker.clear();

        self.obstacles.reset();
        self.obstacles.set_speed_multiplier(self.state.active_speed_multiplier);
        self.obstacles.set_rest_mode(self.state.is_resting());
        self.obstacles.start(self.state.tutorial);
        self.lines.clear_all_lines();

        self.state.phase = SessionPhase::Running;
        log::info!(
            "Revived ({}/{}) at {:.1}s",
            self.state.revives_used,
            self.upgrades.max_revives,
            self.state.elapsed_ms / 1000.0
        );
        self.bump_all();
        true
    }

    /// Back to `Ready` immediately. A dead, unbanked run is banked first;
    /// a run abandoned while `Running` is discarded.
    pub fn reset(&mut self) {
        if self.state.phase == SessionPhase::Dead {
            self.finalize();
        }
        self.state = SessionState::new(&self.config);
        self.obstacles.reset();
        self.lines.reset();
        self.coins.reset();
        self.notifications.clear();
        self.bump_all();
    }

    /// Bank the dead run's rewards and history entry. Idempotent: only the
    /// first call after a death does anything.
    pub fn finalize(&mut self) -> Option<RunReward> {
        if self.state.phase != SessionPhase::Dead || self.state.banked {
            return None;
        }
        let stats = self.state.pending_stats.clone()?;
        self.state.banked = true;

        let reward = self.finalizer.bank(&stats, &mut self.history);
        if reward.grace_granted {
            self.notify(NotificationKind::GraceGranted);
        }
        self.services.telemetry.run_ended(&stats);
        self.last_reward = Some(reward);
        self.signals.hud.bump();
        Some(reward)
    }

    /// Queue a jump; it fires on the first tick with footing or coyote time
    pub fn request_jump(&mut self) {
        if self.state.is_running() {
            self.state.jump_buffer.set(self.config.physics.jump_buffer_ms);
        }
    }

    // -- internals shared with tick ------------------------------------------

    pub(super) fn coyote_budget_ms(&self) -> f32 {
        self.config.physics.coyote_ms + self.upgrades.coyote_bonus_ms
    }

    pub(super) fn notify(&mut self, kind: NotificationKind) {
        self.notifications
            .post(Notification::standard(kind, self.config.timers.notification_ms));
        self.signals.notifications.bump();
    }

    pub(super) fn snapshot_stats(&self) -> RunStats {
        let usage = self.lines.usage();
        let elapsed = self.state.elapsed_ms;
        RunStats {
            duration_ms: elapsed,
            score: self.state.score,
            coins: self.coins.collected(),
            used_line: usage.used_line,
            jumps_performed: self.state.jumps_performed,
            draw_time_ms: usage.draw_time_ms.max(0.0),
            accident_death: elapsed < self.remote.difficulty.accident_death_window_ms,
            near_misses: self.state.near_misses,
            ink_efficiency: if usage.ink_efficiency.is_finite() {
                usage.ink_efficiency.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }

    fn bump_all(&mut self) {
        self.signals.world.bump();
        self.signals.hud.bump();
        self.signals.notifications.bump();
    }

    // -- accessors -----------------------------------------------------------

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn player(&self) -> &PlayerState {
        &self.state.player
    }

    /// Current player hitbox
    pub fn player_hitbox(&self) -> Rect {
        let p = &self.config.physics;
        Rect::standing_at(p.player_x, self.state.player.y, p.player_width, p.player_height)
    }

    pub fn score(&self) -> u64 {
        self.state.score
    }

    pub fn elapsed_ms(&self) -> f32 {
        self.state.elapsed_ms
    }

    pub fn revives_used(&self) -> u32 {
        self.state.revives_used
    }

    pub fn active_speed_multiplier(&self) -> f32 {
        self.state.active_speed_multiplier
    }

    pub fn is_resting(&self) -> bool {
        self.state.is_resting()
    }

    pub fn is_invulnerable(&self) -> bool {
        self.state.invulnerability.is_active()
    }

    /// Coin spawn multiplier in effect (tuning × boost)
    pub fn coin_spawn_multiplier(&self) -> f32 {
        self.tuning.coin_multiplier * self.state.boost.coin_multiplier()
    }

    /// Ink regen in effect (upgrade × boost × rest window)
    pub fn ink_regen_multiplier(&self) -> f32 {
        let rest = if self.state.is_resting() {
            self.config.timers.rest_ink_regen_multiplier
        } else {
            1.0
        };
        self.upgrades.ink_regen_multiplier * self.state.boost.ink_regen_multiplier() * rest
    }

    pub fn tuning(&self) -> &DifficultyTuning {
        &self.tuning
    }

    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    pub fn progress(&self) -> &Progress {
        self.finalizer.progress()
    }

    pub fn last_reward(&self) -> Option<&RunReward> {
        self.last_reward.as_ref()
    }

    /// Stats of the current death, if dead
    pub fn pending_stats(&self) -> Option<&RunStats> {
        self.state.pending_stats.as_ref()
    }

    pub fn upgrades(&self) -> &UpgradeSnapshot {
        &self.upgrades
    }

    pub fn remote_config(&self) -> &RemoteConfig {
        &self.remote
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn signals(&self) -> &SessionSignals {
        &self.signals
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn obstacles(&self) -> &O {
        &self.obstacles
    }

    pub fn lines(&self) -> &L {
        &self.lines
    }

    /// Drawing input goes through here
    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn coins(&self) -> &C {
        &self.coins
    }

    pub fn run_number(&self) -> u64 {
        self.run_number
    }
}
