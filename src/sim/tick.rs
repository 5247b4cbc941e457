//! Per-frame simulation step
//!
//! Variable timestep, capped. Evaluation order inside one tick is fixed:
//!
//! 1. clamp delta, age notifications
//! 2. jump-buffer, coyote and invulnerability countdowns
//! 3. rest-window duty cycle
//! 4. boost expiry
//! 5. obstacle field and lines advance, emergency ink check
//! 6. gravity integration, line landing, implicit floor, coyote refill, jump
//! 7. coin spawn and pickup
//! 8. obstacle overlap (absorb or die)
//! 9. speed ramp
//! 10. score accumulation
//!
//! Timers crossing a boundary in the same frame resolve in this order.

use super::collision::{first_overlap, resolve_floor, resolve_line_landing};
use super::session::Session;
use super::state::SessionPhase;
use super::timers::RestTransition;
use crate::collaborators::{CoinField, LineGeometry, ObstacleField};
use crate::signals::NotificationKind;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Jump pressed this frame
    pub jump: bool,
}

impl<O, L, C> Session<O, L, C>
where
    O: ObstacleField,
    L: LineGeometry,
    C: CoinField,
{
    /// Advance the run by one display frame
    pub fn tick(&mut self, input: &TickInput, delta_ms: f32) {
        let dt = self.clamp_delta(delta_ms);
        if self.notifications.advance(dt) {
            self.signals.notifications.bump();
        }
        if !self.state.is_running() {
            return;
        }
        if input.jump {
            self.request_jump();
        }
        let coins_before = self.coins.collected();
        let score_before = self.state.score;
        let mut hud_changed = false;

        self.state.elapsed_ms += dt;

        self.state.jump_buffer.advance(dt);
        self.state.coyote.advance(dt);
        self.state.invulnerability.advance(dt);

        if let Some(transition) = self.state.rest.advance(dt) {
            self.apply_rest_transition(transition);
            hud_changed = true;
        }

        if self.state.boost.advance(dt) {
            let multiplier = self.coin_spawn_multiplier();
            self.coins.configure_spawn(multiplier);
            self.notify(NotificationKind::BoostExpired);
            log::debug!("Boost expired at {:.0}ms", self.state.elapsed_ms);
            hud_changed = true;
        }

        self.advance_world(dt);
        self.step_player(dt);
        self.advance_coins(dt);

        if self.resolve_hazards() {
            self.signals.world.bump();
            self.signals.hud.bump();
            return;
        }

        hud_changed |= self.apply_speed_ramp();
        self.accumulate_score(dt);

        if self.state.score != score_before || self.coins.collected() != coins_before {
            hud_changed = true;
        }
        self.signals.world.bump();
        if hud_changed {
            self.signals.hud.bump();
        }
    }

    /// Cap the frame delta; a stalled host never replays its backlog
    fn clamp_delta(&self, delta_ms: f32) -> f32 {
        if !delta_ms.is_finite() || delta_ms <= 0.0 {
            return 0.0;
        }
        delta_ms.min(self.config.physics.max_frame_delta_ms)
    }

    fn apply_rest_transition(&mut self, transition: RestTransition) {
        let resting = transition == RestTransition::Entered;
        self.obstacles.set_rest_mode(resting);
        self.coins.set_rest_window_active(resting);
        if resting {
            log::debug!("Rest window entered at {:.0}ms", self.state.elapsed_ms);
            self.notify(NotificationKind::RestZoneEnter);
        } else {
            log::debug!("Rest window left at {:.0}ms", self.state.elapsed_ms);
            self.notify(NotificationKind::RestZoneExit);
        }
    }

    fn advance_world(&mut self, dt: f32) {
        let scroll_speed = self.obstacles.scroll_speed();
        let regen = self.ink_regen_multiplier();
        self.obstacles.update(dt, self.state.elapsed_ms);
        self.lines.update(dt, scroll_speed * dt, regen);

        if !self.state.emergency_ink_granted {
            let floor = self.remote.difficulty.emergency_ink_floor.clamp(0.0, 1.0);
            if self.lines.grant_emergency_ink(floor) {
                self.state.emergency_ink_granted = true;
                log::debug!("Emergency ink granted");
                self.notify(NotificationKind::EmergencyInk);
            }
        }
    }

    /// Gravity, landing, coyote refill and the forgiving jump
    fn step_player(&mut self, dt: f32) {
        let coyote_budget = self.coyote_budget_ms();
        let physics = &self.config.physics;
        let frames = dt / physics.frame_ms;
        let player = &mut self.state.player;

        player.grounded = false;
        player.y_velocity += physics.gravity_per_frame * frames;
        player.y += player.y_velocity * frames;

        let on_line = resolve_line_landing(
            player,
            physics.player_x,
            self.lines.lines(),
            physics.line_snap_tolerance_px,
        );
        if !on_line {
            resolve_floor(player, physics.ground_y);
        }

        if player.grounded {
            self.state.coyote.set(coyote_budget);
        }

        if self.state.jump_buffer.is_active() && (player.grounded || self.state.coyote.is_active())
        {
            self.state.jump_buffer.clear();
            self.state.coyote.clear();
            player.y_velocity = physics.jump_velocity;
            player.grounded = false;
            self.state.jumps_performed += 1;
        }
    }

    fn advance_coins(&mut self, dt: f32) {
        let physics = &self.config.physics;
        let hitbox = self.player_hitbox();
        let scroll_speed = self.obstacles.scroll_speed();
        self.coins
            .maybe_spawn_coin(self.state.elapsed_ms, physics.screen_width, physics.ground_y);
        self.coins.update(dt, scroll_speed, &hitbox, physics.screen_width);
    }

    /// Near misses, absorbed hits and death. Returns true if the player died.
    fn resolve_hazards(&mut self) -> bool {
        let hitbox = self.player_hitbox();
        let obstacles = self.obstacles.obstacles();
        self.state.near_misses += self.state.near_miss_tracker.update(
            &hitbox,
            self.config.physics.near_miss_margin_px,
            obstacles,
        );

        let Some(hit) = first_overlap(&hitbox, obstacles).map(|o| o.id) else {
            return false;
        };

        if self.state.invulnerability.is_active() {
            self.state
                .invulnerability
                .set(self.config.timers.hit_grace_ms);
            if !self.state.shield_warned {
                self.state.shield_warned = true;
                log::debug!("Invulnerability absorbed obstacle {hit}");
                self.notify(NotificationKind::ShieldAbsorbed);
            }
            return false;
        }

        self.die(hit);
        true
    }

    fn die(&mut self, obstacle_id: u32) {
        self.state.phase = SessionPhase::Dead;
        self.obstacles.stop();
        let stats = self.snapshot_stats();
        log::info!(
            "Died on obstacle {} at {:.1}s: score {} coins {}{}",
            obstacle_id,
            stats.duration_ms / 1000.0,
            stats.score,
            stats.coins,
            if stats.accident_death { " (accident)" } else { "" }
        );
        self.state.pending_stats = Some(stats);

        if !self.can_revive() {
            self.finalize();
        }
    }

    /// Step the active speed multiplier for every threshold crossed
    fn apply_speed_ramp(&mut self) -> bool {
        let difficulty = &self.remote.difficulty;
        let interval = difficulty.speed_ramp_interval.max(1);
        let increment = difficulty.speed_ramp_increment.max(0.0);
        let cap = difficulty.speed_ramp_max;
        let mut changed = false;

        while self.state.score >= self.state.next_speed_ramp_score {
            let next = (self.state.active_speed_multiplier + increment).min(cap);
            if next > self.state.active_speed_multiplier {
                self.state.active_speed_multiplier = next;
                changed = true;
            }
            let threshold = self.state.next_speed_ramp_score.saturating_add(interval);
            if threshold == self.state.next_speed_ramp_score {
                break;
            }
            self.state.next_speed_ramp_score = threshold;
        }

        if changed {
            log::debug!(
                "Speed ramp to {:.2} at score {}",
                self.state.active_speed_multiplier,
                self.state.score
            );
            self.obstacles
                .set_speed_multiplier(self.state.active_speed_multiplier);
            self.notify(NotificationKind::SpeedUp);
        }
        changed
    }

    /// Whole points from elapsed time; the fraction carries to the next tick
    fn accumulate_score(&mut self, dt: f32) {
        let per_ms = self.config.scoring.points_per_second / 1000.0;
        self.state.score_carry += dt * per_ms * self.state.active_speed_multiplier;
        let whole = self.state.score_carry.floor();
        if whole >= 1.0 {
            self.state.score += whole as u64;
            self.state.score_carry -= whole;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{Obstacle, RunBoost};
    use crate::config::UpgradeSnapshot;
    use crate::signals::SignalCursor;
    use crate::sim::geometry::Rect;
    use crate::sim::testing::{Harness, TestSession, ledge_under_player, obstacle_on_player, session};
    use proptest::prelude::*;

    const FRAME: f32 = 16.0;

    fn idle(s: &mut TestSession) {
        s.tick(&TickInput::default(), FRAME);
    }

    fn jump(s: &mut TestSession) {
        s.tick(&TickInput { jump: true }, FRAME);
    }

    fn started() -> TestSession {
        let mut s = session();
        assert!(s.start());
        s
    }

    #[test]
    fn test_tick_before_start_is_inert() {
        let mut s = session();
        idle(&mut s);
        jump(&mut s);
        assert_eq!(s.phase(), SessionPhase::Ready);
        assert_eq!(s.elapsed_ms(), 0.0);
        assert_eq!(s.state().jumps_performed, 0);
    }

    #[test]
    fn test_stalled_frame_is_capped() {
        let mut s = started();
        s.tick(&TickInput::default(), 5_000.0);
        let cap = s.config().physics.max_frame_delta_ms;
        assert_eq!(s.elapsed_ms(), cap);

        s.tick(&TickInput::default(), -20.0);
        s.tick(&TickInput::default(), f32::NAN);
        assert_eq!(s.elapsed_ms(), cap);
    }

    #[test]
    fn test_player_stays_on_floor() {
        let mut s = started();
        for _ in 0..120 {
            idle(&mut s);
        }
        let ground = s.config().physics.ground_y;
        assert_eq!(s.player().y, ground);
        assert!(s.player().grounded);
        assert_eq!(s.player().y_velocity, 0.0);
    }

    #[test]
    fn test_jump_from_ground() {
        let mut s = started();
        let ground = s.config().physics.ground_y;
        jump(&mut s);
        assert_eq!(s.player().y_velocity, s.config().physics.jump_velocity);
        assert_eq!(s.state().jumps_performed, 1);
        idle(&mut s);
        assert!(s.player().y < ground);

        // Land again eventually
        for _ in 0..200 {
            idle(&mut s);
        }
        assert!(s.player().grounded);
        assert_eq!(s.state().jumps_performed, 1);
    }

    #[test]
    fn test_buffered_jump_fires_on_landing() {
        let mut s = started();
        let ground = s.config().physics.ground_y;
        s.state.player.y = ground - 30.0;
        s.state.player.y_velocity = 4.0;
        s.state.player.grounded = false;
        s.state.coyote.clear();

        jump(&mut s);
        assert_eq!(s.state().jumps_performed, 0, "no footing yet");

        let mut landed_jump = false;
        for _ in 0..10 {
            idle(&mut s);
            if s.state().jumps_performed == 1 {
                landed_jump = true;
                break;
            }
        }
        assert!(landed_jump);
        assert_eq!(s.player().y, ground);
        assert_eq!(s.player().y_velocity, s.config().physics.jump_velocity);
    }

    #[test]
    fn test_stale_jump_request_expires() {
        let mut s = started();
        let ground = s.config().physics.ground_y;
        s.state.player.y = ground - 200.0;
        s.state.player.y_velocity = 0.0;
        s.state.player.grounded = false;
        s.state.coyote.clear();

        jump(&mut s);
        for _ in 0..60 {
            idle(&mut s);
        }
        assert_eq!(s.state().jumps_performed, 0);
        assert!(s.player().grounded);
    }

    fn standing_on_ledge(upgrades: UpgradeSnapshot) -> TestSession {
        let mut s = Harness {
            upgrades,
            ..Default::default()
        }
        .build()
        .0;
        assert!(s.start());
        let ledge_y = s.config().physics.ground_y - 100.0;
        let ledge = ledge_under_player(&s, ledge_y);
        s.lines.lines.push(ledge);
        s.state.player.y = ledge_y;
        idle(&mut s);
        assert!(s.player().grounded);
        assert_eq!(s.player().y, ledge_y);
        s
    }

    #[test]
    fn test_coyote_jump_after_leaving_ledge() {
        let mut s = standing_on_ledge(UpgradeSnapshot::default());
        s.lines.lines.clear();
        for _ in 0..3 {
            idle(&mut s);
        }
        assert!(!s.player().grounded);

        jump(&mut s);
        assert_eq!(s.state().jumps_performed, 1);
        assert_eq!(s.player().y_velocity, s.config().physics.jump_velocity);
    }

    #[test]
    fn test_coyote_expires() {
        let mut s = standing_on_ledge(UpgradeSnapshot::default());
        s.lines.lines.clear();
        for _ in 0..8 {
            idle(&mut s);
        }
        jump(&mut s);
        assert_eq!(s.state().jumps_performed, 0);
        assert!(s.player().y_velocity > 0.0);
    }

    #[test]
    fn test_coyote_upgrade_extends_window() {
        let mut s = standing_on_ledge(UpgradeSnapshot {
            coyote_bonus_ms: 100.0,
            ..Default::default()
        });
        s.lines.lines.clear();
        for _ in 0..8 {
            idle(&mut s);
        }
        jump(&mut s);
        assert_eq!(s.state().jumps_performed, 1);
    }

    #[test]
    fn test_no_double_jump() {
        let mut s = started();
        jump(&mut s);
        jump(&mut s);
        assert_eq!(s.state().jumps_performed, 1);
    }

    #[test]
    fn test_obstacle_overlap_kills() {
        let mut s = started();
        let hit = obstacle_on_player(&s, 1);
        s.obstacles.obstacles.push(hit);
        idle(&mut s);

        assert_eq!(s.phase(), SessionPhase::Dead);
        assert!(!s.obstacles().running);
        assert!(s.pending_stats().is_some());
        // Revive still available: nothing banked yet
        assert!(s.can_revive());
        assert!(s.history().is_empty());

        let elapsed = s.elapsed_ms();
        idle(&mut s);
        assert_eq!(s.elapsed_ms(), elapsed);
    }

    #[test]
    fn test_invulnerability_absorbs_hits_with_single_warning() {
        let mut s = started();
        s.state.invulnerability.set(20.0);
        let hit = obstacle_on_player(&s, 1);
        s.obstacles.obstacles.push(hit);

        for _ in 0..5 {
            idle(&mut s);
        }
        assert_eq!(s.phase(), SessionPhase::Running);
        assert!(s.state().invulnerability.remaining_ms() > 0.0);
        let warnings = s
            .notifications()
            .active()
            .iter()
            .filter(|n| n.notification.kind == NotificationKind::ShieldAbsorbed)
            .count();
        assert_eq!(warnings, 1);

        // Obstacle gone: grace runs out, next hit is fatal
        s.obstacles.obstacles.clear();
        for _ in 0..40 {
            idle(&mut s);
        }
        assert!(!s.is_invulnerable());
        s.obstacles.obstacles.push(hit);
        idle(&mut s);
        assert_eq!(s.phase(), SessionPhase::Dead);
    }

    #[test]
    fn test_absorbed_hit_resets_invulnerability_to_grace() {
        let mut s = started();
        s.state.invulnerability.set(2_000.0);
        let hit = obstacle_on_player(&s, 1);
        s.obstacles.obstacles.push(hit);
        idle(&mut s);
        assert_eq!(s.phase(), SessionPhase::Running);
        assert_eq!(
            s.state().invulnerability.remaining_ms(),
            s.config().timers.hit_grace_ms
        );
    }

    fn beside_player(s: &TestSession, id: u32, gap: f32) -> Obstacle {
        let hitbox = s.player_hitbox();
        Obstacle {
            id,
            rect: Rect::from_xywh(hitbox.max.x + gap, hitbox.min.y, 20.0, 20.0),
        }
    }

    #[test]
    fn test_near_miss_credited_once_passed() {
        let mut s = started();
        let margin = s.config().physics.near_miss_margin_px;
        let passing = beside_player(&s, 9, margin / 2.0);
        s.obstacles.obstacles.push(passing);
        for _ in 0..3 {
            idle(&mut s);
        }
        // Still alongside: outcome unknown
        assert_eq!(s.state().near_misses, 0);

        s.obstacles.obstacles.clear();
        idle(&mut s);
        idle(&mut s);
        assert_eq!(s.phase(), SessionPhase::Running);
        assert_eq!(s.state().near_misses, 1);
    }

    #[test]
    fn test_obstacle_that_hits_is_not_a_near_miss() {
        let mut s = started();
        let approaching = beside_player(&s, 9, 5.0);
        s.obstacles.obstacles.push(approaching);
        idle(&mut s);

        let hit = obstacle_on_player(&s, 9);
        s.obstacles.obstacles[0] = hit;
        idle(&mut s);
        assert_eq!(s.phase(), SessionPhase::Dead);
        assert_eq!(s.pending_stats().map(|st| st.near_misses), Some(0));
    }

    #[test]
    fn test_absorbed_obstacle_is_not_a_near_miss() {
        let mut s = started();
        s.state.invulnerability.set(2_000.0);
        let approaching = beside_player(&s, 4, 5.0);
        s.obstacles.obstacles.push(approaching);
        idle(&mut s);
        let hit = obstacle_on_player(&s, 4);
        s.obstacles.obstacles[0] = hit;
        idle(&mut s);
        s.obstacles.obstacles.clear();
        idle(&mut s);

        assert_eq!(s.phase(), SessionPhase::Running);
        assert_eq!(s.state().near_misses, 0);
    }

    #[test]
    fn test_score_keeps_fractional_carry() {
        let mut s = started();
        let speed = s.active_speed_multiplier();
        for _ in 0..1_000 {
            idle(&mut s);
        }
        let expected = s.config().scoring.points_per_second * 16.0 * speed;
        assert!((s.score() as f32 - expected).abs() <= 1.0, "score {}", s.score());
    }

    #[test]
    fn test_speed_ramp_steps_per_threshold() {
        let mut s = started();
        let d = s.remote_config().difficulty.clone();
        let initial = s.active_speed_multiplier();
        s.state.score = d.speed_ramp_interval * 2;
        idle(&mut s);

        let expected = (initial + 2.0 * d.speed_ramp_increment).min(d.speed_ramp_max);
        assert!((s.active_speed_multiplier() - expected).abs() < 1e-5);
        assert_eq!(s.state().next_speed_ramp_score, d.speed_ramp_interval * 3);
        assert_eq!(s.obstacles().speed_multiplier, s.active_speed_multiplier());
        assert!(s.notifications().contains(NotificationKind::SpeedUp));
    }

    #[test]
    fn test_speed_ramp_caps() {
        let mut s = started();
        let d = s.remote_config().difficulty.clone();
        s.state.score = d.speed_ramp_interval * 1_000;
        idle(&mut s);
        assert_eq!(s.active_speed_multiplier(), d.speed_ramp_max);
        assert!(s.state().next_speed_ramp_score > s.score());
    }

    proptest! {
        #[test]
        fn prop_speed_ramp_monotone_and_bounded(steps in proptest::collection::vec(0u64..600, 1..60)) {
            let mut s = started();
            let cap = s.remote_config().difficulty.speed_ramp_max;
            let mut last = s.active_speed_multiplier();
            for step in steps {
                s.state.score += step;
                idle(&mut s);
                let now = s.active_speed_multiplier();
                prop_assert!(now >= last);
                prop_assert!(now <= cap);
                last = now;
            }
        }
    }

    fn rest_harness(interval: f32, duration: f32) -> TestSession {
        let mut h = Harness::default();
        h.config.timers.rest_interval_ms = interval;
        h.config.timers.rest_duration_ms = duration;
        let mut s = h.build().0;
        assert!(s.start());
        s
    }

    #[test]
    fn test_rest_window_toggles_collaborators() {
        let mut s = rest_harness(160.0, 80.0);
        let rest_regen = s.config().timers.rest_ink_regen_multiplier;
        for _ in 0..10 {
            idle(&mut s);
        }
        assert!(s.is_resting());
        assert!(s.obstacles().resting);
        assert!(s.coins().resting);
        assert!(s.notifications().contains(NotificationKind::RestZoneEnter));
        // Regen boosted on the tick the window is active
        assert_eq!(s.lines().regen_seen.last().copied(), Some(rest_regen));

        for _ in 0..5 {
            idle(&mut s);
        }
        assert!(!s.is_resting());
        assert!(!s.obstacles().resting);
        assert!(s.notifications().contains(NotificationKind::RestZoneExit));
    }

    #[test]
    fn test_rest_share_converges_at_constant_delta() {
        let mut s = rest_harness(900.0, 300.0);
        let ticks = 20_000;
        let mut active = 0;
        for _ in 0..ticks {
            idle(&mut s);
            if s.is_resting() {
                active += 1;
            }
        }
        let share = active as f32 / ticks as f32;
        assert!((share - 0.25).abs() < 0.02, "share {share}");
    }

    #[test]
    fn test_stall_does_not_fast_forward_rest_cycle() {
        let mut s = rest_harness(100.0, 50.0);
        s.tick(&TickInput::default(), 10_000.0);
        assert!(!s.is_resting());
        assert_eq!(s.elapsed_ms(), s.config().physics.max_frame_delta_ms);
    }

    #[test]
    fn test_boost_window_is_exact_and_reverts_once() {
        let boost = RunBoost {
            duration_ms: 10_000.0,
            coin_multiplier: 2.0,
            ink_regen_multiplier: 1.0,
        };
        let mut s = Harness {
            boosts: [boost].into_iter().collect(),
            ..Default::default()
        }
        .build()
        .0;
        assert!(s.start());
        let base = s.tuning().coin_multiplier;
        assert_eq!(s.coins().spawn_multipliers, vec![base * 2.0]);

        for _ in 0..499 {
            s.tick(&TickInput::default(), 20.0);
        }
        assert_eq!(s.coin_spawn_multiplier(), base * 2.0);
        assert_eq!(s.coins().spawn_multipliers.len(), 1);

        s.tick(&TickInput::default(), 20.0);
        assert_eq!(s.elapsed_ms(), 10_000.0);
        assert_eq!(s.coin_spawn_multiplier(), base);
        assert_eq!(s.coins().spawn_multipliers, vec![base * 2.0, base]);
        assert!(s.notifications().contains(NotificationKind::BoostExpired));

        for _ in 0..100 {
            s.tick(&TickInput::default(), 20.0);
        }
        assert_eq!(s.coins().spawn_multipliers.len(), 2);
    }

    #[test]
    fn test_boost_consumed_once() {
        let boost = RunBoost {
            duration_ms: 1_000.0,
            coin_multiplier: 3.0,
            ink_regen_multiplier: 2.0,
        };
        let mut s = Harness {
            boosts: [boost].into_iter().collect(),
            ..Default::default()
        }
        .build()
        .0;
        assert!(s.start());
        assert!(s.state().boost.is_active());
        assert_eq!(s.ink_regen_multiplier(), 2.0);
        s.reset();
        assert!(s.start());
        assert!(!s.state().boost.is_active());
    }

    #[test]
    fn test_emergency_ink_granted_once_per_run() {
        let mut s = started();
        s.lines.ink_low = true;
        idle(&mut s);
        assert!(s.state().emergency_ink_granted);
        assert!(s.notifications().contains(NotificationKind::EmergencyInk));

        s.lines.ink_low = true;
        idle(&mut s);
        // Not asked again this run
        assert!(s.lines().ink_low);
    }

    #[test]
    fn test_signals_coalesce_per_frame() {
        let mut s = started();
        let mut world = SignalCursor::default();
        let mut hud = SignalCursor::default();
        world.changed(&s.signals().world);
        hud.changed(&s.signals().hud);

        idle(&mut s);
        assert!(world.changed(&s.signals().world));
        assert!(!world.changed(&s.signals().world));

        // Score moves within a few frames
        for _ in 0..10 {
            idle(&mut s);
        }
        assert!(hud.changed(&s.signals().hud));
    }

    #[test]
    fn test_rising_player_passes_through_ledge() {
        let mut s = started();
        let ground = s.config().physics.ground_y;
        let ledge = ledge_under_player(&s, ground - 20.0);
        s.lines.lines.push(ledge);
        jump(&mut s);
        for _ in 0..5 {
            idle(&mut s);
        }
        assert!(s.player().y < ground - 20.0);
        assert!(!s.player().grounded);
    }
}
