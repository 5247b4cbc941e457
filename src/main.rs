//! Ink Runner headless demo
//!
//! Plays a few runs with a simple bot against the reference fields and logs
//! what the run core does: tuning, deaths, revives, rewards.
//!
//! Usage: `ink-runner [config.json] [runs]` (verbosity via `RUST_LOG`)

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::collections::VecDeque;

    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use ink_runner::collaborators::{LogTelemetry, ObstacleField, RunBoost, Services};
    use ink_runner::fields::{CoinConfig, CoinLane, InkCanvas, InkConfig, LaneConfig, ObstacleLane};
    use ink_runner::{ConfigError, GameConfig, RemoteConfig, Session, SessionPhase, TickInput, UpgradeSnapshot};

    type DemoSession = Session<ObstacleLane, InkCanvas, CoinLane>;

    /// Longest a single run may last before the demo abandons it
    const RUN_CAP_MS: f32 = 180_000.0;
    const FRAME_MS: f32 = 1000.0 / 60.0;

    /// Auto-jumper with a configurable chance of fumbling an obstacle
    struct Bot {
        rng: Pcg32,
        miss_chance: f64,
        decided: Vec<(u32, bool)>,
        since_draw_ms: f32,
    }

    impl Bot {
        fn new(seed: u64, miss_chance: f64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed),
                miss_chance,
                decided: Vec::new(),
                since_draw_ms: 0.0,
            }
        }

        fn input(&mut self, session: &DemoSession) -> TickInput {
            let hitbox = session.player_hitbox();
            let lead_px = session.obstacles().scroll_speed() * 150.0;
            let ahead = session
                .obstacles()
                .obstacles()
                .iter()
                .filter(|o| o.rect.min.x >= hitbox.max.x)
                .min_by(|a, b| a.rect.min.x.total_cmp(&b.rect.min.x))
                .copied();

            let Some(next) = ahead else {
                return TickInput::default();
            };
            if next.rect.min.x - hitbox.max.x > lead_px {
                return TickInput::default();
            }
            let attempt = match self.decided.iter().find(|(id, _)| *id == next.id) {
                Some((_, attempt)) => *attempt,
                None => {
                    let attempt = !self.rng.random_bool(self.miss_chance);
                    self.decided.push((next.id, attempt));
                    attempt
                }
            };
            TickInput { jump: attempt }
        }

        /// Now and then lay a short platform ahead of the player
        fn doodle(&mut self, session: &mut DemoSession, dt: f32) {
            self.since_draw_ms += dt;
            if self.since_draw_ms < 3_000.0 {
                return;
            }
            self.since_draw_ms = 0.0;
            let physics = &session.config().physics;
            let y = physics.ground_y - 50.0;
            let x = physics.player_x + 40.0;
            let points = vec![Vec2::new(x, y), Vec2::new(x + 120.0, y)];
            session.lines_mut().draw_line(points, 250.0);
        }

        fn forget(&mut self) {
            self.decided.clear();
            self.since_draw_ms = 0.0;
        }
    }

    fn load_config(path: Option<&str>) -> Result<GameConfig, ConfigError> {
        let Some(path) = path else {
            return Ok(GameConfig::default());
        };
        match std::fs::read_to_string(path) {
            Ok(json) => GameConfig::from_json(&json),
            Err(e) => {
                log::warn!("Cannot read {path}: {e}; using defaults");
                Ok(GameConfig::default())
            }
        }
    }

    /// Play one run to its end; returns false if it hit the time cap
    fn play_run(session: &mut DemoSession, bot: &mut Bot, frame_rng: &mut Pcg32) -> bool {
        session.start();
        bot.forget();
        while session.elapsed_ms() < RUN_CAP_MS {
            match session.phase() {
                SessionPhase::Running => {
                    // Mostly steady frames with the odd hitch
                    let dt = if frame_rng.random_bool(0.01) {
                        120.0
                    } else {
                        FRAME_MS
                    };
                    let input = bot.input(session);
                    session.tick(&input, dt);
                    bot.doodle(session, dt);
                }
                SessionPhase::Dead => {
                    if session.revive() {
                        bot.forget();
                        continue;
                    }
                    session.finalize();
                    return true;
                }
                SessionPhase::Ready => return true,
            }
        }
        false
    }

    pub fn run() -> Result<(), ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let config = load_config(args.first().map(String::as_str))?;
        let runs: u32 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(8);

        let boosts: VecDeque<RunBoost> = [RunBoost {
            duration_ms: 10_000.0,
            coin_multiplier: 2.0,
            ink_regen_multiplier: 1.5,
        }]
        .into_iter()
        .collect();
        let services = Services {
            upgrades: Box::new(UpgradeSnapshot::default()),
            remote: Box::new(RemoteConfig::default()),
            telemetry: Box::new(LogTelemetry),
            boosts: Box::new(boosts),
        };
        let mut session = Session::new(
            config,
            services,
            ObstacleLane::new(LaneConfig::default(), 0x1A7E),
            InkCanvas::new(InkConfig::default()),
            CoinLane::new(CoinConfig::default(), 0xC017),
        );
        let mut bot = Bot::new(7, 0.08);
        let mut frame_rng = Pcg32::seed_from_u64(99);

        for _ in 0..runs {
            if !play_run(&mut session, &mut bot, &mut frame_rng) {
                log::warn!("Run {} hit the demo time cap; discarded", session.run_number());
                session.reset();
                continue;
            }
            let stats = session.history().latest().cloned().unwrap_or_default();
            let reward = session.last_reward().copied().unwrap_or_default();
            log::info!(
                "Run {}: {:.1}s score {} coins +{} (bonus {}) near misses {} revives {}",
                session.run_number(),
                stats.duration_ms / 1000.0,
                stats.score,
                reward.coins,
                reward.bonus_coins,
                stats.near_misses,
                session.revives_used()
            );
            session.reset();
        }

        let progress = session.progress();
        log::info!(
            "Done: {} runs banked, {} coins, bonus tier {}",
            progress.runs_completed,
            progress.total_coins,
            progress.highest_bonus_tier
        );
        log::info!("History: {}", session.history().to_json()?);
        log::info!("Progress: {}", progress.to_json()?);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Ink Runner (headless) starting...");
    if let Err(e) = demo::run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is embedded by a host; nothing to run here
}
