use std::path::Path;

use rand::Rng;

use crate::adaptive::{performance_score, update_adaptive, AdaptiveParams, LevelMetrics};
use crate::agent::{
    compute_reward, EpisodeEndReason, QLearningAgent, RewardFlags, EPISODE_STEP_CEILING,
};
use crate::components::{Ghost, Pacman, Personality, FRIGHTENED_MS, FRIGHTENED_SPEED, GHOST_SPEED};
use crate::geometry::{can_turn, cell_center, lerp, neighbor, valid_dirs, Cell, Dir, TILE};
use crate::ghost::{decide_direction, GhostBrain, GhostMode};
use crate::level::{Level, GHOST_HOME};

pub const SCORE_PELLET: u32 = 10;
pub const SCORE_POWER: u32 = 50;
pub const SCORE_GHOST: u32 = 200;
pub const STARTING_LIVES: u32 = 3;

/// Buffered turns apply only this close to a cell center.
const TURN_TOLERANCE: f32 = 0.15;
/// Ghosts re-decide their direction only at a cell center.
const DECIDE_EPSILON: f32 = 1e-4;
const MOUTH_ANIM_SPEED: f32 = 6.0;
/// Lets the level-complete overlay render before the next map goes in.
const LEVEL_RESET_DELAY_MS: f64 = 300.0;
const COLLISION_RADIUS2: f32 = (TILE * 0.45 + TILE * 0.4) * (TILE * 0.45 + TILE * 0.4);
const GHOST_LOG_THROTTLE_MS: f64 = 300.0;

/// What happened to the player during one tick; drives scoring side effects
/// already applied and the reward dispatched to the learning agent.
#[derive(Default)]
struct StepOutcome {
    advanced: bool,
    pellet: bool,
    power: bool,
    ghost_eaten: bool,
    died: bool,
    won: bool,
}

/// The whole mutable simulation state. The tick owns it for its duration;
/// nothing else writes it concurrently.
pub struct Game {
    pub level_num: u32,
    pub level: Level,
    pub score: u32,
    pub lives: u32,
    pub pellets_left: usize,
    pub pacman: Pacman,
    pub ghosts: Vec<Ghost>,
    pub brains: Vec<GhostBrain>,
    pub frightened_until: f64,
    pub adaptive: AdaptiveParams,
    pub metrics: LevelMetrics,
    pub game_over: bool,
    pub won: bool,
    pub autonomous: bool,
    pub agent: Option<QLearningAgent>,
    pending_level: Option<(u32, f64)>,
    decided_cell: Option<Cell>,
    ghost_log: Vec<(f64, GhostMode, Dir)>,
}

impl Game {
    pub fn new(now_ms: f64) -> Game {
        let mut game = Game {
            level_num: 1,
            level: Level::for_level(1),
            score: 0,
            lives: STARTING_LIVES,
            pellets_left: 0,
            pacman: Pacman::spawn(),
            ghosts: Vec::new(),
            brains: Vec::new(),
            frightened_until: 0.0,
            adaptive: AdaptiveParams::initial(),
            metrics: LevelMetrics::new(1, now_ms),
            game_over: false,
            won: false,
            autonomous: false,
            agent: None,
            pending_level: None,
            decided_cell: None,
            ghost_log: Vec::new(),
        };
        game.reset_level(now_ms);
        game
    }

    /// Hard restart: score, lives, level, adaptive difficulty and map all
    /// start over. Learning state is kept; an in-flight episode is closed.
    pub fn restart(&mut self, now_ms: f64) {
        if let Some(agent) = self.agent.as_mut() {
            if agent.persisted.metrics.steps > 0 {
                agent.end_episode(EpisodeEndReason::Other);
            }
        }
        self.score = 0;
        self.lives = STARTING_LIVES;
        self.level_num = 1;
        self.adaptive = AdaptiveParams::initial();
        self.game_over = false;
        self.pending_level = None;
        self.reset_level(now_ms);
    }

    /// Install the current level's map and reset every actor to spawn.
    fn reset_level(&mut self, now_ms: f64) {
        self.level = Level::for_level(self.level_num);
        self.level.auto_fill_pellets();
        self.pellets_left = self.level.pellets_left();
        self.pacman = Pacman::spawn();
        self.ghosts = Personality::ALL.iter().map(|&p| Ghost::spawn(p)).collect();
        self.brains = self.ghosts.iter().map(|_| GhostBrain::new(now_ms)).collect();
        self.ghost_log = self
            .ghosts
            .iter()
            .map(|g| (0.0, GhostMode::Scatter, g.dir))
            .collect();
        self.frightened_until = 0.0;
        self.won = false;
        self.decided_cell = None;
        self.metrics = LevelMetrics::new(self.level_num, now_ms);
    }

    /// Entering autonomous mode for the first time lazily constructs the
    /// learning state, restoring a persisted table when one exists.
    pub fn toggle_autonomous(&mut self, rl_path: Option<&Path>) {
        if self.agent.is_none() {
            self.agent = Some(QLearningAgent::load_or_fresh(rl_path));
        }
        self.autonomous = !self.autonomous;
        tracing::info!(autonomous = self.autonomous, "mode toggled");
    }

    /// Keyboard input; ignored while the agent is driving.
    pub fn set_next_dir(&mut self, dir: Dir) {
        if !self.autonomous && !self.game_over {
            self.pacman.next_dir = dir;
        }
    }

    pub fn frightened_active(&self, now_ms: f64) -> bool {
        now_ms < self.frightened_until
    }

    /// One simulation step. `dt` is in seconds and already clamped by the
    /// frame driver; `now_ms` is the tick's timestamp, injected so the
    /// whole system stays replayable.
    pub fn tick(&mut self, dt: f32, now_ms: f64, rng: &mut impl Rng) {
        if self.game_over {
            return;
        }
        if let Some((next, at)) = self.pending_level {
            if now_ms < at {
                return;
            }
            self.pending_level = None;
            self.level_num = next;
            self.reset_level(now_ms);
        }

        let mut step = StepOutcome::default();
        let cols = self.level.cols();

        self.pacman.mouth_phase += dt * MOUTH_ANIM_SPEED * std::f32::consts::PI;
        if self.pacman.mouth_phase > std::f32::consts::TAU {
            self.pacman.mouth_phase -= std::f32::consts::TAU;
        }

        // Agent decision, once per cell, near the center.
        if self.autonomous
            && self.pacman.progress < TURN_TOLERANCE
            && self.decided_cell != Some(self.pacman.cell)
        {
            self.decided_cell = Some(self.pacman.cell);
            if let Some(agent) = self.agent.as_mut() {
                let dir = agent.choose_action(&self.level, &self.pacman, &self.ghosts, rng);
                self.pacman.next_dir = dir;
            }
        }

        // Buffered turn applies near the center when legal.
        if self.pacman.progress < TURN_TOLERANCE
            && can_turn(&self.level, self.pacman.cell, self.pacman.next_dir)
        {
            self.pacman.dir = self.pacman.next_dir;
        }

        // Continuous advance between cell centers. Large dt resolves into
        // several whole-cell steps, each processing its own pellet.
        let ahead = neighbor(self.pacman.cell, self.pacman.dir, cols);
        if !self.level.is_wall(ahead.r, ahead.c) {
            self.pacman.progress += self.pacman.speed_tiles * dt;
            while self.pacman.progress >= 1.0 {
                let next = neighbor(self.pacman.cell, self.pacman.dir, cols);
                if self.level.is_wall(next.r, next.c) {
                    self.pacman.progress = 0.0;
                    break;
                }
                self.pacman.progress -= 1.0;
                self.pacman.cell = next;
                step.advanced = true;
                self.consume_at(next, &mut step, now_ms);
                if step.won {
                    break;
                }
            }
        } else {
            // Wait at the center until a legal turn shows up.
            self.pacman.progress = 0.0;
        }

        if !step.won {
            let frightened = self.frightened_active(now_ms);

            // Scatter/chase cycling is frozen while frightened.
            if !frightened {
                for brain in &mut self.brains {
                    brain.exit_frightened(now_ms);
                    brain.update(now_ms, &self.adaptive);
                }
            }

            for i in 0..self.ghosts.len() {
                self.step_ghost(i, dt, now_ms, frightened, rng);
            }

            self.resolve_collisions(&mut step, now_ms, frightened);
        }

        if self.autonomous && (step.advanced || step.died || step.won || step.ghost_eaten) {
            self.dispatch_reward(&step);
        }
    }

    fn consume_at(&mut self, cell: Cell, step: &mut StepOutcome, now_ms: f64) {
        if self.level.is_pellet(cell.r, cell.c) {
            self.level.clear_cell(cell.r, cell.c);
            self.score += SCORE_PELLET;
            self.pellets_left -= 1;
            self.metrics.pellets_eaten += 1;
            step.pellet = true;
        } else if self.level.is_power(cell.r, cell.c) {
            self.level.clear_cell(cell.r, cell.c);
            self.score += SCORE_POWER;
            self.pellets_left -= 1;
            self.metrics.power_pellets_eaten += 1;
            step.power = true;
            self.trigger_frightened(now_ms);
        }
        if self.pellets_left == 0 {
            step.won = true;
            self.complete_level(now_ms);
        }
    }

    /// Power pellet: every non-eyes ghost goes frightened with the classic
    /// forced reversal; capture flags reset so each can be eaten once.
    fn trigger_frightened(&mut self, now_ms: f64) {
        self.frightened_until = now_ms + FRIGHTENED_MS;
        for (g, brain) in self.ghosts.iter_mut().zip(self.brains.iter_mut()) {
            g.eaten = false;
            if !g.eyes_home {
                g.dir = g.dir.reverse();
                brain.enter_frightened();
            }
        }
        tracing::info!("power pellet: ghosts frightened");
    }

    fn complete_level(&mut self, now_ms: f64) {
        self.won = true;
        let perf = performance_score(&self.metrics, now_ms);
        let next = self.level_num + 1;
        self.adaptive = update_adaptive(&self.adaptive, perf, next);
        tracing::info!(
            level = self.level_num,
            performance = perf,
            prediction_ahead = self.adaptive.prediction_ahead,
            chase_weight = self.adaptive.chase_weight,
            scatter_factor = self.adaptive.scatter_factor,
            randomness = self.adaptive.randomness,
            "level complete, difficulty adapted"
        );
        self.pending_level = Some((next, now_ms + LEVEL_RESET_DELAY_MS));
    }

    fn step_ghost(&mut self, i: usize, dt: f32, now_ms: f64, frightened: bool, rng: &mut impl Rng) {
        let cols = self.level.cols();

        if self.ghosts[i].progress < DECIDE_EPSILON {
            {
                let g = &self.ghosts[i];
                let brain = &mut self.brains[i];
                if g.eyes_home {
                    brain.mode = GhostMode::Eyes;
                } else if frightened && !g.eaten {
                    brain.mode = GhostMode::Frightened;
                } else if brain.mode == GhostMode::Frightened && !frightened {
                    brain.exit_frightened(now_ms);
                }
            }
            let opts = valid_dirs(&self.level, self.ghosts[i].cell);
            let chosen = decide_direction(
                &self.ghosts[i],
                &self.brains[i],
                &self.pacman,
                &self.ghosts,
                &opts,
                &self.adaptive,
                &self.level,
                rng,
            );
            self.ghosts[i].dir = chosen;
            self.log_ghost_decision(i, now_ms);
        }

        let speed = {
            let g = &self.ghosts[i];
            if g.eyes_home {
                GHOST_SPEED
            } else if frightened {
                FRIGHTENED_SPEED
            } else {
                g.base_speed
            }
        };

        let ahead = neighbor(self.ghosts[i].cell, self.ghosts[i].dir, cols);
        if !self.level.is_wall(ahead.r, ahead.c) {
            self.ghosts[i].progress += speed * dt;
            while self.ghosts[i].progress >= 1.0 {
                let next = neighbor(self.ghosts[i].cell, self.ghosts[i].dir, cols);
                if self.level.is_wall(next.r, next.c) {
                    self.ghosts[i].progress = 0.0;
                    break;
                }
                self.ghosts[i].progress -= 1.0;
                self.ghosts[i].cell = next;
                if self.ghosts[i].eyes_home && self.ghosts[i].cell == GHOST_HOME {
                    // Eyes reached the house: rejoin the cycle, or go
                    // straight back to frightened if the timer still runs.
                    let g = &mut self.ghosts[i];
                    g.eyes_home = false;
                    g.dir = Dir::Left;
                    self.brains[i].mode = if frightened {
                        GhostMode::Frightened
                    } else {
                        GhostMode::Scatter
                    };
                    tracing::debug!(ghost = self.ghosts[i].personality.name(), "eyes home");
                }
            }
        } else {
            // Wall-blocked mid-tick: freeze at the center and take any
            // legal non-reversing direction.
            self.ghosts[i].progress = 0.0;
            let opts = valid_dirs(&self.level, self.ghosts[i].cell);
            let reverse = self.ghosts[i].dir.reverse();
            if let Some(&alt) = opts.iter().find(|&&d| d != reverse) {
                self.ghosts[i].dir = alt;
            }
        }
    }

    fn log_ghost_decision(&mut self, i: usize, now_ms: f64) {
        let (last_at, last_mode, last_dir) = self.ghost_log[i];
        let g = &self.ghosts[i];
        let mode = self.brains[i].mode;
        if (g.dir != last_dir || mode != last_mode) && now_ms - last_at > GHOST_LOG_THROTTLE_MS {
            tracing::debug!(
                ghost = g.personality.name(),
                mode = ?mode,
                cell = ?(g.cell.r, g.cell.c),
                dir = ?g.dir,
                "ghost decision"
            );
            self.ghost_log[i] = (now_ms, mode, g.dir);
        }
    }

    /// Collisions use interpolated sub-tile positions against a combined
    /// radius, not grid-cell equality.
    fn resolve_collisions(&mut self, step: &mut StepOutcome, now_ms: f64, frightened: bool) {
        let cols = self.level.cols();
        let pac_pos = lerp(
            cell_center(self.pacman.cell),
            cell_center(neighbor(self.pacman.cell, self.pacman.dir, cols)),
            self.pacman.progress,
        );
        for i in 0..self.ghosts.len() {
            let (g_cell, g_dir, g_progress, g_eyes, g_eaten) = {
                let g = &self.ghosts[i];
                (g.cell, g.dir, g.progress, g.eyes_home, g.eaten)
            };
            let g_pos = lerp(
                cell_center(g_cell),
                cell_center(neighbor(g_cell, g_dir, cols)),
                g_progress,
            );
            let dx = pac_pos.x - g_pos.x;
            let dy = pac_pos.y - g_pos.y;
            if dx * dx + dy * dy >= COLLISION_RADIUS2 {
                continue;
            }
            let ghost_is_frightened = frightened && !g_eyes;
            if ghost_is_frightened && !g_eaten {
                let g = &mut self.ghosts[i];
                g.eaten = true;
                g.eyes_home = true;
                self.score += SCORE_GHOST;
                self.metrics.ghosts_eaten += 1;
                step.ghost_eaten = true;
                tracing::debug!(ghost = self.ghosts[i].personality.name(), "ghost captured");
            } else if !g_eyes {
                step.died = true;
                self.handle_death(now_ms);
                break;
            }
        }
    }

    /// Lose a life; reset positions but keep the eaten pellets. Out of
    /// lives means game over and the simulation stops until restart.
    fn handle_death(&mut self, now_ms: f64) {
        self.pacman.alive = false;
        self.metrics.deaths += 1;
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            self.game_over = true;
            tracing::info!(score = self.score, "game over");
            return;
        }
        self.pacman = Pacman::spawn();
        self.ghosts = Personality::ALL.iter().map(|&p| Ghost::spawn(p)).collect();
        self.brains = self.ghosts.iter().map(|_| GhostBrain::new(now_ms)).collect();
        self.frightened_until = 0.0;
        self.decided_cell = None;
    }

    /// Reward dispatch for the learning agent: one reward per cell advance
    /// (or terminal event), then the TD update and any episode boundary.
    fn dispatch_reward(&mut self, step: &StepOutcome) {
        let Some(agent) = self.agent.as_mut() else {
            return;
        };
        let mut flags = RewardFlags {
            pellet_eaten: step.pellet,
            power_eaten: step.power,
            ghost_eaten: step.ghost_eaten,
            died: step.died,
            won: step.won,
            ..RewardFlags::default()
        };
        if step.advanced && !step.died {
            let shaping =
                agent.observe_advance(&self.level, &self.pacman, &self.ghosts, step.pellet || step.power);
            flags.loop_penalty = shaping.loop_penalty;
            flags.novelty_bonus = shaping.novelty_bonus;
            flags.shaping = shaping.shaping;
            flags.starvation_steps = shaping.starvation_steps;
        }
        let reward = compute_reward(&flags);
        agent.update(reward, &self.level, &self.pacman, &self.ghosts);

        if step.won {
            agent.end_episode(EpisodeEndReason::Win);
        } else if step.died {
            agent.end_episode(EpisodeEndReason::Death);
            agent.explore.clear();
        } else if agent.persisted.metrics.steps >= EPISODE_STEP_CEILING {
            agent.end_episode(EpisodeEndReason::Timeout);
            agent.explore.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::PAC_SPAWN;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    /// Park every ghost far from the action on the bottom corridor, mid-cell
    /// with open space on both sides.
    fn park_ghosts(game: &mut Game) {
        for (i, g) in game.ghosts.iter_mut().enumerate() {
            g.cell = Cell::new(14, 2 + i as i32);
            g.progress = 0.5;
            g.dir = Dir::Right;
        }
    }

    #[test]
    fn progress_correction_resolves_multiple_cells() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        game.pacman.cell = Cell::new(5, 1);
        game.pacman.dir = Dir::Right;
        game.pacman.next_dir = Dir::Right;
        let score0 = game.score;
        let pellets0 = game.pellets_left;

        // 4.4 tiles in one second: exactly floor(4.4) cell advances.
        game.tick(1.0, 16.0, &mut rng);

        assert_eq!(game.pacman.cell, Cell::new(5, 5));
        assert!(game.pacman.progress >= 0.0 && game.pacman.progress < 1.0);
        assert!((game.pacman.progress - 0.4).abs() < 1e-3);
        assert_eq!(game.score, score0 + 4 * SCORE_PELLET);
        assert_eq!(game.pellets_left, pellets0 - 4);
        assert_eq!(game.metrics.pellets_eaten, 4);
    }

    #[test]
    fn wall_ahead_freezes_at_center() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        // Spawn pocket: left/right/up are walls.
        game.pacman.cell = PAC_SPAWN;
        game.pacman.dir = Dir::Up;
        game.pacman.next_dir = Dir::Up;
        game.tick(0.5, 16.0, &mut rng);
        assert_eq!(game.pacman.cell, PAC_SPAWN);
        assert_eq!(game.pacman.progress, 0.0);
    }

    #[test]
    fn power_pellet_frightens_and_reverses_ghosts() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        // Mid-cell ghosts keep their reversed direction this tick.
        park_ghosts(&mut game);
        game.pacman.cell = Cell::new(4, 1);
        game.pacman.dir = Dir::Up;
        game.pacman.next_dir = Dir::Up;
        assert!(game.level.is_power(3, 1));

        game.tick(0.25, 16.0, &mut rng);

        assert_eq!(game.pacman.cell, Cell::new(3, 1));
        assert!(game.frightened_active(17.0));
        for (g, brain) in game.ghosts.iter().zip(game.brains.iter()) {
            assert_eq!(brain.mode, GhostMode::Frightened);
            assert!(!g.eaten);
            // Reverse of the parked Right direction.
            assert_eq!(g.dir, Dir::Left);
        }
    }

    #[test]
    fn frightened_collision_captures_ghost() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        game.pacman.cell = Cell::new(5, 5);
        game.pacman.dir = Dir::Left;
        game.pacman.next_dir = Dir::Left;
        game.frightened_until = 10_000.0;
        game.ghosts[0].cell = Cell::new(5, 5);
        game.ghosts[0].progress = 0.0;
        let score0 = game.score;

        game.tick(0.001, 16.0, &mut rng);

        assert!(game.ghosts[0].eaten);
        assert!(game.ghosts[0].eyes_home);
        assert_eq!(game.score, score0 + SCORE_GHOST);
        assert_eq!(game.metrics.ghosts_eaten, 1);
        assert_eq!(game.lives, STARTING_LIVES);
    }

    #[test]
    fn deadly_collision_costs_a_life_and_keeps_pellets() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        // Eat a couple of pellets first.
        game.pacman.cell = Cell::new(5, 1);
        game.pacman.dir = Dir::Right;
        game.pacman.next_dir = Dir::Right;
        game.tick(0.5, 16.0, &mut rng);
        let pellets_after_eating = game.pellets_left;

        game.ghosts[0].cell = game.pacman.cell;
        game.ghosts[0].progress = game.pacman.progress;
        game.ghosts[0].dir = game.pacman.dir;
        game.tick(0.001, 32.0, &mut rng);

        assert_eq!(game.lives, STARTING_LIVES - 1);
        assert_eq!(game.metrics.deaths, 1);
        assert_eq!(game.pacman.cell, PAC_SPAWN);
        assert_eq!(game.pellets_left, pellets_after_eating);
        assert!(!game.game_over);
    }

    #[test]
    fn exhausting_lives_ends_the_game() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        game.lives = 1;
        game.pacman.cell = Cell::new(5, 5);
        game.ghosts[0].cell = Cell::new(5, 5);
        game.ghosts[0].progress = 0.0;

        game.tick(0.001, 16.0, &mut rng);
        assert!(game.game_over);

        // Simulation halts: nothing moves on later ticks.
        let cell = game.pacman.cell;
        game.tick(0.5, 32.0, &mut rng);
        assert_eq!(game.pacman.cell, cell);
    }

    #[test]
    fn clearing_pellets_advances_level_after_delay() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        // Leave a single pellet right of Pac-Man.
        for r in 0..game.level.rows() {
            for c in 0..game.level.cols() {
                if game.level.is_pellet(r, c) || game.level.is_power(r, c) {
                    game.level.clear_cell(r, c);
                }
            }
        }
        game.level.replace_cell(5, 6, '.');
        game.pellets_left = 1;
        game.pacman.cell = Cell::new(5, 5);
        game.pacman.dir = Dir::Right;
        game.pacman.next_dir = Dir::Right;

        game.tick(0.25, 1000.0, &mut rng);
        assert!(game.won);
        assert_eq!(game.adaptive.level_learned, 2);

        // Still inside the deferred-reset window.
        game.tick(0.016, 1100.0, &mut rng);
        assert!(game.won);
        assert_eq!(game.level_num, 1);

        // Past the delay: next level installed, fresh pellets, spawns reset.
        game.tick(0.016, 1400.0, &mut rng);
        assert_eq!(game.level_num, 2);
        assert!(!game.won);
        assert!(game.pellets_left > 0);
        assert_eq!(game.pacman.cell, PAC_SPAWN);
    }

    #[test]
    fn autonomous_mode_feeds_the_agent() {
        let mut rng = seeded();
        let mut game = Game::new(0.0);
        park_ghosts(&mut game);
        game.toggle_autonomous(None);
        assert!(game.autonomous);
        game.pacman.cell = Cell::new(5, 5);
        game.pacman.dir = Dir::Right;
        game.pacman.next_dir = Dir::Right;

        // Enough ticks to cross at least one cell center.
        for i in 0..20 {
            game.tick(0.05, 16.0 * (i + 1) as f64, &mut rng);
        }
        let agent = game.agent.as_ref().unwrap();
        assert!(agent.persisted.metrics.steps > 0);
        assert!(!agent.persisted.q_table.is_empty());
        assert!(agent.persisted.metrics.last_reward != 0.0);
    }

    #[test]
    fn keyboard_input_ignored_while_autonomous() {
        let mut game = Game::new(0.0);
        game.toggle_autonomous(None);
        let buffered = game.pacman.next_dir;
        game.set_next_dir(buffered.reverse());
        assert_eq!(game.pacman.next_dir, buffered);
        game.toggle_autonomous(None);
        game.set_next_dir(Dir::Down);
        assert_eq!(game.pacman.next_dir, Dir::Down);
    }
}
