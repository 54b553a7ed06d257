use rand::seq::SliceRandom;
use rand::Rng;

use crate::adaptive::AdaptiveParams;
use crate::components::{Ghost, Pacman, Personality};
use crate::geometry::{choose_closest, manhattan, neighbor, Cell, Dir};
use crate::level::{Level, GHOST_HOME};

/// Ghost behavior modes. A ghost is in exactly one mode; `Eyes` and
/// `Frightened` both suspend the scatter/chase cycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GhostMode {
    Scatter,
    Chase,
    Frightened,
    Eyes,
}

/// Base scatter/chase alternation in milliseconds. After the last entry the
/// ghost stays in chase permanently. Scatter durations scale by the adaptive
/// scatter factor; chase durations never scale.
const BASE_CYCLE: [(f64, f64); 4] = [
    (7000.0, 20000.0),
    (7000.0, 20000.0),
    (5000.0, 20000.0),
    (5000.0, 20000.0),
];

/// Short scatter window granted when frightened wears off.
pub const POST_FRIGHTENED_SCATTER_MS: f64 = 3000.0;

/// Clyde retreats to his corner once closer than this to Pac-Man.
const CLYDE_SHY_DISTANCE: i32 = 8;

/// Per-ghost mode tracker. Deadlines are absolute tick timestamps injected
/// by the simulation loop, never read from a global clock.
#[derive(Clone, Debug)]
pub struct GhostBrain {
    pub mode: GhostMode,
    pub mode_ends_at: f64,
    pub scatter_index: usize,
}

impl GhostBrain {
    pub fn new(now_ms: f64) -> GhostBrain {
        GhostBrain {
            mode: GhostMode::Scatter,
            mode_ends_at: now_ms + BASE_CYCLE[0].0,
            scatter_index: 0,
        }
    }

    /// Advance the scatter/chase alternation. Frightened and eyes are
    /// driven externally and freeze the cycle.
    pub fn update(&mut self, now_ms: f64, adaptive: &AdaptiveParams) {
        if self.mode == GhostMode::Frightened || self.mode == GhostMode::Eyes {
            return;
        }
        if self.scatter_index >= BASE_CYCLE.len() {
            self.mode = GhostMode::Chase;
            return;
        }
        if now_ms < self.mode_ends_at {
            return;
        }
        match self.mode {
            GhostMode::Scatter => {
                self.mode = GhostMode::Chase;
                self.mode_ends_at = now_ms + BASE_CYCLE[self.scatter_index].1;
            }
            GhostMode::Chase => {
                self.scatter_index += 1;
                self.mode = GhostMode::Scatter;
                let idx = self.scatter_index.min(BASE_CYCLE.len() - 1);
                self.mode_ends_at = now_ms + BASE_CYCLE[idx].0 * adaptive.scatter_factor as f64;
            }
            GhostMode::Frightened | GhostMode::Eyes => {}
        }
    }

    pub fn enter_frightened(&mut self) {
        self.mode = GhostMode::Frightened;
    }

    /// Resume the cycle in scatter once the frightened timer lapses.
    pub fn exit_frightened(&mut self, now_ms: f64) {
        if self.mode == GhostMode::Frightened {
            self.mode = GhostMode::Scatter;
            self.mode_ends_at = now_ms + POST_FRIGHTENED_SCATTER_MS;
        }
    }
}

fn project_ahead(start: Cell, dir: Dir, steps: i32, cols: i32) -> Cell {
    let mut cell = start;
    for _ in 0..steps {
        cell = neighbor(cell, dir, cols);
    }
    cell
}

/// Chase-mode target cell for a ghost's personality.
pub fn chase_target(
    g: &Ghost,
    pac: &Pacman,
    ghosts: &[Ghost],
    adaptive: &AdaptiveParams,
    level: &Level,
) -> Cell {
    let cols = level.cols();
    let ahead = adaptive.prediction_ahead.round() as i32;
    match g.personality {
        Personality::Blinky => pac.cell,
        Personality::Pinky => project_ahead(pac.cell, pac.dir, ahead, cols),
        Personality::Inky => {
            let steps = (ahead as f32 / 2.0).round().max(2.0) as i32;
            let pivot = project_ahead(pac.cell, pac.dir, steps, cols);
            match ghosts.iter().find(|x| x.personality == Personality::Blinky) {
                Some(blinky) => Cell::new(
                    pivot.r + (pivot.r - blinky.cell.r),
                    pivot.c + (pivot.c - blinky.cell.c),
                ),
                None => pivot,
            }
        }
        Personality::Clyde => {
            if manhattan(g.cell, pac.cell) > CLYDE_SHY_DISTANCE {
                pac.cell
            } else {
                Personality::Clyde.scatter_corner(level.rows(), cols)
            }
        }
    }
}

/// Direction decision at a cell center. The reverse of the current direction
/// is excluded unless it is the only option.
pub fn decide_direction(
    g: &Ghost,
    brain: &GhostBrain,
    pac: &Pacman,
    ghosts: &[Ghost],
    valid: &[Dir],
    adaptive: &AdaptiveParams,
    level: &Level,
    rng: &mut impl Rng,
) -> Dir {
    let opts: Vec<Dir> = valid
        .iter()
        .copied()
        .filter(|&d| d != g.dir.reverse())
        .collect();
    if opts.is_empty() {
        // Dead end: the anti-oscillation exclusion would strand the ghost,
        // so the reversal is allowed. A fully walled cell keeps the
        // current direction.
        return valid.first().copied().unwrap_or(g.dir);
    }

    let cols = level.cols();
    if g.eyes_home {
        return choose_closest(&opts, g.cell, GHOST_HOME, cols);
    }

    if brain.mode == GhostMode::Frightened && !g.eaten {
        return *opts.choose(rng).expect("opts is non-empty");
    }

    if rng.gen::<f32>() < adaptive.randomness {
        return *opts.choose(rng).expect("opts is non-empty");
    }

    let target = if brain.mode == GhostMode::Scatter {
        g.personality.scatter_corner(level.rows(), cols)
    } else {
        chase_target(g, pac, ghosts, adaptive, level)
    };

    if adaptive.chase_weight == 1.0 {
        return choose_closest(&opts, g.cell, target, cols);
    }
    let mut best = opts[0];
    let mut best_score = f32::INFINITY;
    for &d in &opts {
        let n = neighbor(g.cell, d, cols);
        let score = manhattan(n, target) as f32 / adaptive.chase_weight;
        if score < best_score {
            best_score = score;
            best = d;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::valid_dirs;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_adaptive() -> AdaptiveParams {
        AdaptiveParams {
            prediction_ahead: 4.0,
            chase_weight: 1.0,
            scatter_factor: 1.0,
            randomness: 0.0,
            level_learned: 1,
        }
    }

    #[test]
    fn cycle_alternates_and_scales_scatter() {
        let adaptive = AdaptiveParams {
            scatter_factor: 0.5,
            ..fixed_adaptive()
        };
        let mut brain = GhostBrain::new(0.0);
        assert_eq!(brain.mode, GhostMode::Scatter);

        brain.update(7000.0, &adaptive);
        assert_eq!(brain.mode, GhostMode::Chase);
        assert_eq!(brain.mode_ends_at, 27000.0);

        brain.update(27000.0, &adaptive);
        assert_eq!(brain.mode, GhostMode::Scatter);
        assert_eq!(brain.scatter_index, 1);
        // 7000 base scaled by 0.5.
        assert_eq!(brain.mode_ends_at, 27000.0 + 3500.0);
    }

    #[test]
    fn cycle_ends_in_permanent_chase() {
        let adaptive = fixed_adaptive();
        let mut brain = GhostBrain::new(0.0);
        brain.scatter_index = BASE_CYCLE.len();
        brain.mode = GhostMode::Scatter;
        brain.update(1.0, &adaptive);
        assert_eq!(brain.mode, GhostMode::Chase);
        brain.update(1e9, &adaptive);
        assert_eq!(brain.mode, GhostMode::Chase);
    }

    #[test]
    fn frightened_freezes_cycle_and_eyes_survive_expiry() {
        let adaptive = fixed_adaptive();
        let mut brain = GhostBrain::new(0.0);
        brain.enter_frightened();
        brain.update(1e9, &adaptive);
        assert_eq!(brain.mode, GhostMode::Frightened);

        // A brain already in eyes must not be disturbed by a pending
        // frightened expiration.
        brain.mode = GhostMode::Eyes;
        brain.exit_frightened(5000.0);
        assert_eq!(brain.mode, GhostMode::Eyes);
    }

    #[test]
    fn never_reverses_outside_frightened() {
        let level = Level::for_level(1);
        let adaptive = fixed_adaptive();
        let mut rng = StdRng::seed_from_u64(7);
        let pac = Pacman::spawn();
        let ghosts: Vec<Ghost> = Personality::ALL.iter().map(|&p| Ghost::spawn(p)).collect();
        // (5,5) is an open junction on variant 1's long corridor.
        let mut g = Ghost::spawn(Personality::Blinky);
        g.cell = Cell::new(5, 5);
        let brain = GhostBrain::new(0.0);
        for dir in crate::geometry::ALL_DIRS {
            g.dir = dir;
            let valid = valid_dirs(&level, g.cell);
            if valid.iter().filter(|&&d| d != dir.reverse()).count() == 0 {
                continue;
            }
            for _ in 0..50 {
                let chosen = decide_direction(
                    &g, &brain, &pac, &ghosts, &valid, &adaptive, &level, &mut rng,
                );
                assert_ne!(chosen, dir.reverse());
            }
        }
    }

    #[test]
    fn eyes_head_for_home() {
        let level = Level::for_level(1);
        let adaptive = fixed_adaptive();
        let mut rng = StdRng::seed_from_u64(3);
        let pac = Pacman::spawn();
        let ghosts: Vec<Ghost> = Personality::ALL.iter().map(|&p| Ghost::spawn(p)).collect();
        let mut g = Ghost::spawn(Personality::Pinky);
        g.eyes_home = true;
        // (8,13) is on the house corridor; home lies to the left.
        g.cell = Cell::new(8, 13);
        g.dir = Dir::Down;
        let mut brain = GhostBrain::new(0.0);
        brain.mode = GhostMode::Eyes;
        let valid = valid_dirs(&level, g.cell);
        let chosen = decide_direction(&g, &brain, &pac, &ghosts, &valid, &adaptive, &level, &mut rng);
        assert_eq!(chosen, Dir::Left);
        let n = neighbor(g.cell, chosen, level.cols());
        assert!(manhattan(n, GHOST_HOME) < manhattan(g.cell, GHOST_HOME));
    }

    #[test]
    fn clyde_retreats_when_close() {
        let level = Level::for_level(1);
        let adaptive = fixed_adaptive();
        let mut pac = Pacman::spawn();
        let ghosts: Vec<Ghost> = Personality::ALL.iter().map(|&p| Ghost::spawn(p)).collect();
        let mut clyde = Ghost::spawn(Personality::Clyde);

        clyde.cell = Cell::new(10, 9);
        pac.cell = Cell::new(11, 9);
        let target = chase_target(&clyde, &pac, &ghosts, &adaptive, &level);
        assert_eq!(target, Personality::Clyde.scatter_corner(16, 19));

        pac.cell = Cell::new(1, 1);
        let target = chase_target(&clyde, &pac, &ghosts, &adaptive, &level);
        assert_eq!(target, pac.cell);
    }

    #[test]
    fn inky_doubles_the_blinky_vector() {
        let level = Level::for_level(1);
        let adaptive = fixed_adaptive();
        let mut pac = Pacman::spawn();
        pac.cell = Cell::new(5, 5);
        pac.dir = Dir::Right;
        let mut ghosts: Vec<Ghost> = Personality::ALL.iter().map(|&p| Ghost::spawn(p)).collect();
        ghosts[0].cell = Cell::new(5, 3); // blinky
        let inky = ghosts[2].clone();
        // pivot = two ahead of pac = (5,7); target = pivot + (pivot - blinky).
        let target = chase_target(&inky, &pac, &ghosts, &adaptive, &level);
        assert_eq!(target, Cell::new(5, 11));
    }
}
