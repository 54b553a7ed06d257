use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::io;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Ghost, Pacman};
use crate::geometry::{manhattan, neighbor, valid_dirs, Cell, Dir, ALL_DIRS};
use crate::level::Level;

// Reward shaping surface. The qualitative shape matters (small step
// penalty, moderate positive shaping, large terminal values); magnitudes
// were tuned by play, not derived.
pub const STEP_PENALTY: f32 = -0.02;
pub const PELLET_REWARD: f32 = 1.2;
pub const POWER_REWARD: f32 = 10.0;
pub const GHOST_REWARD: f32 = 8.0;
pub const DEATH_PENALTY: f32 = -30.0;
pub const WIN_REWARD: f32 = 50.0;
const STARVATION_SOFT: u32 = 5;
const STARVATION_HARD: u32 = 20;
const STARVATION_SHOCK: f32 = -1.0;

pub const EPISODE_STEP_CEILING: u32 = 1000;

const NOVELTY_VISIT_BONUS: f32 = 0.35;
const FIRST_COLLECT_BONUS: f32 = 0.25;
const PELLET_APPROACH_WEIGHT: f32 = 0.06;
const GHOST_ESCAPE_WEIGHT: f32 = 0.04;
const LOOP_PENALTY_UNIT: f32 = -0.4;
const LOOP_WINDOW: usize = 10;
const LOOP_REVISIT_MIN: usize = 4;

const GHOST_DIST_CLAMP: i32 = 12;
const PELLET_SEARCH_DEPTH: i32 = 30;
const FRESH_SEARCH_DEPTH: i32 = 40;

const RECENT_WINDOW: usize = 24;
const VISIT_DECAY_INTERVAL: u32 = 120;
const NOVELTY_EPSILON_GATE: f32 = 0.05;
const CONFINE_BOX_SPAN: i32 = 4;
const CONFINE_UNIQUE_MAX: usize = 6;

/// Persisted policy parameters. Serialized field names form the stable
/// storage schema, shared with export/import blobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyParams {
    pub epsilon: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub alpha: f32,
    pub gamma: f32,
}

impl PolicyParams {
    fn initial() -> PolicyParams {
        PolicyParams {
            epsilon: 0.25,
            epsilon_min: 0.02,
            epsilon_decay: 0.985,
            alpha: 0.18,
            gamma: 0.92,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub episode: u32,
    pub total_reward: f32,
    pub last_reward: f32,
    pub avg_reward_window: f32,
    pub steps: u32,
}

impl AgentMetrics {
    fn initial() -> AgentMetrics {
        AgentMetrics {
            episode: 1,
            total_reward: 0.0,
            last_reward: 0.0,
            avg_reward_window: 0.0,
            steps: 0,
        }
    }
}

/// The durable part of the learning state: everything that survives a
/// session restart. Transient per-tick bookkeeping lives outside.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QState {
    pub q_table: HashMap<String, [f32; 4]>,
    pub params: PolicyParams,
    pub metrics: AgentMetrics,
}

impl QState {
    fn initial() -> QState {
        QState {
            q_table: HashMap::new(),
            params: PolicyParams::initial(),
            metrics: AgentMetrics::initial(),
        }
    }
}

/// Exploration bookkeeping: a fixed, enumerable set of fields, cleared on
/// death and timeout but kept across ordinary level completion so spatial
/// knowledge carries over within a run.
#[derive(Clone, Debug, Default)]
pub struct Exploration {
    visit_counts: HashMap<Cell, u32>,
    recent: VecDeque<Cell>,
    collected: HashSet<Cell>,
    pub starvation: u32,
    steps_since_decay: u32,
    last_pellet_dist: Option<i32>,
    last_ghost_dist: Option<i32>,
}

impl Exploration {
    pub fn visits(&self, cell: Cell) -> u32 {
        self.visit_counts.get(&cell).copied().unwrap_or(0)
    }

    pub fn collected_at(&self, cell: Cell) -> bool {
        self.collected.contains(&cell)
    }

    /// Negative penalty when the entered cell shows up heavily in the
    /// recent window, scaled by the revisit count.
    pub fn loop_penalty(&self, cell: Cell) -> f32 {
        let revisits = self
            .recent
            .iter()
            .rev()
            .take(LOOP_WINDOW)
            .filter(|&&c| c == cell)
            .count();
        if revisits >= LOOP_REVISIT_MIN {
            LOOP_PENALTY_UNIT * (revisits - LOOP_REVISIT_MIN + 1) as f32
        } else {
            0.0
        }
    }

    pub fn record_step(&mut self, cell: Cell, collected_something: bool) {
        *self.visit_counts.entry(cell).or_insert(0) += 1;
        self.recent.push_back(cell);
        while self.recent.len() > RECENT_WINDOW {
            self.recent.pop_front();
        }
        if collected_something {
            self.starvation = 0;
            self.collected.insert(cell);
        } else {
            self.starvation += 1;
        }
        self.steps_since_decay += 1;
        if self.steps_since_decay >= VISIT_DECAY_INTERVAL {
            self.steps_since_decay = 0;
            // Halve counts so stale areas become worth revisiting.
            for count in self.visit_counts.values_mut() {
                *count /= 2;
            }
            self.visit_counts.retain(|_, count| *count > 0);
        }
    }

    /// Last four cells form an A-B-A-B oscillation.
    fn ping_pong(&self) -> bool {
        if self.recent.len() < 4 {
            return false;
        }
        let tail: Vec<Cell> = self.recent.iter().rev().take(4).copied().collect();
        tail[0] != tail[1] && tail[0] == tail[2] && tail[1] == tail[3]
    }

    /// Last six cells collapse to at most two unique cells.
    fn stuck(&self) -> bool {
        if self.recent.len() < 6 {
            return false;
        }
        let unique: HashSet<Cell> = self.recent.iter().rev().take(6).copied().collect();
        unique.len() <= 2
    }

    /// The rolling window fits in a small bounding box with low revisit
    /// diversity, i.e. the agent is orbiting a pocket of the maze.
    fn confined(&self) -> bool {
        if self.recent.len() < RECENT_WINDOW {
            return false;
        }
        let unique: HashSet<Cell> = self.recent.iter().copied().collect();
        if unique.len() > CONFINE_UNIQUE_MAX {
            return false;
        }
        let min_r = unique.iter().map(|c| c.r).min().unwrap_or(0);
        let max_r = unique.iter().map(|c| c.r).max().unwrap_or(0);
        let min_c = unique.iter().map(|c| c.c).min().unwrap_or(0);
        let max_c = unique.iter().map(|c| c.c).max().unwrap_or(0);
        max_r - min_r <= CONFINE_BOX_SPAN && max_c - min_c <= CONFINE_BOX_SPAN
    }

    pub fn clear(&mut self) {
        self.visit_counts.clear();
        self.recent.clear();
        self.collected.clear();
        self.starvation = 0;
        self.steps_since_decay = 0;
        self.last_pellet_dist = None;
        self.last_ghost_dist = None;
    }
}

/// Per-step reward inputs. Callers fill in only what happened; the default
/// is the plain step penalty.
#[derive(Clone, Copy, Debug, Default)]
pub struct RewardFlags {
    pub pellet_eaten: bool,
    pub power_eaten: bool,
    pub ghost_eaten: bool,
    pub died: bool,
    pub won: bool,
    /// Already negative when set.
    pub loop_penalty: f32,
    pub starvation_steps: u32,
    pub novelty_bonus: f32,
    pub shaping: f32,
}

/// Pure reward function; one call per cell advance, never per frame.
pub fn compute_reward(flags: &RewardFlags) -> f32 {
    let mut r = STEP_PENALTY;
    if flags.pellet_eaten {
        r += PELLET_REWARD;
    }
    if flags.power_eaten {
        r += POWER_REWARD;
    }
    if flags.ghost_eaten {
        r += GHOST_REWARD;
    }
    if flags.died {
        r += DEATH_PENALTY;
    }
    if flags.won {
        r += WIN_REWARD;
    }
    r += flags.loop_penalty;
    if !flags.pellet_eaten && !flags.power_eaten {
        let st = flags.starvation_steps;
        if st > STARVATION_SOFT {
            let over = (st - STARVATION_SOFT) as f32;
            r += -0.01 * over * over * 4.0;
        }
        if st > STARVATION_HARD {
            r += STARVATION_SHOCK;
        }
    }
    r += flags.novelty_bonus;
    r += flags.shaping;
    r
}

/// Bounded BFS distance to the nearest plain pellet; `max_depth + 1` when
/// none is reachable within the bound.
pub fn nearest_pellet_distance(level: &Level, start: Cell, max_depth: i32) -> i32 {
    let cols = level.cols();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((start, 0));
    seen.insert(start);
    while let Some((cell, d)) = queue.pop_front() {
        if level.is_pellet(cell.r, cell.c) {
            return d;
        }
        if d >= max_depth {
            continue;
        }
        for dir in ALL_DIRS {
            let n = neighbor(cell, dir, cols);
            if level.is_wall(n.r, n.c) || !seen.insert(n) {
                continue;
            }
            queue.push_back((n, d + 1));
        }
    }
    max_depth + 1
}

pub fn min_ghost_distance(pac: &Pacman, ghosts: &[Ghost]) -> i32 {
    ghosts
        .iter()
        .map(|g| manhattan(pac.cell, g.cell))
        .min()
        .unwrap_or(0)
}

/// First step of a bounded BFS path to the nearest never-visited pellet or
/// power cell.
fn bfs_fresh_step(level: &Level, start: Cell, explore: &Exploration, max_depth: i32) -> Option<Dir> {
    let cols = level.cols();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    for dir in ALL_DIRS {
        let n = neighbor(start, dir, cols);
        if level.is_wall(n.r, n.c) || !seen.insert(n) {
            continue;
        }
        queue.push_back((n, dir, 1));
    }
    while let Some((cell, first, d)) = queue.pop_front() {
        let fresh = (level.is_pellet(cell.r, cell.c) || level.is_power(cell.r, cell.c))
            && explore.visits(cell) == 0;
        if fresh {
            return Some(first);
        }
        if d >= max_depth {
            continue;
        }
        for dir in ALL_DIRS {
            let n = neighbor(cell, dir, cols);
            if level.is_wall(n.r, n.c) || !seen.insert(n) {
                continue;
            }
            queue.push_back((n, first, d + 1));
        }
    }
    None
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EpisodeEndReason {
    Win,
    Death,
    Timeout,
    Other,
}

/// Shaping inputs the simulation loop feeds into `compute_reward` for one
/// cell advance.
#[derive(Clone, Copy, Debug, Default)]
pub struct StepShaping {
    pub loop_penalty: f32,
    pub novelty_bonus: f32,
    pub shaping: f32,
    pub starvation_steps: u32,
}

/// Online tabular Q-learning agent. Table entries are created lazily on
/// first reference; updates are pure, persistence is an explicit step the
/// simulation loop invokes at its boundary.
pub struct QLearningAgent {
    pub persisted: QState,
    prev_state_key: Option<String>,
    prev_action: Option<usize>,
    pub explore: Exploration,
    dirty: bool,
}

impl QLearningAgent {
    pub fn fresh() -> QLearningAgent {
        QLearningAgent {
            persisted: QState::initial(),
            prev_state_key: None,
            prev_action: None,
            explore: Exploration::default(),
            dirty: false,
        }
    }

    /// Reload persisted state when the file exists and parses; anything
    /// missing or corrupt means a fresh start, never a failure.
    pub fn load_or_fresh(path: Option<&Path>) -> QLearningAgent {
        let persisted = path
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|raw| serde_json::from_str::<QState>(&raw).ok());
        match persisted {
            Some(state) => {
                tracing::info!(
                    episode = state.metrics.episode,
                    states = state.q_table.len(),
                    "restored learning state"
                );
                QLearningAgent {
                    persisted: state,
                    prev_state_key: None,
                    prev_action: None,
                    explore: Exploration::default(),
                    dirty: false,
                }
            }
            None => QLearningAgent::fresh(),
        }
    }

    /// Coarse state key: exact cell, two nearest ghost distances (clamped),
    /// pellet/power flags for the current cell, and the legal-direction
    /// bitmask. Coarseness keeps the table small enough to converge within
    /// a single session.
    pub fn encode_state(level: &Level, pac: &Pacman, ghosts: &[Ghost]) -> String {
        let mut dists: Vec<i32> = ghosts
            .iter()
            .map(|g| manhattan(pac.cell, g.cell).min(GHOST_DIST_CLAMP))
            .collect();
        dists.sort_unstable();
        dists.truncate(2);
        while dists.len() < 2 {
            dists.push(GHOST_DIST_CLAMP);
        }
        let pellet_here = u8::from(level.is_pellet(pac.cell.r, pac.cell.c));
        let power_here = u8::from(level.is_power(pac.cell.r, pac.cell.c));
        let legal = valid_dirs(level, pac.cell);
        let mask: String = ALL_DIRS
            .iter()
            .map(|d| if legal.contains(d) { '1' } else { '0' })
            .collect();
        format!(
            "{},{}|{},{}|{}{}|{}",
            pac.cell.r, pac.cell.c, dists[0], dists[1], pellet_here, power_here, mask
        )
    }

    /// ε-greedy selection over legal actions, then the exploration-correcting
    /// overrides in precedence order: ping-pong break, stuck break, low-ε
    /// novelty bias, confinement escape, BFS fallback.
    pub fn choose_action(
        &mut self,
        level: &Level,
        pac: &Pacman,
        ghosts: &[Ghost],
        rng: &mut impl Rng,
    ) -> Dir {
        let key = Self::encode_state(level, pac, ghosts);
        let q = *self
            .persisted
            .q_table
            .entry(key.clone())
            .or_insert([0.0; 4]);

        let candidates = valid_dirs(level, pac.cell);
        if candidates.is_empty() {
            self.prev_state_key = Some(key);
            self.prev_action = Some(0);
            return Dir::from_index(0);
        }

        let mut choice = if rng.gen::<f32>() < self.persisted.params.epsilon {
            *candidates.choose(rng).expect("candidates is non-empty")
        } else {
            let mut best = candidates[0];
            for &d in &candidates[1..] {
                if q[d.index()] > q[best.index()] {
                    best = d;
                }
            }
            best
        };

        let non_reverse: Vec<Dir> = {
            let filtered: Vec<Dir> = candidates
                .iter()
                .copied()
                .filter(|&d| d != pac.dir.reverse())
                .collect();
            if filtered.is_empty() {
                candidates.clone()
            } else {
                filtered
            }
        };

        if self.explore.ping_pong() {
            choice = *non_reverse
                .iter()
                .min_by_key(|&&d| {
                    let n = neighbor(pac.cell, d, level.cols());
                    nearest_pellet_distance(level, n, PELLET_SEARCH_DEPTH)
                })
                .expect("non_reverse is non-empty");
        } else if self.explore.stuck() {
            choice = *non_reverse.choose(rng).expect("non_reverse is non-empty");
        } else if self.persisted.params.epsilon < NOVELTY_EPSILON_GATE {
            choice = self.novelty_pick(level, pac.cell, &candidates, rng);
        } else if self.explore.confined() {
            if let Some(d) = bfs_fresh_step(level, pac.cell, &self.explore, FRESH_SEARCH_DEPTH) {
                choice = d;
            }
        } else {
            let all_stale = non_reverse.iter().all(|&d| {
                let n = neighbor(pac.cell, d, level.cols());
                self.explore.visits(n) > 0
                    && !level.is_pellet(n.r, n.c)
                    && !level.is_power(n.r, n.c)
            });
            if all_stale {
                if let Some(d) = bfs_fresh_step(level, pac.cell, &self.explore, FRESH_SEARCH_DEPTH)
                {
                    choice = d;
                }
            }
        }

        self.prev_state_key = Some(key);
        self.prev_action = Some(choice.index());
        choice
    }

    /// Visit-scarcity scoring: unvisited neighbors rank highest, decaying
    /// with count; pellets and fresh onward neighbors add on top, plus a
    /// little jitter to break symmetric corridors.
    fn novelty_pick(
        &self,
        level: &Level,
        from: Cell,
        candidates: &[Dir],
        rng: &mut impl Rng,
    ) -> Dir {
        let cols = level.cols();
        let mut best = candidates[0];
        let mut best_score = f32::NEG_INFINITY;
        for &d in candidates {
            let n = neighbor(from, d, cols);
            let visits = self.explore.visits(n);
            let mut score = if visits == 0 {
                2.0
            } else {
                1.0 / (1.0 + visits as f32)
            };
            if level.is_pellet(n.r, n.c) || level.is_power(n.r, n.c) {
                score += 0.8;
            }
            let fresh_neighbors = ALL_DIRS
                .iter()
                .filter(|&&nd| {
                    let nn = neighbor(n, nd, cols);
                    !level.is_wall(nn.r, nn.c) && self.explore.visits(nn) == 0
                })
                .count();
            score += 0.15 * fresh_neighbors as f32;
            score += rng.gen::<f32>() * 0.05;
            if score > best_score {
                best_score = score;
                best = d;
            }
        }
        best
    }

    /// Bookkeeping for one cell advance, run before the reward is computed:
    /// collects the loop penalty and one-time novelty bonuses, records the
    /// visit, and derives the incremental shaping terms (closer to the
    /// nearest pellet, farther from the nearest ghost).
    pub fn observe_advance(
        &mut self,
        level: &Level,
        pac: &Pacman,
        ghosts: &[Ghost],
        collected: bool,
    ) -> StepShaping {
        let entered = pac.cell;
        let loop_penalty = self.explore.loop_penalty(entered);
        let mut novelty_bonus = 0.0;
        if self.explore.visits(entered) == 0 {
            novelty_bonus += NOVELTY_VISIT_BONUS;
        }
        if collected && !self.explore.collected_at(entered) {
            novelty_bonus += FIRST_COLLECT_BONUS;
        }
        self.explore.record_step(entered, collected);

        let pellet_dist = nearest_pellet_distance(level, entered, PELLET_SEARCH_DEPTH);
        let ghost_dist = min_ghost_distance(pac, ghosts);
        let mut shaping = 0.0;
        if let Some(prev) = self.explore.last_pellet_dist {
            shaping += PELLET_APPROACH_WEIGHT * (prev - pellet_dist) as f32;
        }
        if let Some(prev) = self.explore.last_ghost_dist {
            shaping += GHOST_ESCAPE_WEIGHT * (ghost_dist - prev) as f32;
        }
        self.explore.last_pellet_dist = Some(pellet_dist);
        self.explore.last_ghost_dist = Some(ghost_dist);

        StepShaping {
            loop_penalty,
            novelty_bonus,
            shaping,
            starvation_steps: self.explore.starvation,
        }
    }

    /// One-step temporal-difference update. The very first transition of an
    /// episode has no previous state/action memo and is skipped.
    pub fn update(&mut self, reward: f32, level: &Level, pac: &Pacman, ghosts: &[Ghost]) {
        let new_key = Self::encode_state(level, pac, ghosts);
        let q_now = *self
            .persisted
            .q_table
            .entry(new_key)
            .or_insert([0.0; 4]);
        if let (Some(prev_key), Some(action)) = (self.prev_state_key.as_ref(), self.prev_action) {
            let max_next = q_now.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let params = self.persisted.params.clone();
            let entry = self
                .persisted
                .q_table
                .entry(prev_key.clone())
                .or_insert([0.0; 4]);
            entry[action] += params.alpha * (reward + params.gamma * max_next - entry[action]);
        }
        let m = &mut self.persisted.metrics;
        m.total_reward += reward;
        m.last_reward = reward;
        m.steps += 1;
        m.avg_reward_window = m.avg_reward_window * 0.98 + reward * 0.02;
        self.dirty = true;
    }

    /// Episode boundary: adjust ε by the end reason, reset per-episode
    /// metrics, and clear the TD memo so the next update starts a fresh
    /// chain.
    pub fn end_episode(&mut self, reason: EpisodeEndReason) {
        let params = &mut self.persisted.params;
        let metrics = &self.persisted.metrics;
        let mut effective_decay = params.epsilon_decay;
        match reason {
            EpisodeEndReason::Win => {
                effective_decay = 0.9;
            }
            EpisodeEndReason::Death => {
                if metrics.steps < 40 && metrics.avg_reward_window < -0.2 {
                    params.epsilon = (params.epsilon * 1.08).min(0.5);
                } else {
                    effective_decay = 0.992;
                }
            }
            EpisodeEndReason::Timeout => {
                params.epsilon = (params.epsilon * 1.02).min(0.45);
                effective_decay = 0.99;
            }
            EpisodeEndReason::Other => {
                if metrics.avg_reward_window < -0.5 {
                    params.epsilon = (params.epsilon * 1.05).min(0.6);
                    effective_decay = 0.995;
                }
            }
        }
        if params.epsilon > params.epsilon_min {
            params.epsilon = (params.epsilon * effective_decay).max(params.epsilon_min);
        }
        tracing::info!(
            episode = self.persisted.metrics.episode,
            reason = ?reason,
            epsilon = self.persisted.params.epsilon,
            total_reward = self.persisted.metrics.total_reward,
            "episode ended"
        );
        let m = &mut self.persisted.metrics;
        m.episode += 1;
        m.total_reward = 0.0;
        m.steps = 0;
        m.last_reward = 0.0;
        self.prev_state_key = None;
        self.prev_action = None;
        self.dirty = true;
    }

    /// Write-through persistence, invoked from the simulation loop boundary.
    pub fn persist_if_dirty(&mut self, path: &Path) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string(&self.persisted)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(path, json)?;
        self.dirty = false;
        Ok(())
    }

    pub fn export_json(&self) -> String {
        serde_json::to_string(&self.persisted).unwrap_or_default()
    }

    /// Accepts any blob matching the storage schema; anything else is
    /// rejected without touching the live state.
    pub fn import_json(&mut self, raw: &str) -> bool {
        match serde_json::from_str::<QState>(raw) {
            Ok(state) => {
                self.persisted = state;
                self.prev_state_key = None;
                self.prev_action = None;
                self.dirty = true;
                true
            }
            Err(_) => false,
        }
    }

    /// Discard stored and in-memory learning state.
    pub fn hard_reset(&mut self, path: Option<&Path>) {
        if let Some(p) = path {
            let _ = fs::remove_file(p);
        }
        self.persisted = QState::initial();
        self.prev_state_key = None;
        self.prev_action = None;
        self.explore.clear();
        self.dirty = false;
    }

    pub fn has_td_memo(&self) -> bool {
        self.prev_state_key.is_some() && self.prev_action.is_some()
    }
}
