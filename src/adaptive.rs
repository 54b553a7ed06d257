/// Cross-level ghost difficulty parameters, nudged between levels from a
/// performance score and clamped to safe ranges so difficulty cannot run
/// away in either direction.
#[derive(Clone, Copy, Debug)]
pub struct AdaptiveParams {
    /// Cells Pinky/Inky project ahead of Pac-Man (2..8).
    pub prediction_ahead: f32,
    /// Sharpens target-seeking at intersections (1.0..1.6).
    pub chase_weight: f32,
    /// Multiplier on base scatter durations (0.2..1.1).
    pub scatter_factor: f32,
    /// Chance of a random choice at an intersection (0..0.5).
    pub randomness: f32,
    /// Last level at which an update happened.
    pub level_learned: u32,
}

impl AdaptiveParams {
    pub fn initial() -> AdaptiveParams {
        AdaptiveParams {
            prediction_ahead: 4.0,
            chase_weight: 1.05,
            scatter_factor: 1.0,
            randomness: 0.12,
            level_learned: 1,
        }
    }
}

/// Per-level performance counters. Reset on every level start.
#[derive(Clone, Copy, Debug)]
pub struct LevelMetrics {
    pub level: u32,
    pub start_time: f64,
    pub pellets_eaten: u32,
    pub power_pellets_eaten: u32,
    pub ghosts_eaten: u32,
    pub deaths: u32,
}

impl LevelMetrics {
    pub fn new(level: u32, now_ms: f64) -> LevelMetrics {
        LevelMetrics {
            level,
            start_time: now_ms,
            pellets_eaten: 0,
            power_pellets_eaten: 0,
            ghosts_eaten: 0,
            deaths: 0,
        }
    }
}

const TARGET_SCORE: f32 = 360.0;

pub fn performance_score(m: &LevelMetrics, now_ms: f64) -> f32 {
    let elapsed_sec = ((now_ms - m.start_time) / 1000.0) as f32;
    m.pellets_eaten as f32 * 1.0 + m.power_pellets_eaten as f32 * 8.0
        + m.ghosts_eaten as f32 * 15.0
        - m.deaths as f32 * 25.0
        - elapsed_sec * 0.02
}

/// Directional adjustment: outperforming the target hardens the ghosts
/// (longer lookahead, sharper chase, shorter scatter, less noise);
/// underperforming relaxes them. Small proportional nudge in between.
pub fn update_adaptive(prev: &AdaptiveParams, score: f32, level: u32) -> AdaptiveParams {
    let ratio = score / TARGET_SCORE;
    let mut ahead = prev.prediction_ahead;
    let mut chase = prev.chase_weight;
    let mut scatter = prev.scatter_factor;
    let mut randomness = prev.randomness;

    if ratio > 1.05 {
        let boost = (ratio - 1.0).min(0.6);
        ahead += 0.6 + boost * 0.6;
        chase += 0.08 + boost * 0.12;
        scatter -= 0.12 + boost * 0.15;
        randomness -= 0.05 + boost * 0.06;
    } else if ratio < 0.75 {
        let drop = (1.0 - ratio).min(0.6);
        ahead -= 0.45 + drop * 0.5;
        chase -= 0.06 + drop * 0.09;
        scatter += 0.15 + drop * 0.2;
        randomness += 0.06 + drop * 0.1;
    } else {
        ahead += (ratio - 1.0) * 0.4;
        chase += (ratio - 1.0) * 0.07;
        scatter += if ratio < 1.0 {
            (1.0 - ratio) * 0.1
        } else {
            (ratio - 1.0) * -0.1
        };
    }

    AdaptiveParams {
        prediction_ahead: ahead.clamp(2.0, 8.0),
        chase_weight: chase.clamp(1.0, 1.6),
        scatter_factor: scatter.clamp(0.2, 1.1),
        randomness: randomness.clamp(0.0, 0.5),
        level_learned: level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_weights_match() {
        let mut m = LevelMetrics::new(1, 0.0);
        m.pellets_eaten = 100;
        m.power_pellets_eaten = 4;
        m.ghosts_eaten = 3;
        m.deaths = 1;
        // 100 + 32 + 45 - 25 - 10s * 0.02
        let score = performance_score(&m, 10_000.0);
        assert!((score - 151.8).abs() < 1e-3);
    }

    #[test]
    fn outperforming_hardens_ghosts() {
        let prev = AdaptiveParams::initial();
        let next = update_adaptive(&prev, TARGET_SCORE * 1.5, 2);
        assert!(next.prediction_ahead > prev.prediction_ahead);
        assert!(next.chase_weight > prev.chase_weight);
        assert!(next.scatter_factor < prev.scatter_factor);
        assert!(next.randomness < prev.randomness);
        assert_eq!(next.level_learned, 2);
    }

    #[test]
    fn underperforming_relaxes_ghosts() {
        let prev = AdaptiveParams::initial();
        let next = update_adaptive(&prev, TARGET_SCORE * 0.3, 2);
        assert!(next.prediction_ahead < prev.prediction_ahead);
        assert!(next.chase_weight <= prev.chase_weight);
        assert!(next.scatter_factor > prev.scatter_factor);
        assert!(next.randomness > prev.randomness);
    }

    #[test]
    fn parameters_stay_clamped() {
        let mut params = AdaptiveParams::initial();
        for level in 2..30 {
            params = update_adaptive(&params, TARGET_SCORE * 3.0, level);
        }
        assert!(params.prediction_ahead <= 8.0);
        assert!(params.chase_weight <= 1.6);
        assert!(params.scatter_factor >= 0.2);
        assert!(params.randomness >= 0.0);

        for level in 30..60 {
            params = update_adaptive(&params, -TARGET_SCORE, level);
        }
        assert!(params.prediction_ahead >= 2.0);
        assert!(params.chase_weight >= 1.0);
        assert!(params.scatter_factor <= 1.1);
        assert!(params.randomness <= 0.5);
    }
}
