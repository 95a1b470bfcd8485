//! Quadratic level curve. Level `L` starts at `100 * (L - 1)^2` points and ends at `100 * L^2`,
//! so every level takes `100 * (2L - 1)` points, more than the previous one.

use serde::Serialize;

const POINTS_PER_LEVEL_UNIT: f64 = 100.;

/// Where a point total sits on the level curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    pub level: u32,
    /// Fraction of the current level already done, always within 0..=1.
    pub progress: f64,
    pub points_to_next: f64,
}

/// Points at which `level` starts.
pub fn level_floor(level: u32) -> f64 {
    let below = level.saturating_sub(1) as f64;
    POINTS_PER_LEVEL_UNIT * below * below
}

/// Points at which the level after `level` starts.
pub fn level_ceil(level: u32) -> f64 {
    let level = level as f64;
    POINTS_PER_LEVEL_UNIT * level * level
}

impl LevelProgress {
    /// Negative and NaN totals are treated as 0.
    pub fn from_points(points: f64) -> Self {
        let points = if points > 0. { points } else { 0. };

        let mut level = ((points / POINTS_PER_LEVEL_UNIT).sqrt().floor() as u32).saturating_add(1);
        // sqrt may round across a boundary.
        while level > 1 && level_floor(level) > points {
            level -= 1;
        }
        // Levels stop at u32::MAX, around 1.8e21 points. Everything above stays on the last
        // level with full progress.
        while level < u32::MAX && level_ceil(level) <= points {
            level += 1;
        }

        let floor = level_floor(level);
        let ceil = level_ceil(level);
        let span = ceil - floor;
        let progress = if span > 0. {
            ((points - floor) / span).clamp(0., 1.)
        } else {
            1.
        };

        Self {
            level,
            progress,
            points_to_next: (ceil - points).max(0.),
        }
    }
}
