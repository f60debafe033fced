//! Piecewise-linear score curves
//!
//! Every component maps a measured quantity (hours of debt, hours of night
//! overlap, hours of start-time spread) to a bounded integer score through a
//! curve of half-open segments `[from, to)`. Values at or above `cap_at` earn
//! `max_score`; zero, negative or NaN inputs and values outside every segment
//! earn zero.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// A single `[from, to)` band, interpolated linearly from `score_from` to `score_to`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    pub from: f64,
    pub to: f64,
    pub score_from: f64,
    pub score_to: f64,
}

impl CurveSegment {
    pub const fn new(from: f64, to: f64, score_from: f64, score_to: f64) -> Self {
        Self {
            from,
            to,
            score_from,
            score_to,
        }
    }

    /// Flat band
    pub const fn constant(from: f64, to: f64, score: f64) -> Self {
        Self::new(from, to, score, score)
    }

    fn contains(&self, value: f64) -> bool {
        value >= self.from && value < self.to
    }

    fn interpolate(&self, value: f64) -> f64 {
        let t = (value - self.from) / (self.to - self.from);
        self.score_from + t * (self.score_to - self.score_from)
    }
}

/// Bounded piecewise-linear mapping from a measurement to a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCurve {
    pub segments: Vec<CurveSegment>,
    /// Threshold at or above which the curve saturates
    pub cap_at: f64,
    pub max_score: u8,
}

impl ScoreCurve {
    /// Weekly sleep debt hours → 0-40
    pub fn sleep_debt() -> Self {
        Self {
            segments: vec![
                CurveSegment::constant(0.0, 3.0, 0.0),
                CurveSegment::new(3.0, 7.0, 10.0, 20.0),
                CurveSegment::new(7.0, 14.0, 20.0, 35.0),
            ],
            cap_at: 14.0,
            max_score: 40,
        }
    }

    /// Average night-overlap hours → 0-40
    pub fn misalignment() -> Self {
        Self {
            segments: vec![
                CurveSegment::constant(0.0, 2.0, 5.0),
                CurveSegment::new(2.0, 4.0, 15.0, 25.0),
                CurveSegment::new(4.0, 6.0, 25.0, 35.0),
                CurveSegment::new(6.0, 8.0, 35.0, 40.0),
            ],
            cap_at: 8.0,
            max_score: 40,
        }
    }

    /// Shift start-time spread hours → 0-20
    pub fn instability() -> Self {
        Self {
            segments: vec![
                CurveSegment::constant(0.0, 2.0, 0.0),
                CurveSegment::new(2.0, 4.0, 5.0, 10.0),
                CurveSegment::new(4.0, 6.0, 10.0, 15.0),
                CurveSegment::new(6.0, 8.0, 15.0, 20.0),
            ],
            cap_at: 8.0,
            max_score: 20,
        }
    }

    /// Score a measurement, rounded to the nearest integer
    pub fn score(&self, value: f64) -> u8 {
        if value.is_nan() || value <= 0.0 {
            return 0;
        }
        if value >= self.cap_at {
            return self.max_score;
        }

        self.segments
            .iter()
            .find(|segment| segment.contains(value))
            .map(|segment| {
                segment
                    .interpolate(value)
                    .round()
                    .clamp(0.0, self.max_score as f64) as u8
            })
            .unwrap_or(0)
    }

    /// Check segments are well-formed, ordered, non-overlapping and within bounds
    pub fn validate(&self, name: &str) -> Result<(), ComputeError> {
        let max = self.max_score as f64;
        let mut previous_end = f64::NEG_INFINITY;

        for segment in &self.segments {
            if !(segment.from < segment.to) {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name}: segment [{}, {}) is empty",
                    segment.from, segment.to
                )));
            }
            if segment.from < previous_end {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name}: segments overlap or are out of order at {}",
                    segment.from
                )));
            }
            let in_range = |s: f64| (0.0..=max).contains(&s);
            if !in_range(segment.score_from) || !in_range(segment.score_to) {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name}: segment scores must lie within 0-{}",
                    self.max_score
                )));
            }
            previous_end = segment.to;
        }

        if self.cap_at < previous_end {
            return Err(ComputeError::InvalidConfig(format!(
                "{name}: cap {} lies inside the last segment",
                self.cap_at
            )));
        }

        Ok(())
    }
}
