//! Schedule instability
//!
//! Spread of recent shift start times. A rota that keeps jumping between
//! early, late and night starts gives the body clock no stable anchor.

use crate::config::{ShiftLagConfig, StartTimeSpread};
use crate::source::DateWindow;
use crate::stats::{circular_std_dev_minutes, population_std_dev, round1};
use crate::types::{InstabilityScore, ShiftRecord};

/// Minimum number of shift starts needed to measure a spread
pub const MIN_START_SAMPLES: usize = 2;

/// Estimator for the instability component
pub struct InstabilityEstimator;

impl InstabilityEstimator {
    pub fn estimate(
        shifts: &[ShiftRecord],
        window: DateWindow,
        config: &ShiftLagConfig,
    ) -> InstabilityScore {
        let offset = config.offset();

        let starts: Vec<f64> = shifts
            .iter()
            .filter(|s| window.contains(s.date) && s.is_scorable_shift())
            .filter_map(|s| s.start_minutes(offset))
            .collect();

        if starts.len() < MIN_START_SAMPLES {
            return InstabilityScore {
                samples: starts.len(),
                ..InstabilityScore::default()
            };
        }

        let spread_minutes = match config.start_time_spread {
            StartTimeSpread::Linear => population_std_dev(&starts),
            StartTimeSpread::Circular => circular_std_dev_minutes(&starts),
        }
        .unwrap_or(0.0);
        let variability_hours = spread_minutes / 60.0;

        InstabilityScore {
            score: config.instability_curve.score(round1(variability_hours)),
            variability_hours,
            samples: starts.len(),
        }
    }
}
