//! Typical sleep need
//!
//! Estimates how much main sleep a user takes when the rota leaves them free:
//! the median of per-day sleep totals on days without a working shift, clamped
//! to a plausible adult range.

use crate::config::ShiftLagConfig;
use crate::source::DateWindow;
use crate::stats::median;
use crate::types::{ShiftRecord, SleepSession};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

/// Estimator for a user's typical sleep need (hours)
pub struct SleepNeedEstimator;

impl SleepNeedEstimator {
    /// Median off-day sleep inside `window`, clamped; the configured default
    /// when no off-day sleep has been logged.
    pub fn estimate(
        sessions: &[SleepSession],
        shifts: &[ShiftRecord],
        window: DateWindow,
        config: &ShiftLagConfig,
    ) -> f64 {
        let offset = config.offset();

        let work_days: HashSet<NaiveDate> = shifts
            .iter()
            .filter(|s| window.contains(s.date) && s.is_work_day())
            .map(|s| s.date)
            .collect();

        let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for session in sessions.iter().filter(|s| !s.is_nap) {
            let date = session.calendar_date(offset);
            if !window.contains(date) || work_days.contains(&date) {
                continue;
            }
            *per_day.entry(date).or_insert(0.0) += session.duration_hours();
        }

        let totals: Vec<f64> = per_day.into_values().collect();
        match median(&totals) {
            Some(hours) => hours.clamp(config.min_sleep_need_hours, config.max_sleep_need_hours),
            None => config.default_sleep_need_hours,
        }
    }
}
