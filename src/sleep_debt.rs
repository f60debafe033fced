//! Rolling sleep debt
//!
//! Sums the daily shortfall of main sleep against the user's typical need over
//! the debt window. A day with no logged sleep counts as a full deficit, but a
//! window with no logs at all scores zero: absence of logging is not evidence
//! of sleep loss.

use crate::config::ShiftLagConfig;
use crate::source::DateWindow;
use crate::stats::round1;
use crate::types::{SleepDebtScore, SleepSession};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Estimator for the sleep debt component
pub struct SleepDebtEstimator;

impl SleepDebtEstimator {
    pub fn estimate(
        sessions: &[SleepSession],
        typical_need_hours: f64,
        window: DateWindow,
        config: &ShiftLagConfig,
    ) -> SleepDebtScore {
        let debt_hours = weekly_debt_hours(sessions, typical_need_hours, window, config);

        SleepDebtScore {
            score: config.sleep_debt_curve.score(round1(debt_hours)),
            debt_hours,
        }
    }
}

/// Summed deficit across `window`; zero when nothing was logged in it
pub fn weekly_debt_hours(
    sessions: &[SleepSession],
    typical_need_hours: f64,
    window: DateWindow,
    config: &ShiftLagConfig,
) -> f64 {
    let offset = config.offset();

    let mut per_day: HashMap<NaiveDate, f64> = HashMap::new();
    for session in sessions.iter().filter(|s| !s.is_nap) {
        let date = session.calendar_date(offset);
        if window.contains(date) {
            *per_day.entry(date).or_insert(0.0) += session.duration_hours();
        }
    }

    if per_day.is_empty() {
        return 0.0;
    }

    window
        .days_backward()
        .map(|day| {
            let actual = per_day.get(&day).copied().unwrap_or(0.0);
            (typical_need_hours - actual).max(0.0)
        })
        .sum()
}
