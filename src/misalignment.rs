//! Circadian misalignment
//!
//! Measures how many hours of each recent shift fall inside the biological
//! night. Shifts and the night window are laid out on one minute timeline that
//! starts at the shift's local midnight; the night runs from its start hour to
//! its end hour on the following morning, and a shift whose end hour is before
//! its start hour ends on the following day.

use crate::config::{NightOverlapMode, ShiftLagConfig};
use crate::source::DateWindow;
use crate::stats::{round1, MINUTES_PER_DAY};
use crate::types::{MisalignmentScore, ShiftRecord};
use chrono::FixedOffset;

/// Estimator for the misalignment component
pub struct MisalignmentEstimator;

impl MisalignmentEstimator {
    pub fn estimate(
        shifts: &[ShiftRecord],
        window: DateWindow,
        config: &ShiftLagConfig,
    ) -> MisalignmentScore {
        let offset = config.offset();

        let overlaps: Vec<f64> = shifts
            .iter()
            .filter(|s| window.contains(s.date) && s.is_scorable_shift())
            .filter_map(|s| shift_night_overlap_hours(s, offset, config))
            .collect();

        if overlaps.is_empty() {
            return MisalignmentScore::default();
        }

        let avg_overlap_hours = overlaps.iter().sum::<f64>() / overlaps.len() as f64;

        // Scored at reporting precision: a reported 0.0h never earns points

        MisalignmentScore {
            score: config.misalignment_curve.score(round1(avg_overlap_hours)),
            avg_overlap_hours,
            shifts_considered: overlaps.len(),
        }
    }
}

/// Night-window overlap of one shift in hours; `None` without a start time
pub fn shift_night_overlap_hours(
    shift: &ShiftRecord,
    offset: FixedOffset,
    config: &ShiftLagConfig,
) -> Option<f64> {
    let start = shift.start_minutes(offset)?;
    let end = shift
        .end_minutes(offset)
        .unwrap_or_else(|| estimated_end_minutes(shift, start, config));

    Some(overlap_minutes(start, end, config) / 60.0)
}

/// Shift end when the rota omitted it: long shifts are marked in the label
fn estimated_end_minutes(shift: &ShiftRecord, start: f64, config: &ShiftLagConfig) -> f64 {
    let length_hours = if shift.label_contains(&config.long_shift_marker) {
        config.long_shift_hours
    } else {
        config.default_shift_hours
    };
    (start + length_hours * 60.0) % MINUTES_PER_DAY
}

/// Overlap of `[start, end)` (minutes of day) with the configured night window
pub fn overlap_minutes(start: f64, end: f64, config: &ShiftLagConfig) -> f64 {
    let shift_end = if end < start { end + MINUTES_PER_DAY } else { end };

    let night_start = config.night_start_hour * 60.0;
    let mut night_end = config.night_end_hour * 60.0;
    if night_end <= night_start {
        night_end += MINUTES_PER_DAY;
    }

    let tonight = interval_overlap(start, shift_end, night_start, night_end);

    match config.night_overlap_mode {
        NightOverlapMode::SingleWindow => tonight,
        NightOverlapMode::Wrapped => {
            let last_night = interval_overlap(
                start,
                shift_end,
                night_start - MINUTES_PER_DAY,
                night_end - MINUTES_PER_DAY,
            );
            tonight + last_night
        }
    }
}

fn interval_overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}
