//! Engine configuration
//!
//! All windows, thresholds and curves the estimators use are named here so
//! they can be tuned (or pinned in tests) without touching scoring logic. The
//! defaults reproduce the production calibration.

use crate::curve::ScoreCurve;
use crate::error::ComputeError;
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Biological night start (hour of day)
pub const DEFAULT_NIGHT_START_HOUR: f64 = 23.0;
/// Biological night end (hour of day, next morning)
pub const DEFAULT_NIGHT_END_HOUR: f64 = 7.0;

/// Days of off-day sleep used to estimate typical sleep need
pub const DEFAULT_SLEEP_NEED_LOOKBACK_DAYS: u32 = 30;
/// Days summed into the weekly sleep debt
pub const DEFAULT_SLEEP_DEBT_LOOKBACK_DAYS: u32 = 7;
/// Days of shifts checked against the biological night
pub const DEFAULT_MISALIGNMENT_LOOKBACK_DAYS: u32 = 5;
/// Days of shift starts used for schedule instability
pub const DEFAULT_INSTABILITY_LOOKBACK_DAYS: u32 = 14;

/// Longest lookback any estimator may use (about ten years)
pub const MAX_LOOKBACK_DAYS: u32 = 3660;

/// Largest UTC offset a fixed offset can express, either side of UTC
pub const MAX_UTC_OFFSET_MINUTES: i32 = 1439;

/// Typical sleep need bounds and fallback (hours)
pub const MIN_SLEEP_NEED_HOURS: f64 = 7.0;
pub const MAX_SLEEP_NEED_HOURS: f64 = 9.0;
pub const DEFAULT_SLEEP_NEED_HOURS: f64 = 7.5;

/// Assumed length of a shift logged without an end time
pub const DEFAULT_SHIFT_HOURS: f64 = 8.0;
/// Assumed length when the label marks a long shift
pub const LONG_SHIFT_HOURS: f64 = 12.0;
/// Label fragment that marks a long shift ("12h", "Night 12", ...)
pub const LONG_SHIFT_MARKER: &str = "12";

/// Composite category thresholds (inclusive upper bounds)
pub const LOW_MAX_SCORE: u8 = 20;
pub const MODERATE_MAX_SCORE: u8 = 50;

/// How night overlap is measured on the minute timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NightOverlapMode {
    /// Only the night starting on the shift's own evening. Shifts that begin
    /// after midnight do not see the night they fall in.
    #[default]
    SingleWindow,
    /// Also count the previous evening's night window
    Wrapped,
}

/// How the spread of shift start times is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartTimeSpread {
    /// Population std-dev of raw minutes since midnight. 23:30 and 00:30
    /// read as ~23h apart; kept because the instability curve is calibrated on it.
    #[default]
    Linear,
    /// Circular std-dev on the 24h clock
    Circular,
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftLagConfig {
    pub night_start_hour: f64,
    pub night_end_hour: f64,
    pub sleep_need_lookback_days: u32,
    pub sleep_debt_lookback_days: u32,
    pub misalignment_lookback_days: u32,
    pub instability_lookback_days: u32,
    pub min_sleep_need_hours: f64,
    pub max_sleep_need_hours: f64,
    pub default_sleep_need_hours: f64,
    pub default_shift_hours: f64,
    pub long_shift_hours: f64,
    pub long_shift_marker: String,
    pub night_overlap_mode: NightOverlapMode,
    pub start_time_spread: StartTimeSpread,
    /// Offset used for hour-of-day and calendar-day derivation
    pub utc_offset_minutes: i32,
    pub sleep_debt_curve: ScoreCurve,
    pub misalignment_curve: ScoreCurve,
    pub instability_curve: ScoreCurve,
}

impl Default for ShiftLagConfig {
    fn default() -> Self {
        Self {
            night_start_hour: DEFAULT_NIGHT_START_HOUR,
            night_end_hour: DEFAULT_NIGHT_END_HOUR,
            sleep_need_lookback_days: DEFAULT_SLEEP_NEED_LOOKBACK_DAYS,
            sleep_debt_lookback_days: DEFAULT_SLEEP_DEBT_LOOKBACK_DAYS,
            misalignment_lookback_days: DEFAULT_MISALIGNMENT_LOOKBACK_DAYS,
            instability_lookback_days: DEFAULT_INSTABILITY_LOOKBACK_DAYS,
            min_sleep_need_hours: MIN_SLEEP_NEED_HOURS,
            max_sleep_need_hours: MAX_SLEEP_NEED_HOURS,
            default_sleep_need_hours: DEFAULT_SLEEP_NEED_HOURS,
            default_shift_hours: DEFAULT_SHIFT_HOURS,
            long_shift_hours: LONG_SHIFT_HOURS,
            long_shift_marker: LONG_SHIFT_MARKER.to_string(),
            night_overlap_mode: NightOverlapMode::default(),
            start_time_spread: StartTimeSpread::default(),
            utc_offset_minutes: 0,
            sleep_debt_curve: ScoreCurve::sleep_debt(),
            misalignment_curve: ScoreCurve::misalignment(),
            instability_curve: ScoreCurve::instability(),
        }
    }
}

impl ShiftLagConfig {
    /// Fixed offset for local clock derivation
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Reject configurations the estimators cannot run with
    pub fn validate(&self) -> Result<(), ComputeError> {
        let hour_ok = |h: f64| (0.0..24.0).contains(&h);
        if !hour_ok(self.night_start_hour) || !hour_ok(self.night_end_hour) {
            return Err(ComputeError::InvalidConfig(
                "night window hours must lie in [0, 24)".to_string(),
            ));
        }

        for (name, days) in [
            ("sleep_need_lookback_days", self.sleep_need_lookback_days),
            ("sleep_debt_lookback_days", self.sleep_debt_lookback_days),
            ("misalignment_lookback_days", self.misalignment_lookback_days),
            ("instability_lookback_days", self.instability_lookback_days),
        ] {
            if days == 0 || days > MAX_LOOKBACK_DAYS {
                return Err(ComputeError::InvalidConfig(format!(
                    "{name} must lie in 1..={MAX_LOOKBACK_DAYS}, got {days}"
                )));
            }
        }

        if !(self.min_sleep_need_hours > 0.0
            && self.min_sleep_need_hours <= self.max_sleep_need_hours)
        {
            return Err(ComputeError::InvalidConfig(
                "sleep need bounds must satisfy 0 < min <= max".to_string(),
            ));
        }
        if !(self.min_sleep_need_hours..=self.max_sleep_need_hours)
            .contains(&self.default_sleep_need_hours)
        {
            return Err(ComputeError::InvalidConfig(
                "default sleep need must lie within the sleep need bounds".to_string(),
            ));
        }

        if !(self.default_shift_hours > 0.0 && self.long_shift_hours > 0.0) {
            return Err(ComputeError::InvalidConfig(
                "estimated shift lengths must be positive".to_string(),
            ));
        }

        if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&self.utc_offset_minutes) {
            return Err(ComputeError::InvalidConfig(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            )));
        }

        self.sleep_debt_curve.validate("sleep_debt_curve")?;
        self.misalignment_curve.validate("misalignment_curve")?;
        self.instability_curve.validate("instability_curve")?;

        Ok(())
    }

    /// Load and validate a configuration from JSON; missing keys take defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
