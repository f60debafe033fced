//! Composite ShiftLag scoring
//!
//! This module provides the public API of the engine. It fetches the records
//! each estimator needs from a [`SleepShiftSource`], runs the estimators in
//! order and folds their scores into a [`ShiftLagResult`].
//!
//! Stages:
//! 1. SleepNeedEstimator - typical sleep need from off-day sleep
//! 2. SleepDebtEstimator - rolling deficit against that need
//! 3. MisalignmentEstimator - shift overlap with the biological night
//! 4. InstabilityEstimator - spread of shift start times
//! 5. Explainer - category, explanation, drivers and recommendations

use crate::config::ShiftLagConfig;
use crate::error::ComputeError;
use crate::explain::{Explainer, ExplanationInput};
use crate::instability::InstabilityEstimator;
use crate::misalignment::MisalignmentEstimator;
use crate::schema::{RowAdapter, ShiftRow, SleepLogRow};
use crate::sleep_debt::SleepDebtEstimator;
use crate::sleep_need::SleepNeedEstimator;
use crate::source::{DateWindow, MemoryStore, SleepShiftSource};
use crate::stats::round1;
use crate::types::{
    InstabilityScore, MisalignmentScore, ShiftLagCategory, ShiftLagResult, SleepDebtScore, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Raw output of the four estimators before composition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftLagComponents {
    pub typical_sleep_hours: f64,
    pub sleep_debt: SleepDebtScore,
    pub misalignment: MisalignmentScore,
    pub instability: InstabilityScore,
}

/// Compute a ShiftLag result from Supabase row exports.
///
/// # Arguments
/// * `sleep_rows_json` - JSON array of `sleep_logs` rows (either column naming)
/// * `shift_rows_json` - JSON array of `shifts` rows
/// * `user_id` - User the rows belong to (rows without a user id are attributed to it)
/// * `now` - Reference time; "today" is its local calendar day
///
/// # Returns
/// The serialized [`ShiftLagResult`]
///
/// # Example
/// ```ignore
/// let json = shift_lag_from_json(&sleep_json, &shift_json, user_id, Utc::now())?;
/// ```
pub fn shift_lag_from_json(
    sleep_rows_json: &str,
    shift_rows_json: &str,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<String, ComputeError> {
    let config = ShiftLagConfig::default();
    let adapter = RowAdapter::new(user_id, config.offset());

    let sleep_rows: Vec<SleepLogRow> = RowAdapter::parse_array(sleep_rows_json)?;
    let shift_rows: Vec<ShiftRow> = RowAdapter::parse_array(shift_rows_json)?;

    let sleep = adapter.sleep_sessions(&sleep_rows);
    let shifts = adapter.shifts(&shift_rows);
    if !sleep.report.is_clean() || !shifts.report.is_clean() {
        warn!(
            skipped_sleep = sleep.report.skipped_count(),
            skipped_shifts = shifts.report.skipped_count(),
            "some rows could not be read"
        );
    }

    let store = MemoryStore::new(sleep.records, shifts.records);
    let engine = ShiftLagEngine::with_config(store, config)?;
    let result = engine.calculate_at(user_id, now);

    serde_json::to_string_pretty(&result).map_err(ComputeError::JsonError)
}

/// Stateless scorer over a data source.
///
/// Every call reads fresh records; nothing is cached between calls.
pub struct ShiftLagEngine<S> {
    source: S,
    config: ShiftLagConfig,
}

impl<S: SleepShiftSource> ShiftLagEngine<S> {
    /// Create an engine with the default configuration
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: ShiftLagConfig::default(),
        }
    }

    /// Create an engine with a validated custom configuration
    pub fn with_config(source: S, config: ShiftLagConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { source, config })
    }

    pub fn config(&self) -> &ShiftLagConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Score a user as of now
    pub fn calculate(&self, user_id: UserId) -> ShiftLagResult {
        self.calculate_at(user_id, Utc::now())
    }

    /// Score a user as of `now`. Never fails: errors are logged and a zeroed
    /// result in the low category is returned instead.
    pub fn calculate_at(&self, user_id: UserId, now: DateTime<Utc>) -> ShiftLagResult {
        match self.try_calculate_at(user_id, now) {
            Ok(result) => result,
            Err(e) => {
                error!(%user_id, error = %e, "ShiftLag calculation failed, returning fallback");
                fallback_result(now)
            }
        }
    }

    /// Score a user as of `now`, surfacing data source errors
    pub fn try_calculate_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<ShiftLagResult, ComputeError> {
        let components = self.components_at(user_id, now)?;
        let result = compose(&components, &self.config, now);

        info!(
            %user_id,
            score = result.score,
            category = result.category.as_str(),
            "ShiftLag computed"
        );

        Ok(result)
    }

    /// Run the four estimators without composing them
    pub fn components_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<ShiftLagComponents, ComputeError> {
        let config = &self.config;
        let today = self.local_today(now);

        // Stage 1: typical sleep need from off-day sleep
        let need_window = DateWindow::ending_on(today, config.sleep_need_lookback_days)?;
        let need_shifts = self.source.shifts(user_id, need_window)?;
        let need_sleep = self.source.sleep_sessions(user_id, need_window)?;
        let typical_sleep_hours =
            SleepNeedEstimator::estimate(&need_sleep, &need_shifts, need_window, config);
        debug!(%user_id, typical_sleep_hours, "typical sleep need");

        // Stage 2: rolling sleep debt
        let debt_window = DateWindow::ending_on(today, config.sleep_debt_lookback_days)?;
        let debt_sleep = self.source.sleep_sessions(user_id, debt_window)?;
        let sleep_debt =
            SleepDebtEstimator::estimate(&debt_sleep, typical_sleep_hours, debt_window, config);
        debug!(%user_id, score = sleep_debt.score, debt_hours = sleep_debt.debt_hours, "sleep debt");

        // Stage 3: biological night overlap
        let night_window = DateWindow::ending_on(today, config.misalignment_lookback_days)?;
        let night_shifts = self.source.shifts(user_id, night_window)?;
        let misalignment = MisalignmentEstimator::estimate(&night_shifts, night_window, config);
        debug!(
            %user_id,
            score = misalignment.score,
            avg_overlap_hours = misalignment.avg_overlap_hours,
            shifts = misalignment.shifts_considered,
            "circadian misalignment"
        );

        // Stage 4: start time spread
        let spread_window = DateWindow::ending_on(today, config.instability_lookback_days)?;
        let spread_shifts = self.source.shifts(user_id, spread_window)?;
        let instability = InstabilityEstimator::estimate(&spread_shifts, spread_window, config);
        debug!(
            %user_id,
            score = instability.score,
            variability_hours = instability.variability_hours,
            samples = instability.samples,
            "schedule instability"
        );

        Ok(ShiftLagComponents {
            typical_sleep_hours,
            sleep_debt,
            misalignment,
            instability,
        })
    }

    fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.config.offset()).date_naive()
    }
}

/// Fold component scores into the composite result
pub fn compose(
    components: &ShiftLagComponents,
    config: &ShiftLagConfig,
    now: DateTime<Utc>,
) -> ShiftLagResult {
    let total = u16::from(components.sleep_debt.score)
        + u16::from(components.misalignment.score)
        + u16::from(components.instability.score);
    let score = total.min(100) as u8;
    let category = ShiftLagCategory::from_score(score);

    let text = Explainer::render(&ExplanationInput {
        category,
        sleep_debt: &components.sleep_debt,
        misalignment: &components.misalignment,
        instability: &components.instability,
        typical_sleep_hours: components.typical_sleep_hours,
        config,
    });

    ShiftLagResult {
        score,
        category,
        sleep_debt_score: components.sleep_debt.score,
        misalignment_score: components.misalignment.score,
        instability_score: components.instability.score,
        sleep_debt_hours: round1(components.sleep_debt.debt_hours),
        avg_night_overlap_hours: round1(components.misalignment.avg_overlap_hours),
        shift_start_variability_hours: round1(components.instability.variability_hours),
        typical_sleep_hours: round1(components.typical_sleep_hours),
        explanation: text.explanation,
        drivers: text.drivers,
        recommendations: text.recommendations,
        computed_at: now,
    }
}

/// Zeroed, well-formed result returned when scoring fails
pub fn fallback_result(now: DateTime<Utc>) -> ShiftLagResult {
    let text = Explainer::fallback();

    ShiftLagResult {
        score: 0,
        category: ShiftLagCategory::Low,
        sleep_debt_score: 0,
        misalignment_score: 0,
        instability_score: 0,
        sleep_debt_hours: 0.0,
        avg_night_overlap_hours: 0.0,
        shift_start_variability_hours: 0.0,
        typical_sleep_hours: 0.0,
        explanation: text.explanation,
        drivers: text.drivers,
        recommendations: text.recommendations,
        computed_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::FALLBACK_EXPLANATION;
    use crate::types::{ShiftRecord, SleepSession};
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn user() -> UserId {
        Uuid::parse_str("7f1c7a52-2b0e-4d39-9a52-1f6f0c2f9b11").unwrap()
    }

    fn night_sleep(days_ago: i64, hours: f64) -> SleepSession {
        let date = now().date_naive() - Duration::days(days_ago);
        let start = Utc.from_utc_datetime(&date.and_hms_opt(0, 30, 0).unwrap());
        SleepSession {
            user_id: user(),
            date: Some(date),
            start_time: start,
            end_time: start + Duration::minutes((hours * 60.0) as i64),
            is_nap: false,
        }
    }

    fn night_shift(days_ago: i64) -> ShiftRecord {
        let date = now().date_naive() - Duration::days(days_ago);
        let start = Utc.from_utc_datetime(&date.and_hms_opt(22, 0, 0).unwrap());
        ShiftRecord {
            user_id: user(),
            date,
            start_time: Some(start),
            end_time: Some(start + Duration::hours(8)),
            label: Some("Night".to_string()),
        }
    }

    struct FailingSource;

    impl SleepShiftSource for FailingSource {
        fn sleep_sessions(
            &self,
            _user_id: UserId,
            _window: DateWindow,
        ) -> Result<Vec<SleepSession>, ComputeError> {
            Err(ComputeError::DataSource("connection reset".to_string()))
        }

        fn shifts(
            &self,
            _user_id: UserId,
            _window: DateWindow,
        ) -> Result<Vec<ShiftRecord>, ComputeError> {
            Err(ComputeError::DataSource("connection reset".to_string()))
        }
    }

    #[test]
    fn test_empty_user_scores_zero() {
        let engine = ShiftLagEngine::new(MemoryStore::default());
        let result = engine.calculate_at(user(), now());

        assert_eq!(result.score, 0);
        assert_eq!(result.category, ShiftLagCategory::Low);
        assert_eq!(result.sleep_debt_score, 0);
        assert_eq!(result.misalignment_score, 0);
        assert_eq!(result.instability_score, 0);
        assert_eq!(result.sleep_debt_hours, 0.0);
        assert_eq!(result.avg_night_overlap_hours, 0.0);
        assert_eq!(result.shift_start_variability_hours, 0.0);
        assert_eq!(result.typical_sleep_hours, 7.5);
        assert_ne!(result.explanation, FALLBACK_EXPLANATION);
    }

    #[test]
    fn test_short_sleep_week_saturates_debt() {
        // Off-day history fixes the typical need at 8h
        let mut sleep: Vec<SleepSession> = (10..20).map(|d| night_sleep(d, 8.0)).collect();
        sleep.extend((0..7).map(|d| night_sleep(d, 4.0)));
        // The recent short nights are work days, so they don't drag the need down
        let shifts: Vec<ShiftRecord> = (0..7)
            .map(|d| ShiftRecord {
                label: Some("Day".to_string()),
                start_time: None,
                end_time: None,
                ..night_shift(d)
            })
            .collect();

        let engine = ShiftLagEngine::new(MemoryStore::new(sleep, shifts));
        let components = engine.components_at(user(), now()).unwrap();

        assert_eq!(components.typical_sleep_hours, 8.0);
        assert!((components.sleep_debt.debt_hours - 28.0).abs() < 1e-9);
        assert_eq!(components.sleep_debt.score, 40);
    }

    #[test]
    fn test_night_worker_composite() {
        let sleep: Vec<SleepSession> = (0..7).map(|d| night_sleep(d, 7.5)).collect();
        let shifts: Vec<ShiftRecord> = (0..5).map(night_shift).collect();

        let engine = ShiftLagEngine::new(MemoryStore::new(sleep, shifts));
        let result = engine.calculate_at(user(), now());

        // 22:00-06:00 every night: 7h overlap, identical starts
        assert_eq!(result.misalignment_score, 38);
        assert_eq!(result.avg_night_overlap_hours, 7.0);
        assert_eq!(result.instability_score, 0);
        assert_eq!(
            result.score,
            result.sleep_debt_score + result.misalignment_score + result.instability_score
        );
        assert_eq!(result.category, ShiftLagCategory::from_score(result.score));
        assert!(result.explanation.contains("biological night"));
    }

    #[test]
    fn test_data_source_failure_returns_fallback() {
        let engine = ShiftLagEngine::new(FailingSource);

        assert!(engine.try_calculate_at(user(), now()).is_err());

        let result = engine.calculate_at(user(), now());
        assert_eq!(result, fallback_result(now()));
        assert_eq!(result.category, ShiftLagCategory::Low);
        assert_eq!(result.explanation, FALLBACK_EXPLANATION);
    }

    #[test]
    fn test_compose_clamps_and_classifies() {
        let config = ShiftLagConfig::default();
        let components = ShiftLagComponents {
            typical_sleep_hours: 8.0,
            sleep_debt: SleepDebtScore {
                score: 40,
                debt_hours: 20.04,
            },
            misalignment: MisalignmentScore {
                score: 40,
                avg_overlap_hours: 9.0,
                shifts_considered: 5,
            },
            instability: InstabilityScore {
                score: 20,
                variability_hours: 8.26,
                samples: 9,
            },
        };

        let result = compose(&components, &config, now());
        assert_eq!(result.score, 100);
        assert_eq!(result.category, ShiftLagCategory::High);
        assert_eq!(result.sleep_debt_hours, 20.0);
        assert_eq!(result.shift_start_variability_hours, 8.3);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = ShiftLagConfig {
            sleep_debt_lookback_days: 0,
            ..ShiftLagConfig::default()
        };
        assert!(ShiftLagEngine::with_config(MemoryStore::default(), config).is_err());

        let config = ShiftLagConfig {
            sleep_need_lookback_days: u32::MAX,
            ..ShiftLagConfig::default()
        };
        assert!(ShiftLagEngine::with_config(MemoryStore::default(), config).is_err());
    }

    #[test]
    fn test_custom_config_is_kept() {
        let config = ShiftLagConfig {
            utc_offset_minutes: 60,
            ..ShiftLagConfig::default()
        };
        let engine = ShiftLagEngine::with_config(MemoryStore::default(), config.clone()).unwrap();

        assert_eq!(engine.config(), &config);
        assert_eq!(engine.source().shift_count(), 0);
    }

    #[test]
    fn test_sliver_of_night_reports_zero_overlap_and_score() {
        let mut store = MemoryStore::default();
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 15, 2, 0).unwrap();
        store.add_shift(ShiftRecord {
            start_time: Some(start),
            end_time: Some(start + Duration::hours(8)),
            label: Some("Late".to_string()),
            ..night_shift(1)
        });
        store.add_sleep(night_sleep(1, 7.5));

        let engine = ShiftLagEngine::new(store);
        assert_eq!(engine.source().shift_count(), 1);
        assert_eq!(engine.source().sleep_count(), 1);

        let result = engine.calculate_at(user(), now());
        assert_eq!(result.avg_night_overlap_hours, 0.0);
        assert_eq!(result.misalignment_score, 0);
    }

    #[test]
    fn test_shift_lag_from_json() {
        let sleep_rows = r#"[
            {"user_id": "7f1c7a52-2b0e-4d39-9a52-1f6f0c2f9b11", "start_at": "2024-03-09T23:00:00Z", "end_at": "2024-03-10T07:00:00Z", "naps": 0},
            {"start_ts": "2024-03-09T14:00:00Z", "end_ts": "2024-03-09T15:00:00Z", "type": "nap"}
        ]"#;
        let shift_rows = r#"[
            {"date": "2024-03-09", "start_ts": "2024-03-09T22:00:00Z", "end_ts": "2024-03-10T06:00:00Z", "label": "Night"},
            {"date": "2024-03-10", "start_ts": null, "end_ts": null, "label": "OFF"}
        ]"#;

        let json = shift_lag_from_json(sleep_rows, shift_rows, user(), now()).unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(payload["avgNightOverlapHours"], 7.0);
        assert_eq!(payload["misalignmentScore"], 38);
        assert!(payload["recommendations"].as_array().unwrap().len() >= 1);
    }

    #[test]
    fn test_shift_lag_from_json_invalid() {
        assert!(shift_lag_from_json("not json", "[]", user(), now()).is_err());
    }
}
