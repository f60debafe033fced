//! Core types for the ShiftLag engine
//!
//! This module defines the normalized records the estimators consume (sleep
//! sessions and shift records), the per-component scores they produce, and the
//! composite [`ShiftLagResult`] handed back to callers.

use crate::config::{LOW_MAX_SCORE, MODERATE_MAX_SCORE};
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identifier (auth user id in the relational store)
pub type UserId = Uuid;

/// Label used on the rota to mark a non-working day
pub const OFF_LABEL: &str = "OFF";

/// A logged sleep period, normalized from either column-naming convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub user_id: UserId,
    /// Calendar day the log was filed under, when the store provides one
    pub date: Option<NaiveDate>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Naps are excluded from every main-sleep aggregation
    pub is_nap: bool,
}

impl SleepSession {
    /// Sleep duration in hours; inverted timestamps count as zero
    pub fn duration_hours(&self) -> f64 {
        let minutes = (self.end_time - self.start_time).num_seconds() as f64 / 60.0;
        (minutes / 60.0).max(0.0)
    }

    /// Day this session is attributed to: the stored date, else the local start date
    pub fn calendar_date(&self, offset: FixedOffset) -> NaiveDate {
        self.date
            .unwrap_or_else(|| self.start_time.with_timezone(&offset).date_naive())
    }
}

/// One rota entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub user_id: UserId,
    pub date: NaiveDate,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Free text; [`OFF_LABEL`] marks a day off
    pub label: Option<String>,
}

impl ShiftRecord {
    pub fn is_off(&self) -> bool {
        self.label
            .as_deref()
            .map(|l| l.trim().eq_ignore_ascii_case(OFF_LABEL))
            .unwrap_or(false)
    }

    /// A dated working day: labelled, and not the OFF sentinel
    pub fn is_work_day(&self) -> bool {
        match self.label.as_deref() {
            Some(label) => !label.trim().is_empty() && !self.is_off(),
            None => false,
        }
    }

    /// Shift that can be placed on the clock (not OFF, start time known)
    pub fn is_scorable_shift(&self) -> bool {
        !self.is_off() && self.start_time.is_some()
    }

    /// Local start time as minutes since midnight
    pub fn start_minutes(&self, offset: FixedOffset) -> Option<f64> {
        self.start_time.map(|t| minutes_of_day(t, offset))
    }

    /// Local end time as minutes since midnight
    pub fn end_minutes(&self, offset: FixedOffset) -> Option<f64> {
        self.end_time.map(|t| minutes_of_day(t, offset))
    }

    pub fn label_contains(&self, needle: &str) -> bool {
        self.label
            .as_deref()
            .map(|l| l.contains(needle))
            .unwrap_or(false)
    }
}

/// Fractional minutes since local midnight
pub fn minutes_of_day(instant: DateTime<Utc>, offset: FixedOffset) -> f64 {
    let local = instant.with_timezone(&offset);
    local.hour() as f64 * 60.0 + local.minute() as f64 + local.second() as f64 / 60.0
}

/// Sleep debt component (0-40)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SleepDebtScore {
    pub score: u8,
    /// Summed deficit over the debt window (hours)
    pub debt_hours: f64,
}

/// Circadian misalignment component (0-40)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MisalignmentScore {
    pub score: u8,
    /// Mean hours worked inside the biological night
    pub avg_overlap_hours: f64,
    /// Number of shifts that contributed to the mean
    pub shifts_considered: usize,
}

/// Schedule instability component (0-20)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InstabilityScore {
    pub score: u8,
    /// Spread of shift start times (hours)
    pub variability_hours: f64,
    /// Number of shift starts sampled
    pub samples: usize,
}

/// Composite classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftLagCategory {
    #[default]
    Low,
    Moderate,
    High,
}

impl ShiftLagCategory {
    /// Classify a composite score: <=20 low, <=50 moderate, otherwise high
    pub fn from_score(score: u8) -> Self {
        if score <= LOW_MAX_SCORE {
            ShiftLagCategory::Low
        } else if score <= MODERATE_MAX_SCORE {
            ShiftLagCategory::Moderate
        } else {
            ShiftLagCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftLagCategory::Low => "low",
            ShiftLagCategory::Moderate => "moderate",
            ShiftLagCategory::High => "high",
        }
    }
}

/// One human-readable line per component
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftLagDrivers {
    pub sleep_debt: String,
    pub misalignment: String,
    pub instability: String,
}

/// Composite ShiftLag output, serialized for the HTTP layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftLagResult {
    pub score: u8,
    pub category: ShiftLagCategory,
    pub sleep_debt_score: u8,
    pub misalignment_score: u8,
    pub instability_score: u8,
    pub sleep_debt_hours: f64,
    pub avg_night_overlap_hours: f64,
    pub shift_start_variability_hours: f64,
    pub typical_sleep_hours: f64,
    pub explanation: String,
    pub drivers: ShiftLagDrivers,
    pub recommendations: Vec<String>,
    pub computed_at: DateTime<Utc>,
}
