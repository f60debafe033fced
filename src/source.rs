//! Data-access boundary
//!
//! The estimators never talk to a database directly. They ask a
//! [`SleepShiftSource`] for the records of one user inside a [`DateWindow`]
//! and receive normalized [`SleepSession`]s and [`ShiftRecord`]s. Sources may
//! return a superset of the window; every estimator filters by calendar day
//! itself.

use crate::error::ComputeError;
use crate::types::{ShiftRecord, SleepSession, UserId};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// The `days` calendar days ending on (and including) `today`
    pub fn ending_on(today: NaiveDate, days: u32) -> Result<Self, ComputeError> {
        let span = i64::from(days.max(1)) - 1;
        let from = today.checked_sub_signed(Duration::days(span)).ok_or_else(|| {
            ComputeError::InvalidConfig(format!(
                "a {days}-day window ending on {today} is out of the date range"
            ))
        })?;

        Ok(Self { from, to: today })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    /// Number of calendar days covered
    pub fn len_days(&self) -> i64 {
        (self.to - self.from).num_days() + 1
    }

    /// Days from `to` backwards to `from`
    pub fn days_backward(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.len_days()).map(move |offset| self.to - Duration::days(offset))
    }
}

/// Read-only access to a user's sleep logs and rota
pub trait SleepShiftSource {
    /// Sleep sessions (main sleep and naps) attributed to days in `window`
    fn sleep_sessions(
        &self,
        user_id: UserId,
        window: DateWindow,
    ) -> Result<Vec<SleepSession>, ComputeError>;

    /// Shift records dated inside `window`
    fn shifts(&self, user_id: UserId, window: DateWindow) -> Result<Vec<ShiftRecord>, ComputeError>;
}

impl<T: SleepShiftSource + ?Sized> SleepShiftSource for &T {
    fn sleep_sessions(
        &self,
        user_id: UserId,
        window: DateWindow,
    ) -> Result<Vec<SleepSession>, ComputeError> {
        (**self).sleep_sessions(user_id, window)
    }

    fn shifts(&self, user_id: UserId, window: DateWindow) -> Result<Vec<ShiftRecord>, ComputeError> {
        (**self).shifts(user_id, window)
    }
}

/// In-memory source, used by the CLI and tests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    sleep: Vec<SleepSession>,
    shifts: Vec<ShiftRecord>,
}

impl MemoryStore {
    pub fn new(sleep: Vec<SleepSession>, shifts: Vec<ShiftRecord>) -> Self {
        Self { sleep, shifts }
    }

    pub fn add_sleep(&mut self, session: SleepSession) {
        self.sleep.push(session);
    }

    pub fn add_shift(&mut self, shift: ShiftRecord) {
        self.shifts.push(shift);
    }

    pub fn sleep_count(&self) -> usize {
        self.sleep.len()
    }

    pub fn shift_count(&self) -> usize {
        self.shifts.len()
    }
}

impl SleepShiftSource for MemoryStore {
    fn sleep_sessions(
        &self,
        user_id: UserId,
        window: DateWindow,
    ) -> Result<Vec<SleepSession>, ComputeError> {
        // Widen by a day on each side so local-date attribution can be done by the caller
        let padded = DateWindow {
            from: window.from.pred_opt().unwrap_or(window.from),
            to: window.to.succ_opt().unwrap_or(window.to),
        };

        Ok(self
            .sleep
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| match s.date {
                Some(date) => window.contains(date),
                None => padded.contains(s.start_time.date_naive()),
            })
            .cloned()
            .collect())
    }

    fn shifts(&self, user_id: UserId, window: DateWindow) -> Result<Vec<ShiftRecord>, ComputeError> {
        Ok(self
            .shifts
            .iter()
            .filter(|s| s.user_id == user_id && window.contains(s.date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_window_ending_on() {
        let window = DateWindow::ending_on(day(10), 7).unwrap();
        assert_eq!(window.from, day(4));
        assert_eq!(window.to, day(10));
        assert_eq!(window.len_days(), 7);
        assert!(window.contains(day(4)));
        assert!(!window.contains(day(3)));

        let days: Vec<NaiveDate> = window.days_backward().collect();
        assert_eq!(days.first(), Some(&day(10)));
        assert_eq!(days.last(), Some(&day(4)));
    }

    #[test]
    fn test_window_out_of_date_range() {
        assert!(DateWindow::ending_on(day(10), u32::MAX).is_err());
        assert!(DateWindow::ending_on(NaiveDate::MIN, 2).is_err());

        let single = DateWindow::ending_on(NaiveDate::MIN, 1).unwrap();
        assert_eq!(single.len_days(), 1);
    }

    #[test]
    fn test_memory_store_filters_user_and_window() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let shift = |user, d| ShiftRecord {
            user_id: user,
            date: day(d),
            start_time: None,
            end_time: None,
            label: Some("Day".to_string()),
        };

        let store = MemoryStore::new(
            vec![SleepSession {
                user_id: me,
                date: None,
                start_time: Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap(),
                is_nap: false,
            }],
            vec![shift(me, 1), shift(me, 8), shift(other, 8)],
        );

        let window = DateWindow::ending_on(day(10), 5).unwrap();
        let shifts = store.shifts(me, window).unwrap();
        assert_eq!(shifts.len(), 1);
        assert_eq!(shifts[0].date, day(8));

        assert_eq!(store.sleep_sessions(me, window).unwrap().len(), 1);
        assert!(store.sleep_sessions(other, window).unwrap().is_empty());
    }
}
