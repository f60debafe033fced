//! Adapter for converting Supabase rows into engine records
//!
//! Bad rows never abort a batch: each one is skipped, logged at debug level
//! and recorded in an [`AdapterReport`] so the caller can surface it. A shift
//! row only loses the field that could not be read: its date and label still
//! mark a work day.

use crate::error::ComputeError;
use crate::schema::rows::{parse_date, parse_timestamp, ShiftRow, SleepLogRow};
use crate::types::{ShiftRecord, SleepSession, UserId};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Why a row, or one field of it, was dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub index: usize,
    pub reason: String,
}

/// Outcome of adapting one batch of rows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdapterReport {
    pub total_rows: usize,
    pub accepted: usize,
    pub skipped: Vec<SkippedRow>,
    /// Accepted rows with a field that was unreadable and left empty
    pub ignored_fields: Vec<SkippedRow>,
}

impl AdapterReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.ignored_fields.is_empty()
    }
}

/// Converted records alongside the report for their batch
#[derive(Debug, Clone)]
pub struct Adapted<T> {
    pub records: Vec<T>,
    pub report: AdapterReport,
}

/// Converts raw rows for one user
pub struct RowAdapter {
    default_user: UserId,
    offset: FixedOffset,
}

impl RowAdapter {
    /// `default_user` is assigned to rows without a `user_id` column;
    /// `offset` derives shift dates from start times when `date` is missing.
    pub fn new(default_user: UserId, offset: FixedOffset) -> Self {
        Self {
            default_user,
            offset,
        }
    }

    /// Parse a JSON string containing an array of rows
    pub fn parse_array<T: DeserializeOwned>(json: &str) -> Result<Vec<T>, ComputeError> {
        let rows: Vec<T> = serde_json::from_str(json)?;
        Ok(rows)
    }

    /// Parse NDJSON (newline-delimited JSON), one row per line
    pub fn parse_ndjson<T: DeserializeOwned>(ndjson: &str) -> Result<Vec<T>, ComputeError> {
        let mut rows = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(trimmed) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(rows)
    }

    pub fn sleep_sessions(&self, rows: &[SleepLogRow]) -> Adapted<SleepSession> {
        self.adapt(rows, "sleep_logs", |row, _| self.sleep_session(row))
    }

    pub fn shifts(&self, rows: &[ShiftRow]) -> Adapted<ShiftRecord> {
        self.adapt(rows, "shifts", |row, ignored| self.shift(row, ignored))
    }

    fn adapt<R, T>(
        &self,
        rows: &[R],
        table: &str,
        convert: impl Fn(&R, &mut Vec<String>) -> Result<T, String>,
    ) -> Adapted<T> {
        let mut records = Vec::with_capacity(rows.len());
        let mut report = AdapterReport {
            total_rows: rows.len(),
            ..AdapterReport::default()
        };

        for (index, row) in rows.iter().enumerate() {
            let mut ignored = Vec::new();
            match convert(row, &mut ignored) {
                Ok(record) => {
                    for reason in ignored {
                        debug!(table, index, %reason, "ignoring field");
                        report.ignored_fields.push(SkippedRow { index, reason });
                    }
                    records.push(record);
                }
                Err(reason) => {
                    debug!(table, index, %reason, "skipping row");
                    report.skipped.push(SkippedRow { index, reason });
                }
            }
        }
        report.accepted = records.len();

        Adapted { records, report }
    }

    fn sleep_session(&self, row: &SleepLogRow) -> Result<SleepSession, String> {
        let user_id = self.user(row.user_id.as_deref())?;
        let start_time = required_timestamp(row.start(), "start")?;
        let end_time = required_timestamp(row.end(), "end")?;
        if end_time < start_time {
            return Err(format!("end {end_time} is before start {start_time}"));
        }
        let date = optional_date(row.date.as_deref())?;

        Ok(SleepSession {
            user_id,
            date,
            start_time,
            end_time,
            is_nap: row.is_nap(),
        })
    }

    fn shift(&self, row: &ShiftRow, ignored: &mut Vec<String>) -> Result<ShiftRecord, String> {
        let user_id = self.user(row.user_id.as_deref())?;
        let mut lenient = |raw: Option<&str>, column: &str| {
            optional_timestamp(raw, column).unwrap_or_else(|reason| {
                ignored.push(reason);
                None
            })
        };
        let start_time = lenient(row.start(), "start");
        let end_time = lenient(row.end(), "end");

        let date = match optional_date(row.date.as_deref())? {
            Some(date) => date,
            None => start_time
                .map(|s| s.with_timezone(&self.offset).date_naive())
                .ok_or_else(|| "missing date and start".to_string())?,
        };

        Ok(ShiftRecord {
            user_id,
            date,
            start_time,
            end_time,
            label: row.label.clone(),
        })
    }

    fn user(&self, raw: Option<&str>) -> Result<UserId, String> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => UserId::parse_str(id).map_err(|e| format!("invalid user_id '{id}': {e}")),
            None => Ok(self.default_user),
        }
    }
}

fn required_timestamp(raw: Option<&str>, column: &str) -> Result<DateTime<Utc>, String> {
    optional_timestamp(raw, column)?.ok_or_else(|| format!("missing {column} time"))
}

fn optional_timestamp(raw: Option<&str>, column: &str) -> Result<Option<DateTime<Utc>>, String> {
    raw.map(|value| parse_timestamp(value).map_err(|e| format!("{column}: {e}")))
        .transpose()
}

fn optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|value| parse_date(value).map_err(|e| e.to_string()))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn adapter() -> RowAdapter {
        RowAdapter::new(Uuid::nil(), Utc.fix())
    }

    #[test]
    fn test_sleep_rows_with_either_column_naming() {
        let rows: Vec<SleepLogRow> = RowAdapter::parse_array(
            r#"[
                {"start_ts": "2024-03-09T23:00:00Z", "end_ts": "2024-03-10T07:00:00Z", "naps": false},
                {"start_at": "2024-03-10 14:00:00", "end_at": "2024-03-10 14:30:00", "type": "nap"}
            ]"#,
        )
        .unwrap();

        let adapted = adapter().sleep_sessions(&rows);
        assert!(adapted.report.is_clean());
        assert_eq!(adapted.report.accepted, 2);

        let main = &adapted.records[0];
        assert!(!main.is_nap);
        assert_eq!(main.user_id, Uuid::nil());
        assert!((main.duration_hours() - 8.0).abs() < 1e-9);

        assert!(adapted.records[1].is_nap);
    }

    #[test]
    fn test_malformed_sleep_rows_are_skipped() {
        let rows: Vec<SleepLogRow> = RowAdapter::parse_array(
            r#"[
                {"start_ts": "2024-03-09T23:00:00Z"},
                {"start_ts": "last night", "end_ts": "2024-03-10T07:00:00Z"},
                {"start_ts": "2024-03-10T07:00:00Z", "end_ts": "2024-03-09T23:00:00Z"},
                {"user_id": "not-a-uuid", "start_ts": "2024-03-09T23:00:00Z", "end_ts": "2024-03-10T07:00:00Z"},
                {"start_ts": "2024-03-09T23:00:00Z", "end_ts": "2024-03-10T07:00:00Z", "date": "2024-03-10"}
            ]"#,
        )
        .unwrap();

        let adapted = adapter().sleep_sessions(&rows);
        assert_eq!(adapted.report.total_rows, 5);
        assert_eq!(adapted.report.accepted, 1);
        assert_eq!(adapted.report.skipped_count(), 4);

        let indices: Vec<usize> = adapted.report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(adapted.report.skipped[0].reason, "missing end time");

        assert_eq!(
            adapted.records[0].date,
            Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
        );
    }

    #[test]
    fn test_shift_rows() {
        let user = Uuid::parse_str("7f1c7a52-2b0e-4d39-9a52-1f6f0c2f9b11").unwrap();
        let rows: Vec<ShiftRow> = RowAdapter::parse_array(
            r#"[
                {"user_id": "7f1c7a52-2b0e-4d39-9a52-1f6f0c2f9b11", "date": "2024-03-09", "start_at": "2024-03-09T22:00:00Z", "end_at": "2024-03-10T06:00:00Z", "label": "Night"},
                {"date": "2024-03-10", "start_ts": null, "label": "OFF"},
                {"start_ts": "2024-03-11T07:00:00Z", "label": "Day"},
                {"label": "Day"},
                {"date": "2024-03-12", "start_ts": "7am"},
                {"start_ts": "7am", "label": "Day"}
            ]"#,
        )
        .unwrap();

        let adapted = adapter().shifts(&rows);
        assert_eq!(adapted.report.accepted, 4);
        assert_eq!(adapted.report.skipped_count(), 2);
        let skipped: Vec<usize> = adapted.report.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![3, 5]);

        assert_eq!(adapted.records[0].user_id, user);
        assert!(adapted.records[1].is_off());
        assert_eq!(adapted.records[1].start_time, None);
        // Date derived from the start time
        assert_eq!(
            adapted.records[2].date,
            NaiveDate::from_ymd_opt(2024, 3, 11).unwrap()
        );
    }

    #[test]
    fn test_unreadable_shift_end_keeps_the_shift() {
        let rows: Vec<ShiftRow> = RowAdapter::parse_array(
            r#"[{"date": "2024-03-09", "start_ts": "2024-03-09T19:00:00Z", "end_ts": "late", "label": "Night 12h"}]"#,
        )
        .unwrap();

        let adapted = adapter().shifts(&rows);
        assert_eq!(adapted.report.accepted, 1);
        assert_eq!(adapted.report.skipped_count(), 0);
        assert!(!adapted.report.is_clean());
        assert_eq!(adapted.report.ignored_fields[0].index, 0);
        assert!(adapted.report.ignored_fields[0].reason.starts_with("end:"));

        let shift = &adapted.records[0];
        assert!(shift.is_work_day());
        assert!(shift.is_scorable_shift());
        assert_eq!(shift.end_time, None);
    }

    #[test]
    fn test_shift_date_derived_in_local_offset() {
        let adapter = RowAdapter::new(Uuid::nil(), FixedOffset::east_opt(3600).unwrap());
        let rows = vec![ShiftRow {
            start_ts: Some("2024-03-09T23:30:00Z".to_string()),
            ..ShiftRow::default()
        }];

        let adapted = adapter.shifts(&rows);
        assert_eq!(
            adapted.records[0].date,
            NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
        );
    }

    #[test]
    fn test_parse_ndjson() {
        let ndjson = r#"{"date": "2024-03-09", "label": "OFF"}

{"date": "2024-03-10", "label": "Day", "start_ts": "2024-03-10T07:00:00Z"}
"#;
        let rows: Vec<ShiftRow> = RowAdapter::parse_ndjson(ndjson).unwrap();
        assert_eq!(rows.len(), 2);

        let err = RowAdapter::parse_ndjson::<ShiftRow>("{\"label\": \"OFF\"}\nnot json").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
