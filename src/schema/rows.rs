//! Supabase row shapes
//!
//! Rows are read exactly as exported. Deployments disagree on column names
//! (`start_ts` vs `start_at`), so both are kept as separate optional fields and
//! resolved by the adapter; a serde alias would reject rows carrying both.

use crate::error::ComputeError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the `sleep_logs` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepLogRow {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_ts: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    /// Nap flag, stored as a boolean or a 0/1 number depending on the table version
    #[serde(default)]
    pub naps: Option<serde_json::Value>,
    /// Sleep type discriminator (`"main"`, `"nap"`)
    #[serde(default, rename = "type")]
    pub sleep_type: Option<String>,
}

impl SleepLogRow {
    pub fn start(&self) -> Option<&str> {
        first_present(&self.start_ts, &self.start_at)
    }

    pub fn end(&self) -> Option<&str> {
        first_present(&self.end_ts, &self.end_at)
    }

    /// True when either the nap flag or the type column marks a nap
    pub fn is_nap(&self) -> bool {
        let flagged = match &self.naps {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(serde_json::Value::String(s)) => {
                matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
            }
            _ => false,
        };
        let typed = self
            .sleep_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("nap"));

        flagged || typed
    }
}

/// One row of the `shifts` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShiftRow {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub start_ts: Option<String>,
    #[serde(default)]
    pub start_at: Option<String>,
    #[serde(default)]
    pub end_ts: Option<String>,
    #[serde(default)]
    pub end_at: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl ShiftRow {
    pub fn start(&self) -> Option<&str> {
        first_present(&self.start_ts, &self.start_at)
    }

    pub fn end(&self) -> Option<&str> {
        first_present(&self.end_ts, &self.end_at)
    }
}

fn first_present<'a>(primary: &'a Option<String>, fallback: &'a Option<String>) -> Option<&'a str> {
    primary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.as_deref().map(str::trim).filter(|s| !s.is_empty()))
}

/// Parse a timestamp column. Zoned values keep their offset; naive values are
/// taken as UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ComputeError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    // Postgres text output: "2024-03-09 22:00:00+00"
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(ComputeError::DateParseError(format!(
        "unrecognised timestamp '{value}'"
    )))
}

/// Parse a date column; a full timestamp contributes its date part
pub fn parse_date(value: &str) -> Result<NaiveDate, ComputeError> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("invalid date '{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 22, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-09T22:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09T23:00:00+01:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09T22:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09T22:00:00.000").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09 22:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-09 22:00:00+00").unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-03-09").is_err());
    }

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09").unwrap(), expected);
        assert_eq!(parse_date("2024-03-09T22:00:00Z").unwrap(), expected);
        assert!(parse_date("09/03/2024").is_err());
    }

    #[test]
    fn test_column_duality() {
        let row: SleepLogRow = serde_json::from_str(
            r#"{"start_at": "2024-03-09T23:00:00Z", "end_ts": "2024-03-10T07:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(row.start(), Some("2024-03-09T23:00:00Z"));
        assert_eq!(row.end(), Some("2024-03-10T07:00:00Z"));

        // Both columns present: the *_ts column wins, empty strings are ignored
        let row: ShiftRow = serde_json::from_str(
            r#"{"start_ts": "", "start_at": "2024-03-09T22:00:00Z", "end_ts": null}"#,
        )
        .unwrap();
        assert_eq!(row.start(), Some("2024-03-09T22:00:00Z"));
        assert_eq!(row.end(), None);
    }

    #[test]
    fn test_nap_detection() {
        let nap = |json: &str| serde_json::from_str::<SleepLogRow>(json).unwrap().is_nap();

        assert!(nap(r#"{"naps": true}"#));
        assert!(nap(r#"{"naps": 1}"#));
        assert!(nap(r#"{"type": "Nap"}"#));
        assert!(!nap(r#"{"naps": false}"#));
        assert!(!nap(r#"{"naps": 0, "type": "main"}"#));
        assert!(!nap(r#"{"naps": null}"#));
        assert!(!nap("{}"));
    }
}
