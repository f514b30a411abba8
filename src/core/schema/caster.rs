use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::core::schema::column::{CastValue, Column, ColumnType};
use crate::core::time::windower::TimeRange;
use crate::core::client::transport::RawRecord;
use crate::errors::{ExtractError, Result};

/// Formats tried in order when a timestamp column carries no explicit format.
pub(crate) const PERMISSIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d",
];

/// Converts loosely-typed wire records into the fixed column schema.
///
/// Missing fields and empty wire strings become `Null` without ever invoking
/// type conversion; any value that is present but does not convert is a
/// configuration error naming the column and the offending raw value, never a
/// silent fallback.
#[derive(Debug, Clone)]
pub struct SchemaCaster {
    columns: Vec<Column>,
    append_processed_time: bool,
}

impl SchemaCaster {
    pub fn new(columns: Vec<Column>, append_processed_time: bool) -> Self {
        Self {
            columns,
            append_processed_time,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of values per emitted row.
    pub fn width(&self) -> usize {
        self.columns.len() + usize::from(self.append_processed_time)
    }

    /// Produces one ordered row for `record`, processed within `window`.
    ///
    /// The synthetic processed-time column (when enabled) takes the window's
    /// start rather than wall clock, so every row of one window carries the
    /// same reproducible value across re-runs.
    pub fn cast(&self, record: &RawRecord, window: &TimeRange) -> Result<Vec<CastValue>> {
        let mut row = Vec::with_capacity(self.width());
        for column in &self.columns {
            row.push(cast_field(column, record.get(&column.name))?);
        }
        if self.append_processed_time {
            row.push(CastValue::Timestamp(window.from));
        }
        Ok(row)
    }
}

fn cast_field(column: &Column, value: Option<&Value>) -> Result<CastValue> {
    let value = match value {
        None | Some(Value::Null) => return Ok(CastValue::Null),
        Some(Value::String(s)) if s.is_empty() => return Ok(CastValue::Null),
        Some(v) => v,
    };

    let fail = |reason: String| ExtractError::Cast {
        column: column.name.clone(),
        value: render(value),
        reason,
    };

    match column.column_type {
        ColumnType::Long => match value {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| fail("not a whole number".into()))
                .map(CastValue::Long),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(CastValue::Long)
                .map_err(|e| fail(e.to_string())),
            _ => Err(fail("expected a long".into())),
        },
        ColumnType::Double => match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| fail("not representable as double".into()))
                .map(CastValue::Double),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(CastValue::Double)
                .map_err(|e| fail(e.to_string())),
            _ => Err(fail("expected a double".into())),
        },
        ColumnType::Boolean => match value {
            Value::Bool(b) => Ok(CastValue::Boolean(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(CastValue::Boolean(true)),
                "false" | "0" => Ok(CastValue::Boolean(false)),
                _ => Err(fail("expected a boolean".into())),
            },
            _ => Err(fail("expected a boolean".into())),
        },
        ColumnType::String => match value {
            Value::String(s) => Ok(CastValue::String(s.clone())),
            Value::Number(n) => Ok(CastValue::String(n.to_string())),
            Value::Bool(b) => Ok(CastValue::String(b.to_string())),
            _ => Err(fail("expected a scalar".into())),
        },
        ColumnType::Timestamp => {
            let raw = match value {
                Value::String(s) => s.trim(),
                _ => return Err(fail("expected a timestamp string".into())),
            };
            match &column.format {
                Some(format) => parse_timestamp(raw, format)
                    .ok_or_else(|| fail(format!("does not match format '{format}'")))
                    .map(CastValue::Timestamp),
                None => parse_timestamp_permissive(raw)
                    .ok_or_else(|| fail("unrecognized timestamp".into()))
                    .map(CastValue::Timestamp),
            }
        }
    }
}

/// Parses `raw` with one explicit strftime format, accepting zoned, naive
/// date-time and date-only shapes. Naive values are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(zoned) = DateTime::parse_from_str(raw, format) {
        return Some(zoned.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

pub(crate) fn parse_timestamp_permissive(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    PERMISSIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| parse_timestamp(raw, format))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/* ---------------- Tests ---------------- */
