use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five output types every extracted value is coerced into. Fixed for the
/// lifetime of one run; column order defines row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Long,
    Double,
    Boolean,
    String,
    Timestamp,
}

/// One configured (or guessed) output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// strftime format for timestamp columns; a permissive parser is used
    /// when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            format: None,
        }
    }

    pub fn with_format(name: impl Into<String>, column_type: ColumnType, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type,
            format: Some(format.into()),
        }
    }
}

/// One typed output value. `Null` stands in for absent fields and empty wire
/// strings; every emitted row holds exactly one value per configured column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CastValue {
    Null,
    Long(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Timestamp(DateTime<Utc>),
}

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_deserializes_from_config_shape() {
        let column: Column = serde_json::from_value(serde_json::json!({
            "name": "updated_at",
            "type": "timestamp",
            "format": "%Y-%m-%d %H:%M:%S",
        }))
        .unwrap();
        assert_eq!(column.column_type, ColumnType::Timestamp);
        assert_eq!(column.format.as_deref(), Some("%Y-%m-%d %H:%M:%S"));
    }

    #[test]
    fn column_format_is_optional() {
        let column: Column =
            serde_json::from_value(serde_json::json!({"name": "id", "type": "long"})).unwrap();
        assert_eq!(column.column_type, ColumnType::Long);
        assert!(column.format.is_none());
    }
}
