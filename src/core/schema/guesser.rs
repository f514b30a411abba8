use std::collections::BTreeMap;

use chrono::Duration;
use serde_json::Value;
use tracing::info;

use crate::core::cancel::CancelToken;
use crate::core::client::retrying::RetryingClient;
use crate::core::client::transport::{RequestBody, SoapResponse, SoapTransport};
use crate::core::schema::caster::{parse_timestamp, PERMISSIVE_TIMESTAMP_FORMATS};
use crate::core::schema::column::{Column, ColumnType};
use crate::core::time::windower::TimeRange;
use crate::errors::{ExtractError, Result};

/// Length of the live sample window used by the sampling strategy.
pub const SAMPLE_WINDOW_SECONDS: i64 = 1800;

/// Batch cap for the sampling fetch; a guess needs a handful of records, not
/// a full page.
pub const SAMPLE_BATCH_SIZE: u32 = 30;

/// Maps a declared primitive type from the schema-description call onto an
/// output column type. Unrecognized declarations fall back to string.
pub fn map_declared_type(data_type: &str) -> ColumnType {
    match data_type {
        "integer" => ColumnType::Long,
        "dateTime" | "date" => ColumnType::Timestamp,
        "string" | "text" | "phone" | "currency" => ColumnType::String,
        "boolean" => ColumnType::Boolean,
        "float" => ColumnType::Double,
        _ => ColumnType::String,
    }
}

/// Declared-schema strategy: probe the schema-description operation and map
/// every declared field. The two identity columns are not part of the
/// declared custom-field schema and are always prepended.
pub async fn declared_columns<T: SoapTransport>(
    client: &RetryingClient<T>,
    operation: &'static str,
    object_name: &str,
    cancel: &CancelToken,
) -> Result<Vec<Column>> {
    let response = client
        .call(
            operation,
            RequestBody::DescribeObject {
                object_name: object_name.to_string(),
            },
            cancel,
        )
        .await?;

    let fields = match response {
        SoapResponse::Schema(fields) => fields,
        SoapResponse::Page(_) => {
            return Err(ExtractError::Transport(
                "schema-description call returned a record page".into(),
            ))
        }
    };

    let mut columns = vec![
        Column::new("id", ColumnType::Long),
        Column::new("email", ColumnType::String),
    ];
    columns.extend(
        fields
            .into_iter()
            .map(|field| Column::new(field.name, map_declared_type(&field.data_type))),
    );
    info!(columns = columns.len(), "guessed columns from declared schema");
    Ok(columns)
}

/// Sampling strategy for entity kinds whose attributes are dynamic key-value
/// pairs: fetch a short window of live records and infer a type (and, for
/// timestamps, a format) from the observed values.
///
/// `seed` columns come first in the output with fixed types; only fields
/// outside the seed are inferred.
pub async fn sampled_columns<T: SoapTransport>(
    client: &RetryingClient<T>,
    operation: &'static str,
    sample_from: chrono::DateTime<chrono::Utc>,
    seed: &[Column],
    cancel: &CancelToken,
) -> Result<Vec<Column>> {
    let window = TimeRange::new(sample_from, sample_from + Duration::seconds(SAMPLE_WINDOW_SECONDS))?;
    let response = client
        .call(
            operation,
            RequestBody::FetchByTimeWindow {
                from: window.from,
                to: window.to,
                cursor: None,
                batch_size: SAMPLE_BATCH_SIZE,
            },
            cancel,
        )
        .await?;

    let page = match response {
        SoapResponse::Page(page) => page,
        SoapResponse::Schema(_) => {
            return Err(ExtractError::Transport(
                "sampling fetch returned a schema document".into(),
            ))
        }
    };
    info!(records = page.records.len(), "sampled records for schema guess");

    // Observed string values per field, excluding seeded names.
    let mut observed: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();
    for record in &page.records {
        for (name, value) in record {
            if seed.iter().any(|c| c.name == *name) {
                continue;
            }
            observed.entry(name.as_str()).or_default().push(value);
        }
    }

    let mut columns = seed.to_vec();
    for (name, values) in observed {
        columns.push(infer_column(name, &values));
    }
    Ok(columns)
}

fn infer_column(name: &str, values: &[&Value]) -> Column {
    // Native wire types decide immediately.
    if values.iter().all(|v| v.is_i64()) {
        return Column::new(name, ColumnType::Long);
    }
    if values.iter().all(|v| v.is_number()) {
        return Column::new(name, ColumnType::Double);
    }
    if values.iter().all(|v| v.is_boolean()) {
        return Column::new(name, ColumnType::Boolean);
    }

    let strings: Vec<&str> = values
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if strings.len() != values.len() || strings.is_empty() {
        return Column::new(name, ColumnType::String);
    }

    if strings.iter().all(|s| s.parse::<i64>().is_ok()) {
        return Column::new(name, ColumnType::Long);
    }
    if strings.iter().all(|s| s.parse::<f64>().is_ok()) {
        return Column::new(name, ColumnType::Double);
    }
    if strings
        .iter()
        .all(|s| matches!(s.to_ascii_lowercase().as_str(), "true" | "false"))
    {
        return Column::new(name, ColumnType::Boolean);
    }
    for format in PERMISSIVE_TIMESTAMP_FORMATS {
        if strings.iter().all(|s| parse_timestamp(s, format).is_some()) {
            return Column::with_format(name, ColumnType::Timestamp, *format);
        }
    }
    Column::new(name, ColumnType::String)
}

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::retrying::RetryPolicy;
    use crate::core::client::signer::RequestSigner;
    use crate::core::client::transport::{FieldDescription, RecordPage, SignedRequest};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct FixedTransport {
        response: SoapResponse,
    }

    #[async_trait]
    impl SoapTransport for FixedTransport {
        async fn call(&self, _request: SignedRequest) -> Result<SoapResponse> {
            Ok(self.response.clone())
        }
    }

    fn client(response: SoapResponse) -> RetryingClient<FixedTransport> {
        RetryingClient::new(
            FixedTransport { response },
            RequestSigner::new("user", "key"),
            RetryPolicy::default(),
        )
    }

    #[test]
    fn declared_type_mapping_table() {
        assert_eq!(map_declared_type("integer"), ColumnType::Long);
        assert_eq!(map_declared_type("dateTime"), ColumnType::Timestamp);
        assert_eq!(map_declared_type("date"), ColumnType::Timestamp);
        for t in ["string", "text", "phone", "currency"] {
            assert_eq!(map_declared_type(t), ColumnType::String);
        }
        assert_eq!(map_declared_type("boolean"), ColumnType::Boolean);
        assert_eq!(map_declared_type("float"), ColumnType::Double);
        assert_eq!(map_declared_type("somethingWeird"), ColumnType::String);
    }

    #[tokio::test]
    async fn declared_strategy_prepends_identity_columns() {
        let client = client(SoapResponse::Schema(vec![
            FieldDescription {
                name: "Company".into(),
                data_type: "string".into(),
            },
            FieldDescription {
                name: "LeadScore".into(),
                data_type: "integer".into(),
            },
        ]));

        let columns = declared_columns(&client, "describe_m_object", "LeadRecord", &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(
            columns,
            vec![
                Column::new("id", ColumnType::Long),
                Column::new("email", ColumnType::String),
                Column::new("Company", ColumnType::String),
                Column::new("LeadScore", ColumnType::Long),
            ]
        );
    }

    #[tokio::test]
    async fn sampling_strategy_infers_types_and_formats() {
        let records = vec![
            [
                ("id".to_string(), json!(101)),
                ("Campaign Score".to_string(), json!("12")),
                ("Visited At".to_string(), json!("2015-07-01 10:00:05")),
                ("Source".to_string(), json!("web")),
            ]
            .into_iter()
            .collect(),
            [
                ("id".to_string(), json!(102)),
                ("Campaign Score".to_string(), json!("7")),
                ("Visited At".to_string(), json!("2015-07-01 10:12:41")),
                ("Source".to_string(), json!("import")),
            ]
            .into_iter()
            .collect(),
        ];
        let client = client(SoapResponse::Page(RecordPage {
            records,
            remaining: 0,
            next_cursor: None,
        }));

        let seed = vec![Column::new("id", ColumnType::Long)];
        let from = Utc.with_ymd_and_hms(2015, 7, 1, 10, 0, 0).unwrap();
        let columns = sampled_columns(&client, "get_lead_changes", from, &seed, &CancelToken::never())
            .await
            .unwrap();

        assert_eq!(columns[0], Column::new("id", ColumnType::Long));
        assert!(columns.contains(&Column::new("Campaign Score", ColumnType::Long)));
        assert!(columns.contains(&Column::with_format(
            "Visited At",
            ColumnType::Timestamp,
            "%Y-%m-%d %H:%M:%S"
        )));
        assert!(columns.contains(&Column::new("Source", ColumnType::String)));
    }
}
