use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use validator::Validate;

use crate::core::client::retrying::RetryPolicy;
use crate::core::schema::caster::parse_timestamp_permissive;
use crate::core::schema::column::Column;
use crate::core::time::windower::TimeRange;
use crate::domain::entity::EntityKind;
use crate::errors::{ExtractError, Result};

/// Inbound configuration, as handed over by the host pipeline.
///
/// Credentials may be left empty in the file and overlaid from the
/// environment via [`ExtractConfig::apply_env_overlay`].
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ExtractConfig {
    #[validate(url(message = "endpoint must be a valid URL"))]
    pub endpoint: String,

    /// Defaults to `{endpoint}?WSDL`.
    #[serde(default)]
    pub wsdl: Option<String>,

    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub encryption_key: String,

    pub target: EntityKind,

    #[serde(default)]
    pub from_datetime: Option<String>,

    /// Defaults to "now" at configure time.
    #[serde(default)]
    pub to_datetime: Option<String>,

    /// Deprecated alias for `from_datetime`.
    #[serde(default)]
    pub last_updated_at: Option<String>,

    #[serde(default)]
    pub columns: Vec<Column>,

    /// Appends a synthetic column holding the start of the window each row
    /// was processed in.
    #[serde(default)]
    pub append_processed_time_column: bool,

    #[serde(default = "default_partition_count")]
    #[validate(range(min = 1, message = "partition_count must be at least 1"))]
    pub partition_count: usize,

    #[serde(default = "default_retry_initial_wait")]
    pub retry_initial_wait_seconds: u64,

    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Overrides the per-entity default page size.
    #[serde(default)]
    pub batch_size: Option<u32>,
}

fn default_partition_count() -> usize {
    1
}

fn default_retry_initial_wait() -> u64 {
    1
}

fn default_retry_limit() -> u32 {
    5
}

impl ExtractConfig {
    /// Validates shape constraints plus the cross-field rules validator
    /// cannot express.
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self).map_err(|e| ExtractError::Config(e.to_string()))?;
        if self.user_id.is_empty() {
            return Err(ExtractError::Config("user_id must be set".into()));
        }
        if self.encryption_key.is_empty() {
            return Err(ExtractError::Config("encryption_key must be set".into()));
        }
        self.time_range(Utc::now())?;
        Ok(())
    }

    /// Fills empty credentials from `LEADSTREAM_USER_ID` /
    /// `LEADSTREAM_ENCRYPTION_KEY`, reading a `.env` file when present.
    pub fn apply_env_overlay(&mut self) {
        let _ = dotenvy::dotenv();
        if self.user_id.is_empty() {
            if let Ok(user_id) = std::env::var("LEADSTREAM_USER_ID") {
                self.user_id = user_id;
            }
        }
        if self.encryption_key.is_empty() {
            if let Ok(key) = std::env::var("LEADSTREAM_ENCRYPTION_KEY") {
                self.encryption_key = key;
            }
        }
    }

    pub fn wsdl_url(&self) -> String {
        self.wsdl
            .clone()
            .unwrap_or_else(|| format!("{}?WSDL", self.endpoint))
    }

    /// Resolves the configured `[from, to)` interval. `to_datetime` defaults
    /// to `now`; an inverted interval is a configuration error.
    pub fn time_range(&self, now: DateTime<Utc>) -> Result<TimeRange> {
        let from_source = match (&self.from_datetime, &self.last_updated_at) {
            (Some(from), _) => from,
            (None, Some(alias)) => {
                warn!("config: last_updated_at is deprecated, use from_datetime/to_datetime");
                alias
            }
            (None, None) => {
                return Err(ExtractError::Config("from_datetime must be set".into()))
            }
        };

        let from = parse_config_timestamp("from_datetime", from_source)?;
        let to = match &self.to_datetime {
            Some(to) => parse_config_timestamp("to_datetime", to)?,
            None => now,
        };
        TimeRange::new(from, to)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_wait: Duration::from_secs(self.retry_initial_wait_seconds),
            retry_limit: self.retry_limit,
        }
    }

    pub fn effective_batch_size(&self) -> u32 {
        self.batch_size
            .unwrap_or_else(|| self.target.default_batch_size())
    }
}

fn parse_config_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp_permissive(raw)
        .ok_or_else(|| ExtractError::Config(format!("config: cannot parse {key} '{raw}'")))
}

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn base_config() -> ExtractConfig {
        serde_json::from_value(json!({
            "endpoint": "https://soap.example.com/soap/mktows/2_3",
            "user_id": "user",
            "encryption_key": "secret",
            "target": "lead",
            "from_datetime": "2015-07-01 00:00:00",
            "to_datetime": "2015-11-01 00:00:00",
            "columns": [{"name": "id", "type": "long"}],
        }))
        .unwrap()
    }

    #[test]
    fn defaults_are_applied() {
        let config = base_config();
        assert_eq!(config.partition_count, 1);
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.retry_initial_wait_seconds, 1);
        assert_eq!(config.effective_batch_size(), 250);
        assert_eq!(
            config.wsdl_url(),
            "https://soap.example.com/soap/mktows/2_3?WSDL"
        );
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let mut config = base_config();
        config.from_datetime = Some("2015-11-01 00:00:00".into());
        config.to_datetime = Some("2015-07-01 00:00:00".into());
        let err = config.time_range(Utc::now()).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Config);
    }

    #[test]
    fn unset_to_datetime_defaults_to_now() {
        let mut config = base_config();
        config.to_datetime = None;
        let now = Utc.with_ymd_and_hms(2015, 12, 1, 0, 0, 0).unwrap();
        assert_eq!(config.time_range(now).unwrap().to, now);
    }

    #[test]
    fn deprecated_last_updated_at_still_works() {
        let mut config = base_config();
        config.from_datetime = None;
        config.last_updated_at = Some("2015-07-01 00:00:00".into());
        let range = config.time_range(Utc::now()).unwrap();
        assert_eq!(
            range.from,
            Utc.with_ymd_and_hms(2015, 7, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn missing_credentials_fail_validation() {
        let mut config = base_config();
        config.encryption_key.clear();
        let err = config.validate_all().unwrap_err();
        assert!(err.to_string().contains("encryption_key"));
    }

    #[test]
    fn unparsable_from_datetime_is_a_config_error() {
        let mut config = base_config();
        config.from_datetime = Some("not a time".into());
        let err = config.time_range(Utc::now()).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Config);
    }

    #[test]
    fn activity_log_batch_size_default_differs() {
        let mut config = base_config();
        config.target = EntityKind::ActivityLog;
        assert_eq!(config.effective_batch_size(), 100);
    }
}
