use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::core::client::signer::AuthHeader;
use crate::errors::Result;

/// One decoded wire record: field name to loosely-typed wire value. Created
/// per page, converted into a typed row immediately, then discarded.
pub type RawRecord = BTreeMap<String, Value>;

/// Pagination continuation token, scoped to a single time range.
///
/// Lead fetches return a continuously renewed stream position; activity-log
/// fetches return a numeric offset that restarts with every new time range.
/// Neither is ever carried across ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    StreamPosition(String),
    Offset(u64),
}

/// Body of one remote operation, independent of the SOAP envelope encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Schema-description call for the declared-field strategy.
    DescribeObject { object_name: String },
    /// Paginated fetch of records updated within `[from, to)`.
    FetchByTimeWindow {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cursor: Option<Cursor>,
        batch_size: u32,
    },
}

/// A request body paired with the freshly computed auth header. Built
/// immediately before transmission; never reused, since signatures expire.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub operation: &'static str,
    pub auth: AuthHeader,
    pub body: RequestBody,
}

/// One declared field from the schema-description operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: String,
    pub data_type: String,
}

/// One page of a paginated fetch.
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<RawRecord>,
    /// Records the server still holds for this time range beyond this page.
    pub remaining: u64,
    pub next_cursor: Option<Cursor>,
}

impl RecordPage {
    /// The fetch loop continues only while the server reports more records
    /// AND handed back a continuation token.
    pub fn continuation(&self) -> Option<Cursor> {
        if self.remaining > 0 {
            self.next_cursor.clone()
        } else {
            None
        }
    }
}

/// Decoded response of one remote operation.
#[derive(Debug, Clone)]
pub enum SoapResponse {
    Schema(Vec<FieldDescription>),
    Page(RecordPage),
}

/// The wire capability this crate drives but does not implement: encode the
/// request into the vendor's SOAP envelope, perform the HTTP round trip, and
/// decode the response document. Implementations map wire failures onto
/// [`crate::errors::ExtractError`] so classification stays in one place.
#[async_trait]
pub trait SoapTransport: Send + Sync {
    async fn call(&self, request: SignedRequest) -> Result<SoapResponse>;
}

#[async_trait]
impl<T: SoapTransport + ?Sized> SoapTransport for std::sync::Arc<T> {
    async fn call(&self, request: SignedRequest) -> Result<SoapResponse> {
        (**self).call(request).await
    }
}

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_requires_both_remaining_and_cursor() {
        let page = RecordPage {
            records: vec![],
            remaining: 12,
            next_cursor: Some(Cursor::Offset(100)),
        };
        assert_eq!(page.continuation(), Some(Cursor::Offset(100)));

        let exhausted = RecordPage {
            records: vec![],
            remaining: 0,
            next_cursor: Some(Cursor::Offset(100)),
        };
        assert_eq!(exhausted.continuation(), None);

        let no_cursor = RecordPage {
            records: vec![],
            remaining: 3,
            next_cursor: None,
        };
        assert_eq!(no_cursor.continuation(), None);
    }
}
