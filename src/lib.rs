//! Incremental batch extraction of lead and lead-activity records from a
//! legacy SOAP CRM API.
//!
//! The configured `[from, to)` interval is sliced into one-hour windows,
//! windows are grouped into disjoint partitions, and each partition worker
//! pages through its windows sequentially while records are cast into a
//! fixed column schema and forwarded to the host's sink. Remote calls go
//! through a signing, classifying, backoff-retrying client; the wire-level
//! SOAP encoding itself stays behind the
//! [`crate::core::client::transport::SoapTransport`] seam.

pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod scheduler;
pub mod telemetry;

pub use crate::config::ExtractConfig;
pub use crate::core::cancel::{cancel_pair, CancelHandle, CancelToken};
pub use crate::core::client::retrying::{RetryPolicy, RetryingClient};
pub use crate::core::client::signer::RequestSigner;
pub use crate::core::client::transport::{
    Cursor, FieldDescription, RawRecord, RecordPage, RequestBody, SignedRequest, SoapResponse,
    SoapTransport,
};
pub use crate::core::schema::caster::SchemaCaster;
pub use crate::core::schema::column::{CastValue, Column, ColumnType};
pub use crate::core::time::windower::TimeRange;
pub use crate::domain::entity::EntityKind;
pub use crate::errors::{ErrorKind, ExtractError};
pub use crate::scheduler::extractor::{Extractor, RecordSink, RunMode, TaskReport};
pub use crate::scheduler::task::{configure, resume_watermark, run_all, ExtractTask};
