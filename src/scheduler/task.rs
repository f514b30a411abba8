use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use tracing::info;
use uuid::Uuid;

use crate::config::ExtractConfig;
use crate::core::cancel::CancelToken;
use crate::core::client::retrying::{RetryPolicy, RetryingClient};
use crate::core::client::signer::RequestSigner;
use crate::core::client::transport::SoapTransport;
use crate::core::schema::caster::SchemaCaster;
use crate::core::schema::column::Column;
use crate::core::time::windower::{self, TimeRange, DEFAULT_CHUNK_SECONDS};
use crate::domain::entity::EntityKind;
use crate::errors::{ExtractError, Result};
use crate::scheduler::extractor::{Extractor, RecordSink, RunMode, TaskReport};

/// Fully resolved run description: everything a set of partition workers
/// needs, with no further I/O or defaulting left to do.
#[derive(Debug, Clone)]
pub struct ExtractTask {
    pub run_id: Uuid,
    pub entity: EntityKind,
    pub endpoint: String,
    pub wsdl: String,
    pub user_id: String,
    pub encryption_key: String,
    pub partitions: Vec<Vec<TimeRange>>,
    pub columns: Vec<Column>,
    pub append_processed_time: bool,
    pub batch_size: u32,
    pub retry_policy: RetryPolicy,
    /// Upper bound of the configured interval; the collapsed watermark equals
    /// this once the partition owning the final range completes.
    pub configured_to: DateTime<Utc>,
}

/// Resolves configuration into a runnable task: validation, interval slicing
/// and deterministic partition assignment.
pub fn configure(config: &ExtractConfig) -> Result<ExtractTask> {
    configure_at(config, Utc::now())
}

pub fn configure_at(config: &ExtractConfig, now: DateTime<Utc>) -> Result<ExtractTask> {
    config.validate_all()?;
    if config.columns.is_empty() {
        return Err(ExtractError::Config(
            "columns must be set; run a schema guess to generate a starting list".into(),
        ));
    }

    let range = config.time_range(now)?;
    let ranges = windower::slice(range.from, range.to, Duration::seconds(DEFAULT_CHUNK_SECONDS))?;
    let partitions = windower::partition(ranges, config.partition_count)?;

    let task = ExtractTask {
        run_id: Uuid::new_v4(),
        entity: config.target,
        endpoint: config.endpoint.clone(),
        wsdl: config.wsdl_url(),
        user_id: config.user_id.clone(),
        encryption_key: config.encryption_key.clone(),
        partitions,
        columns: config.columns.clone(),
        append_processed_time: config.append_processed_time_column,
        batch_size: config.effective_batch_size(),
        retry_policy: config.retry_policy(),
        configured_to: range.to,
    };
    info!(
        run_id = %task.run_id,
        entity = ?task.entity,
        partitions = task.partitions.len(),
        windows = task.partitions.iter().map(Vec::len).sum::<usize>(),
        "configured extraction run"
    );
    Ok(task)
}

/// Runs every partition of `task` concurrently and returns their reports in
/// partition order.
///
/// Each partition is an independent tokio task with its own client, retry
/// counters and signing material; nothing mutable is shared. Any partition
/// failure fails the whole run, since the output schema guarantees are
/// all-or-nothing.
pub async fn run_all<T, S, F>(
    task: &ExtractTask,
    transport: Arc<T>,
    mut make_sink: F,
    mode: RunMode,
    cancel: &CancelToken,
) -> Result<Vec<TaskReport>>
where
    T: SoapTransport + 'static,
    S: RecordSink + 'static,
    F: FnMut(usize) -> S,
{
    let caster = SchemaCaster::new(task.columns.clone(), task.append_processed_time);

    let mut handles = Vec::with_capacity(task.partitions.len());
    for (index, ranges) in task.partitions.iter().enumerate() {
        let ranges = ranges.clone();
        let transport = Arc::clone(&transport);
        let signer = RequestSigner::new(task.user_id.clone(), task.encryption_key.clone());
        let extractor = Extractor::new(task.entity, caster.clone(), task.batch_size, mode);
        let policy = task.retry_policy;
        let run_id = task.run_id;
        let cancel = cancel.clone();
        let mut sink = make_sink(index);

        handles.push(tokio::spawn(async move {
            info!(%run_id, partition = index, windows = ranges.len(), "partition started");
            let client = RetryingClient::new(transport, signer, policy);
            extractor
                .run_partition(&client, &ranges, &mut sink, &cancel)
                .await
        }));
    }

    let joined = try_join_all(handles)
        .await
        .map_err(|e| ExtractError::Internal(format!("partition task failed: {e}")))?;
    joined.into_iter().collect()
}

/// Host-side helper collapsing per-partition reports into the single
/// watermark to persist. Completion is monotonic within each partition, so
/// the maximum completed bound is the authoritative one; it equals the
/// configured `to` once the partition owning the final range has finished.
pub fn resume_watermark(reports: &[TaskReport]) -> Option<DateTime<Utc>> {
    reports.iter().filter_map(|r| r.watermark).max()
}

/* ---------------- Tests ---------------- */
