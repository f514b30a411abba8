use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::cancel::CancelToken;
use crate::core::client::retrying::RetryingClient;
use crate::core::client::transport::{Cursor, SoapResponse, SoapTransport};
use crate::core::schema::caster::SchemaCaster;
use crate::core::schema::column::CastValue;
use crate::core::time::windower::TimeRange;
use crate::domain::entity::EntityKind;
use crate::errors::{ExtractError, Result};

/// Record cap for preview runs, enough for interactive schema inspection.
pub const PREVIEW_COUNT: usize = 15;

/// Receives typed rows in emission order. Implemented by the host's sink
/// collaborator; batching and flushing happen on its side of the seam.
#[async_trait]
pub trait RecordSink: Send {
    async fn add(&mut self, row: Vec<CastValue>) -> anyhow::Result<()>;
    /// Called once per partition after its last assigned range.
    async fn finish(&mut self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Full,
    /// Truncated interactive run: most recent window first, stops after the
    /// first non-empty page or [`PREVIEW_COUNT`] records.
    Preview,
}

/// Resumable state for one partition, reported at the end of its run.
///
/// The host collapses the per-partition reports into the single persisted
/// watermark; the authoritative report is the one owning the final configured
/// range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// `to` bound of the last range this partition completed. Seeds the next
    /// incremental run's `from`; re-applying it may re-deliver records but
    /// never loses any.
    pub watermark: Option<DateTime<Utc>>,
    pub rows: u64,
}

/// Drives one partition of time ranges to completion: sequential pagination
/// inside each range, ranges strictly in order, every record cast and
/// forwarded in response order.
pub struct Extractor {
    entity: EntityKind,
    caster: SchemaCaster,
    batch_size: u32,
    mode: RunMode,
}

impl Extractor {
    pub fn new(entity: EntityKind, caster: SchemaCaster, batch_size: u32, mode: RunMode) -> Self {
        Self {
            entity,
            caster,
            batch_size,
            mode,
        }
    }

    pub async fn run_partition<T: SoapTransport>(
        &self,
        client: &RetryingClient<T>,
        ranges: &[TimeRange],
        sink: &mut dyn RecordSink,
        cancel: &CancelToken,
    ) -> Result<TaskReport> {
        let mut report = TaskReport {
            watermark: None,
            rows: 0,
        };

        // Preview prefers the most recent window to dodge cold-API latency;
        // correctness-relevant ordering only applies to full runs.
        let ordered: Vec<&TimeRange> = match self.mode {
            RunMode::Full => ranges.iter().collect(),
            RunMode::Preview => ranges.iter().rev().collect(),
        };

        'ranges: for window in ordered {
            if cancel.is_cancelled() {
                return Err(ExtractError::Cancelled);
            }
            info!(from = %window.from, to = %window.to, "fetching window");

            // Cursor lives and dies with this window. Lead stream positions
            // renew every page; activity-log offsets restart per window.
            let mut cursor: Option<Cursor> = None;
            loop {
                if cancel.is_cancelled() {
                    return Err(ExtractError::Cancelled);
                }

                let started = std::time::Instant::now();
                let response = client
                    .call(
                        self.entity.fetch_operation(),
                        self.entity.page_request(window, cursor.take(), self.batch_size),
                        cancel,
                    )
                    .await?;
                let page = match response {
                    SoapResponse::Page(page) => page,
                    SoapResponse::Schema(_) => {
                        return Err(ExtractError::Transport(
                            "fetch call returned a schema document".into(),
                        ))
                    }
                };
                debug!(
                    records = page.records.len(),
                    remaining = page.remaining,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetched page"
                );

                let got_records = !page.records.is_empty();
                for record in &page.records {
                    let row = self.caster.cast(record, window)?;
                    sink.add(row).await.map_err(ExtractError::Sink)?;
                    report.rows += 1;
                    if self.mode == RunMode::Preview && report.rows as usize >= PREVIEW_COUNT {
                        break 'ranges;
                    }
                }

                if self.mode == RunMode::Preview && got_records {
                    break 'ranges;
                }

                match page.continuation() {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }

            if self.mode == RunMode::Full {
                report.watermark = Some(window.to);
            }
        }

        sink.finish().await.map_err(ExtractError::Sink)?;
        info!(rows = report.rows, watermark = ?report.watermark, "partition finished");
        Ok(report)
    }
}

/* ---------------- Tests ---------------- */
