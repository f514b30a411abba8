use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{ExtractError, Result};

/// Default window length. The vendor recommends keeping fetch windows at one
/// hour; longer windows risk request timeouts and oversized payloads.
pub const DEFAULT_CHUNK_SECONDS: i64 = 3600;

/// Half-open interval `[from, to)` over which one paginated fetch sequence
/// runs. Immutable once created; `from <= to` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(ExtractError::Config(format!(
                "from_datetime '{from}' is later than to_datetime '{to}'"
            )));
        }
        Ok(Self { from, to })
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// Splits `[from, to)` into consecutive windows of `chunk` length, the final
/// window truncated to end exactly at `to`.
///
/// `from == to` yields an empty sequence; `from > to` is a configuration
/// error.
pub fn slice(from: DateTime<Utc>, to: DateTime<Utc>, chunk: Duration) -> Result<Vec<TimeRange>> {
    if chunk <= Duration::zero() {
        return Err(ExtractError::Config(format!(
            "window chunk must be positive, got {chunk}"
        )));
    }
    if from > to {
        return Err(ExtractError::Config(format!(
            "from_datetime '{from}' is later than to_datetime '{to}'"
        )));
    }

    let mut ranges = Vec::new();
    let mut since = from;
    while since < to {
        let mut next = since + chunk;
        if to < next {
            next = to;
        }
        ranges.push(TimeRange { from: since, to: next });
        since = next;
    }
    Ok(ranges)
}

/// Distributes `ranges` over `count` partitions as contiguous blocks.
///
/// Each partition receives `len / count` ranges; the remainder is appended to
/// the last partition rather than dropped. Pure and deterministic, so a rerun
/// with the same inputs reproduces the same assignment. A `count` larger than
/// `len` leaves trailing partitions empty.
pub fn partition(ranges: Vec<TimeRange>, count: usize) -> Result<Vec<Vec<TimeRange>>> {
    if count == 0 {
        return Err(ExtractError::Config(
            "partition count must be at least 1".into(),
        ));
    }

    let base = ranges.len() / count;
    let mut partitions: Vec<Vec<TimeRange>> = Vec::with_capacity(count);
    let mut rest = ranges;
    for index in 0..count {
        if index + 1 == count {
            // Last partition takes its block plus the remainder.
            partitions.push(std::mem::take(&mut rest));
        } else {
            let tail = rest.split_off(base.min(rest.len()));
            partitions.push(std::mem::replace(&mut rest, tail));
        }
    }
    Ok(partitions)
}

/* ---------------- Tests ---------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn slice_produces_contiguous_hour_windows() {
        let from = at(2015, 8, 2, 20, 0, 0);
        let to = at(2015, 8, 3, 8, 8, 8);
        let ranges = slice(from, to, Duration::seconds(3600)).unwrap();

        assert_eq!(ranges.len(), 13);
        assert_eq!(ranges.first().unwrap().from, from);
        assert_eq!(ranges.last().unwrap().to, to);
        assert_eq!(ranges.last().unwrap().from, at(2015, 8, 3, 8, 0, 0));
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].to, pair[1].from);
        }
    }

    #[test]
    fn slice_range_count_matches_ceiling_division() {
        let from = at(2020, 1, 1, 0, 0, 0);
        for (secs, chunk, expected) in [(7200, 3600, 2), (7201, 3600, 3), (10, 60, 1)] {
            let to = from + Duration::seconds(secs);
            let ranges = slice(from, to, Duration::seconds(chunk)).unwrap();
            assert_eq!(ranges.len(), expected, "{secs}s / {chunk}s");
        }
    }

    #[test]
    fn slice_of_empty_interval_is_empty_not_an_error() {
        let from = at(2020, 1, 1, 0, 0, 0);
        let ranges = slice(from, from, Duration::seconds(3600)).unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn slice_rejects_inverted_interval() {
        let from = at(2020, 1, 2, 0, 0, 0);
        let to = at(2020, 1, 1, 0, 0, 0);
        let err = slice(from, to, Duration::seconds(3600)).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Config);
    }

    #[test]
    fn partition_is_a_bijection_over_the_input() {
        let from = at(2021, 6, 1, 0, 0, 0);
        let to = at(2021, 6, 2, 1, 30, 0);
        let ranges = slice(from, to, Duration::seconds(3600)).unwrap();

        for count in 1..=30 {
            let parts = partition(ranges.clone(), count).unwrap();
            assert_eq!(parts.len(), count);
            let mut rebuilt: Vec<TimeRange> = parts.into_iter().flatten().collect();
            rebuilt.sort_by_key(|r| r.from);
            assert_eq!(rebuilt, ranges, "count {count}");
        }
    }

    #[test]
    fn partition_remainder_lands_in_last_partition() {
        let from = at(2021, 6, 1, 0, 0, 0);
        let to = from + Duration::hours(7);
        let ranges = slice(from, to, Duration::seconds(3600)).unwrap();

        let parts = partition(ranges, 3).unwrap();
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[1].len(), 2);
        assert_eq!(parts[2].len(), 3);
    }

    #[test]
    fn partition_count_beyond_range_count_leaves_empty_partitions() {
        let from = at(2021, 6, 1, 0, 0, 0);
        let to = from + Duration::hours(2);
        let ranges = slice(from, to, Duration::seconds(3600)).unwrap();

        let parts = partition(ranges, 5).unwrap();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts.iter().map(Vec::len).sum::<usize>(), 2);
    }
}
