//! Batch size limits and sub-batch dispatch
//!
//! Create/update/delete/amend calls accept at most [`MAX_BATCH_SIZE`] objects.
//! Larger payloads are split into ordered contiguous slices, each slice is sent
//! on its own task, and the results are merged back into one outcome per
//! original item.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Hard upper bound on objects per create/update/delete call
pub const MAX_BATCH_SIZE: usize = 50;

/// Default lower bound of the batch size range
pub const DEFAULT_MIN_BATCH_SIZE: usize = 8;

/// Upper bound for `QueryOptions.batchSize`
pub const MAX_QUERY_BATCH_SIZE: u32 = 2000;

/// Default `QueryOptions.batchSize`
pub const DEFAULT_QUERY_BATCH_SIZE: u32 = 2000;

/// Batch size range for create/update/delete payloads
///
/// Invariant: `0 < min <= max <= MAX_BATCH_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBatchSizes")]
pub struct BatchSizes {
    min: usize,
    max: usize,
}

#[derive(Deserialize)]
struct RawBatchSizes {
    min: usize,
    max: usize,
}

impl TryFrom<RawBatchSizes> for BatchSizes {
    type Error = Error;

    fn try_from(raw: RawBatchSizes) -> Result<Self> {
        BatchSizes::new(raw.min, raw.max)
    }
}

impl BatchSizes {
    /// Validate and build a `(min, max)` range
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if max == 0 || max > MAX_BATCH_SIZE {
            return Err(Error::validation(
                "batch_size",
                format!("Max Batch Size must be set between 1 and {MAX_BATCH_SIZE}"),
            ));
        }
        if min == 0 || min > max {
            return Err(Error::validation(
                "batch_size",
                format!("Min Batch Size must be set between 1 and {max} (the max batch size)"),
            ));
        }
        Ok(Self { min, max })
    }

    /// Set only the maximum, keeping the default minimum
    pub fn with_max(max: usize) -> Result<Self> {
        Self::new(DEFAULT_MIN_BATCH_SIZE, max)
    }

    /// Lower bound
    pub fn min(&self) -> usize {
        self.min
    }

    /// Upper bound; payloads larger than this are split
    pub fn max(&self) -> usize {
        self.max
    }

    /// `(min, max)` pair
    pub fn as_tuple(&self) -> (usize, usize) {
        (self.min, self.max)
    }
}

impl Default for BatchSizes {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_BATCH_SIZE,
            max: MAX_BATCH_SIZE,
        }
    }
}

/// Parses `"max"`, `"min,max"` or `"(min, max)"`
impl FromStr for BatchSizes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parse = |part: &str| {
            part.trim().parse::<usize>().map_err(|_| {
                Error::validation(
                    "batch_size",
                    format!("batch size must be numeric, got {:?}", part.trim()),
                )
            })
        };

        match trimmed.split_once(',') {
            Some((min, max)) => Self::new(parse(min)?, parse(max)?),
            None => Self::with_max(parse(trimmed)?),
        }
    }
}

/// `QueryOptions.batchSize` for `query` / `queryMore`
///
/// Invariant: `0 < size <= MAX_QUERY_BATCH_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct QueryBatchSize(u32);

impl QueryBatchSize {
    /// Validate a size; `0` resets to the default
    pub fn new(size: u32) -> Result<Self> {
        if size > MAX_QUERY_BATCH_SIZE {
            return Err(Error::validation(
                "query_batch_size",
                format!("Max Query Batch Size must be set between 0 and {MAX_QUERY_BATCH_SIZE}"),
            ));
        }
        if size == 0 {
            return Ok(Self::default());
        }
        Ok(Self(size))
    }

    /// The size in records
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for QueryBatchSize {
    fn default() -> Self {
        Self(DEFAULT_QUERY_BATCH_SIZE)
    }
}

impl TryFrom<u32> for QueryBatchSize {
    type Error = Error;

    fn try_from(size: u32) -> Result<Self> {
        Self::new(size)
    }
}

impl From<QueryBatchSize> for u32 {
    fn from(size: QueryBatchSize) -> Self {
        size.0
    }
}

impl FromStr for QueryBatchSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let size = s.trim().parse::<u32>().map_err(|_| {
            Error::validation(
                "query_batch_size",
                format!("query batch size must be numeric, got {:?}", s.trim()),
            )
        })?;
        Self::new(size)
    }
}

/// Outcome for one item of a batched call
#[derive(Clone, Debug, PartialEq)]
pub enum ItemOutcome<R> {
    /// The item's sub-batch completed and the remote returned this result
    Completed(R),
    /// The item's sub-batch failed
    Failed {
        /// Index of the sub-batch the item was sent in
        batch: usize,
        /// Why the sub-batch failed
        reason: String,
    },
    /// The item's sub-batch did not finish before the dispatch timeout
    TimedOut {
        /// Index of the sub-batch the item was sent in
        batch: usize,
    },
}

impl<R> ItemOutcome<R> {
    /// The remote result, if the item completed
    pub fn result(&self) -> Option<&R> {
        match self {
            ItemOutcome::Completed(result) => Some(result),
            _ => None,
        }
    }

    /// True for `Completed`
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed(_))
    }
}

/// Merged outcome of a (possibly split) batched call, one entry per input item
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct BatchResult<R> {
    outcomes: Vec<ItemOutcome<R>>,
    batches: usize,
}

impl<R> Default for BatchResult<R> {
    fn default() -> Self {
        Self {
            outcomes: Vec::new(),
            batches: 0,
        }
    }
}

impl<R> BatchResult<R> {
    /// Reconcile the results of a single, unsplit call of `size` items
    ///
    /// Items without a returned result are reported as [`ItemOutcome::Failed`]
    /// and surplus results are dropped.
    pub fn from_single_call(size: usize, results: Vec<R>) -> Self {
        let mut outcomes = Vec::with_capacity(size);
        merge_slice(&mut outcomes, 0, size, results);
        Self {
            outcomes,
            batches: 1,
        }
    }

    /// Number of item outcomes
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// True when no items were submitted
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of sub-batches the payload was sent in
    pub fn batch_count(&self) -> usize {
        self.batches
    }

    /// Every item completed
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_completed)
    }

    /// Outcomes in input order
    pub fn outcomes(&self) -> &[ItemOutcome<R>] {
        &self.outcomes
    }

    /// Results of completed items, in input order
    pub fn completed(&self) -> impl Iterator<Item = &R> {
        self.outcomes.iter().filter_map(ItemOutcome::result)
    }

    /// Number of items whose sub-batch failed
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Failed { .. }))
            .count()
    }

    /// Number of items whose sub-batch timed out
    pub fn timed_out_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::TimedOut { .. }))
            .count()
    }

    /// Consume into the per-item outcomes
    pub fn into_outcomes(self) -> Vec<ItemOutcome<R>> {
        self.outcomes
    }
}

/// Split `items` into ordered contiguous slices of at most `max` items
pub fn split_into_batches<T>(items: Vec<T>, max: usize) -> Vec<Vec<T>> {
    let max = max.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(max));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(max).collect());
    }
    batches
}

/// Split `items`, run `call` for every slice on its own task, and merge the results
///
/// All slices share one deadline of `timeout` from the moment they are spawned.
/// A slice still running at the deadline is aborted and its items are reported
/// as [`ItemOutcome::TimedOut`]. A slice whose call fails, panics, or returns
/// fewer results than items yields [`ItemOutcome::Failed`] for the affected items.
pub async fn dispatch_batches<T, R, F, Fut>(
    items: Vec<T>,
    max: usize,
    timeout: Duration,
    call: F,
) -> BatchResult<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<R>>> + Send + 'static,
{
    let total = items.len();
    let batches = split_into_batches(items, max);
    let batch_count = batches.len();

    info!(
        items = total,
        batch_size = max,
        batches = batch_count,
        "dispatching items in batches"
    );

    let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
    let handles: Vec<_> = batches
        .into_iter()
        .map(|slice| tokio::spawn(call(slice)))
        .collect();

    let deadline = tokio::time::Instant::now() + timeout;
    let mut outcomes = Vec::with_capacity(total);

    for (batch, (mut handle, size)) in handles.into_iter().zip(sizes).enumerate() {
        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(Ok(results))) => merge_slice(&mut outcomes, batch, size, results),
            Ok(Ok(Err(e))) => {
                warn!(batch, items = size, error = %e, "sub-batch failed");
                push_failed(&mut outcomes, batch, size, &e.to_string());
            }
            Ok(Err(join_error)) => {
                warn!(batch, items = size, error = %join_error, "sub-batch task did not finish");
                push_failed(&mut outcomes, batch, size, &join_error.to_string());
            }
            Err(_) => {
                handle.abort();
                warn!(batch, items = size, timeout = ?timeout, "sub-batch timed out");
                outcomes.extend((0..size).map(|_| ItemOutcome::TimedOut { batch }));
            }
        }
    }

    info!(
        items = total,
        completed = outcomes.iter().filter(|o| o.is_completed()).count(),
        "batched call finished"
    );

    BatchResult {
        outcomes,
        batches: batch_count,
    }
}

fn merge_slice<R>(outcomes: &mut Vec<ItemOutcome<R>>, batch: usize, size: usize, results: Vec<R>) {
    let returned = results.len();
    if returned != size {
        warn!(batch, expected = size, returned, "sub-batch result count mismatch");
    }
    outcomes.extend(results.into_iter().take(size).map(ItemOutcome::Completed));
    if returned < size {
        push_failed(outcomes, batch, size - returned, "no result returned for item");
    }
}

fn push_failed<R>(outcomes: &mut Vec<ItemOutcome<R>>, batch: usize, count: usize, reason: &str) {
    outcomes.extend((0..count).map(|_| ItemOutcome::Failed {
        batch,
        reason: reason.to_string(),
    }));
}
