use futures_util::Stream;
use runtime::{CancelToken, ProgressSnapshot, ProgressTracker, yield_to_scheduler};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::IngestionError;
use crate::point::{Point, RawPoint};
use crate::source::PointSource;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessorConfig {
    /// Records per group. The final group may be smaller.
    pub batch_size: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// One ingestion step: the valid points of a group plus the progress after it.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// 0-based position of this group in the run.
    pub index: usize,
    pub points: Vec<Point>,
    /// Records in this group that failed validation and were dropped.
    pub skipped: usize,
    pub progress: ProgressSnapshot,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RunState {
    NotStarted,
    Running,
    Finished,
}

/// Pulls records from a [`PointSource`] in groups of exactly `batch_size`.
///
/// The processor is a single-use lazy sequence of [`Chunk`]s: once it returns
/// `None` or an error it stays finished. Between groups it yields to the
/// scheduler. Cancellation is checked before each group and raced against every
/// pull; a group interrupted by cancellation is discarded and produces no
/// progress.
pub struct ChunkedProcessor<S> {
    source: S,
    batch_size: usize,
    cancel: CancelToken,
    tracker: Option<ProgressTracker>,
    carry: Vec<RawPoint>,
    state: RunState,
    next_index: usize,
}

impl<S: PointSource> ChunkedProcessor<S> {
    pub fn new(source: S, config: ProcessorConfig, cancel: CancelToken) -> Self {
        Self {
            source,
            batch_size: config.batch_size.max(1),
            cancel,
            tracker: None,
            carry: Vec::new(),
            state: RunState::NotStarted,
            next_index: 0,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_finished(&self) -> bool {
        self.state == RunState::Finished
    }

    /// Latest progress, or `None` before the first group.
    pub fn progress(&self) -> Option<ProgressSnapshot> {
        self.tracker
            .as_ref()
            .filter(|t| t.processed() > 0)
            .map(ProgressTracker::snapshot)
    }

    fn finish(&mut self) {
        self.state = RunState::Finished;
        self.carry.clear();
    }

    /// Produces the next group, `None` once exhausted or cancelled.
    pub async fn next_chunk(&mut self) -> Option<Result<Chunk, IngestionError>> {
        match self.state {
            RunState::Finished => return None,
            RunState::NotStarted => {
                self.tracker = Some(ProgressTracker::start(self.source.declared_count()));
                self.state = RunState::Running;
            }
            RunState::Running => yield_to_scheduler().await,
        }

        if self.cancel.is_cancelled() {
            info!(chunks = self.next_index, "ingestion cancelled");
            self.finish();
            return None;
        }

        let mut group = std::mem::take(&mut self.carry);
        let mut exhausted = false;
        while group.len() < self.batch_size {
            let want = self.batch_size - group.len();
            let pulled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                res = self.source.next_batch(want) => Some(res),
            };
            match pulled {
                None => {
                    info!(
                        chunks = self.next_index,
                        discarded = group.len(),
                        "ingestion cancelled mid-group"
                    );
                    self.finish();
                    return None;
                }
                Some(Err(err)) => {
                    warn!(chunks = self.next_index, "point source failed: {err}");
                    self.finish();
                    return Some(Err(err));
                }
                Some(Ok(batch)) if batch.is_empty() => {
                    exhausted = true;
                    break;
                }
                Some(Ok(batch)) => group.extend(batch),
            }
        }

        if group.len() > self.batch_size {
            // Source over-delivered; keep the surplus for the next group.
            self.carry = group.split_off(self.batch_size);
        }

        if self.cancel.is_cancelled() {
            info!(chunks = self.next_index, "ingestion cancelled mid-group");
            self.finish();
            return None;
        }

        if group.is_empty() {
            debug!(chunks = self.next_index, "point source exhausted");
            self.finish();
            return None;
        }

        let pulled = group.len();
        let mut points = Vec::with_capacity(pulled);
        let mut skipped = 0usize;
        for raw in group {
            match Point::try_from(raw) {
                Ok(p) => points.push(p),
                Err(reason) => {
                    skipped += 1;
                    warn!(%reason, "skipping malformed point record");
                }
            }
        }

        let declared = self.source.declared_count();
        let tracker = self
            .tracker
            .get_or_insert_with(|| ProgressTracker::start(declared));
        tracker.refine_total(declared);
        let progress = tracker.advance(pulled as u64);

        let chunk = Chunk {
            index: self.next_index,
            points,
            skipped,
            progress,
        };
        self.next_index += 1;
        if exhausted && self.carry.is_empty() {
            self.finish();
        }
        debug!(
            index = chunk.index,
            processed = progress.processed,
            total = progress.total,
            "chunk ready"
        );
        Some(Ok(chunk))
    }

    /// Adapts the processor into a `Stream` of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Chunk, IngestionError>> {
        futures_util::stream::unfold(self, |mut processor| async move {
            let item = processor.next_chunk().await?;
            Some((item, processor))
        })
    }
}
