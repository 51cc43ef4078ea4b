use runtime::ProgressSnapshot;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::IngestionError;
use crate::point::Point;
use crate::processor::ChunkedProcessor;
use crate::source::PointSource;

/// Downstream owner of ingested points (the live point set).
pub trait ChunkSink {
    /// Takes ownership of a validated group; returns how many points were new.
    fn accept(&mut self, points: Vec<Point>) -> usize;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks: usize,
    /// Points accepted by the sink.
    pub ingested: usize,
    /// Records dropped as malformed.
    pub skipped: usize,
    pub last_progress: Option<ProgressSnapshot>,
    pub outcome: IngestOutcome,
}

impl IngestReport {
    fn empty() -> Self {
        Self {
            chunks: 0,
            ingested: 0,
            skipped: 0,
            last_progress: None,
            outcome: IngestOutcome::Completed,
        }
    }
}

/// A run that stopped on a source failure. Points delivered before it stay in the sink.
#[derive(Debug, Error)]
#[error("ingestion stopped after {} points: {}", .partial.ingested, .error)]
pub struct IngestRunError {
    pub partial: IngestReport,
    #[source]
    pub error: IngestionError,
}

/// Drives `processor` to completion, handing each group to `sink` and then
/// reporting its progress through `on_progress`.
///
/// Progress fires once per delivered group, in increasing `processed` order. A
/// group finished after cancellation was signalled is dropped without reaching
/// the sink or the progress callback.
pub async fn ingest_into<S, K, F>(
    processor: &mut ChunkedProcessor<S>,
    sink: &mut K,
    mut on_progress: F,
) -> Result<IngestReport, IngestRunError>
where
    S: PointSource,
    K: ChunkSink + ?Sized,
    F: FnMut(ProgressSnapshot),
{
    let mut report = IngestReport::empty();

    while let Some(next) = processor.next_chunk().await {
        let chunk = match next {
            Ok(chunk) => chunk,
            Err(error) => {
                warn!(ingested = report.ingested, "ingestion run failed: {error}");
                return Err(IngestRunError {
                    partial: report,
                    error,
                });
            }
        };

        if processor.cancel_token().is_cancelled() {
            break;
        }

        report.chunks += 1;
        report.skipped += chunk.skipped;
        report.ingested += sink.accept(chunk.points);
        report.last_progress = Some(chunk.progress);
        on_progress(chunk.progress);
    }

    if processor.cancel_token().is_cancelled() {
        report.outcome = IngestOutcome::Cancelled;
    }
    info!(
        chunks = report.chunks,
        ingested = report.ingested,
        skipped = report.skipped,
        outcome = ?report.outcome,
        "ingestion run finished"
    );
    Ok(report)
}

impl ChunkSink for Vec<Point> {
    fn accept(&mut self, points: Vec<Point>) -> usize {
        let n = points.len();
        self.extend(points);
        n
    }
}

#[cfg(test)]
mod tests {
    use super::{IngestOutcome, ingest_into};
    use crate::point::{Point, PointKind, RawPoint};
    use crate::processor::{ChunkedProcessor, ProcessorConfig};
    use crate::sources::MemorySource;
    use runtime::CancelToken;

    #[tokio::test]
    async fn collects_everything_into_a_vec_sink() {
        let recs: Vec<RawPoint> = (0..25)
            .map(|i| RawPoint::new(format!("v{i}"), 1.0, 1.0, PointKind::Sign))
            .collect();
        let mut p = ChunkedProcessor::new(
            MemorySource::new(recs),
            ProcessorConfig { batch_size: 10 },
            CancelToken::new(),
        );
        let mut sink: Vec<Point> = Vec::new();
        let mut seen = Vec::new();
        let report = ingest_into(&mut p, &mut sink, |s| seen.push(s.processed))
            .await
            .unwrap();

        assert_eq!(sink.len(), 25);
        assert_eq!(seen, vec![10, 20, 25]);
        assert_eq!(report.chunks, 3);
        assert_eq!(report.outcome, IngestOutcome::Completed);
    }
}
