use std::path::PathBuf;
use std::sync::Arc;

use cluster::{ClusterService, SharedIndex, ViewportController};
use foundation::LatLng;
use ingest::{
    ChunkedProcessor, GeneratedSource, IngestOutcome, JsonFileSource, PointSource, ingest_into,
};
use runtime::CancelToken;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;

/// Where the points come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceChoice {
    Generated { count: u64, seed: u64 },
    JsonFile(PathBuf),
}

/// The screen the clusters are computed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest {
    pub center: LatLng,
    pub zoom: f64,
    pub width_px: f64,
    pub height_px: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub cancelled: bool,
    pub chunks: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub live_points: usize,
    pub zoom: f64,
    pub visible_points: usize,
    pub clusters: usize,
    pub singletons: usize,
    pub largest_cluster: usize,
}

fn open_source(choice: &SourceChoice) -> Box<dyn PointSource> {
    match choice {
        SourceChoice::Generated { count, seed } => Box::new(GeneratedSource::new(*count, *seed)),
        SourceChoice::JsonFile(path) => Box::new(JsonFileSource::new(path)),
    }
}

/// Loads points chunk by chunk while a cluster service follows the growing
/// live set, then reports the clusters for the requested view.
///
/// Cancelling `cancel` stops ingestion at the next group boundary; the summary
/// then covers whatever had been delivered.
pub async fn run(
    config: &EngineConfig,
    source: &SourceChoice,
    view: ViewRequest,
    cancel: CancelToken,
) -> anyhow::Result<RunSummary> {
    let index = SharedIndex::new(config.cluster());
    let viewport = Arc::new(ViewportController::with_tile_size(
        (view.width_px, view.height_px),
        view.center,
        view.zoom,
        config.tile_size,
    ));
    let service = ClusterService::new(index.clone());
    let stop_service = CancelToken::new();
    let follower = tokio::spawn(service.clone().run(viewport.clone(), stop_service.clone()));

    let mut processor = ChunkedProcessor::new(open_source(source), config.processor(), cancel);
    let mut sink = index.clone();
    let ingested = ingest_into(&mut processor, &mut sink, |snapshot| {
        info!(
            processed = snapshot.processed,
            total = snapshot.total,
            percent = snapshot.percent(),
            "loading points"
        );
        viewport.report_progress(snapshot);
    })
    .await;

    stop_service.cancel();
    if let Err(e) = follower.await {
        warn!(error = %e, "cluster service task failed");
    }
    let report = ingested?;

    let frame = service.compute(viewport.current());
    let summary = RunSummary {
        cancelled: report.outcome == IngestOutcome::Cancelled,
        chunks: report.chunks,
        ingested: report.ingested,
        skipped: report.skipped,
        live_points: index.len(),
        zoom: frame.viewport.zoom,
        visible_points: frame.visible_points,
        clusters: frame.clusters.len(),
        singletons: frame.clusters.iter().filter(|c| c.is_singleton).count(),
        largest_cluster: frame.clusters.iter().map(|c| c.len()).max().unwrap_or(0),
    };
    viewport.report_clusters(summary.clusters, summary.visible_points);
    info!(
        clusters = summary.clusters,
        visible = summary.visible_points,
        live = summary.live_points,
        "clustered view"
    );
    Ok(summary)
}
