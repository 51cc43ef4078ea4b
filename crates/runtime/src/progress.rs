use serde::Serialize;
use tokio::time::Instant;

/// Point-in-time view of an ingestion run.
///
/// Within one run `processed` never decreases and never exceeds `total`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub processed: u64,
    pub total: u64,
    pub elapsed_millis: u64,
}

impl ProgressSnapshot {
    /// Rounded completion percentage; 0 for an empty run.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.processed as f64 / self.total as f64) * 100.0).round() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.processed >= self.total
    }
}

/// Produces monotonic [`ProgressSnapshot`]s for a single run.
///
/// `declared_total` is the producer's best-effort size. When it is unknown, or the
/// producer under-declared, the total is raised to the processed count so the
/// `processed <= total` invariant holds.
#[derive(Debug)]
pub struct ProgressTracker {
    started: Instant,
    declared_total: Option<u64>,
    processed: u64,
}

impl ProgressTracker {
    pub fn start(declared_total: Option<u64>) -> Self {
        Self {
            started: Instant::now(),
            declared_total,
            processed: 0,
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        match self.declared_total {
            Some(total) => total.max(self.processed),
            None => self.processed,
        }
    }

    /// Adopts a declared total that only became known mid-run (lazy sources).
    pub fn refine_total(&mut self, declared_total: Option<u64>) {
        if self.declared_total.is_none() {
            self.declared_total = declared_total;
        }
    }

    /// Records `items` more processed records and returns the new snapshot.
    pub fn advance(&mut self, items: u64) -> ProgressSnapshot {
        self.processed = self.processed.saturating_add(items);
        self.snapshot()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: self.processed,
            total: self.total(),
            elapsed_millis: self.started.elapsed().as_millis() as u64,
        }
    }
}
