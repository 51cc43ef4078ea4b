use std::collections::VecDeque;

use crate::error::IngestionError;
use crate::point::RawPoint;
use crate::source::{BoxFuture, PointSource};

/// Serves records from memory, at most `max_per_pull` per call.
#[derive(Debug, Default)]
pub struct MemorySource {
    records: VecDeque<RawPoint>,
    declared: u64,
    max_per_pull: Option<usize>,
}

impl MemorySource {
    pub fn new(records: Vec<RawPoint>) -> Self {
        Self {
            declared: records.len() as u64,
            records: records.into(),
            max_per_pull: None,
        }
    }

    /// Caps each pull, mimicking a paged upstream that returns short pages.
    pub fn with_page_size(mut self, page: usize) -> Self {
        self.max_per_pull = Some(page.max(1));
        self
    }

    pub fn remaining(&self) -> usize {
        self.records.len()
    }
}

impl PointSource for MemorySource {
    fn declared_count(&self) -> Option<u64> {
        Some(self.declared)
    }

    fn next_batch(
        &mut self,
        max_size: usize,
    ) -> BoxFuture<'_, Result<Vec<RawPoint>, IngestionError>> {
        let take = match self.max_per_pull {
            Some(page) => max_size.min(page),
            None => max_size,
        }
        .min(self.records.len());
        let batch: Vec<RawPoint> = self.records.drain(..take).collect();
        Box::pin(async move { Ok(batch) })
    }
}

#[cfg(test)]
mod tests {
    use super::MemorySource;
    use crate::point::{PointKind, RawPoint};
    use crate::source::PointSource;

    fn records(n: usize) -> Vec<RawPoint> {
        (0..n)
            .map(|i| RawPoint::new(format!("m{i}"), 0.0, 0.0, PointKind::Rack))
            .collect()
    }

    #[tokio::test]
    async fn drains_in_order_with_short_pages() {
        let mut src = MemorySource::new(records(5)).with_page_size(2);
        assert_eq!(src.declared_count(), Some(5));

        let a = src.next_batch(10).await.unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].id.as_deref(), Some("m0"));
        let b = src.next_batch(10).await.unwrap();
        let c = src.next_batch(10).await.unwrap();
        assert_eq!((b.len(), c.len()), (2, 1));
        assert!(src.next_batch(10).await.unwrap().is_empty());
    }
}
