use std::future::Future;
use std::pin::Pin;

use crate::error::IngestionError;
use crate::point::RawPoint;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A lazy, finite producer of raw point records.
///
/// Methods return boxed futures for dyn-compatibility, so callers can hold a
/// `Box<dyn PointSource>` picked at runtime.
pub trait PointSource: Send {
    /// Best-effort number of records this source will produce, `None` if unknown.
    fn declared_count(&self) -> Option<u64>;

    /// Next records in source order.
    ///
    /// May return fewer than `max_size` records; an empty batch means the source
    /// is exhausted.
    fn next_batch(&mut self, max_size: usize)
    -> BoxFuture<'_, Result<Vec<RawPoint>, IngestionError>>;
}

impl<S: PointSource + ?Sized> PointSource for Box<S> {
    fn declared_count(&self) -> Option<u64> {
        (**self).declared_count()
    }

    fn next_batch(
        &mut self,
        max_size: usize,
    ) -> BoxFuture<'_, Result<Vec<RawPoint>, IngestionError>> {
        (**self).next_batch(max_size)
    }
}
