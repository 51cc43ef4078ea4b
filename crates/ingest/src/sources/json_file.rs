use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::IngestionError;
use crate::point::RawPoint;
use crate::source::{BoxFuture, PointSource};

/// Reads a JSON array of raw point records from disk.
///
/// The file is read and parsed on the first pull, so the declared count is
/// unknown until then and read/parse failures surface as ingestion errors.
#[derive(Debug)]
pub struct JsonFileSource {
    path: PathBuf,
    loaded: Option<VecDeque<RawPoint>>,
    declared: Option<u64>,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            loaded: None,
            declared: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&mut self) -> Result<(), IngestionError> {
        if self.loaded.is_some() {
            return Ok(());
        }
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| IngestionError::Io {
                path: self.path.clone(),
                source,
            })?;
        let records: Vec<RawPoint> = serde_json::from_str(&text)?;
        debug!(path = ?self.path, records = records.len(), "loaded point file");
        self.declared = Some(records.len() as u64);
        self.loaded = Some(records.into());
        Ok(())
    }
}

impl PointSource for JsonFileSource {
    fn declared_count(&self) -> Option<u64> {
        self.declared
    }

    fn next_batch(
        &mut self,
        max_size: usize,
    ) -> BoxFuture<'_, Result<Vec<RawPoint>, IngestionError>> {
        Box::pin(async move {
            self.load().await?;
            let Some(records) = self.loaded.as_mut() else {
                return Ok(Vec::new());
            };
            let take = max_size.min(records.len());
            Ok(records.drain(..take).collect())
        })
    }
}
