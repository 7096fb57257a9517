use crate::error::StoreError;
use crate::models::ChunkRecord;
use crate::store::{FilenameLease, FilenameLocks};
use crate::traits::CorpusStore;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Process-local corpus; useful for dry runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryCorpusStore {
    records: RwLock<Vec<ChunkRecord>>,
    locks: FilenameLocks,
}

impl InMemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records_for_filename(&self, filename: &str) -> Vec<ChunkRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| record.filename == filename)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CorpusStore for InMemoryCorpusStore {
    async fn lock_filename(&self, filename: &str) -> FilenameLease {
        self.locks.acquire(filename).await
    }

    async fn exists_for_filename(&self, filename: &str) -> Result<bool, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .any(|record| record.filename == filename))
    }

    async fn delete_all_for_filename(&self, filename: &str) -> Result<usize, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|record| record.filename != filename);
        Ok(before - records.len())
    }

    async fn insert_chunk_records(&self, records: &[ChunkRecord]) -> Result<usize, StoreError> {
        if records.iter().any(|record| record.embedding.is_empty()) {
            return Err(StoreError::Request("record has an empty embedding".to_string()));
        }

        let mut stored = self.records.write().await;

        let expected = stored
            .first()
            .or_else(|| records.first())
            .map(|record| record.embedding.len());

        if let Some(expected) = expected {
            if let Some(bad) = records
                .iter()
                .find(|record| record.embedding.len() != expected)
            {
                return Err(StoreError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        stored.extend_from_slice(records);
        Ok(records.len())
    }
}
