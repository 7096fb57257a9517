use crate::error::{EmbeddingError, StoreError};
use crate::models::ChunkRecord;
use crate::store::FilenameLease;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One vector returned by a provider, tagged with the position of its input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedEmbedding {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Largest number of inputs accepted in a single request.
    fn max_batch_size(&self) -> usize;

    /// Results may come back in any order; `index` refers to `texts`.
    async fn embed(
        &self,
        texts: &[String],
        model: &str,
    ) -> Result<Vec<IndexedEmbedding>, EmbeddingError>;
}

#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Serializes purge and insert for one filename across concurrent calls.
    async fn lock_filename(&self, filename: &str) -> FilenameLease;

    async fn exists_for_filename(&self, filename: &str) -> Result<bool, StoreError>;

    async fn delete_all_for_filename(&self, filename: &str) -> Result<usize, StoreError>;

    /// Either every record becomes visible or none does.
    async fn insert_chunk_records(&self, records: &[ChunkRecord]) -> Result<usize, StoreError>;
}
