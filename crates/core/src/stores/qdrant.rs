use crate::error::StoreError;
use crate::models::ChunkRecord;
use crate::store::{FilenameLease, FilenameLocks};
use crate::traits::CorpusStore;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const BACKEND: &str = "qdrant";

pub struct QdrantCorpusStore {
    endpoint: Url,
    collection: String,
    client: Client,
    vector_size: usize,
    locks: FilenameLocks,
}

impl QdrantCorpusStore {
    /// `timeout` bounds every request; a filename lease is held across them.
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let endpoint = Url::parse(&format!("{}/", endpoint.trim().trim_end_matches('/')))?;
        let collection = collection.into();
        if collection.trim().is_empty() {
            return Err(StoreError::Request("collection name is empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            endpoint,
            collection,
            client,
            vector_size,
            locks: FilenameLocks::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        Ok(self
            .endpoint
            .join(&format!("collections/{}{path}", self.collection))?)
    }

    /// Creates the collection and its `filename` payload index when absent.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.url("")?).send().await?;

        if response.status().is_success() {
            let parsed: Value = response.json().await?;
            let existing = parsed
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64);
            if let Some(size) = existing {
                if size as usize != self.vector_size {
                    return Err(StoreError::DimensionMismatch {
                        expected: size as usize,
                        actual: self.vector_size,
                    });
                }
            }

            if parsed.pointer("/result/payload_schema/filename").is_none() {
                self.create_filename_index().await?;
                info!(collection = %self.collection, "added filename index to qdrant collection");
            }
            return Ok(());
        }

        if response.status() != StatusCode::NOT_FOUND {
            return Err(backend_error(response.status()));
        }

        let response = self
            .client
            .put(self.url("")?)
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        self.create_filename_index().await?;
        info!(collection = %self.collection, size = self.vector_size, "created qdrant collection");
        Ok(())
    }

    async fn create_filename_index(&self) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url("/index?wait=true")?)
            .json(&json!({ "field_name": "filename", "field_schema": "keyword" }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }
        Ok(())
    }

    async fn count_for_filename(&self, filename: &str) -> Result<usize, StoreError> {
        let response = self
            .client
            .post(self.url("/points/count")?)
            .json(&json!({ "filter": filename_filter(filename), "exact": true }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "count response missing result.count".to_string(),
            })
    }
}

fn filename_filter(filename: &str) -> Value {
    json!({
        "must": [{ "key": "filename", "match": { "value": filename } }]
    })
}

fn backend_error(status: StatusCode) -> StoreError {
    StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        details: status.to_string(),
    }
}

fn to_point(record: &ChunkRecord) -> Value {
    json!({
        "id": Uuid::new_v4().to_string(),
        "vector": record.embedding,
        "payload": {
            "content": record.content,
            "subject": record.subject,
            "level": record.level,
            "year": record.year,
            "type": record.doc_type,
            "filename": record.filename,
        },
    })
}

#[async_trait]
impl CorpusStore for QdrantCorpusStore {
    async fn lock_filename(&self, filename: &str) -> FilenameLease {
        self.locks.acquire(filename).await
    }

    async fn exists_for_filename(&self, filename: &str) -> Result<bool, StoreError> {
        Ok(self.count_for_filename(filename).await? > 0)
    }

    async fn delete_all_for_filename(&self, filename: &str) -> Result<usize, StoreError> {
        let existing = self.count_for_filename(filename).await?;
        if existing == 0 {
            return Ok(0);
        }

        let response = self
            .client
            .post(self.url("/points/delete?wait=true")?)
            .json(&json!({ "filter": filename_filter(filename) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        debug!(filename, removed = existing, "deleted qdrant points");
        Ok(existing)
    }

    /// Sends every record in one upsert so a rejected request stores nothing.
    async fn insert_chunk_records(&self, records: &[ChunkRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(bad) = records
            .iter()
            .find(|record| record.embedding.len() != self.vector_size)
        {
            return Err(StoreError::DimensionMismatch {
                expected: self.vector_size,
                actual: bad.embedding.len(),
            });
        }

        let points = records.iter().map(to_point).collect::<Vec<_>>();
        let response = self
            .client
            .put(self.url("/points?wait=true")?)
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_error(response.status()));
        }

        Ok(records.len())
    }
}
