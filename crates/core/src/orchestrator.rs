use crate::embeddings::EmbeddingGenerator;
use crate::error::IngestError;
use crate::models::{ChunkRecord, IngestOutcome, IngestRequest};
use crate::traits::CorpusStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Entry point for one batch of one document upload.
///
/// A call authorizes the caller, validates metadata, purges the filename when
/// it is the first batch, embeds the chunk texts and stores one record per
/// chunk. The store's filename lease is held from purge to insert. A purge is
/// not rolled back if embedding or insert fails afterwards; the filename then
/// has no rows until a retry succeeds.
pub struct IngestionOrchestrator<S>
where
    S: CorpusStore,
{
    admin_secret: String,
    generator: EmbeddingGenerator,
    store: Arc<S>,
}

impl<S> IngestionOrchestrator<S>
where
    S: CorpusStore,
{
    pub fn new(
        admin_secret: impl Into<String>,
        generator: EmbeddingGenerator,
        store: Arc<S>,
    ) -> Result<Self, IngestError> {
        let admin_secret = admin_secret.into();
        if admin_secret.is_empty() {
            return Err(IngestError::Validation(
                "admin secret must be configured".to_string(),
            ));
        }

        Ok(Self {
            admin_secret,
            generator,
            store,
        })
    }

    pub async fn ingest(&self, request: IngestRequest) -> IngestOutcome {
        let result = self.try_ingest(request).await;
        if let Err(error) = &result {
            warn!(kind = ?error.kind(), %error, "ingest batch failed");
        }
        IngestOutcome::from(result)
    }

    pub async fn try_ingest(&self, request: IngestRequest) -> Result<usize, IngestError> {
        self.authorize(request.secret.as_deref())?;

        if request.chunk_texts.is_empty() {
            return Ok(0);
        }

        let metadata = request.metadata.validate()?;
        let filename = metadata.filename.as_str();

        let _lease = self.store.lock_filename(filename).await;

        let purged = if request.is_first_batch {
            let removed = self.store.delete_all_for_filename(filename).await?;
            info!(filename, removed, "purged previous upload");
            true
        } else {
            false
        };

        let vectors = match self.generator.embed(&request.chunk_texts).await {
            Ok(vectors) => vectors,
            Err(error) => {
                if purged {
                    warn!(filename, "embedding failed after purge; filename has no chunks");
                }
                return Err(error.into());
            }
        };

        let records = request
            .chunk_texts
            .into_iter()
            .zip(vectors)
            .map(|(content, embedding)| ChunkRecord::new(content, embedding, &metadata))
            .collect::<Vec<_>>();

        let inserted = match self.store.insert_chunk_records(&records).await {
            Ok(inserted) => inserted,
            Err(error) => {
                if purged {
                    warn!(filename, "insert failed after purge; filename has no chunks");
                }
                return Err(error.into());
            }
        };

        info!(
            filename,
            inserted,
            first_batch = request.is_first_batch,
            "stored chunk batch"
        );
        Ok(inserted)
    }

    fn authorize(&self, secret: Option<&str>) -> Result<(), IngestError> {
        match secret {
            None | Some("") => Err(IngestError::Auth("missing admin secret".to_string())),
            Some(secret) if secrets_match(secret, &self.admin_secret) => Ok(()),
            Some(_) => Err(IngestError::Auth("admin secret does not match".to_string())),
        }
    }
}

/// Comparison time depends only on the lengths, not on where bytes differ.
fn secrets_match(given: &str, expected: &str) -> bool {
    let given = given.as_bytes();
    let expected = expected.as_bytes();
    let mut diff = given.len() ^ expected.len();
    for (position, byte) in expected.iter().enumerate() {
        let other = given.get(position).copied().unwrap_or(0);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}
