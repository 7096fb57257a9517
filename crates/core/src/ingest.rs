use crate::chunking::ChunkingConfig;
use crate::error::IngestError;
use crate::extractor::{LopdfExtractor, TextExtractor};
use crate::models::{IngestOutcome, IngestRequest, RawDocumentMetadata};
use crate::orchestrator::IngestionOrchestrator;
use crate::traits::CorpusStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadReport {
    pub filename: String,
    pub chunk_count: usize,
    pub batches_submitted: usize,
    pub inserted: usize,
}

/// Drives one document from PDF bytes to stored chunks.
///
/// Text is extracted and chunked once, then handed to the orchestrator in
/// sequential batches; only the first batch purges earlier uploads.
pub struct DocumentUploader<'a, S>
where
    S: CorpusStore,
{
    orchestrator: &'a IngestionOrchestrator<S>,
    chunking: ChunkingConfig,
    batch_size: usize,
}

impl<'a, S> DocumentUploader<'a, S>
where
    S: CorpusStore,
{
    pub fn new(
        orchestrator: &'a IngestionOrchestrator<S>,
        chunking: ChunkingConfig,
        batch_size: usize,
    ) -> Result<Self, IngestError> {
        chunking.validate()?;
        if batch_size == 0 {
            return Err(IngestError::Validation(
                "upload batch size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            orchestrator,
            chunking,
            batch_size,
        })
    }

    pub async fn upload_file(
        &self,
        secret: &str,
        metadata: RawDocumentMetadata,
        path: &Path,
    ) -> Result<UploadReport, IngestError> {
        let bytes = tokio::fs::read(path).await?;
        self.upload(secret, metadata, bytes).await
    }

    pub async fn upload(
        &self,
        secret: &str,
        metadata: RawDocumentMetadata,
        pdf: Vec<u8>,
    ) -> Result<UploadReport, IngestError> {
        let text = tokio::task::spawn_blocking(move || LopdfExtractor.extract(&pdf))
            .await
            .map_err(|error| IngestError::Task(error.to_string()))??;

        self.upload_text(secret, metadata, &text).await
    }

    pub async fn upload_text(
        &self,
        secret: &str,
        metadata: RawDocumentMetadata,
        text: &str,
    ) -> Result<UploadReport, IngestError> {
        let chunks = self.chunking.split(text)?;
        let filename = metadata.filename.clone().unwrap_or_default();
        info!(filename = %filename, chunks = chunks.len(), "chunked document");

        let mut report = UploadReport {
            filename,
            chunk_count: chunks.len(),
            batches_submitted: 0,
            inserted: 0,
        };

        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            let request = IngestRequest {
                secret: Some(secret.to_string()),
                metadata: metadata.clone(),
                chunk_texts: batch.to_vec(),
                is_first_batch: batch_no == 0,
            };

            report.batches_submitted += 1;
            let result = self.orchestrator.try_ingest(request).await;
            match result {
                Ok(inserted) => report.inserted += inserted,
                Err(error) => {
                    warn!(
                        filename = %report.filename,
                        batch = batch_no,
                        inserted = report.inserted,
                        %error,
                        "upload stopped at failed batch"
                    );
                    return Err(error);
                }
            }
        }

        Ok(report)
    }

    /// Same as [`Self::upload_file`] but reported in the entry point's wire shape.
    pub async fn upload_file_outcome(
        &self,
        secret: &str,
        metadata: RawDocumentMetadata,
        path: &Path,
    ) -> IngestOutcome {
        let result = self
            .upload_file(secret, metadata, path)
            .await
            .map(|report| report.inserted);
        IngestOutcome::from(result)
    }
}
