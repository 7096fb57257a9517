pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod providers;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{split, ChunkingConfig};
pub use embeddings::{
    reorder_by_index, CharacterNgramProvider, EmbeddingGenerator, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IngestError, IngestErrorKind, StoreError};
pub use extractor::{extract_file_text, extract_text, LopdfExtractor, TextExtractor};
pub use ingest::{discover_pdf_files, DocumentUploader, UploadReport};
pub use models::{
    ChunkRecord, DocumentMetadata, DocumentType, IngestOutcome, IngestRequest, IngestionOptions,
    RawDocumentMetadata,
};
pub use orchestrator::IngestionOrchestrator;
pub use providers::OpenAiEmbeddingProvider;
pub use store::{FilenameLease, FilenameLocks};
pub use stores::{InMemoryCorpusStore, QdrantCorpusStore};
pub use traits::{CorpusStore, EmbeddingProvider, IndexedEmbedding};
