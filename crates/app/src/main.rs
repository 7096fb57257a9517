use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use study_corpus_core::{
    discover_pdf_files, extract_file_text, CharacterNgramProvider, ChunkingConfig, CorpusStore,
    DocumentUploader, EmbeddingGenerator, EmbeddingProvider, InMemoryCorpusStore,
    IngestionOptions, IngestionOrchestrator, OpenAiEmbeddingProvider, QdrantCorpusStore,
    RawDocumentMetadata,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "study-corpus", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Shared secret every ingestion call must present
    #[arg(long, env = "CORPUS_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,

    /// Where chunk records are written
    #[arg(long, value_enum, default_value_t = StoreKind::Qdrant)]
    store: StoreKind,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "study_chunks")]
    qdrant_collection: String,

    /// Which provider produces embeddings
    #[arg(long, value_enum, default_value_t = EmbeddingBackend::Openai)]
    embedding_backend: EmbeddingBackend,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    /// API key for the embeddings endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Embedding model identifier
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Vector length produced by the embedding model
    #[arg(long, default_value_t = 1536)]
    embedding_dimensions: usize,

    /// Inputs per embeddings request
    #[arg(long, default_value_t = 96)]
    embedding_batch_size: usize,

    /// Chunks per ingestion call
    #[arg(long, default_value_t = 50)]
    upload_batch_size: usize,

    /// Characters per chunk
    #[arg(long, default_value_t = 500)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 100)]
    chunk_overlap: usize,

    /// Timeout for each embeddings request, in seconds
    #[arg(long, default_value_t = 60)]
    request_timeout_secs: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Qdrant,
    Memory,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbeddingBackend {
    Openai,
    Ngram,
}

#[derive(Args, Clone)]
struct DocumentArgs {
    /// Subject, e.g. "Physics"
    #[arg(long)]
    subject: String,
    /// Level, e.g. "HL"
    #[arg(long)]
    level: String,
    /// Exam year
    #[arg(long)]
    year: Option<i32>,
    /// paper, markscheme or textbook (defaults to paper)
    #[arg(long = "type")]
    doc_type: Option<String>,
}

impl DocumentArgs {
    fn metadata(&self, filename: String) -> RawDocumentMetadata {
        RawDocumentMetadata {
            subject: Some(self.subject.clone()),
            level: Some(self.level.clone()),
            year: self.year,
            doc_type: self.doc_type.clone(),
            filename: Some(filename),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Extract, chunk, embed and store one PDF, replacing earlier uploads of it.
    Ingest {
        /// PDF to ingest
        #[arg(long)]
        file: PathBuf,
        /// Key used for replace-on-reupload; defaults to the file name
        #[arg(long)]
        filename: Option<String>,
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Ingest every PDF beneath a folder; failures are reported and skipped.
    IngestFolder {
        /// Folder that contains PDFs recursively.
        #[arg(long)]
        folder: PathBuf,
        #[command(flatten)]
        document: DocumentArgs,
    },
    /// Print the chunks a PDF would produce without embedding or storing.
    Chunk {
        #[arg(long)]
        file: PathBuf,
        /// Number of chunks to print
        #[arg(long, default_value_t = 3)]
        preview: usize,
    },
}

impl Cli {
    fn options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            embedding_model: self.embedding_model.clone(),
            embedding_batch_size: self.embedding_batch_size,
            upload_batch_size: self.upload_batch_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    fn provider(&self, options: &IngestionOptions) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        let provider: Arc<dyn EmbeddingProvider> = match self.embedding_backend {
            EmbeddingBackend::Openai => {
                let api_key = self
                    .openai_api_key
                    .clone()
                    .context("OPENAI_API_KEY is required for the openai backend")?;
                Arc::new(OpenAiEmbeddingProvider::new(
                    &self.openai_base_url,
                    api_key,
                    options.request_timeout,
                )?)
            }
            EmbeddingBackend::Ngram => Arc::new(CharacterNgramProvider {
                dimensions: self.embedding_dimensions,
            }),
        };
        Ok(provider)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "study-corpus boot"
    );

    if let Command::Chunk { file, preview } = &cli.command {
        return preview_chunks(&cli, file, *preview);
    }

    let options = cli.options();
    options.validate()?;

    match cli.store {
        StoreKind::Qdrant => {
            let store = QdrantCorpusStore::new(
                &cli.qdrant_url,
                &cli.qdrant_collection,
                cli.embedding_dimensions,
                options.request_timeout,
            )?;
            store.ensure_collection().await?;
            run(&cli, &options, Arc::new(store)).await
        }
        StoreKind::Memory => run(&cli, &options, Arc::new(InMemoryCorpusStore::new())).await,
    }
}

fn preview_chunks(cli: &Cli, file: &Path, preview: usize) -> anyhow::Result<()> {
    let text = extract_file_text(file)?;
    let chunking = ChunkingConfig {
        chunk_size: cli.chunk_size,
        overlap: cli.chunk_overlap,
    };
    let chunks = chunking.split(&text)?;

    println!(
        "{}: {} characters, {} chunks",
        file.display(),
        text.chars().count(),
        chunks.len()
    );
    for (position, chunk) in chunks.iter().take(preview).enumerate() {
        println!("[chunk {position}]\n{chunk}");
    }
    Ok(())
}

async fn run<S>(cli: &Cli, options: &IngestionOptions, store: Arc<S>) -> anyhow::Result<()>
where
    S: CorpusStore,
{
    let generator = EmbeddingGenerator::new(
        cli.provider(options)?,
        options.embedding_model.clone(),
        options.embedding_batch_size,
    )?;
    let secret = cli
        .admin_secret
        .as_deref()
        .context("CORPUS_ADMIN_SECRET is required to ingest")?;
    let orchestrator = IngestionOrchestrator::new(secret, generator, store)?;
    let uploader = DocumentUploader::new(
        &orchestrator,
        ChunkingConfig::from(options),
        options.upload_batch_size,
    )?;

    match &cli.command {
        Command::Ingest {
            file,
            filename,
            document,
        } => {
            let filename = match filename {
                Some(filename) => filename.clone(),
                None => file_name(file)?,
            };
            let report = uploader
                .upload_file(secret, document.metadata(filename), file)
                .await?;

            println!(
                "{}: {} chunks in {} batches, {} inserted at {}",
                report.filename,
                report.chunk_count,
                report.batches_submitted,
                report.inserted,
                Utc::now().to_rfc3339()
            );
        }
        Command::IngestFolder { folder, document } => {
            let files = discover_pdf_files(folder);
            if files.is_empty() {
                anyhow::bail!("no pdf files found in {}", folder.display());
            }

            let mut inserted = 0usize;
            let mut skipped = 0usize;
            for path in files {
                let filename = file_name(&path)?;
                match uploader
                    .upload_file(secret, document.metadata(filename), &path)
                    .await
                {
                    Ok(report) => {
                        info!(filename = %report.filename, inserted = report.inserted, "ingested pdf");
                        inserted += report.inserted;
                    }
                    Err(error) => {
                        skipped += 1;
                        warn!(path = %path.display(), kind = ?error.kind(), reason = %error, "skipped pdf");
                    }
                }
            }

            println!(
                "{} chunks inserted from {} ({} files skipped)",
                inserted,
                folder.display(),
                skipped
            );
        }
        Command::Chunk { .. } => {}
    }

    Ok(())
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("path has no file name: {}", path.display()))
}
