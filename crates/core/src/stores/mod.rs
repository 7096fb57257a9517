pub mod memory;
pub mod qdrant;

pub use memory::InMemoryCorpusStore;
pub use qdrant::QdrantCorpusStore;
