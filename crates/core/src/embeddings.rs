use crate::error::EmbeddingError;
use crate::traits::{EmbeddingProvider, IndexedEmbedding};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Turns ordered chunk texts into vectors in the same order.
///
/// The provider handle is created once by the caller and shared; requests are
/// cut to the provider's batch limit and every response is placed back into
/// input order by its `index`.
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    model: String,
    batch_size: usize,
}

impl EmbeddingGenerator {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        model: impl Into<String>,
        batch_size: usize,
    ) -> Result<Self, EmbeddingError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(EmbeddingError::Config("model must not be empty".to_string()));
        }

        let batch_size = batch_size.min(provider.max_batch_size());
        if batch_size == 0 {
            return Err(EmbeddingError::Config(
                "batch size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            provider,
            model,
            batch_size,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        let mut dimensions = None;

        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            let response = self.provider.embed(batch, &self.model).await?;
            let ordered = reorder_by_index(response, batch.len())?;

            for vector in &ordered {
                let expected = *dimensions.get_or_insert(vector.len());
                if vector.len() != expected || expected == 0 {
                    return Err(EmbeddingError::InvalidResponse(format!(
                        "vector dimension {} differs from {expected}",
                        vector.len()
                    )));
                }
            }

            debug!(
                provider = self.provider.name(),
                batch = batch_no,
                size = batch.len(),
                "embedded batch"
            );
            vectors.extend(ordered);
        }

        Ok(vectors)
    }
}

/// Places each vector into the slot named by its index.
pub fn reorder_by_index(
    response: Vec<IndexedEmbedding>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if response.len() != expected {
        return Err(EmbeddingError::InvalidResponse(format!(
            "provider returned {} embeddings for {expected} inputs",
            response.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in response {
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            EmbeddingError::InvalidResponse(format!(
                "index {} is out of range for {expected} inputs",
                item.index
            ))
        })?;
        if slot.replace(item.embedding).is_some() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "index {} returned more than once",
                item.index
            )));
        }
    }

    // every slot is filled: count matched and no index repeated
    Ok(slots.into_iter().flatten().collect())
}

/// Local hashed character-trigram embeddings; deterministic and offline.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramProvider {
    pub dimensions: usize,
}

impl Default for CharacterNgramProvider {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramProvider {
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingProvider for CharacterNgramProvider {
    fn name(&self) -> &'static str {
        "ngram"
    }

    fn max_batch_size(&self) -> usize {
        usize::MAX
    }

    async fn embed(
        &self,
        texts: &[String],
        _model: &str,
    ) -> Result<Vec<IndexedEmbedding>, EmbeddingError> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(index, text)| IndexedEmbedding {
                index,
                embedding: self.embed_one(text),
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Encodes the input position into the vector and answers in reverse order.
    pub(crate) struct ReversingProvider {
        pub max_batch: usize,
        pub requests: Mutex<Vec<usize>>,
    }

    impl ReversingProvider {
        pub(crate) fn new(max_batch: usize) -> Self {
            Self {
                max_batch,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    pub(crate) fn vector_for(text: &str) -> Vec<f32> {
        vec![text.len() as f32, text.bytes().map(f32::from).sum()]
    }

    #[async_trait]
    impl EmbeddingProvider for ReversingProvider {
        fn name(&self) -> &'static str {
            "reversing"
        }

        fn max_batch_size(&self) -> usize {
            self.max_batch
        }

        async fn embed(
            &self,
            texts: &[String],
            _model: &str,
        ) -> Result<Vec<IndexedEmbedding>, EmbeddingError> {
            self.requests.lock().unwrap().push(texts.len());
            Ok(texts
                .iter()
                .enumerate()
                .rev()
                .map(|(index, text)| IndexedEmbedding {
                    index,
                    embedding: vector_for(text),
                })
                .collect())
        }
    }

    struct FixedResponseProvider(Vec<IndexedEmbedding>);

    #[async_trait]
    impl EmbeddingProvider for FixedResponseProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn max_batch_size(&self) -> usize {
            16
        }

        async fn embed(
            &self,
            _texts: &[String],
            _model: &str,
        ) -> Result<Vec<IndexedEmbedding>, EmbeddingError> {
            Ok(self.0.clone())
        }
    }

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[tokio::test]
    async fn reversed_responses_are_restored_to_input_order() {
        let provider = Arc::new(ReversingProvider::new(8));
        let generator = EmbeddingGenerator::new(provider, "test-model", 8).unwrap();
        let inputs = texts(&["c0", "chunk one", "the third chunk"]);

        let vectors = generator.embed(&inputs).await.unwrap();

        let expected: Vec<_> = inputs.iter().map(|text| vector_for(text)).collect();
        assert_eq!(vectors, expected);
    }

    #[tokio::test]
    async fn large_inputs_are_split_at_the_provider_limit() {
        let provider = Arc::new(ReversingProvider::new(3));
        let generator = EmbeddingGenerator::new(provider.clone(), "test-model", 100).unwrap();
        assert_eq!(generator.batch_size(), 3);

        let inputs: Vec<String> = (0..8).map(|n| "x".repeat(n + 1)).collect();
        let vectors = generator.embed(&inputs).await.unwrap();

        assert_eq!(vectors.len(), 8);
        for (position, vector) in vectors.iter().enumerate() {
            assert_eq!(vector[0], (position + 1) as f32);
        }
        assert_eq!(*provider.requests.lock().unwrap(), vec![3, 3, 2]);
    }

    #[tokio::test]
    async fn empty_input_makes_no_requests() {
        let provider = Arc::new(ReversingProvider::new(3));
        let generator = EmbeddingGenerator::new(provider.clone(), "test-model", 3).unwrap();
        assert!(generator.embed(&[]).await.unwrap().is_empty());
        assert!(provider.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_or_duplicated_responses_are_rejected() {
        let short = FixedResponseProvider(vec![IndexedEmbedding {
            index: 0,
            embedding: vec![1.0],
        }]);
        let generator = EmbeddingGenerator::new(Arc::new(short), "m", 16).unwrap();
        let result = generator.embed(&texts(&["a", "b"])).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));

        let duplicated = FixedResponseProvider(vec![
            IndexedEmbedding {
                index: 1,
                embedding: vec![1.0],
            },
            IndexedEmbedding {
                index: 1,
                embedding: vec![2.0],
            },
        ]);
        let generator = EmbeddingGenerator::new(Arc::new(duplicated), "m", 16).unwrap();
        let result = generator.embed(&texts(&["a", "b"])).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let response = vec![IndexedEmbedding {
            index: 4,
            embedding: vec![1.0],
        }];
        assert!(matches!(
            reorder_by_index(response, 1),
            Err(EmbeddingError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn mixed_dimensions_are_rejected() {
        let provider = FixedResponseProvider(vec![
            IndexedEmbedding {
                index: 0,
                embedding: vec![1.0, 0.0],
            },
            IndexedEmbedding {
                index: 1,
                embedding: vec![1.0],
            },
        ]);
        let generator = EmbeddingGenerator::new(Arc::new(provider), "m", 16).unwrap();
        let result = generator.embed(&texts(&["a", "b"])).await;
        assert!(matches!(result, Err(EmbeddingError::InvalidResponse(_))));
    }

    #[test]
    fn zero_batch_size_is_a_config_error() {
        let provider = Arc::new(CharacterNgramProvider::default());
        assert!(matches!(
            EmbeddingGenerator::new(provider, "m", 0),
            Err(EmbeddingError::Config(_))
        ));
    }

    #[test]
    fn ngram_embedder_is_deterministic() {
        let provider = CharacterNgramProvider::default();
        let first = provider.embed_one("Simple harmonic motion");
        let second = provider.embed_one("Simple harmonic motion");
        assert_eq!(first, second);
    }

    #[test]
    fn ngram_embedder_outputs_expected_length() {
        let provider = CharacterNgramProvider { dimensions: 32 };
        assert_eq!(provider.embed_one("abc").len(), 32);
    }
}
