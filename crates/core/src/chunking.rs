use crate::error::IngestError;
use crate::models::IngestionOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
        }
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Distance between the starts of two consecutive windows.
    pub fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }

    pub fn split(&self, text: &str) -> Result<Vec<String>, IngestError> {
        split(text, self.chunk_size, self.overlap)
    }
}

/// Splits `text` into windows of `chunk_size` characters, each starting
/// `chunk_size - overlap` characters after the previous one.
///
/// Positions are counted in `char`s so multi-byte text is never cut inside a
/// code point. The last window may be shorter than `chunk_size`.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, IngestError> {
    let config = ChunkingConfig {
        chunk_size,
        overlap,
    };
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    let step = config.step();
    let mut chunks = Vec::with_capacity(chars.len().div_ceil(step));
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        start += step;
    }

    Ok(chunks)
}
