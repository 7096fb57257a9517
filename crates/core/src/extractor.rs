use crate::error::IngestError;
use lopdf::Document;
use std::path::Path;
use tracing::debug;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n";

pub trait TextExtractor {
    /// Text of each page that has any, in page order.
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, IngestError>;

    fn extract(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let pages = self.extract_pages(bytes)?;
        Ok(join_pages(&pages))
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::Extraction(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::Extraction(format!("page {page_no}: {error}")))?;

            if !text.trim().is_empty() {
                pages.push(text);
            }
        }

        if pages.is_empty() {
            return Err(IngestError::Extraction(
                "pdf had no readable page text".to_string(),
            ));
        }

        debug!(pages = pages.len(), "extracted pdf text");
        Ok(pages)
    }
}

pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim_end_matches(['\n', '\r']))
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

pub fn extract_text(bytes: &[u8]) -> Result<String, IngestError> {
    LopdfExtractor.extract(bytes)
}

pub fn extract_file_text(path: &Path) -> Result<String, IngestError> {
    let bytes = std::fs::read(path)?;
    extract_text(&bytes).map_err(|error| match error {
        IngestError::Extraction(reason) => {
            IngestError::Extraction(format!("{}: {reason}", path.display()))
        }
        other => other,
    })
}
