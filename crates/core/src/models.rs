use crate::error::{IngestError, IngestErrorKind};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Paper,
    Markscheme,
    Textbook,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Markscheme => "markscheme",
            Self::Textbook => "textbook",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = IngestError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paper" => Ok(Self::Paper),
            "markscheme" => Ok(Self::Markscheme),
            "textbook" => Ok(Self::Textbook),
            other => Err(IngestError::Validation(format!(
                "unknown document type '{other}', expected paper, markscheme or textbook"
            ))),
        }
    }
}

/// Document metadata as it arrives from the upload handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawDocumentMetadata {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

impl RawDocumentMetadata {
    pub fn validate(&self) -> Result<DocumentMetadata, IngestError> {
        let subject = required_field("subject", self.subject.as_deref())?;
        let level = required_field("level", self.level.as_deref())?;
        let filename = required_field("filename", self.filename.as_deref())?;

        let doc_type = match self.doc_type.as_deref().map(str::trim) {
            None | Some("") => DocumentType::default(),
            Some(value) => value.parse()?,
        };

        Ok(DocumentMetadata {
            subject,
            level,
            year: self.year,
            doc_type,
            filename,
        })
    }
}

fn required_field(name: &str, value: Option<&str>) -> Result<String, IngestError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| IngestError::Validation(format!("missing required field '{name}'")))
}

/// Metadata that has passed boundary validation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub subject: String,
    pub level: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub content: String,
    pub embedding: Vec<f32>,
    pub subject: String,
    pub level: String,
    pub year: Option<i32>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub filename: String,
}

impl ChunkRecord {
    pub fn new(content: String, embedding: Vec<f32>, metadata: &DocumentMetadata) -> Self {
        Self {
            content,
            embedding,
            subject: metadata.subject.clone(),
            level: metadata.level.clone(),
            year: metadata.year,
            doc_type: metadata.doc_type,
            filename: metadata.filename.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub metadata: RawDocumentMetadata,
    #[serde(default)]
    pub chunk_texts: Vec<String>,
    #[serde(default)]
    pub is_first_batch: bool,
}

/// Result of one ingestion call.
///
/// Serializes as `{"success": true, "inserted": n}` or
/// `{"error": "...", "kind": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Success { inserted: usize },
    Failure { error: String, kind: IngestErrorKind },
}

impl Serialize for IngestOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Success { inserted } => {
                map.serialize_entry("success", &true)?;
                map.serialize_entry("inserted", inserted)?;
            }
            Self::Failure { error, kind } => {
                map.serialize_entry("error", error)?;
                map.serialize_entry("kind", kind)?;
            }
        }
        map.end()
    }
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn inserted(&self) -> Option<usize> {
        match self {
            Self::Success { inserted } => Some(*inserted),
            Self::Failure { .. } => None,
        }
    }
}

impl From<Result<usize, IngestError>> for IngestOutcome {
    fn from(value: Result<usize, IngestError>) -> Self {
        match value {
            Ok(inserted) => Self::Success { inserted },
            Err(error) => Self::Failure {
                error: error.to_string(),
                kind: error.kind(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    pub upload_batch_size: usize,
    pub request_timeout: Duration,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_batch_size: 96,
            upload_batch_size: 50,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl IngestionOptions {
    pub fn validate(&self) -> Result<(), IngestError> {
        crate::chunking::ChunkingConfig::from(self).validate()?;

        if self.embedding_batch_size == 0 || self.upload_batch_size == 0 {
            return Err(IngestError::Validation(
                "batch sizes must be greater than zero".to_string(),
            ));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(IngestError::Validation(
                "embedding model must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawDocumentMetadata {
        RawDocumentMetadata {
            subject: Some("Physics".to_string()),
            level: Some("HL".to_string()),
            year: Some(2021),
            doc_type: None,
            filename: Some("physics_2021_p1.pdf".to_string()),
        }
    }

    #[test]
    fn missing_type_defaults_to_paper() {
        let metadata = raw().validate().expect("metadata should validate");
        assert_eq!(metadata.doc_type, DocumentType::Paper);
        assert_eq!(metadata.year, Some(2021));
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut metadata = raw();
        metadata.level = Some("   ".to_string());
        let error = metadata.validate().unwrap_err();
        assert!(matches!(error, IngestError::Validation(ref msg) if msg.contains("level")));

        let mut metadata = raw();
        metadata.filename = None;
        assert!(matches!(
            metadata.validate(),
            Err(IngestError::Validation(_))
        ));
    }

    #[test]
    fn unknown_type_is_a_validation_error() {
        let mut metadata = raw();
        metadata.doc_type = Some("slides".to_string());
        assert!(matches!(
            metadata.validate(),
            Err(IngestError::Validation(_))
        ));

        metadata.doc_type = Some(" MarkScheme ".to_string());
        assert_eq!(
            metadata.validate().unwrap().doc_type,
            DocumentType::Markscheme
        );
    }

    #[test]
    fn outcome_serializes_to_wire_shape() {
        let success = IngestOutcome::from(Ok(3));
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({"success": true, "inserted": 3})
        );

        let failure = IngestOutcome::from(Err(IngestError::Auth("bad secret".to_string())));
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"error": "unauthorized: bad secret", "kind": "auth"})
        );
    }

    #[test]
    fn request_uses_camel_case_field_names() {
        let request: IngestRequest = serde_json::from_value(serde_json::json!({
            "secret": "s3cret",
            "metadata": {"subject": "Physics", "level": "HL", "filename": "p1.pdf"},
            "chunkTexts": ["one", "two"],
            "isFirstBatch": true
        }))
        .unwrap();
        assert_eq!(request.chunk_texts, vec!["one", "two"]);
        assert!(request.is_first_batch);
        assert_eq!(request.metadata.filename.as_deref(), Some("p1.pdf"));

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("chunkTexts").is_some());
        assert!(value.get("isFirstBatch").is_some());
        assert!(value.get("chunk_texts").is_none());
    }

    #[test]
    fn missing_request_fields_take_defaults() {
        let request: IngestRequest = serde_json::from_str("{}").unwrap();
        assert!(request.secret.is_none());
        assert!(request.chunk_texts.is_empty());
        assert!(!request.is_first_batch);
    }

    #[test]
    fn chunk_record_uses_type_field_name() {
        let metadata = raw().validate().unwrap();
        let record = ChunkRecord::new("text".to_string(), vec![0.5, 0.5], &metadata);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "paper");
        assert_eq!(value["filename"], "physics_2021_p1.pdf");
    }
}
