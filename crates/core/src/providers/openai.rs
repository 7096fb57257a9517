//! OpenAI-compatible embeddings endpoint.

use crate::error::EmbeddingError;
use crate::traits::{EmbeddingProvider, IndexedEmbedding};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Inputs accepted per request by the hosted embeddings API.
pub const OPENAI_MAX_BATCH: usize = 2048;

pub struct OpenAiEmbeddingProvider {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl OpenAiEmbeddingProvider {
    /// Builds the HTTP client once; reuse the provider for every call.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::Config("missing embeddings API key".to_string()));
        }

        let endpoint = embeddings_endpoint(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(EmbeddingError::Http)?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

fn embeddings_endpoint(base_url: &str) -> Result<Url, EmbeddingError> {
    let base = format!("{}/", base_url.trim().trim_end_matches('/'));
    Url::parse(&base)
        .and_then(|base| base.join("embeddings"))
        .map_err(|error| EmbeddingError::Config(format!("invalid base url '{base_url}': {error}")))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<IndexedEmbedding>,
}

fn classify_status(status: StatusCode, body: String) -> EmbeddingError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => EmbeddingError::Auth(body),
        StatusCode::TOO_MANY_REQUESTS => EmbeddingError::Quota(body),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => EmbeddingError::Timeout(body),
        _ => EmbeddingError::BackendResponse {
            backend: "openai".to_string(),
            details: format!("{status}: {body}"),
        },
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn max_batch_size(&self) -> usize {
        OPENAI_MAX_BATCH
    }

    async fn embed(
        &self,
        texts: &[String],
        model: &str,
    ) -> Result<Vec<IndexedEmbedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > OPENAI_MAX_BATCH {
            return Err(EmbeddingError::Config(format!(
                "batch of {} exceeds provider max {OPENAI_MAX_BATCH}",
                texts.len()
            )));
        }

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(classify_status(status, body));
        }

        let parsed: EmbeddingResponse = response.json().await?;
        Ok(parsed.data)
    }
}
