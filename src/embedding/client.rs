// HTTP client for the external embedding service (§4.3, §6 "Embedding
// service contract"). Grounded on the teacher's `GGUFEmbedder` batching and
// stats-tracking shape, transformed from an in-process GGUF model call into
// a remote collaborator reached over HTTP with the documented retry policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EmbedderConfig;
use crate::error::{retry_with_backoff, LumenError, Result, RetryPolicy};
use super::l2_normalize;

/// Whether text is being embedded as a search query or as an indexed
/// document; dictates whether the instruction prefix is applied (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Query,
    Document,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::Query => "query",
            Role::Document => "document",
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    role: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    error: String,
}

#[derive(Debug, Default, Clone)]
pub struct EmbedderStats {
    pub requests: u64,
    pub texts_embedded: u64,
    pub retries: u64,
}

pub struct EmbedderClient {
    http: reqwest::Client,
    endpoint: String,
    dimension: usize,
    batch_size: usize,
    query_instruction_prefix: String,
    retry_policy: RetryPolicy,
    stats: parking_lot::Mutex<EmbedderStats>,
}

impl EmbedderClient {
    pub fn new(config: &EmbedderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LumenError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            dimension: config.dimension,
            batch_size: config.batch_size.max(1),
            query_instruction_prefix: config.query_instruction_prefix.clone(),
            retry_policy: RetryPolicy::default(),
            stats: parking_lot::Mutex::new(EmbedderStats::default()),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn stats(&self) -> EmbedderStats {
        self.stats.lock().clone()
    }

    /// Embeds `texts`, cutting large inputs into sub-batches of the
    /// configured batch size (§4.3). Returns unit-length vectors.
    pub async fn embed(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let prepared = self.prepare_batch(batch, role);
            let vectors = self.embed_batch_with_retry(&prepared, role).await?;
            results.extend(vectors);
        }
        Ok(results)
    }

    fn prepare_batch(&self, batch: &[String], role: Role) -> Vec<String> {
        if role == Role::Query && !self.query_instruction_prefix.is_empty() {
            batch.iter().map(|t| format!("{}{}", self.query_instruction_prefix, t)).collect()
        } else {
            batch.to_vec()
        }
    }

    async fn embed_batch_with_retry(&self, batch: &[String], role: Role) -> Result<Vec<Vec<f32>>> {
        let result = retry_with_backoff(&self.retry_policy, || self.call_once(batch, role)).await;
        let mut stats = self.stats.lock();
        stats.requests += 1;
        stats.texts_embedded += batch.len() as u64;
        drop(stats);
        result
    }

    async fn call_once(&self, batch: &[String], role: Role) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest { texts: batch, role: role.as_str() };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| LumenError::BackendUnavailable {
                backend: format!("embedding service ({e})"),
                attempts: 1,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ServiceErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(LumenError::BackendUnavailable {
                backend: format!("embedding service returned {status}: {message}"),
                attempts: 1,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| LumenError::embedding(format!("malformed embedding response: {e}")))?;

        if parsed.dimension != self.dimension {
            return Err(LumenError::DimensionMismatch { expected: self.dimension, actual: parsed.dimension });
        }

        let mut vectors = parsed.vectors;
        for vector in vectors.iter_mut() {
            if vector.len() != self.dimension {
                return Err(LumenError::DimensionMismatch { expected: self.dimension, actual: vector.len() });
            }
            l2_normalize(vector);
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_role_applies_instruction_prefix() {
        let config = EmbedderConfig { query_instruction_prefix: "search_query: ".into(), ..EmbedderConfig::default() };
        let client = EmbedderClient::new(&config).unwrap();
        let prepared = client.prepare_batch(&["find foo".to_string()], Role::Query);
        assert_eq!(prepared[0], "search_query: find foo");
    }

    #[test]
    fn document_role_does_not_apply_prefix() {
        let config = EmbedderConfig { query_instruction_prefix: "search_query: ".into(), ..EmbedderConfig::default() };
        let client = EmbedderClient::new(&config).unwrap();
        let prepared = client.prepare_batch(&["fn foo() {}".to_string()], Role::Document);
        assert_eq!(prepared[0], "fn foo() {}");
    }

    #[test]
    fn empty_prefix_means_no_prepend() {
        let config = EmbedderConfig::default();
        assert_eq!(config.query_instruction_prefix, "");
        let client = EmbedderClient::new(&config).unwrap();
        let prepared = client.prepare_batch(&["find foo".to_string()], Role::Query);
        assert_eq!(prepared[0], "find foo");
    }
}
