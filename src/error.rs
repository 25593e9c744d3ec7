// Error handling foundation for the search core.
// Every fallible boundary (storage, embedding service, chunking, search) returns
// a LumenError variant; no panics on data paths.

use std::fmt;
use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Top-level error type returned by the search core's public API.
#[derive(Debug, Error)]
pub enum LumenError {
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("embedding service error: {message}")]
    Embedding {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("search error: {message}")]
    Search {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("dimension mismatch: index expects {expected}, embedder returned {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index corrupt: {index_name} failed integrity check, rebuild required")]
    IndexCorrupt { index_name: String },

    #[error("backend unavailable: {backend} after {attempts} attempts")]
    BackendUnavailable { backend: String, attempts: u32 },

    #[error("partial backend failure: {failed} failed, falling back to {fallback}")]
    PartialBackendFailure { failed: String, fallback: String },

    #[error("search failed: both backends unavailable")]
    SearchFailed,

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("io error: {message}")]
    Io {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    #[error("internal error: {message}")]
    Internal { message: String },
}

pub type Result<T> = std::result::Result<T, LumenError>;

impl LumenError {
    pub fn config<M: Into<String>>(message: M) -> Self {
        LumenError::Config { message: message.into(), source: None }
    }

    pub fn storage<M: Into<String>>(message: M) -> Self {
        LumenError::Storage { message: message.into(), source: None }
    }

    pub fn embedding<M: Into<String>>(message: M) -> Self {
        LumenError::Embedding { message: message.into(), source: None }
    }

    pub fn search<M: Into<String>>(message: M) -> Self {
        LumenError::Search { message: message.into(), source: None }
    }

    pub fn invalid_argument<M: Into<String>>(message: M) -> Self {
        LumenError::InvalidArgument { message: message.into() }
    }

    pub fn internal<M: Into<String>>(message: M) -> Self {
        LumenError::Internal { message: message.into() }
    }

    /// Errors the coordinator/engine should retry or degrade gracefully from,
    /// as opposed to ones that require a rebuild or operator action.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LumenError::Io { .. } | LumenError::BackendUnavailable { .. }
        )
    }
}

impl From<io::Error> for LumenError {
    fn from(err: io::Error) -> Self {
        LumenError::Io { message: err.to_string(), source: err }
    }
}

impl From<sled::Error> for LumenError {
    fn from(err: sled::Error) -> Self {
        LumenError::Storage { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<serde_json::Error> for LumenError {
    fn from(err: serde_json::Error) -> Self {
        LumenError::Serialization { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<bincode::Error> for LumenError {
    fn from(err: bincode::Error) -> Self {
        LumenError::Serialization { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<toml::de::Error> for LumenError {
    fn from(err: toml::de::Error) -> Self {
        LumenError::Config { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

impl From<anyhow::Error> for LumenError {
    fn from(err: anyhow::Error) -> Self {
        LumenError::Internal { message: err.to_string() }
    }
}

/// Extension trait for adding context to a `Result`, in the style the rest of
/// the codebase uses instead of reaching for `unwrap`.
pub trait ErrorContext<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| LumenError::Internal { message: format!("{context}: {e}") })
    }
}

/// Exponential backoff retry used by the embedder client (§4.3) and, with a
/// jittered variant, by the BM25 writer-slot wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 4, initial_delay_ms: 100, max_delay_ms: 5000, factor: 2.0 }
    }
}

pub async fn retry_with_backoff<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay_ms = policy.initial_delay_ms;
    let mut last_err = None;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() || attempt == policy.max_attempts {
                    return Err(e);
                }
                tracing::warn!(attempt, delay_ms, error = %e, "retrying after transient failure");
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                delay_ms = ((delay_ms as f64) * policy.factor) as u64;
                delay_ms = delay_ms.min(policy.max_delay_ms);
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(LumenError::internal("retry loop exited without a result")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn io_error_converts() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: LumenError = io_err.into();
        assert!(matches!(err, LumenError::Io { .. }));
    }

    #[tokio::test]
    async fn retry_gives_up_on_non_retryable_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_with_backoff(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LumenError::invalid_argument("bad query")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_exhausts_max_attempts_on_retryable_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy { max_attempts: 3, initial_delay_ms: 1, max_delay_ms: 2, factor: 2.0 };
        let result: Result<()> = retry_with_backoff(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LumenError::BackendUnavailable { backend: "embedder".into(), attempts: 1 }) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
