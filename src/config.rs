// Project configuration: index layout, embedder profile, chunking budget,
// HNSW/BM25 parameters, classifier weight overrides, and ranking-adjustment
// pattern sets (§6 External Interfaces, §9 Design Notes).

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{LumenError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overridden by the `INDEX_DIR` environment variable.
    pub index_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { index_dir: PathBuf::from(".index") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderConfig {
    /// `EMBED_ENDPOINT`: URL of the external embedding service.
    pub endpoint: String,
    /// `EMBED_DIM`: expected vector dimension; mismatch is fatal (§4.3).
    pub dimension: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    /// Prepended to query text only; empty string means "do not prepend" (§9).
    pub query_instruction_prefix: String,
    pub cache_size: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/embed".to_string(),
            dimension: 768,
            batch_size: 32,
            timeout_secs: 30,
            query_instruction_prefix: String::new(),
            cache_size: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Byte budget before an oversized chunk is split (§4.2, default ~2048).
    pub max_chunk_bytes: usize,
    /// Fallback byte-window overlap fraction for unsupported languages.
    pub fallback_overlap_fraction: f32,
    /// Enables the context-prefix descriptor per chunk kind (§9 default: off
    /// for code, on for docs).
    pub context_prefix_for_code: bool,
    pub context_prefix_for_docs: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 2048,
            fallback_overlap_fraction: 0.10,
            context_prefix_for_code: false,
            context_prefix_for_docs: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bm25Config {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Config {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswConfig {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    /// Compaction triggers once the tombstone ratio exceeds this (§4.5).
    pub tombstone_compaction_ratio: f32,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self { m: 16, ef_construction: 200, ef_search: 64, tombstone_compaction_ratio: 0.20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Path glob patterns recognized as test files; triggers the test-file
    /// penalty in §4.8 when `test_penalty_enabled`.
    pub test_path_patterns: Vec<String>,
    pub implementation_path_patterns: Vec<String>,
    pub wrapper_path_patterns: Vec<String>,
    pub test_penalty_enabled: bool,
    pub implementation_boost_enabled: bool,
    pub wrapper_penalty_enabled: bool,
    pub test_penalty_factor: f32,
    pub implementation_boost_factor: f32,
    pub wrapper_penalty_factor: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            test_path_patterns: vec!["tests/".into(), "test_".into(), "_test.".into()],
            implementation_path_patterns: vec!["src/".into()],
            wrapper_path_patterns: vec!["bin/".into()],
            test_penalty_enabled: false,
            implementation_boost_enabled: false,
            wrapper_penalty_enabled: false,
            test_penalty_factor: 0.7,
            implementation_boost_factor: 1.15,
            wrapper_penalty_factor: 0.9,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub worker_count: usize,
    pub ignore_file: Option<PathBuf>,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { worker_count: num_cpus_heuristic(), ignore_file: None }
    }
}

fn num_cpus_heuristic() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json_format: false }
    }
}

/// Root configuration, captured into `.index/config.json` at build time so a
/// startup header mismatch (dimension or analyzer version) can trigger a
/// rebuild (§6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub embedder: EmbedderConfig,
    pub chunking: ChunkingConfig,
    pub bm25: Bm25Config,
    pub hnsw: HnswConfig,
    pub ranking: RankingConfig,
    pub indexing: IndexingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
                .map_err(|e| LumenError::config(format!("invalid yaml config: {e}")))?,
            _ => toml::from_str(&raw)?,
        };
        config.apply_env_overrides()
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Self::default().apply_env_overrides()
        }
    }

    /// `INDEX_DIR`, `EMBED_ENDPOINT`, `EMBED_DIM` environment overrides (§6).
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(dir) = std::env::var("INDEX_DIR") {
            self.storage.index_dir = PathBuf::from(dir);
        }
        if let Ok(endpoint) = std::env::var("EMBED_ENDPOINT") {
            self.embedder.endpoint = endpoint;
        }
        if let Ok(dim) = std::env::var("EMBED_DIM") {
            self.embedder.dimension = dim
                .parse()
                .map_err(|_| LumenError::config(format!("EMBED_DIM must be an integer, got {dim:?}")))?;
        }
        Ok(self)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| LumenError::config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedder.dimension == 0 {
            return Err(LumenError::config("embedder.dimension must be non-zero"));
        }
        if self.chunking.max_chunk_bytes == 0 {
            return Err(LumenError::config("chunking.max_chunk_bytes must be non-zero"));
        }
        if self.hnsw.m == 0 || self.hnsw.ef_construction == 0 || self.hnsw.ef_search == 0 {
            return Err(LumenError::config("hnsw parameters must be non-zero"));
        }
        Ok(())
    }
}

static GLOBAL_CONFIG: Lazy<RwLock<Option<Arc<Config>>>> = Lazy::new(|| RwLock::new(None));

/// Process-wide configuration handle, set once at startup by the coordinator.
pub struct ConfigManager;

impl ConfigManager {
    pub fn init(config: Config) {
        *GLOBAL_CONFIG.write().unwrap() = Some(Arc::new(config));
    }

    pub fn get() -> Option<Arc<Config>> {
        GLOBAL_CONFIG.read().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_dimension_fails_validation() {
        let mut config = Config::default();
        config.embedder.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn from_file_parses_toml() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(file, "[embedder]\nendpoint = \"http://example.test/embed\"\ndimension = 512\nbatch_size = 16\ntimeout_secs = 10\nquery_instruction_prefix = \"\"\ncache_size = 100\n").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.embedder.dimension, 512);
        assert_eq!(config.embedder.endpoint, "http://example.test/embed");
    }
}
