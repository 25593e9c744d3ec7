//! Structural chunking and hybrid BM25/HNSW retrieval core for a
//! local-first code search engine.

pub mod analyzer;
pub mod chunk;
pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod observability;
pub mod search;
pub mod symbol_store;

pub use chunk::{content_hash, ByteRange, Chunk, FileRecord, SymbolKind};
pub use chunking::{chunk_file, finalize_chunks, TreeSitterChunker};
pub use config::Config;
pub use embedding::client::{EmbedderClient, Role};
pub use error::{LumenError, Result};
pub use indexer::{IndexHealth, IndexOptions, IndexReport, IndexerCoordinator, ProgressEvent, Status};
pub use search::bm25::Bm25Index;
pub use search::classifier::{classify, expand, QueryClass};
pub use search::engine::SearchEngine;
pub use search::vector_index::VectorIndex;
pub use search::{Hit, SearchOptions, SearchResults};
pub use symbol_store::SymbolStore;
