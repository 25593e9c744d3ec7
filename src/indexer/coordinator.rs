// Indexer Coordinator (§4.9): scans paths, detects changes via content hash,
// drives chunk -> embed -> index updates atomically across the three stores.
// Grounded on the teacher's `IncrementalIndexer`/`watcher.rs` scan-and-diff
// shape and its `ignore`-crate-driven walk, generalized from a file-watcher
// push model to the spec's pull/scan model (file watching itself is a
// Non-goal, left to an external collaborator).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use ignore::WalkBuilder;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use crate::chunk::{content_hash, FileRecord};
use crate::chunking::{chunk_file, finalize_chunks, TreeSitterChunker};
use crate::config::Config;
use crate::embedding::client::Role;
use crate::embedding::EmbedderClient;
use crate::error::{LumenError, Result};
use crate::search::bm25::Bm25Index;
use crate::search::vector_index::VectorIndex;
use crate::symbol_store::SymbolStore;

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Overrides `config.indexing.worker_count` for this call.
    pub worker_count: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressEvent {
    pub files_seen: usize,
    pub files_changed: usize,
    pub chunks_embedded: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    pub files_seen: usize,
    pub files_changed: usize,
    pub files_deleted: usize,
    pub chunks_embedded: usize,
    /// `(path, error message)` for files that failed in isolation (§4.9
    /// "per-file failures are isolated").
    pub failed: Vec<(String, String)>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexHealth {
    Healthy,
    Degraded { reason: String },
}

#[derive(Debug, Clone)]
pub struct Status {
    pub chunks: usize,
    pub files: usize,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub index_health: IndexHealth,
}

/// Owns the single logical writer slot shared by all three stores (§5
/// "Shared-resource policy") and wires chunking, embedding, and persistence
/// together.
pub struct IndexerCoordinator {
    symbols: Arc<SymbolStore>,
    bm25: Arc<Bm25Index>,
    vectors: Arc<VectorIndex>,
    embedder: Arc<EmbedderClient>,
    chunker: TreeSitterChunker,
    config: Config,
    writer_lock: AsyncMutex<()>,
    last_indexed_at: RwLock<Option<DateTime<Utc>>>,
}

impl IndexerCoordinator {
    pub fn new(
        symbols: Arc<SymbolStore>,
        bm25: Arc<Bm25Index>,
        vectors: Arc<VectorIndex>,
        embedder: Arc<EmbedderClient>,
        config: Config,
    ) -> Self {
        Self {
            symbols,
            bm25,
            vectors,
            embedder,
            chunker: TreeSitterChunker::new(),
            config,
            writer_lock: AsyncMutex::new(()),
            last_indexed_at: RwLock::new(None),
        }
    }

    /// `Index(paths, options) -> IndexReport` (§6). Runs the algorithm of
    /// §4.9 steps 1-5 with a progress callback invoked after each file.
    pub async fn index(
        &self,
        paths: &[PathBuf],
        options: IndexOptions,
        mut on_progress: impl FnMut(ProgressEvent) + Send,
    ) -> Result<IndexReport> {
        let started = Instant::now();
        let worker_count = options.worker_count.unwrap_or(self.config.indexing.worker_count).max(1);

        let discovered = self.scan(paths)?;
        let on_disk: HashSet<String> = discovered.iter().map(|p| p.to_string_lossy().to_string()).collect();

        let (files_seen, files_changed, chunks_embedded, failed) =
            self.index_with_isolation(discovered, worker_count, &mut on_progress, started).await?;

        let files_deleted = self.reconcile_deletions(&on_disk).await?;

        *self.last_indexed_at.write() = Some(Utc::now());

        Ok(IndexReport {
            files_seen,
            files_changed,
            files_deleted,
            chunks_embedded,
            failed,
            elapsed: started.elapsed(),
        })
    }

    /// Chunks and embeds distinct files concurrently up to `worker_count`
    /// (§4.9 concurrency); each file's own commit step is serialized by
    /// `writer_lock` inside `index_one_file`. A failure on one file does not
    /// abort the batch (§4.9 failure semantics).
    async fn index_with_isolation(
        &self,
        discovered: Vec<PathBuf>,
        worker_count: usize,
        on_progress: &mut (impl FnMut(ProgressEvent) + Send),
        started: Instant,
    ) -> Result<(usize, usize, usize, Vec<(String, String)>)> {
        let mut files_seen = 0usize;
        let mut files_changed = 0usize;
        let mut chunks_embedded = 0usize;
        let mut failed = Vec::new();

        let chunk_iter = discovered.chunks(worker_count.max(1));
        for batch in chunk_iter {
            let outcomes = stream::iter(batch.iter().cloned())
                .map(|path| async move {
                    let outcome = self.index_one_file(&path).await;
                    (path, outcome)
                })
                .buffer_unordered(worker_count.max(1))
                .collect::<Vec<_>>()
                .await;

            for (path, outcome) in outcomes {
                files_seen += 1;
                match outcome {
                    Ok(Some(count)) => {
                        files_changed += 1;
                        chunks_embedded += count;
                    }
                    Ok(None) => {}
                    Err(e) => failed.push((path.to_string_lossy().to_string(), e.to_string())),
                }
                on_progress(ProgressEvent {
                    files_seen,
                    files_changed,
                    chunks_embedded,
                    elapsed: started.elapsed(),
                });
            }
        }

        Ok((files_seen, files_changed, chunks_embedded, failed))
    }

    /// Indexes a single file if its content changed. Returns the number of
    /// chunks embedded, or `None` if the file was unchanged.
    async fn index_one_file(&self, path: &Path) -> Result<Option<usize>> {
        let bytes = std::fs::read(path)?;
        let path_str = path.to_string_lossy().to_string();
        let hash = content_hash(&bytes);

        if let Some(existing) = self.symbols.get_file(&path_str)? {
            if existing.content_hash == hash {
                return Ok(None);
            }
        }

        let language = crate::chunking::detect_language(&path_str).to_string();
        let raw_chunks = chunk_file(&path_str, &bytes, &self.chunker, &self.config.chunking);
        let chunks = finalize_chunks(&path_str, raw_chunks, &self.config.chunking);

        let texts: Vec<String> = chunks.iter().map(|c| c.embedding_text()).collect();
        let vectors = self.embedder.embed(&texts, Role::Document).await?;
        if vectors.len() != chunks.len() {
            return Err(LumenError::internal("embedder returned a different vector count than chunks submitted"));
        }

        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let chunk_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let file_record = FileRecord::new(path_str.clone(), &bytes, language, mtime, chunk_ids.clone());

        // Single logical writer at a time (§5). Commit order: Symbol Store
        // first (source of truth), then BM25, then Vector (§4.9 step 3).
        let _guard = self.writer_lock.lock().await;

        let stale_ids = self.symbols.upsert_file(file_record, chunks.clone())?;

        self.bm25.delete(&stale_ids)?;
        let bm25_docs: Vec<(String, String)> =
            chunks.iter().map(|c| (c.id.clone(), c.bm25_text().to_string())).collect();
        self.bm25.upsert(&bm25_docs)?;

        for id in &stale_ids {
            self.vectors.delete(id)?;
        }
        for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
            self.vectors.insert(&chunk.id, vector)?;
        }

        Ok(Some(chunks.len()))
    }

    fn scan(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for root in paths {
            let mut builder = WalkBuilder::new(root);
            builder.hidden(false).git_ignore(true).git_exclude(true);
            if let Some(ignore_file) = &self.config.indexing.ignore_file {
                builder.add_ignore(ignore_file);
            }
            for entry in builder.build() {
                let entry = entry.map_err(|e| LumenError::internal(format!("walk failed: {e}")))?;
                if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    out.push(entry.path().to_path_buf());
                }
            }
        }
        Ok(out)
    }

    /// For deleted files: `bm25.delete(ids); vector.delete(ids); symbol.delete_file(path)`
    /// (index first, metadata last, §4.9 step 4).
    async fn reconcile_deletions(&self, on_disk: &HashSet<String>) -> Result<usize> {
        let mut deleted = 0;
        for file in self.symbols.list_files()? {
            if on_disk.contains(&file.path) {
                continue;
            }
            let _guard = self.writer_lock.lock().await;
            self.bm25.delete(&file.chunk_ids)?;
            for id in &file.chunk_ids {
                self.vectors.delete(id)?;
            }
            self.symbols.delete_file(&file.path)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Startup reconciliation sweep (§4.9): evicts BM25/Vector entries with
    /// no corresponding Symbol Store chunk.
    pub fn reconcile_orphans(&self) -> Result<usize> {
        let known: HashSet<String> = self.symbols.all_chunk_ids()?.into_iter().collect();

        let mut orphans: Vec<String> = self.bm25.all_ids().into_iter().filter(|id| !known.contains(id)).collect();
        orphans.extend(self.vectors.all_ids().into_iter().filter(|id| !known.contains(id)));
        orphans.sort();
        orphans.dedup();

        if orphans.is_empty() {
            return Ok(0);
        }

        self.bm25.delete(&orphans)?;
        for id in &orphans {
            self.vectors.delete(id)?;
        }
        Ok(orphans.len())
    }

    pub fn status(&self) -> Result<Status> {
        let files = self.symbols.list_files()?;
        let chunks: usize = files.iter().map(|f| f.chunk_ids.len()).sum();
        Ok(Status {
            chunks,
            files: files.len(),
            last_indexed_at: *self.last_indexed_at.read(),
            index_health: IndexHealth::Healthy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn build_coordinator(dir: &TempDir) -> IndexerCoordinator {
        let mut config = Config::default();
        config.embedder.dimension = 3;
        config.embedder.endpoint = "http://127.0.0.1:1/embed".into();

        let symbols_db = sled::Config::new().temporary(true).open().unwrap();
        let symbols = Arc::new(SymbolStore::open(dir.path().join("symbols")).unwrap());
        let bm25 = Arc::new(Bm25Index::open(&symbols_db, &config.bm25).unwrap());
        let vectors = Arc::new(VectorIndex::open(&symbols_db, config.embedder.dimension, config.hnsw.clone()).unwrap());
        let embedder = Arc::new(EmbedderClient::new(&config.embedder).unwrap());
        IndexerCoordinator::new(symbols, bm25, vectors, embedder, config)
    }

    #[test]
    fn status_reports_zero_on_empty_store() {
        let dir = TempDir::new().unwrap();
        let coordinator = build_coordinator(&dir);
        let status = coordinator.status().unwrap();
        assert_eq!(status.files, 0);
        assert_eq!(status.chunks, 0);
    }

    #[test]
    fn reconcile_orphans_is_noop_when_stores_agree() {
        let dir = TempDir::new().unwrap();
        let coordinator = build_coordinator(&dir);
        assert_eq!(coordinator.reconcile_orphans().unwrap(), 0);
    }

    /// Property 3 (§8): no chunk exists whose path matches the ignore rules.
    #[test]
    fn scan_honors_gitignore() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join(".gitignore"), "ignored.rs\n").unwrap();
        std::fs::write(root.path().join("kept.rs"), "fn kept() {}").unwrap();
        std::fs::write(root.path().join("ignored.rs"), "fn ignored() {}").unwrap();

        let store_dir = TempDir::new().unwrap();
        let coordinator = build_coordinator(&store_dir);
        let scanned = coordinator.scan(&[root.path().to_path_buf()]).unwrap();
        let names: Vec<String> = scanned.iter().map(|p| p.file_name().unwrap().to_string_lossy().to_string()).collect();

        assert!(names.contains(&"kept.rs".to_string()));
        assert!(!names.contains(&"ignored.rs".to_string()));
    }
}
