// Search Engine (§4.8): orchestrates parallel BM25 + vector retrieval,
// fuses and ranks, and returns provenance-carrying hits. Grounded on the
// teacher's `UnifiedSearcher` (async, `Arc`-wrapped component construction,
// cache-first `search()` entry point), generalized from the teacher's ad hoc
// feature-gated backend selection to the spec's fixed two-backend fusion
// pipeline.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::{client::Role, EmbedderClient};
use crate::embedding::cache::QueryEmbeddingCache;
use crate::error::{LumenError, Result};
use crate::symbol_store::SymbolStore;
use super::bm25::Bm25Index;
use super::cache::SearchCache;
use super::classifier::{classify, expand};
use super::fusion::{apply_ranking_adjustments, normalize_and_sort, rrf_fuse};
use super::vector_index::VectorIndex;
use super::{BackendHit, Hit, SearchOptions, SearchResults};

pub struct SearchEngine {
    bm25: Arc<Bm25Index>,
    vectors: Arc<VectorIndex>,
    symbols: Arc<SymbolStore>,
    embedder: Arc<EmbedderClient>,
    query_cache: QueryEmbeddingCache,
    result_cache: SearchCache,
    config: Config,
}

impl SearchEngine {
    pub fn new(
        bm25: Arc<Bm25Index>,
        vectors: Arc<VectorIndex>,
        symbols: Arc<SymbolStore>,
        embedder: Arc<EmbedderClient>,
        config: Config,
    ) -> Self {
        let query_cache = QueryEmbeddingCache::new(config.embedder.cache_size);
        let result_cache = SearchCache::new(1000, Duration::from_secs(60));
        Self { bm25, vectors, symbols, embedder, query_cache, result_cache, config }
    }

    /// `Search(query, options)` (§6). Runs the algorithm of §4.8 steps 1-8.
    pub async fn search(&self, query: &str, options: SearchOptions) -> Result<SearchResults> {
        if query.trim().is_empty() {
            return Err(LumenError::invalid_argument("query must not be empty"));
        }
        let limit = options.limit.unwrap_or(10);
        if limit == 0 {
            return Err(LumenError::invalid_argument("limit must be positive"));
        }

        let cache_key = format!("{query}\u{0}{limit}\u{0}{:?}\u{0}{:?}\u{0}{}", options.scope_paths, options.languages, options.include_tests);
        if let Some(cached) = self.result_cache.get(&cache_key) {
            return Ok(cached);
        }

        let class = classify(query);
        let (w_bm25, w_vector) = class.weights();
        let k_pool = (limit * 2).max(50);

        let expanded_query = expand(query);

        let bm25 = self.bm25.clone();
        let bm25_task = tokio::task::spawn_blocking(move || bm25.search(&expanded_query, k_pool));

        let vector_result = self.run_vector_search(query, k_pool).await;

        let mut warnings = Vec::new();

        let bm25_result = match bm25_task.await {
            Ok(hits) => Some(hits),
            Err(e) => {
                warnings.push(format!("bm25 backend failed: {e}"));
                None
            }
        };

        let vector_result = match vector_result {
            Ok(hits) => Some(hits),
            Err(e) => {
                warnings.push(format!("vector backend failed: {e}"));
                None
            }
        };

        if bm25_result.is_none() && vector_result.is_none() {
            return Err(LumenError::SearchFailed);
        }

        let bm25_hits = to_ranked_hits(bm25_result.unwrap_or_default());
        let vector_hits = to_ranked_hits(vector_result.unwrap_or_default());

        let mut fused = rrf_fuse(&bm25_hits, &vector_hits, w_bm25, w_vector);

        let symbols = &self.symbols;
        apply_ranking_adjustments(&mut fused, |id| symbols.get_chunk(id).map(|c| c.path), &self.config.ranking);

        let sorted = normalize_and_sort(fused);

        let mut hits = Vec::with_capacity(limit);
        for entry in sorted {
            let Some(chunk) = self.symbols.get_chunk(&entry.id) else { continue };

            if !options.scope_paths.is_empty() && !options.scope_paths.iter().any(|p| chunk.path.starts_with(p.as_str())) {
                continue;
            }
            if !options.languages.is_empty() && !options.languages.contains(&chunk.language) {
                continue;
            }
            if !options.include_tests && self.config.ranking.test_path_patterns.iter().any(|p| chunk.path.contains(p.as_str())) {
                continue;
            }

            hits.push(Hit {
                id: entry.id,
                path: chunk.path,
                byte_start: chunk.byte_range.start,
                byte_end: chunk.byte_range.end,
                symbol_kind: chunk.symbol_kind.as_str().to_string(),
                symbol_name: chunk.symbol_name,
                snippet: snippet_of(&chunk.content),
                final_score: entry.rrf_score,
                bm25_rank: entry.bm25_rank,
                bm25_score: entry.bm25_score,
                vector_rank: entry.vector_rank,
                vector_similarity: entry.vector_similarity,
                in_both_lists: entry.in_both_lists,
            });

            if hits.len() >= limit {
                break;
            }
        }

        let results = SearchResults { hits, warnings };
        self.result_cache.put(cache_key, results.clone());
        Ok(results)
    }

    /// Embeds the raw (unexpanded) query and searches the vector index.
    /// The vector backend must never see the BM25 expansion (§4.7 invariant).
    async fn run_vector_search(&self, query: &str, k_pool: usize) -> Result<Vec<(String, f32)>> {
        let query_vector = match self.query_cache.get(query) {
            Some(v) => v,
            None => {
                let vectors = self.embedder.embed(&[query.to_string()], Role::Query).await?;
                let vector = vectors.into_iter().next().ok_or_else(|| LumenError::embedding("empty embedding response"))?;
                self.query_cache.put(query, vector.clone());
                vector
            }
        };
        self.vectors.search(&query_vector, k_pool)
    }
}

fn to_ranked_hits(hits: Vec<(String, f32)>) -> Vec<BackendHit> {
    hits.into_iter()
        .enumerate()
        .map(|(i, (id, score))| BackendHit { id, rank: i + 1, score })
        .collect()
}

fn snippet_of(content: &str) -> String {
    const MAX_SNIPPET_LINES: usize = 20;
    content.lines().take(MAX_SNIPPET_LINES).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_truncates_to_max_lines() {
        let content = (0..30).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let snippet = snippet_of(&content);
        assert_eq!(snippet.lines().count(), 20);
    }

    #[test]
    fn to_ranked_hits_assigns_one_indexed_ranks() {
        let hits = to_ranked_hits(vec![("a".into(), 1.0), ("b".into(), 0.5)]);
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
    }
}
