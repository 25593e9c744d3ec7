// Fusion and ranking policy (§4.8 steps 4-7): Reciprocal Rank Fusion with
// asymmetric per-class weights, configurable path-aware adjustments, and
// deterministic tie-breaking. Grounded on the teacher's `fusion.rs`
// (`FusionEngine::rrf_fusion`'s accumulation shape), generalized to the
// spec's `k_rrf = 60` and its specific tie-break chain.

use std::collections::HashMap;

use crate::config::RankingConfig;
use super::BackendHit;

pub const K_RRF: f32 = 60.0;

#[derive(Debug, Clone)]
pub struct FusedEntry {
    pub id: String,
    pub rrf_score: f32,
    pub bm25_rank: Option<usize>,
    pub bm25_score: Option<f32>,
    pub vector_rank: Option<usize>,
    pub vector_similarity: Option<f32>,
    pub in_both_lists: bool,
}

/// Fuses two ranked backend result lists with RRF (§4.8 step 4). A document
/// present in only one list is scored as if it were ranked
/// `max(|L_bm25|, |L_vector|) + 1` on the missing side.
pub fn rrf_fuse(bm25_hits: &[BackendHit], vector_hits: &[BackendHit], w_bm25: f32, w_vector: f32) -> Vec<FusedEntry> {
    let missing_rank = bm25_hits.len().max(vector_hits.len()) + 1;

    let mut entries: HashMap<String, FusedEntry> = HashMap::new();

    for hit in bm25_hits {
        entries.entry(hit.id.clone()).or_insert_with(|| FusedEntry {
            id: hit.id.clone(),
            rrf_score: 0.0,
            bm25_rank: None,
            bm25_score: None,
            vector_rank: None,
            vector_similarity: None,
            in_both_lists: false,
        });
        let entry = entries.get_mut(&hit.id).unwrap();
        entry.bm25_rank = Some(hit.rank);
        entry.bm25_score = Some(hit.score);
    }

    for hit in vector_hits {
        entries.entry(hit.id.clone()).or_insert_with(|| FusedEntry {
            id: hit.id.clone(),
            rrf_score: 0.0,
            bm25_rank: None,
            bm25_score: None,
            vector_rank: None,
            vector_similarity: None,
            in_both_lists: false,
        });
        let entry = entries.get_mut(&hit.id).unwrap();
        entry.vector_rank = Some(hit.rank);
        entry.vector_similarity = Some(hit.score);
    }

    for entry in entries.values_mut() {
        let bm25_rank = entry.bm25_rank.unwrap_or(missing_rank);
        let vector_rank = entry.vector_rank.unwrap_or(missing_rank);
        entry.rrf_score = w_bm25 / (K_RRF + bm25_rank as f32) + w_vector / (K_RRF + vector_rank as f32);
        entry.in_both_lists = entry.bm25_rank.is_some() && entry.vector_rank.is_some();
    }

    entries.into_values().collect()
}

/// Multiplicative ranking adjustments applied to `rrf_score` (§4.8 step 5):
/// disabled by default, applied only when configured, driven entirely by
/// the project's pattern sets — nothing is hard-coded.
pub fn apply_ranking_adjustments(entries: &mut [FusedEntry], path_of: impl Fn(&str) -> Option<String>, config: &RankingConfig) {
    for entry in entries.iter_mut() {
        let Some(path) = path_of(&entry.id) else { continue };

        if config.test_penalty_enabled && matches_any(&path, &config.test_path_patterns) {
            entry.rrf_score *= config.test_penalty_factor;
        }
        if config.implementation_boost_enabled && matches_any(&path, &config.implementation_path_patterns) {
            entry.rrf_score *= config.implementation_boost_factor;
        }
        if config.wrapper_penalty_enabled && matches_any(&path, &config.wrapper_path_patterns) {
            entry.rrf_score *= config.wrapper_penalty_factor;
        }
    }
}

fn matches_any(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| path.contains(p.as_str()))
}

/// Normalizes scores so the top result has score 1.0 (§4.8 step 6, cosmetic
/// only — does not affect ordering) and sorts with the documented tie-break
/// chain (§4.8 step 7): (a) higher adjusted score, (b) `in_both_lists` first,
/// (c) higher raw BM25 score, (d) lexicographically smaller id.
pub fn normalize_and_sort(mut entries: Vec<FusedEntry>) -> Vec<FusedEntry> {
    entries.sort_by(|a, b| {
        b.rrf_score
            .partial_cmp(&a.rrf_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.in_both_lists.cmp(&a.in_both_lists))
            .then_with(|| {
                b.bm25_score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.bm25_score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });

    if let Some(top_score) = entries.first().map(|e| e.rrf_score) {
        if top_score > 0.0 {
            for entry in entries.iter_mut() {
                entry.rrf_score /= top_score;
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, rank: usize, score: f32) -> BackendHit {
        BackendHit { id: id.to_string(), rank, score }
    }

    #[test]
    fn document_present_in_both_lists_scores_higher_than_single_list() {
        let bm25 = vec![hit("a", 1, 5.0)];
        let vector = vec![hit("a", 1, 0.9), hit("b", 2, 0.8)];
        let fused = rrf_fuse(&bm25, &vector, 0.5, 0.5);
        let a = fused.iter().find(|e| e.id == "a").unwrap();
        let b = fused.iter().find(|e| e.id == "b").unwrap();
        assert!(a.rrf_score > b.rrf_score);
        assert!(a.in_both_lists);
        assert!(!b.in_both_lists);
    }

    #[test]
    fn score_monotonically_decreases_with_rank() {
        let bm25 = vec![hit("a", 1, 5.0), hit("b", 100, 1.0)];
        let vector = vec![];
        let fused = rrf_fuse(&bm25, &vector, 0.5, 0.5);
        let a = fused.iter().find(|e| e.id == "a").unwrap();
        let b = fused.iter().find(|e| e.id == "b").unwrap();
        assert!(a.rrf_score > b.rrf_score);
    }

    #[test]
    fn ties_break_lexicographically_by_id() {
        let entries = vec![
            FusedEntry { id: "z".into(), rrf_score: 1.0, bm25_rank: None, bm25_score: None, vector_rank: None, vector_similarity: None, in_both_lists: false },
            FusedEntry { id: "a".into(), rrf_score: 1.0, bm25_rank: None, bm25_score: None, vector_rank: None, vector_similarity: None, in_both_lists: false },
        ];
        let sorted = normalize_and_sort(entries);
        assert_eq!(sorted[0].id, "a");
    }

    #[test]
    fn top_result_normalized_to_one() {
        let bm25 = vec![hit("a", 1, 5.0)];
        let fused = rrf_fuse(&bm25, &[], 0.5, 0.5);
        let sorted = normalize_and_sort(fused);
        assert!((sorted[0].rrf_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_penalty_reduces_score_only_when_enabled() {
        let bm25 = vec![hit("a", 1, 5.0)];
        let mut fused = rrf_fuse(&bm25, &[], 0.5, 0.5);
        let before = fused[0].rrf_score;

        let mut config = RankingConfig::default();
        config.test_penalty_enabled = true;
        config.test_path_patterns = vec!["tests/".into()];
        apply_ranking_adjustments(&mut fused, |_| Some("tests/foo.rs".to_string()), &config);
        assert!(fused[0].rrf_score < before);
    }
}
