// BM25 Index (§4.4): durable full-text inverted index over chunk content.
// Grounded on the teacher's `BM25Engine` (inverted-index shape, IDF/score
// formulas) and `simple_vectordb.rs` (sled-backed persistence pattern),
// generalized from an in-memory-only index to one backed by sled so it
// survives restarts (§3 "BM25 ... persist to disk and must be reopenable").

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::analyzer::tokenize;
use crate::config::Bm25Config;
use crate::error::{LumenError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredDocument {
    id: String,
    text: String,
}

#[derive(Debug, Clone)]
struct Posting {
    id: String,
    term_freq: usize,
}

#[derive(Default)]
struct Inner {
    documents: HashMap<String, String>,
    doc_lengths: HashMap<String, usize>,
    postings: HashMap<String, Vec<Posting>>,
    total_length: u64,
}

impl Inner {
    fn avg_doc_len(&self) -> f32 {
        if self.documents.is_empty() { 0.0 } else { self.total_length as f32 / self.documents.len() as f32 }
    }

    fn remove_document(&mut self, id: &str) {
        if let Some(len) = self.doc_lengths.remove(id) {
            self.total_length = self.total_length.saturating_sub(len as u64);
        }
        self.documents.remove(id);
        for postings in self.postings.values_mut() {
            postings.retain(|p| p.id != id);
        }
        self.postings.retain(|_, v| !v.is_empty());
    }

    fn add_document(&mut self, id: String, text: String) {
        let tokens = tokenize(&text);
        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for token in &tokens {
            *term_counts.entry(token.clone()).or_insert(0) += 1;
        }

        self.total_length += tokens.len() as u64;
        self.doc_lengths.insert(id.clone(), tokens.len());

        for (term, count) in term_counts {
            self.postings.entry(term).or_default().push(Posting { id: id.clone(), term_freq: count });
        }

        self.documents.insert(id, text);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Bm25Stats {
    pub document_count: usize,
    pub term_count: usize,
    pub avg_doc_len: f32,
}

/// `Busy`/writer-contention is not modeled as a distinct process-level error
/// here: this index is single-process, and the coordinator already enforces
/// one logical writer at a time via `SymbolStore`'s file-level transactions
/// (§5). A genuine multi-process deployment would surface `Busy` from sled's
/// own exclusive-open lock on `open`.
pub struct Bm25Index {
    k1: f32,
    b: f32,
    db: sled::Tree,
    inner: RwLock<Inner>,
}

impl Bm25Index {
    pub fn open(db: &sled::Db, config: &Bm25Config) -> Result<Self> {
        let tree = db.open_tree("bm25_documents")?;
        let mut inner = Inner::default();
        for entry in tree.iter() {
            let (_, value) = entry?;
            let doc: StoredDocument = bincode::deserialize(&value)?;
            inner.add_document(doc.id, doc.text);
        }

        Ok(Self { k1: config.k1, b: config.b, db: tree, inner: RwLock::new(inner) })
    }

    /// `upsert(documents)` (§4.4 contract): replaces any existing document
    /// with the same id.
    pub fn upsert(&self, documents: &[(String, String)]) -> Result<()> {
        let mut inner = self.inner.write();
        for (id, text) in documents {
            inner.remove_document(id);
            inner.add_document(id.clone(), text.clone());
            let stored = StoredDocument { id: id.clone(), text: text.clone() };
            self.db.insert(id.as_bytes(), bincode::serialize(&stored)?)?;
        }
        Ok(())
    }

    /// `delete(ids)`: unknown ids are ignored silently (§4.4 `NotFound`).
    pub fn delete(&self, ids: &[String]) -> Result<()> {
        let mut inner = self.inner.write();
        for id in ids {
            inner.remove_document(id);
            let _ = self.db.remove(id.as_bytes())?;
        }
        Ok(())
    }

    fn idf(&self, term: &str, inner: &Inner) -> f32 {
        let n = inner.documents.len() as f32;
        let df = inner.postings.get(term).map(|p| p.len()).unwrap_or(0) as f32;
        let raw = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
        raw.max(1e-6)
    }

    fn score(&self, term_freq: usize, doc_len: usize, idf: f32, avg_doc_len: f32) -> f32 {
        let tf = term_freq as f32;
        let numerator = tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * (doc_len as f32 / avg_doc_len.max(1.0)));
        idf * (numerator / denominator)
    }

    /// `search(query_text, k)` (§4.4): equal scores are ordered
    /// lexicographically by id for determinism.
    pub fn search(&self, query_text: &str, k: usize) -> Vec<(String, f32)> {
        let inner = self.inner.read();
        let avg_doc_len = inner.avg_doc_len();
        let query_terms = tokenize(query_text);

        let mut scores: HashMap<String, f32> = HashMap::new();
        for term in &query_terms {
            let Some(postings) = inner.postings.get(term) else { continue };
            let idf = self.idf(term, &inner);
            for posting in postings {
                let doc_len = inner.doc_lengths.get(&posting.id).copied().unwrap_or(0);
                let score = self.score(posting.term_freq, doc_len, idf, avg_doc_len);
                if score.is_finite() {
                    *scores.entry(posting.id.clone()).or_insert(0.0) += score;
                }
            }
        }

        let mut results: Vec<(String, f32)> = scores.into_iter().collect();
        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(k);
        results
    }

    pub fn all_ids(&self) -> Vec<String> {
        self.inner.read().documents.keys().cloned().collect()
    }

    pub fn stats(&self) -> Bm25Stats {
        let inner = self.inner.read();
        Bm25Stats {
            document_count: inner.documents.len(),
            term_count: inner.postings.len(),
            avg_doc_len: inner.avg_doc_len(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| LumenError::storage(format!("failed to flush bm25 index: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_index() -> Bm25Index {
        let db = sled::Config::new().temporary(true).open().unwrap();
        Bm25Index::open(&db, &Bm25Config::default()).unwrap()
    }

    #[test]
    fn finds_document_by_term() {
        let index = open_test_index();
        index
            .upsert(&[
                ("a".into(), "fn handle_auth_login() {}".into()),
                ("b".into(), "fn render_page() {}".into()),
            ])
            .unwrap();
        let results = index.search("auth", 10);
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn equal_scores_break_ties_lexicographically() {
        let index = open_test_index();
        index
            .upsert(&[("z".into(), "foo bar".into()), ("a".into(), "foo bar".into())])
            .unwrap();
        let results = index.search("foo", 10);
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].0, "z");
    }

    #[test]
    fn delete_unknown_id_is_silent_noop() {
        let index = open_test_index();
        index.delete(&["missing".into()]).unwrap();
    }

    #[test]
    fn upsert_replaces_existing_document() {
        let index = open_test_index();
        index.upsert(&[("a".into(), "alpha".into())]).unwrap();
        index.upsert(&[("a".into(), "beta".into())]).unwrap();
        assert!(index.search("alpha", 10).is_empty());
        assert_eq!(index.search("beta", 10)[0].0, "a");
    }

    #[test]
    fn persists_across_reopen() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        {
            let index = Bm25Index::open(&db, &Bm25Config::default()).unwrap();
            index.upsert(&[("a".into(), "persisted document".into())]).unwrap();
            index.save().unwrap();
        }
        let reopened = Bm25Index::open(&db, &Bm25Config::default()).unwrap();
        assert_eq!(reopened.search("persisted", 10)[0].0, "a");
    }
}
