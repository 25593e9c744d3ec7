// Vector Index (§4.5): an HNSW graph over chunk embeddings, approximate
// top-k cosine search. Grounded on the teacher's `simple_vectordb.rs` for
// the sled-backed persistence and schema-versioning pattern; the ANN graph
// itself is enrichment from outside the teacher (the `hnsw_rs` crate, the
// real HNSW implementation used by other repositories in the retrieval
// pack — the teacher's own vector store is LanceDB's flat/IVF index, not a
// true HNSW graph, so it does not cover this component on its own).
//
// Implementation note (documented in DESIGN.md): `hnsw_rs`'s own graph has no
// delete operation, so deletions are tombstoned here and the graph is
// rebuilt from the vectors persisted in sled once the tombstone ratio
// crosses the configured threshold (§4.5), rather than attempting to patch
// the graph in place. Because the canonical vectors live in sled, the graph
// itself does not need its own on-disk serialization: it is rebuilt in
// insertion order on `load()`, which is equivalent in outcome to reopening a
// persisted graph and keeps the crate's HNSW usage to its well-documented
// `new`/`insert`/`search` surface.

use std::collections::HashMap;

use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::HnswConfig;
use crate::error::{LumenError, Result};

const META_KEY: &[u8] = b"__meta__";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexMeta {
    magic: u32,
    version: u32,
    dimension: usize,
}

const MAGIC: u32 = 0x4c53_4856; // "LSHV"
const VERSION: u32 = 1;

struct Graph {
    hnsw: Hnsw<'static, f32, DistCosine>,
    slot_to_id: HashMap<usize, String>,
    id_to_slot: HashMap<String, usize>,
    tombstones: usize,
    next_slot: usize,
}

impl Graph {
    fn new(config: &HnswConfig, max_elements: usize) -> Self {
        Self {
            hnsw: Hnsw::new(config.m, max_elements, 16, config.ef_construction, DistCosine {}),
            slot_to_id: HashMap::new(),
            id_to_slot: HashMap::new(),
            tombstones: 0,
            next_slot: 0,
        }
    }

    fn live_count(&self) -> usize {
        self.id_to_slot.len()
    }

    fn tombstone_ratio(&self) -> f32 {
        let total = self.live_count() + self.tombstones;
        if total == 0 { 0.0 } else { self.tombstones as f32 / total as f32 }
    }
}

/// Single-process, process-wide HNSW index (§4.5): internally safe for
/// concurrent reads; writes are serialized by the coordinator via the
/// enclosing lock.
pub struct VectorIndex {
    config: HnswConfig,
    dimension: usize,
    vectors: sled::Tree,
    graph: RwLock<Graph>,
}

impl VectorIndex {
    pub fn open(db: &sled::Db, dimension: usize, config: HnswConfig) -> Result<Self> {
        let tree = db.open_tree("vectors")?;

        if let Some(raw) = tree.get(META_KEY)? {
            let meta: IndexMeta = bincode::deserialize(&raw)?;
            if meta.magic != MAGIC || meta.version != VERSION || meta.dimension != dimension {
                tracing::warn!(
                    stored_dim = meta.dimension,
                    requested_dim = dimension,
                    "vector index header mismatch, rebuilding"
                );
                tree.clear()?;
            }
        }

        let meta = IndexMeta { magic: MAGIC, version: VERSION, dimension };
        tree.insert(META_KEY, bincode::serialize(&meta)?)?;

        let max_elements = tree.len().max(10_000);
        let mut graph = Graph::new(&config, max_elements);

        for entry in tree.iter() {
            let (key, value) = entry?;
            if key.as_ref() == META_KEY {
                continue;
            }
            let id = String::from_utf8_lossy(&key).to_string();
            let vector: Vec<f32> = bincode::deserialize(&value)?;
            insert_into_graph(&mut graph, id, &vector);
        }

        Ok(Self { config, dimension, vectors: tree, graph: RwLock::new(graph) })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// `insert(id, vector)` (§4.5): fails with `DimensionMismatch` when
    /// `vector.len() != D`.
    pub fn insert(&self, id: &str, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(LumenError::DimensionMismatch { expected: self.dimension, actual: vector.len() });
        }

        self.vectors.insert(id.as_bytes(), bincode::serialize(&vector.to_vec())?)?;

        let mut graph = self.graph.write();
        if let Some(&slot) = graph.id_to_slot.get(id) {
            graph.slot_to_id.remove(&slot);
            graph.id_to_slot.remove(id);
            graph.tombstones += 1;
        }
        insert_into_graph(&mut graph, id.to_string(), vector);
        self.maybe_compact(&mut graph);
        Ok(())
    }

    /// `delete(id)`: logical tombstone; physical removal happens at compaction.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.vectors.remove(id.as_bytes())?;
        let mut graph = self.graph.write();
        if let Some(slot) = graph.id_to_slot.remove(id) {
            graph.slot_to_id.remove(&slot);
            graph.tombstones += 1;
        }
        self.maybe_compact(&mut graph);
        Ok(())
    }

    /// `search(query_vector, k)` (§4.5): similarity in `[-1, 1]`, descending.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<(String, f32)>> {
        if query_vector.len() != self.dimension {
            return Err(LumenError::DimensionMismatch { expected: self.dimension, actual: query_vector.len() });
        }

        let graph = self.graph.read();
        if graph.live_count() == 0 {
            return Ok(Vec::new());
        }

        // Over-fetch to absorb tombstoned slots that may still surface from
        // the graph until the next compaction.
        let over_fetch = (k * 2).max(k + graph.tombstones.min(k)).max(1);
        let neighbours = graph.hnsw.search(query_vector, over_fetch, self.config.ef_search);

        let mut results: Vec<(String, f32)> = neighbours
            .into_iter()
            .filter_map(|n| graph.slot_to_id.get(&n.d_id).map(|id| (id.clone(), 1.0 - n.distance)))
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        Ok(results)
    }

    fn maybe_compact(&self, graph: &mut Graph) {
        if graph.tombstone_ratio() <= self.config.tombstone_compaction_ratio {
            return;
        }

        tracing::info!(ratio = graph.tombstone_ratio(), "compacting vector index");
        let mut rebuilt = Graph::new(&self.config, graph.live_count().max(10_000));
        for entry in self.vectors.iter() {
            let Ok((key, value)) = entry else { continue };
            if key.as_ref() == META_KEY {
                continue;
            }
            let id = String::from_utf8_lossy(&key).to_string();
            if let Ok(vector) = bincode::deserialize::<Vec<f32>>(&value) {
                insert_into_graph(&mut rebuilt, id, &vector);
            }
        }
        *graph = rebuilt;
    }

    pub fn save(&self) -> Result<()> {
        self.vectors
            .flush()
            .map_err(|e| LumenError::storage(format!("failed to flush vector index: {e}")))?;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.graph.read().live_count()
    }

    /// All ids currently live in the graph, used by startup reconciliation to
    /// find orphans not present in the Symbol Store (§4.9).
    pub fn all_ids(&self) -> Vec<String> {
        self.graph.read().id_to_slot.keys().cloned().collect()
    }
}

fn insert_into_graph(graph: &mut Graph, id: String, vector: &[f32]) {
    let slot = graph.next_slot;
    graph.next_slot += 1;
    graph.hnsw.insert((vector, slot));
    graph.slot_to_id.insert(slot, id.clone());
    graph.id_to_slot.insert(id, slot);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_index(dimension: usize) -> VectorIndex {
        let db = sled::Config::new().temporary(true).open().unwrap();
        VectorIndex::open(&db, dimension, HnswConfig::default()).unwrap()
    }

    #[test]
    fn finds_nearest_neighbor() {
        let index = open_test_index(3);
        index.insert("a", &[1.0, 0.0, 0.0]).unwrap();
        index.insert("b", &[0.0, 1.0, 0.0]).unwrap();
        let results = index.search(&[0.9, 0.1, 0.0], 1).unwrap();
        assert_eq!(results[0].0, "a");
    }

    #[test]
    fn rejects_mismatched_dimension() {
        let index = open_test_index(3);
        let err = index.insert("a", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, LumenError::DimensionMismatch { .. }));
    }

    #[test]
    fn delete_removes_from_search_results() {
        let index = open_test_index(2);
        index.insert("a", &[1.0, 0.0]).unwrap();
        index.delete("a").unwrap();
        let results = index.search(&[1.0, 0.0], 5).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn persists_across_reopen() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        {
            let index = VectorIndex::open(&db, 2, HnswConfig::default()).unwrap();
            index.insert("a", &[1.0, 0.0]).unwrap();
            index.save().unwrap();
        }
        let reopened = VectorIndex::open(&db, 2, HnswConfig::default()).unwrap();
        assert_eq!(reopened.count(), 1);
    }
}
