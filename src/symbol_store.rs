// Symbol Store (§4.6): durable record of every chunk and file. The
// canonical source of truth BM25 and the Vector Index are derived and
// reconstructible from (§3 Ownership). Grounded on the teacher's
// `simple_vectordb.rs` sled-backed schema pattern, transposed from
// embedding records onto the spec's `Chunk`/`FileRecord` model.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use sled::transaction::{ConflictableTransactionError, TransactionError};

use crate::chunk::{Chunk, FileRecord};
use crate::error::{LumenError, Result};

pub struct SymbolStore {
    db: sled::Db,
    files: sled::Tree,
    chunks: sled::Tree,
    name_index: RwLock<HashMap<String, Vec<String>>>,
}

impl SymbolStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        let files = db.open_tree("files")?;
        let chunks = db.open_tree("chunks")?;

        let mut name_index: HashMap<String, Vec<String>> = HashMap::new();
        for entry in chunks.iter() {
            let (_, value) = entry?;
            let chunk: Chunk = bincode::deserialize(&value)?;
            if !chunk.symbol_name.is_empty() {
                name_index.entry(chunk.symbol_name.clone()).or_default().push(chunk.id.clone());
            }
        }

        Ok(Self { db, files, chunks, name_index: RwLock::new(name_index) })
    }

    /// `upsert_file(file_record, chunks)` (§4.6): transactional — all of a
    /// file's chunks are upserted or none are. Returns the ids of any
    /// previously stored chunks for this path that are no longer present,
    /// so the caller can delete them from BM25/Vector (§4.9 atomic replace).
    pub fn upsert_file(&self, file_record: FileRecord, chunks: Vec<Chunk>) -> Result<Vec<String>> {
        let previous_chunk_ids = self.get_file(&file_record.path)?.map(|f| f.chunk_ids).unwrap_or_default();
        let new_ids: std::collections::HashSet<&String> = file_record.chunk_ids.iter().collect();
        let stale_ids: Vec<String> = previous_chunk_ids.into_iter().filter(|id| !new_ids.contains(id)).collect();

        let file_key = file_record.path.clone();
        let file_bytes = bincode::serialize(&file_record)?;

        let chunk_entries: Result<Vec<(String, Vec<u8>)>> = chunks
            .iter()
            .map(|c| Ok((c.id.clone(), bincode::serialize(c)?)))
            .collect();
        let chunk_entries = chunk_entries?;

        let result: std::result::Result<(), TransactionError<LumenError>> =
            (&self.files, &self.chunks).transaction(|(files_tx, chunks_tx)| {
                files_tx.insert(file_key.as_bytes(), file_bytes.as_slice())?;
                for (id, bytes) in &chunk_entries {
                    chunks_tx.insert(id.as_bytes(), bytes.as_slice())?;
                }
                for stale in &stale_ids {
                    chunks_tx.remove(stale.as_bytes())?;
                }
                Ok::<(), ConflictableTransactionError<LumenError>>(())
            });

        result.map_err(|e| LumenError::storage(format!("upsert_file transaction failed: {e}")))?;

        {
            let mut index = self.name_index.write();
            for stale in &stale_ids {
                for ids in index.values_mut() {
                    ids.retain(|id| id != stale);
                }
            }
            for chunk in &chunks {
                if !chunk.symbol_name.is_empty() {
                    let entry = index.entry(chunk.symbol_name.clone()).or_default();
                    if !entry.contains(&chunk.id) {
                        entry.push(chunk.id.clone());
                    }
                }
            }
            index.retain(|_, v| !v.is_empty());
        }

        Ok(stale_ids)
    }

    /// `delete_file(path)`: removes the file record and all of its chunks,
    /// returning the removed chunk ids for the caller to evict from
    /// BM25/Vector (§4.9 deletion ordering).
    pub fn delete_file(&self, path: &str) -> Result<Vec<String>> {
        let Some(file_record) = self.get_file(path)? else { return Ok(Vec::new()) };

        let result: std::result::Result<(), TransactionError<LumenError>> =
            (&self.files, &self.chunks).transaction(|(files_tx, chunks_tx)| {
                files_tx.remove(path.as_bytes())?;
                for id in &file_record.chunk_ids {
                    chunks_tx.remove(id.as_bytes())?;
                }
                Ok::<(), ConflictableTransactionError<LumenError>>(())
            });

        result.map_err(|e| LumenError::storage(format!("delete_file transaction failed: {e}")))?;

        let mut index = self.name_index.write();
        for ids in index.values_mut() {
            ids.retain(|id| !file_record.chunk_ids.contains(id));
        }
        index.retain(|_, v| !v.is_empty());

        Ok(file_record.chunk_ids)
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        match self.files.get(path.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        let mut out = Vec::new();
        for entry in self.files.iter() {
            let (_, value) = entry?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }

    pub fn get_chunk(&self, id: &str) -> Option<Chunk> {
        self.chunks.get(id.as_bytes()).ok().flatten().and_then(|bytes| bincode::deserialize(&bytes).ok())
    }

    pub fn find_by_symbol(&self, name: &str) -> Vec<Chunk> {
        let index = self.name_index.read();
        index
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.get_chunk(id)).collect())
            .unwrap_or_default()
    }

    /// All chunk ids currently recorded, used by reconciliation sweeps to
    /// detect orphans in BM25/Vector (§4.9).
    pub fn all_chunk_ids(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for entry in self.chunks.iter() {
            let (key, _) = entry?;
            out.push(String::from_utf8_lossy(&key).to_string());
        }
        Ok(out)
    }
}

impl From<ConflictableTransactionError<LumenError>> for LumenError {
    fn from(e: ConflictableTransactionError<LumenError>) -> Self {
        match e {
            ConflictableTransactionError::Abort(err) => err,
            other => LumenError::storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ByteRange, SymbolKind};
    use tempfile::TempDir;

    fn make_chunk(id: &str, path: &str, name: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            path: path.to_string(),
            language: "rust".into(),
            symbol_kind: SymbolKind::Function,
            symbol_name: name.to_string(),
            byte_range: ByteRange::new(0, 10),
            content: "fn foo() {}".into(),
            context_prefix: None,
            parent_scope: None,
        }
    }

    #[test]
    fn upsert_and_get_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path()).unwrap();
        let chunk = make_chunk("c1", "a.rs", "foo");
        let file = FileRecord::new("a.rs".into(), b"fn foo() {}", "rust".into(), 0, vec!["c1".into()]);
        store.upsert_file(file, vec![chunk.clone()]).unwrap();

        assert_eq!(store.get_file("a.rs").unwrap().unwrap().chunk_ids, vec!["c1"]);
        assert_eq!(store.get_chunk("c1").unwrap().symbol_name, "foo");
        assert_eq!(store.find_by_symbol("foo").len(), 1);
    }

    #[test]
    fn reindex_drops_stale_chunks() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path()).unwrap();
        let file_v1 = FileRecord::new("a.rs".into(), b"v1", "rust".into(), 0, vec!["c1".into()]);
        store.upsert_file(file_v1, vec![make_chunk("c1", "a.rs", "foo")]).unwrap();

        let file_v2 = FileRecord::new("a.rs".into(), b"v2", "rust".into(), 1, vec!["c2".into()]);
        let stale = store.upsert_file(file_v2, vec![make_chunk("c2", "a.rs", "bar")]).unwrap();

        assert_eq!(stale, vec!["c1".to_string()]);
        assert!(store.get_chunk("c1").is_none());
        assert!(store.get_chunk("c2").is_some());
    }

    #[test]
    fn delete_file_removes_all_its_chunks() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path()).unwrap();
        let file = FileRecord::new("a.rs".into(), b"fn foo() {}", "rust".into(), 0, vec!["c1".into()]);
        store.upsert_file(file, vec![make_chunk("c1", "a.rs", "foo")]).unwrap();

        let removed = store.delete_file("a.rs").unwrap();
        assert_eq!(removed, vec!["c1".to_string()]);
        assert!(store.get_file("a.rs").unwrap().is_none());
        assert!(store.get_chunk("c1").is_none());
    }
}
