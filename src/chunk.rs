// Data model shared by the chunker, the three index stores, and the search
// engine: `Chunk` (§3 Chunk) and `FileRecord` (§3 File record).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Coarse symbol category a chunk carries. `Other` is the fallback for
/// language-agnostic byte-window chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Type,
    Interface,
    Const,
    Var,
    Block,
    File,
    Other,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Type => "type",
            SymbolKind::Interface => "interface",
            SymbolKind::Const => "const",
            SymbolKind::Var => "var",
            SymbolKind::Block => "block",
            SymbolKind::File => "file",
            SymbolKind::Other => "other",
        }
    }
}

/// A contiguous byte range within a source file, start inclusive, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The atomic unit of retrieval (§3 Chunk). Mutated never: a changed chunk is
/// a delete-then-insert of a new one with a new `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub path: String,
    pub language: String,
    pub symbol_kind: SymbolKind,
    pub symbol_name: String,
    pub byte_range: ByteRange,
    pub content: String,
    /// Natural-language descriptor prepended before embedding only; never
    /// indexed by BM25, never returned to clients (§4.2).
    pub context_prefix: Option<String>,
    pub parent_scope: Option<String>,
}

impl Chunk {
    /// Derives the stable chunk id from `(path, byte_start, byte_end, content_hash)`
    /// (§3 invariants, §4.6). Reindexing an unchanged file reproduces identical
    /// ids because the inputs are identical.
    pub fn derive_id(path: &str, byte_range: ByteRange, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(byte_range.start.to_le_bytes());
        hasher.update(byte_range.end.to_le_bytes());
        hasher.update(content_hash(content.as_bytes()).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Text to hand to the embedder: `context_prefix` (when present) followed
    /// by the chunk's own content, matching §4.9's indexing algorithm step 3.
    pub fn embedding_text(&self) -> String {
        match &self.context_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}\n\n{}", self.content),
            _ => self.content.clone(),
        }
    }

    /// Text handed to the BM25 index: content only, the prefix is never indexed.
    pub fn bm25_text(&self) -> &str {
        &self.content
    }
}

/// Per-file metadata, the Symbol Store's unit of transaction (§3 File record, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub content_hash: String,
    pub language: String,
    pub mtime: i64,
    pub chunk_ids: Vec<String>,
}

impl FileRecord {
    pub fn new(path: String, content: &[u8], language: String, mtime: i64, chunk_ids: Vec<String>) -> Self {
        Self { path, content_hash: content_hash(content), language, mtime, chunk_ids }
    }
}

/// SHA-256 over file bytes, hex-encoded (§3 File record).
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_is_stable_for_identical_inputs() {
        let id_a = Chunk::derive_id("src/foo.rs", ByteRange::new(0, 10), "fn foo() {}");
        let id_b = Chunk::derive_id("src/foo.rs", ByteRange::new(0, 10), "fn foo() {}");
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn chunk_id_changes_with_content() {
        let id_a = Chunk::derive_id("src/foo.rs", ByteRange::new(0, 10), "fn foo() {}");
        let id_b = Chunk::derive_id("src/foo.rs", ByteRange::new(0, 10), "fn foo() {?}");
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn embedding_text_prepends_prefix_but_bm25_text_excludes_it() {
        let chunk = Chunk {
            id: "x".into(),
            path: "a.rs".into(),
            language: "rust".into(),
            symbol_kind: SymbolKind::Function,
            symbol_name: "foo".into(),
            byte_range: ByteRange::new(0, 3),
            content: "fn foo() {}".into(),
            context_prefix: Some("From file: a.rs. Defines: function foo.".into()),
            parent_scope: None,
        };
        assert!(chunk.embedding_text().starts_with("From file"));
        assert_eq!(chunk.bm25_text(), "fn foo() {}");
    }
}
