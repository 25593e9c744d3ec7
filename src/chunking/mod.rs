// Chunker (§4.2): produces semantic chunks from a source file. Dispatches to
// the tree-sitter structural chunker for recognized languages and falls back
// to fixed-size byte windowing otherwise.

pub mod fallback;
pub mod tree_sitter_chunker;

use crate::chunk::{ByteRange, Chunk, SymbolKind};
use crate::config::ChunkingConfig;

pub use tree_sitter_chunker::TreeSitterChunker;

/// A chunk produced before an `id` is assigned and before the context prefix
/// is attached; `chunk_file` turns these into full `Chunk`s.
#[derive(Debug, Clone)]
pub struct RawChunk {
    pub symbol_kind: SymbolKind,
    pub symbol_name: String,
    pub byte_range: ByteRange,
    pub content: String,
    pub parent_scope: Option<String>,
}

/// Detects a language from a file extension. Content sniffing is left as a
/// narrow heuristic on top since most repositories name files consistently
/// with their extension (§9 "replacing runtime reflection").
pub fn detect_language(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("");
    match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "go" => "go",
        "java" => "java",
        "md" | "markdown" => "markdown",
        _ => "other",
    }
}

pub fn is_docs_language(language: &str) -> bool {
    matches!(language, "markdown")
}

/// Produces `Chunk`s for a source file's bytes (§4.2 contract). Never fails
/// fatally: when no chunkable nodes are found, or the language is
/// unsupported, this returns byte-window or whole-file fallback chunks.
pub fn chunk_file(
    path: &str,
    bytes: &[u8],
    chunker: &TreeSitterChunker,
    config: &ChunkingConfig,
) -> Vec<RawChunk> {
    let language = detect_language(path);
    let text = match std::str::from_utf8(bytes) {
        Ok(t) => t,
        Err(_) => return fallback::whole_file_chunk(bytes.len()),
    };

    if text.is_empty() {
        return Vec::new();
    }

    let raw_chunks = if chunker.supports(language) {
        chunker.chunk(language, text, config.max_chunk_bytes)
    } else {
        fallback::byte_window_chunks(text, config.max_chunk_bytes, config.fallback_overlap_fraction)
    };

    if raw_chunks.is_empty() {
        fallback::whole_file_chunk(text.len())
    } else {
        raw_chunks
    }
}

/// Builds `context_prefix` text for a chunk using the pattern-based fallback
/// (§4.2): `"From file: {path}. Defines: {kind} {name}. Language: {lang}."`.
/// An LLM-backed enrichment step can replace this; this is the deterministic
/// default.
pub fn pattern_context_prefix(path: &str, language: &str, chunk: &RawChunk) -> String {
    if chunk.symbol_name.is_empty() {
        format!("From file: {path}. Language: {language}.")
    } else {
        format!(
            "From file: {path}. Defines: {} {}. Language: {language}.",
            chunk.symbol_kind.as_str(),
            chunk.symbol_name
        )
    }
}

fn should_prefix(language: &str, config: &ChunkingConfig) -> bool {
    if is_docs_language(language) {
        config.context_prefix_for_docs
    } else {
        config.context_prefix_for_code
    }
}

/// Converts `RawChunk`s into durable `Chunk`s: derives stable ids and attaches
/// the context prefix per §4.2/§9's per-kind default.
pub fn finalize_chunks(path: &str, raw_chunks: Vec<RawChunk>, config: &ChunkingConfig) -> Vec<Chunk> {
    let language = detect_language(path).to_string();
    let prefix_enabled = should_prefix(&language, config);

    raw_chunks
        .into_iter()
        .map(|raw| {
            let id = Chunk::derive_id(path, raw.byte_range, &raw.content);
            let context_prefix = if prefix_enabled {
                Some(pattern_context_prefix(path, &language, &raw))
            } else {
                None
            };
            Chunk {
                id,
                path: path.to_string(),
                language: language.clone(),
                symbol_kind: raw.symbol_kind,
                symbol_name: raw.symbol_name,
                byte_range: raw.byte_range,
                content: raw.content,
                context_prefix,
                parent_scope: raw.parent_scope,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_extensions() {
        assert_eq!(detect_language("src/main.rs"), "rust");
        assert_eq!(detect_language("app.py"), "python");
        assert_eq!(detect_language("README.md"), "markdown");
        assert_eq!(detect_language("data.bin"), "other");
    }

    #[test]
    fn empty_file_produces_no_chunks() {
        let chunker = TreeSitterChunker::new();
        let config = ChunkingConfig::default();
        let chunks = chunk_file("empty.rs", b"", &chunker, &config);
        assert!(chunks.is_empty());
    }
}
