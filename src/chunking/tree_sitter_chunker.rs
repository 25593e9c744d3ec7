// Structural chunking (§4.2) via tree-sitter: an incremental, parse-error
// tolerant concrete syntax tree per language, walked for a per-language set
// of chunkable node kinds. Oversized chunks are split on child-node
// boundaries and a parent symbol is registered for discoverability.
//
// Grounded on the teacher's `semantic_chunker.rs`/`symbol_extractor.rs` walk
// style; generalized to the chunk-kind vocabulary in spec §3 (SymbolKind).
// Open question resolution (documented in DESIGN.md): an `impl`/class body is
// treated as a container that contributes `parent_scope` to its nested
// methods rather than being chunked itself, to avoid emitting the method's
// source twice.

use tree_sitter::{Node, Parser};

use crate::chunk::{ByteRange, SymbolKind};
use super::RawChunk;

/// A chunkable node kind for a language, and what `SymbolKind` it maps to.
struct NodeRule {
    kind: &'static str,
    symbol_kind: SymbolKind,
    /// True when this node's children should be walked looking for nested
    /// chunkable nodes (impl blocks, class bodies, modules).
    is_container: bool,
}

fn rules_for(language: &str) -> &'static [NodeRule] {
    match language {
        "rust" => &[
            NodeRule { kind: "function_item", symbol_kind: SymbolKind::Function, is_container: false },
            NodeRule { kind: "struct_item", symbol_kind: SymbolKind::Type, is_container: false },
            NodeRule { kind: "enum_item", symbol_kind: SymbolKind::Type, is_container: false },
            NodeRule { kind: "trait_item", symbol_kind: SymbolKind::Interface, is_container: true },
            NodeRule { kind: "const_item", symbol_kind: SymbolKind::Const, is_container: false },
            NodeRule { kind: "static_item", symbol_kind: SymbolKind::Const, is_container: false },
            NodeRule { kind: "impl_item", symbol_kind: SymbolKind::Other, is_container: true },
            NodeRule { kind: "mod_item", symbol_kind: SymbolKind::Other, is_container: true },
        ],
        "python" => &[
            NodeRule { kind: "function_definition", symbol_kind: SymbolKind::Function, is_container: false },
            NodeRule { kind: "class_definition", symbol_kind: SymbolKind::Type, is_container: true },
        ],
        "javascript" | "typescript" => &[
            NodeRule { kind: "function_declaration", symbol_kind: SymbolKind::Function, is_container: false },
            NodeRule { kind: "method_definition", symbol_kind: SymbolKind::Method, is_container: false },
            NodeRule { kind: "class_declaration", symbol_kind: SymbolKind::Type, is_container: true },
            NodeRule { kind: "interface_declaration", symbol_kind: SymbolKind::Interface, is_container: true },
        ],
        "go" => &[
            NodeRule { kind: "function_declaration", symbol_kind: SymbolKind::Function, is_container: false },
            NodeRule { kind: "method_declaration", symbol_kind: SymbolKind::Method, is_container: false },
            NodeRule { kind: "type_declaration", symbol_kind: SymbolKind::Type, is_container: false },
        ],
        "java" => &[
            NodeRule { kind: "method_declaration", symbol_kind: SymbolKind::Method, is_container: false },
            NodeRule { kind: "class_declaration", symbol_kind: SymbolKind::Type, is_container: true },
            NodeRule { kind: "interface_declaration", symbol_kind: SymbolKind::Interface, is_container: true },
            NodeRule { kind: "field_declaration", symbol_kind: SymbolKind::Var, is_container: false },
        ],
        _ => &[],
    }
}

/// Nested methods get their parent's identifier as `parent_scope` (e.g. the
/// receiver type for a Rust method, the enclosing class for Java/Python/JS).
fn method_kinds(language: &str) -> &'static [&'static str] {
    match language {
        "rust" => &["function_item"],
        "python" => &["function_definition"],
        "javascript" | "typescript" => &["method_definition"],
        "go" => &["method_declaration"],
        "java" => &["method_declaration"],
        _ => &[],
    }
}

pub struct TreeSitterChunker;

impl TreeSitterChunker {
    pub fn new() -> Self {
        Self
    }

    pub fn supports(&self, language: &str) -> bool {
        !rules_for(language).is_empty()
    }

    fn grammar(&self, language: &str) -> Option<tree_sitter::Language> {
        match language {
            "rust" => Some(tree_sitter_rust::LANGUAGE.into()),
            "python" => Some(tree_sitter_python::LANGUAGE.into()),
            "javascript" => Some(tree_sitter_javascript::LANGUAGE.into()),
            "typescript" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            "go" => Some(tree_sitter_go::LANGUAGE.into()),
            "java" => Some(tree_sitter_java::LANGUAGE.into()),
            _ => None,
        }
    }

    /// Parses `source` and emits chunks for every chunkable node, splitting
    /// any that exceed `max_chunk_bytes` and registering a parent symbol for
    /// the split (§4.2, §9).
    pub fn chunk(&self, language: &str, source: &str, max_chunk_bytes: usize) -> Vec<RawChunk> {
        let Some(grammar) = self.grammar(language) else { return Vec::new() };

        let mut parser = Parser::new();
        if parser.set_language(&grammar).is_err() {
            return Vec::new();
        }

        let Some(tree) = parser.parse(source, None) else { return Vec::new() };
        // Parser is dropped here deterministically; no leaked resources persist
        // between calls (§4.2).

        let mut chunks = Vec::new();
        walk(tree.root_node(), language, source, None, &mut chunks);

        let mut result = Vec::new();
        for chunk in chunks {
            if chunk.content.len() > max_chunk_bytes {
                result.extend(split_oversized(chunk, max_chunk_bytes));
            } else {
                result.push(chunk);
            }
        }
        result
    }
}

impl Default for TreeSitterChunker {
    fn default() -> Self {
        Self::new()
    }
}

fn walk(node: Node, language: &str, source: &str, parent_scope: Option<String>, out: &mut Vec<RawChunk>) {
    let rules = rules_for(language);
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(rule) = rules.iter().find(|r| r.kind == child.kind()) {
            let name = node_name(child, source);
            let symbol_kind = if parent_scope.is_some() && method_kinds(language).contains(&child.kind()) {
                SymbolKind::Method
            } else {
                rule.symbol_kind
            };

            if !rule.is_container {
                out.push(make_chunk(child, source, symbol_kind, name.clone(), parent_scope.clone()));
            }

            let next_scope = if rule.is_container { name.clone().filter(|n| !n.is_empty()).or(parent_scope.clone()) } else { parent_scope.clone() };
            walk(child, language, source, next_scope, out);
        } else {
            walk(child, language, source, parent_scope.clone(), out);
        }
    }
}

fn node_name(node: Node, source: &str) -> Option<String> {
    node.child_by_field_name("name")
        .or_else(|| node.child_by_field_name("type"))
        .and_then(|n| n.utf8_text(source.as_bytes()).ok())
        .map(|s| s.to_string())
}

fn make_chunk(
    node: Node,
    source: &str,
    symbol_kind: SymbolKind,
    name: Option<String>,
    parent_scope: Option<String>,
) -> RawChunk {
    let (start, end) = extend_for_leading_comment(node, source);
    RawChunk {
        symbol_kind,
        symbol_name: name.unwrap_or_default(),
        byte_range: ByteRange::new(start, end),
        content: source[start..end].to_string(),
        parent_scope,
    }
}

/// Includes a leading comment immediately above the node when contiguous in
/// source (§4.2): no blank line and no other non-whitespace content between
/// the comment and the node.
fn extend_for_leading_comment(node: Node, source: &str) -> (usize, usize) {
    let mut start = node.start_byte();
    let end = node.end_byte();

    if let Some(prev) = node.prev_sibling() {
        if prev.kind().contains("comment") {
            let between = &source[prev.end_byte()..node.start_byte()];
            if between.chars().filter(|c| *c == '\n').count() <= 1 {
                start = prev.start_byte();
            }
        }
    }

    (start, end)
}

/// Splits an oversized chunk into ordered `_part1`, `_part2`, ... sub-chunks
/// on line boundaries near `max_chunk_bytes`, and registers a content-empty
/// parent chunk carrying the undecorated symbol name for BM25-only recall
/// (§4.2, §9 "parent-symbol registration for split chunks").
fn split_oversized(chunk: RawChunk, max_chunk_bytes: usize) -> Vec<RawChunk> {
    let base_start = chunk.byte_range.start;
    let lines: Vec<&str> = chunk.content.split_inclusive('\n').collect();

    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_start_offset = 0usize;

    for line in &lines {
        if !current.is_empty() && current.len() + line.len() > max_chunk_bytes {
            let part_start = base_start + current_start_offset;
            let part_end = part_start + current.len();
            parts.push((part_start, part_end, std::mem::take(&mut current)));
            current_start_offset = part_end - base_start;
        }
        current.push_str(line);
    }
    if !current.is_empty() {
        let part_start = base_start + current_start_offset;
        let part_end = part_start + current.len();
        parts.push((part_start, part_end, current));
    }

    if parts.len() <= 1 {
        return vec![chunk];
    }

    let mut out = Vec::with_capacity(parts.len() + 1);
    for (i, (start, end, content)) in parts.into_iter().enumerate() {
        out.push(RawChunk {
            symbol_kind: chunk.symbol_kind,
            symbol_name: format!("{}_part{}", chunk.symbol_name, i + 1),
            byte_range: ByteRange::new(start, end),
            content,
            parent_scope: chunk.parent_scope.clone(),
        });
    }

    out.push(RawChunk {
        symbol_kind: chunk.symbol_kind,
        symbol_name: chunk.symbol_name,
        byte_range: chunk.byte_range,
        content: String::new(),
        parent_scope: out[0].parent_scope.clone(),
    });

    out
}
