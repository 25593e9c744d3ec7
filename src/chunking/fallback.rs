// Fallback chunking strategies (§4.2): fixed-size byte windowing with overlap
// for unsupported languages, and the single whole-file chunk returned when
// parsing produces no chunkable nodes.

use crate::chunk::{ByteRange, SymbolKind};
use super::RawChunk;

/// Splits `text` into overlapping byte windows of at most `window_bytes`,
/// each overlapping the previous by `overlap_fraction * window_bytes`.
/// Marks every chunk `symbol_kind = other` (§4.2).
pub fn byte_window_chunks(text: &str, window_bytes: usize, overlap_fraction: f32) -> Vec<RawChunk> {
    if text.is_empty() {
        return Vec::new();
    }

    let window = window_bytes.max(1);
    let overlap = ((window as f32) * overlap_fraction).round() as usize;
    let stride = window.saturating_sub(overlap).max(1);

    let bytes = text.as_bytes();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < bytes.len() {
        let mut end = (start + window).min(bytes.len());
        // Never split a UTF-8 code point.
        while end < bytes.len() && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end <= start {
            break;
        }
        let content = text[start..end].to_string();
        chunks.push(RawChunk {
            symbol_kind: SymbolKind::Other,
            symbol_name: String::new(),
            byte_range: ByteRange::new(start, end),
            content,
            parent_scope: None,
        });

        if end >= bytes.len() {
            break;
        }
        start += stride;
    }

    chunks
}

/// Single `file`-kind chunk spanning a whole file, used when the chunker
/// produces no chunkable nodes at all (§4.2 failure mode) or the file's bytes
/// are not valid UTF-8.
pub fn whole_file_chunk(byte_len: usize) -> Vec<RawChunk> {
    if byte_len == 0 {
        return Vec::new();
    }
    vec![RawChunk {
        symbol_kind: SymbolKind::File,
        symbol_name: String::new(),
        byte_range: ByteRange::new(0, byte_len),
        content: String::new(),
        parent_scope: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_overlap_by_configured_fraction() {
        let text = "a".repeat(100);
        let chunks = byte_window_chunks(&text, 40, 0.10);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].byte_range.start, 0);
        assert_eq!(chunks[0].byte_range.end, 40);
        assert_eq!(chunks[1].byte_range.start, 36); // stride = 40 - 4
    }

    #[test]
    fn covers_whole_input() {
        let text = "x".repeat(97);
        let chunks = byte_window_chunks(&text, 30, 0.10);
        let last = chunks.last().unwrap();
        assert_eq!(last.byte_range.end, 97);
    }

    #[test]
    fn respects_utf8_boundaries() {
        let text = "é".repeat(20); // each 'é' is 2 bytes
        let chunks = byte_window_chunks(&text, 7, 0.0);
        for chunk in &chunks {
            assert!(text.is_char_boundary(chunk.byte_range.start));
            assert!(text.is_char_boundary(chunk.byte_range.end));
        }
    }
}
